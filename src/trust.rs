//! # Trust Tiers
//!
//! Maps a URL's registrable domain to a coarse trust tier:
//! `3 = High`, `2 = Medium`, `1 = Low`.
//!
//! - Lists load from JSON (`{ "high": [...], "medium": [...] }`).
//! - A built-in copy of `config/trusted_sources.json` is compiled in and used
//!   when no file is found.
//! - Lookup never fails: empty or malformed URLs resolve to tier 1.
//!
//! The resolver holds an immutable snapshot of the lists, so it can be shared
//! across requests behind an `Arc` without locking.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};
use url::Url;

const BUILTIN_SOURCES: &str = include_str!("../config/trusted_sources.json");

/// Second-level public suffixes that need three labels to form a registrable domain.
const MULTI_LABEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "co.in", "gov.in", "ac.in", "org.in", "net.in",
    "com.au", "net.au", "org.au", "gov.au", "co.nz", "co.jp", "com.br", "com.cn", "co.za",
    "com.sg", "com.mx", "com.tr",
];

/// Raw allowlists as stored on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrustLists {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
}

impl TrustLists {
    /// Load lists from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading trust lists from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing trust lists from {}", path.display()))
    }

    /// Load from `path`, falling back to the compiled-in lists on any error.
    pub fn load_or_builtin<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(&path) {
            Ok(lists) => lists,
            Err(e) => {
                tracing::warn!(error = %e, "trust lists unavailable, using built-in copy");
                Self::builtin()
            }
        }
    }

    /// Lists compiled into the binary.
    pub fn builtin() -> Self {
        serde_json::from_str(BUILTIN_SOURCES).unwrap_or_default()
    }
}

/// A resolved trust tier for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustTier {
    pub rank: u8,
    pub level: String,
    pub in_trusted_db: bool,
    pub domain: Option<String>,
}

impl TrustTier {
    fn from_rank(rank: u8, domain: Option<String>) -> Self {
        Self {
            rank,
            level: level_label(rank).to_string(),
            in_trusted_db: rank > 1,
            domain,
        }
    }

    /// Human-readable one-liner used by the transparency report.
    pub fn explanation(&self) -> String {
        format!(
            "Domain '{}' has trust rank {} ({} source)",
            self.domain.as_deref().unwrap_or("unknown"),
            self.rank,
            if self.in_trusted_db { "trusted" } else { "untrusted" }
        )
    }
}

/// `Low` / `Medium` / `High` for ranks 1..=3.
pub fn level_label(rank: u8) -> &'static str {
    match rank {
        3 => "High",
        2 => "Medium",
        _ => "Low",
    }
}

/// Immutable domain lookup built once at startup.
#[derive(Debug, Clone)]
pub struct TrustResolver {
    high: HashSet<String>,
    medium: HashSet<String>,
}

impl TrustResolver {
    pub fn new(lists: TrustLists) -> Self {
        let norm = |v: Vec<String>| -> HashSet<String> {
            v.into_iter()
                .map(|d| d.trim().trim_end_matches('.').to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect()
        };
        Self {
            high: norm(lists.high),
            medium: norm(lists.medium),
        }
    }

    pub fn builtin() -> Self {
        Self::new(TrustLists::builtin())
    }

    /// Trust rank in `{1, 2, 3}`. Unknown, empty or malformed input gives 1.
    pub fn rank(&self, url: &str) -> u8 {
        match registrable_domain(url) {
            Some(d) if self.high.contains(&d) => 3,
            Some(d) if self.medium.contains(&d) => 2,
            _ => 1,
        }
    }

    /// Full tier report (rank, label, membership flag, extracted domain).
    pub fn tier(&self, url: &str) -> TrustTier {
        TrustTier::from_rank(self.rank(url), registrable_domain(url))
    }

    /// Evidence trust factor: `{3: 1.0, 2: 0.7, 1: 0.4}`.
    pub fn weight(&self, url: &str) -> f64 {
        match self.rank(url) {
            3 => 1.0,
            2 => 0.7,
            _ => 0.4,
        }
    }
}

/// Lowercased DNS hostname of a URL, parsed with WHATWG rules.
///
/// Input without a scheme (`example.org/path`) is retried once as `https://`.
/// IP literals and hostless URLs return `None`.
pub fn host_of(url: &str) -> Option<String> {
    let raw = url.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = match Url::parse(raw) {
        Ok(u) if u.domain().is_some() => Some(u),
        _ if !raw.contains("://") => {
            Url::parse(&format!("https://{}", raw.trim_start_matches('/'))).ok()
        }
        _ => None,
    }?;

    let host = parsed.domain()?.trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }
    Some(host)
}

/// Registrable domain (e.g. `edition.cnn.com` → `cnn.com`, `news.bbc.co.uk` → `bbc.co.uk`).
pub fn registrable_domain(url: &str) -> Option<String> {
    let host = host_of(url)?;
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return None;
    }

    let last_two = labels[labels.len() - 2..].join(".");
    if MULTI_LABEL_SUFFIXES.contains(&last_two.as_str()) {
        if labels.len() < 3 {
            return None;
        }
        return Some(labels[labels.len() - 3..].join("."));
    }
    Some(last_two)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TrustResolver {
        TrustResolver::builtin()
    }

    #[test]
    fn high_tier_domains() {
        let r = resolver();
        assert_eq!(r.rank("https://www.reuters.com/markets/us/"), 3);
        assert_eq!(r.rank("https://timesofindia.indiatimes.com/india/x"), 3);
        assert_eq!(r.rank("https://www.bbc.co.uk/news/uk-1"), 3);
    }

    #[test]
    fn medium_tier_domains() {
        let r = resolver();
        assert_eq!(r.rank("https://edition.cnn.com/2024/11/03/x"), 2);
        assert_eq!(r.rank("http://www.foxnews.com:8080/politics"), 2);
    }

    #[test]
    fn unknown_and_malformed_fall_to_low() {
        let r = resolver();
        assert_eq!(r.rank(""), 1);
        assert_eq!(r.rank("   "), 1);
        assert_eq!(r.rank("not a url"), 1);
        assert_eq!(r.rank("https://"), 1);
        assert_eq!(r.rank("localhost"), 1);
        assert_eq!(r.rank("https://random.blogspot.com/post"), 1);
    }

    #[test]
    fn domain_extraction_strips_noise() {
        assert_eq!(
            registrable_domain("https://user:pw@Sub.Example.COM:443/a?b#c").as_deref(),
            Some("example.com")
        );
        assert_eq!(registrable_domain("example.org/path").as_deref(), Some("example.org"));
        assert_eq!(registrable_domain("https://co.uk/").as_deref(), None);
        assert_eq!(registrable_domain("http://127.0.0.1/a").as_deref(), None);
    }

    #[test]
    fn backslash_is_a_path_separator_not_userinfo() {
        assert_eq!(
            host_of("https://evil.example\\@www.reuters.com/story").as_deref(),
            Some("evil.example")
        );
        assert_eq!(host_of("https://user@www.reuters.com/x").as_deref(), Some("www.reuters.com"));
    }

    #[test]
    fn trust_weight_follows_rank() {
        let r = resolver();
        assert!((r.weight("https://apnews.com/a") - 1.0).abs() < 1e-12);
        assert!((r.weight("https://cnn.com/a") - 0.7).abs() < 1e-12);
        assert!((r.weight("https://example.xyz/a") - 0.4).abs() < 1e-12);
    }

    #[test]
    fn tier_report_labels() {
        let t = resolver().tier("https://www.nytimes.com/2024/x");
        assert_eq!(t.level, "High");
        assert!(t.in_trusted_db);
        assert_eq!(t.domain.as_deref(), Some("nytimes.com"));
        assert!(t.explanation().contains("trusted source"));
    }
}
