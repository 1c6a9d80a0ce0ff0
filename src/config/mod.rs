// src/config/mod.rs
//! Runtime settings.
//!
//! Resolution order:
//! 1) `$VERDICT_CONFIG_PATH`, else `config/verdict.toml` (missing file → defaults)
//! 2) `"ENV"` key values resolved from `NEWS_API_KEY` / `BING_API_KEY`
//! 3) environment overrides (`ML_SERVICE_URL`, `ML_CB_THRESHOLD`, ...)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "VERDICT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/verdict.toml";

pub const ENV_ML_SERVICE_URL: &str = "ML_SERVICE_URL";
pub const ENV_CB_THRESHOLD: &str = "ML_CB_THRESHOLD";
pub const ENV_CB_COOLDOWN: &str = "ML_CB_COOLDOWN_SECONDS";
pub const ENV_NEWS_API_KEY: &str = "NEWS_API_KEY";
pub const ENV_BING_API_KEY: &str = "BING_API_KEY";
pub const ENV_TRUSTED_SOURCES: &str = "TRUSTED_SOURCES_PATH";
pub const ENV_MAX_CLAIMS: &str = "VERDICT_MAX_CLAIMS";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub trust: TrustSettings,
    pub stance: StanceSettings,
    pub retrieval: RetrievalSettings,
    pub claims: ClaimSettings,
    pub history: HistorySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrustSettings {
    pub sources_path: PathBuf,
}

impl Default for TrustSettings {
    fn default() -> Self {
        Self {
            sources_path: PathBuf::from("config/trusted_sources.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StanceSettings {
    /// Base URL of the NLI service. Empty disables the remote tier.
    pub ml_service_url: String,
    pub breaker_threshold: u32,
    pub breaker_cooldown_secs: u64,
    pub timeout_secs: u64,
    pub backoff_ms: Vec<u64>,
}

impl Default for StanceSettings {
    fn default() -> Self {
        Self {
            ml_service_url: "http://localhost:8001".into(),
            breaker_threshold: 3,
            breaker_cooldown_secs: 30,
            timeout_secs: 8,
            backoff_ms: vec![500, 1000, 2000],
        }
    }
}

impl StanceSettings {
    pub fn remote_enabled(&self) -> bool {
        !self.ml_service_url.trim().is_empty()
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.breaker_cooldown_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Vec<Duration> {
        self.backoff_ms.iter().map(|ms| Duration::from_millis(*ms)).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    /// `"ENV"` → `$NEWS_API_KEY`. Absent key disables the provider.
    pub newsapi_key: Option<String>,
    /// `"ENV"` → `$BING_API_KEY`.
    pub bing_key: Option<String>,
    pub max_results: usize,
    pub timeout_secs: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            newsapi_key: Some("ENV".into()),
            bing_key: Some("ENV".into()),
            max_results: 15,
            timeout_secs: 15,
        }
    }
}

impl RetrievalSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClaimSettings {
    pub max_claims: usize,
}

impl Default for ClaimSettings {
    fn default() -> Self {
        Self {
            max_claims: crate::claims::DEFAULT_MAX_CLAIMS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistorySettings {
    pub capacity: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { capacity: 200 }
    }
}

impl Settings {
    /// Parse a TOML file, then resolve `"ENV"` keys from the process environment.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        let mut cfg: Settings = toml::from_str(&data)
            .with_context(|| format!("parsing settings toml {}", path.display()))?;
        cfg.resolve_env_keys(|k| env::var(k).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    /// `$VERDICT_CONFIG_PATH` or the default path; defaults when the file is absent.
    /// Environment overrides are applied last.
    pub fn load() -> Result<Self> {
        let mut cfg = match env::var(ENV_CONFIG_PATH) {
            Ok(p) => Self::load_from_file(&p)?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_PATH)?
            }
            Err(_) => {
                let mut d = Self::default();
                d.resolve_env_keys(|k| env::var(k).ok());
                d
            }
        };
        cfg.apply_overrides(|k| env::var(k).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    fn resolve_env_keys(&mut self, get: impl Fn(&str) -> Option<String>) {
        let resolve = |slot: &mut Option<String>, var: &str| {
            if slot
                .as_deref()
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("env"))
            {
                *slot = get(var).filter(|v| !v.trim().is_empty());
            }
        };
        resolve(&mut self.retrieval.newsapi_key, ENV_NEWS_API_KEY);
        resolve(&mut self.retrieval.bing_key, ENV_BING_API_KEY);
    }

    /// Environment wins over the file. Unparsable numbers are ignored.
    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(v) = get(ENV_ML_SERVICE_URL) {
            self.stance.ml_service_url = v.trim().to_string();
        }
        if let Some(n) = get(ENV_CB_THRESHOLD).and_then(|v| v.trim().parse().ok()) {
            self.stance.breaker_threshold = n;
        }
        if let Some(n) = get(ENV_CB_COOLDOWN).and_then(|v| v.trim().parse().ok()) {
            self.stance.breaker_cooldown_secs = n;
        }
        if let Some(v) = get(ENV_NEWS_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.retrieval.newsapi_key = Some(v);
        }
        if let Some(v) = get(ENV_BING_API_KEY).filter(|v| !v.trim().is_empty()) {
            self.retrieval.bing_key = Some(v);
        }
        if let Some(v) = get(ENV_TRUSTED_SOURCES).filter(|v| !v.trim().is_empty()) {
            self.trust.sources_path = PathBuf::from(v);
        }
        if let Some(n) = get(ENV_MAX_CLAIMS).and_then(|v| v.trim().parse().ok()) {
            self.claims.max_claims = n;
        }
    }

    fn sanitize(&mut self) {
        self.stance.breaker_threshold = self.stance.breaker_threshold.max(1);
        self.retrieval.max_results = self.retrieval.max_results.max(1);
        self.claims.max_claims = self.claims.max_claims.max(1);
        self.history.capacity = self.history.capacity.max(1);
        // Unresolved "ENV" placeholders must not reach a provider as a literal key.
        for slot in [&mut self.retrieval.newsapi_key, &mut self.retrieval.bing_key] {
            if slot
                .as_deref()
                .is_some_and(|v| v.trim().is_empty() || v.trim().eq_ignore_ascii_case("env"))
            {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.stance.ml_service_url, "http://localhost:8001");
        assert_eq!(s.stance.breaker_threshold, 3);
        assert_eq!(s.stance.cooldown(), Duration::from_secs(30));
        assert_eq!(s.stance.backoff().len(), 3);
        assert_eq!(s.retrieval.max_results, 15);
        assert_eq!(s.claims.max_claims, 3);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let s: Settings = toml::from_str("[stance]\nbreaker_threshold = 7\n").unwrap();
        assert_eq!(s.stance.breaker_threshold, 7);
        assert_eq!(s.stance.timeout_secs, 8);
        assert_eq!(s.history.capacity, 200);
    }

    #[test]
    fn env_keys_resolve_or_disappear() {
        let mut s = Settings::default();
        s.resolve_env_keys(env_of(&[("NEWS_API_KEY", "abc")]));
        s.sanitize();
        assert_eq!(s.retrieval.newsapi_key.as_deref(), Some("abc"));
        assert_eq!(s.retrieval.bing_key, None);
    }

    #[test]
    fn overrides_win_and_bad_numbers_are_ignored() {
        let mut s = Settings::default();
        s.apply_overrides(env_of(&[
            ("ML_SERVICE_URL", " http://nli:9000 "),
            ("ML_CB_THRESHOLD", "5"),
            ("ML_CB_COOLDOWN_SECONDS", "soon"),
            ("VERDICT_MAX_CLAIMS", "0"),
            ("TRUSTED_SOURCES_PATH", "/etc/trust.json"),
        ]));
        s.sanitize();
        assert_eq!(s.stance.ml_service_url, "http://nli:9000");
        assert_eq!(s.stance.breaker_threshold, 5);
        assert_eq!(s.stance.breaker_cooldown_secs, 30);
        assert_eq!(s.claims.max_claims, 1);
        assert_eq!(s.trust.sources_path, PathBuf::from("/etc/trust.json"));
    }

    #[test]
    fn load_from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("verdict.toml");
        fs::write(&p, "[retrieval]\nmax_results = 4\nnewsapi_key = \"literal\"\n").unwrap();
        let s = Settings::load_from_file(&p).unwrap();
        assert_eq!(s.retrieval.max_results, 4);
        assert_eq!(s.retrieval.newsapi_key.as_deref(), Some("literal"));
    }

    #[test]
    fn load_from_missing_file_is_an_error() {
        assert!(Settings::load_from_file("/definitely/not/here.toml").is_err());
    }

    #[test]
    fn empty_url_disables_remote() {
        let mut s = Settings::default();
        s.apply_overrides(env_of(&[("ML_SERVICE_URL", "")]));
        assert!(!s.stance.remote_enabled());
    }
}
