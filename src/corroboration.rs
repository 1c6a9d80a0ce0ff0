//! Similarity-based corroboration of the submitted text against general
//! search results. The counts feed the cross-check verdict.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::claims::truncate_with_ellipsis;
use crate::retrieval::EvidenceSource;
use crate::stance::fuzzy_similarity;
use crate::transparency::{analyze_source, SourceReport};
use crate::trust::TrustResolver;
use crate::weighting::round_to;

pub const SIMILARITY_MIN: f64 = 0.6;
pub const QUERY_PREFIX_CHARS: usize = 80;
pub const SEARCH_LABEL_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Confirming (Trusted & Similar)")]
    TrustedSimilar,
    #[serde(rename = "Confirming (Similar)")]
    Similar,
    #[serde(rename = "No strong corroboration")]
    NoCorroboration,
}

impl Classification {
    pub fn is_confirming(&self) -> bool {
        !matches!(self, Classification::NoCorroboration)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorroboratedSource {
    #[serde(flatten)]
    pub report: SourceReport,
    pub classification: Classification,
    pub match_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Corroboration {
    pub search_query: String,
    pub articles_found: usize,
    pub confirmed_count: usize,
    pub disputed_count: usize,
    pub source_breakdown: Vec<CorroboratedSource>,
}

/// Search query: the first 80 chars of the text, then the keywords.
pub fn corroboration_query(text: &str, keywords: &[String]) -> String {
    let head = truncate_with_ellipsis(text, QUERY_PREFIX_CHARS);
    if keywords.is_empty() {
        head
    } else {
        format!("{head} {}", keywords.join(" "))
    }
}

/// Title similar to the text, or enough keyword hits in the title.
pub fn classify(text: &str, keywords: &[String], title: &str, rank: u8) -> (Classification, f64) {
    let sim = fuzzy_similarity(text, title);
    let title_words: HashSet<String> = title.to_lowercase().split_whitespace().map(str::to_string).collect();
    let kw: HashSet<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let hits = kw.intersection(&title_words).count();

    let similar = sim >= SIMILARITY_MIN || hits >= (keywords.len() / 2).max(1);
    let class = match (rank >= 2, similar) {
        (true, true) => Classification::TrustedSimilar,
        (false, true) => Classification::Similar,
        _ => Classification::NoCorroboration,
    };
    (class, sim)
}

/// Classify every article; confirming ones count as confirmed, the rest as disputed.
pub fn corroborate(
    trust: &TrustResolver,
    text: &str,
    keywords: &[String],
    articles: &[EvidenceSource],
) -> Corroboration {
    let mut out = Corroboration {
        search_query: truncate_with_ellipsis(text, SEARCH_LABEL_CHARS),
        articles_found: articles.len(),
        ..Default::default()
    };

    for article in articles {
        let report = analyze_source(trust, article, text);
        let rank = report.trust_verification.tier.rank;
        let (classification, sim) = classify(text, keywords, article.title_str(), rank);
        if classification.is_confirming() {
            out.confirmed_count += 1;
        } else {
            out.disputed_count += 1;
        }
        out.source_breakdown.push(CorroboratedSource {
            report,
            classification,
            match_score: round_to(sim, 4),
        });
    }
    out
}

/// Reader-facing note on coverage, and an optional credibility override.
/// Coverage is low when nothing confirmed; a high-trust submitted source
/// softens that to a "medium" credibility override.
pub fn feedback(confirmed: usize, source_rank: Option<u8>) -> (String, Option<String>) {
    if confirmed > 0 {
        return (
            "Adequate corroboration found across external sources.".to_string(),
            None,
        );
    }
    if source_rank.is_some_and(|r| r >= 3) {
        return (
            "Limited corroboration found, but source has a strong trust record. Credibility set to medium."
                .to_string(),
            Some("medium".to_string()),
        );
    }
    (
        "Low corroboration detected. Article may still be accurate but lacks supporting coverage."
            .to_string(),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn art(url: &str, title: &str) -> EvidenceSource {
        EvidenceSource {
            title: Some(title.to_string()),
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn kws(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn query_is_prefix_plus_keywords() {
        let text = "a".repeat(100);
        let q = corroboration_query(&text, &kws(&["Senate", "budget"]));
        assert_eq!(q, format!("{}... Senate budget", "a".repeat(80)));
        assert_eq!(corroboration_query("short", &[]), "short");
    }

    #[test]
    fn counts_confirmed_and_disputed() {
        let trust = TrustResolver::builtin();
        let text = "Senate passes budget bill";
        let k = kws(&["Senate", "budget", "bill"]);
        let articles = vec![
            art("https://www.bbc.co.uk/news/1", "Senate passes budget bill"),
            art("https://someblog.example/2", "Senate approves budget"),
            art("https://someblog.example/3", "Football results"),
        ];
        let c = corroborate(&trust, text, &k, &articles);
        assert_eq!(c.articles_found, 3);
        assert_eq!(c.confirmed_count, 2);
        assert_eq!(c.disputed_count, 1);
        let classes: Vec<_> = c.source_breakdown.iter().map(|s| s.classification).collect();
        assert_eq!(
            classes,
            vec![
                Classification::TrustedSimilar,
                Classification::Similar,
                Classification::NoCorroboration
            ]
        );
    }

    #[test]
    fn classification_labels() {
        assert_eq!(
            serde_json::to_value(Classification::TrustedSimilar).unwrap(),
            serde_json::json!("Confirming (Trusted & Similar)")
        );
    }

    #[test]
    fn feedback_branches() {
        assert_eq!(feedback(1, None).1, None);
        assert!(feedback(1, None).0.starts_with("Adequate"));
        let (msg, over) = feedback(0, Some(3));
        assert!(msg.contains("strong trust record"));
        assert_eq!(over.as_deref(), Some("medium"));
        assert!(feedback(0, Some(2)).0.starts_with("Low corroboration"));
        assert!(feedback(0, None).0.starts_with("Low corroboration"));
    }
}
