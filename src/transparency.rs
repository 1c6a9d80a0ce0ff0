//! # Source transparency
//! Per-article audit record: trust, bias scan, relevance to the submitted
//! text and a composite score. Diagnostic only; nothing here feeds the
//! evidence aggregator.
//!
//! - `final_source_score = max(0, rank - bias_score + relevance_bonus)`
//! - `relevance_bonus = 1` iff overlap > 30% of the original's distinct words
//! - RELIABLE iff `rank >= 2 && bias_score < 3`; CONFIRM iff `rank >= 2`

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::bias;
use crate::claims::truncate_with_ellipsis;
use crate::retrieval::EvidenceSource;
use crate::trust::{TrustResolver, TrustTier};
use crate::weighting::round_to;

pub const MAX_MATCHING_KEYWORDS: usize = 10;
pub const DESCRIPTION_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelevanceLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Assessment {
    Reliable,
    Questionable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Contribution {
    Confirm,
    Dispute,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustVerification {
    #[serde(flatten)]
    pub tier: TrustTier,
    pub credibility_explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePatterns {
    pub has_excessive_punctuation: bool,
    pub has_all_caps_words: bool,
    pub question_heavy: bool,
    pub clickbait_indicators: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleBias {
    pub sensational_words_detected: Vec<String>,
    pub excessive_caps_found: Vec<String>,
    pub sensational_count: usize,
    pub text_patterns: ArticlePatterns,
    pub bias_score: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relevance {
    pub word_overlap_count: usize,
    /// Percent of the original's distinct words, 2 decimals.
    pub relevance_percentage: f64,
    pub matching_keywords: Vec<String>,
    pub relevance_score: RelevanceLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceScore {
    pub base_trust_score: u8,
    pub bias_penalty: usize,
    pub relevance_bonus: u8,
    pub final_source_score: usize,
    pub calculation_formula: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub trust_level: String,
    pub bias_indicators_found: usize,
    pub relevance_to_claim: RelevanceLevel,
    pub final_assessment: Assessment,
    pub contributes_to_verdict: Contribution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub title: String,
    pub source: String,
    pub url: String,
    pub published: String,
    pub description: String,
    pub trust_verification: TrustVerification,
    pub bias_detection: ArticleBias,
    pub relevance_analysis: Relevance,
    pub verification_process: Vec<String>,
    pub source_score_calculation: SourceScore,
    pub individual_source_summary: SourceSummary,
}

fn article_bias(title: &str, description: &str) -> ArticleBias {
    let raw = format!("{title} {description}");
    let lowered = raw.to_lowercase();

    let sensational_words_detected = bias::sensational_words(&raw);
    let excessive_caps_found = bias::caps_words(&raw);
    let clickbait = bias::lexicon()
        .clickbait
        .iter()
        .any(|p| lowered.contains(p.as_str()));
    let bias_score = sensational_words_detected.len() + excessive_caps_found.len();

    ArticleBias {
        sensational_count: sensational_words_detected.len(),
        text_patterns: ArticlePatterns {
            has_excessive_punctuation: lowered.contains("!!!") || lowered.contains("???"),
            has_all_caps_words: !excessive_caps_found.is_empty(),
            question_heavy: lowered.matches('?').count() > 2,
            clickbait_indicators: clickbait,
        },
        sensational_words_detected,
        excessive_caps_found,
        bias_score,
    }
}

/// Whitespace-token overlap of the article against the original text.
pub fn relevance(original_text: &str, article_text: &str) -> Relevance {
    let original: HashSet<String> = original_text
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    let article: HashSet<String> = article_text
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let mut common: Vec<String> = original.intersection(&article).cloned().collect();
    common.sort();

    let ratio = if original.is_empty() {
        0.0
    } else {
        common.len() as f64 / original.len() as f64
    };
    let relevance_score = if ratio > 0.3 {
        RelevanceLevel::High
    } else if ratio > 0.1 {
        RelevanceLevel::Medium
    } else {
        RelevanceLevel::Low
    };

    Relevance {
        word_overlap_count: common.len(),
        relevance_percentage: round_to(ratio * 100.0, 2),
        matching_keywords: common.into_iter().take(MAX_MATCHING_KEYWORDS).collect(),
        relevance_score,
    }
}

/// Build the audit record for one retrieved article.
pub fn analyze_source(
    trust: &TrustResolver,
    article: &EvidenceSource,
    original_text: &str,
) -> SourceReport {
    let tier = trust.tier(&article.url);
    let rank = tier.rank;
    let title = article.title_str();
    let description = article.description_str();

    let bias = article_bias(title, description);
    let relevance = relevance(original_text, &format!("{title} {description}"));

    let relevance_bonus = u8::from(relevance.relevance_score == RelevanceLevel::High);
    let final_source_score =
        (rank as i64 - bias.bias_score as i64 + relevance_bonus as i64).max(0) as usize;

    let final_assessment = if rank >= 2 && bias.bias_score < 3 {
        Assessment::Reliable
    } else {
        Assessment::Questionable
    };
    let contributes_to_verdict = if rank >= 2 {
        Contribution::Confirm
    } else {
        Contribution::Dispute
    };

    let domain = tier.domain.clone().unwrap_or_else(|| "unknown".to_string());
    let verification_process = vec![
        format!("Extracted domain: {domain}"),
        format!("Looked up trust ranking in database: {rank}"),
        "Analyzed title and description for bias indicators".to_string(),
        format!(
            "Checked relevance to original claim: {:?}",
            relevance.relevance_score
        ),
        if rank >= 2 {
            "Confirming (Trusted Source)".to_string()
        } else {
            "Disputed/Unknown Source".to_string()
        },
    ];

    SourceReport {
        title: if title.is_empty() { "Unknown" } else { title }.to_string(),
        source: article
            .source
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        url: article.url.clone(),
        published: article
            .published_at
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        description: if description.is_empty() {
            String::new()
        } else {
            truncate_with_ellipsis(description, DESCRIPTION_PREVIEW_CHARS)
        },
        trust_verification: TrustVerification {
            credibility_explanation: tier.explanation(),
            tier: tier.clone(),
        },
        source_score_calculation: SourceScore {
            base_trust_score: rank,
            bias_penalty: bias.bias_score,
            relevance_bonus,
            final_source_score,
            calculation_formula: format!(
                "{rank} (trust) - {} (bias) + {relevance_bonus} (relevance)",
                bias.bias_score
            ),
        },
        individual_source_summary: SourceSummary {
            trust_level: tier.level,
            bias_indicators_found: bias.bias_score,
            relevance_to_claim: relevance.relevance_score,
            final_assessment,
            contributes_to_verdict,
        },
        verification_process,
        bias_detection: bias,
        relevance_analysis: relevance,
    }
}
