//! Dependency-free stance tiers used when no NLI service or model answers.

use std::collections::HashSet;

use super::{LocalModel, Stance, StanceError, StanceResult};

const NEGATION_CUES: &[&str] = &[
    "not ", "no ", "never ", "false", "denies", "refutes", "hoax", "fake",
];

/// Share of claim tokens found in the evidence. Always neutral; the score
/// only says how much the snippet is "about" the claim.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalOverlap;

impl LexicalOverlap {
    pub fn classify(&self, claim: &str, evidence: &str) -> Result<StanceResult, StanceError> {
        let (c, e) = (claim.trim(), evidence.trim());
        if c.is_empty() || e.is_empty() {
            return Ok(StanceResult::neutral());
        }
        let cs: HashSet<String> = c.split_whitespace().map(str::to_lowercase).collect();
        let es: HashSet<String> = e.split_whitespace().map(str::to_lowercase).collect();
        let overlap = cs.intersection(&es).count();
        Ok(StanceResult::new(
            Stance::Neutral,
            overlap as f64 / cs.len().max(1) as f64,
        ))
    }
}

/// Surface similarity plus negation cues. Stands in for a local NLI model.
#[derive(Debug, Clone, Copy, Default)]
pub struct CueSimilarity;

/// Normalised edit similarity over the first 200 lowercase characters.
///
/// `1 - distance / longer_len`, so a length gap costs more than it would under a
/// matching-blocks ratio (`2M / (|a| + |b|)`). Cut-offs at 0.55 to 0.7 assume this scale.
pub fn fuzzy_similarity(a: &str, b: &str) -> f64 {
    let a: String = a.chars().take(200).collect::<String>().to_lowercase();
    let b: String = b.chars().take(200).collect::<String>().to_lowercase();
    strsim::normalized_levenshtein(&a, &b)
}

impl LocalModel for CueSimilarity {
    fn name(&self) -> &'static str {
        "cue_similarity"
    }

    fn classify(&self, claim: &str, evidence: &str) -> Result<StanceResult, StanceError> {
        if claim.trim().is_empty() || evidence.trim().is_empty() {
            return Err(StanceError::EmptyInput);
        }
        let sim = fuzzy_similarity(claim, evidence);
        let lowered = format!("{claim} {evidence}").to_lowercase();
        let negated = NEGATION_CUES.iter().any(|cue| lowered.contains(cue));

        let stance = if sim >= 0.7 && !negated {
            Stance::Entailment
        } else if sim >= 0.55 && negated {
            Stance::Contradiction
        } else {
            Stance::Neutral
        };
        Ok(StanceResult::new(stance, sim))
    }
}
