//! # Verdict Engine
//! Pure reductions from scored evidence (or corroboration counts) to a verdict.
//! No I/O, so results are reproducible and suitable for unit tests.
//!
//! Policy (evidence scheme), first match wins:
//! 1. `refute - support >= 0.6`  → False
//! 2. `support - refute >= 0.6`  → True
//! 3. `support > 0.3 && refute > 0.3` → Partly True
//! 4. `support + refute < 0.2`   → Unverified
//! 5. otherwise                  → Misleading
//!
//! `confidence = clamp(round((support + refute + neutral) * 50), 0, 100)`.

use crate::stance::Stance;
use crate::verdict::{
    ClaimVerdict, CrossCheckScore, CrossCheckVerdict, ScoredEvidence, StanceTotals, Verdict,
};
use crate::weighting::round_to;

pub const MARGIN: f64 = 0.6;
pub const MIXED_MIN: f64 = 0.3;
pub const ACTIVITY_MIN: f64 = 0.2;

/// Sum contributions by stance.
pub fn stance_totals(evidence: &[ScoredEvidence]) -> StanceTotals {
    let mut t = StanceTotals::default();
    for e in evidence {
        let c = e.contribution();
        match e.stance {
            Stance::Entailment => t.support += c,
            Stance::Contradiction => t.refute += c,
            Stance::Neutral => t.neutral += c,
        }
    }
    t
}

/// Threshold chain over the totals. Branch order is part of the contract.
pub fn classify(t: &StanceTotals) -> Verdict {
    let (support, refute) = (t.support, t.refute);
    if refute - support >= MARGIN {
        Verdict::False
    } else if support - refute >= MARGIN {
        Verdict::True
    } else if support > MIXED_MIN && refute > MIXED_MIN {
        Verdict::PartlyTrue
    } else if support + refute < ACTIVITY_MIN {
        Verdict::Unverified
    } else {
        Verdict::Misleading
    }
}

pub fn confidence(t: &StanceTotals) -> u8 {
    (t.sum() * 50.0).round().clamp(0.0, 100.0) as u8
}

/// Evidence-weighted verdict. Empty input → Unverified, confidence 0.
pub fn aggregate(evidence: &[ScoredEvidence]) -> ClaimVerdict {
    let stance_totals = stance_totals(evidence);
    ClaimVerdict {
        verdict: classify(&stance_totals),
        confidence: confidence(&stance_totals),
        stance_totals,
    }
}

/// Fallback scheme used when no evidence could be scored:
/// `score = (confirmed - disputed) * 2 - sensational`.
pub fn cross_check_score(confirmed: usize, disputed: usize, sensational: usize) -> CrossCheckScore {
    let score = (confirmed as i64 - disputed as i64) * 2 - sensational as i64;
    let verdict = if score >= 3 {
        CrossCheckVerdict::LikelyTrue
    } else if score >= 0 {
        CrossCheckVerdict::Uncertain
    } else {
        CrossCheckVerdict::LikelyFake
    };
    CrossCheckScore { score, verdict }
}

/// Overall 0..1 confidence for the fallback scheme: agreement ratio, penalised
/// by sensational language and nudged up by source volume.
pub fn cross_check_confidence(confirmed: usize, disputed: usize, sensational: usize) -> f64 {
    let total = confirmed + disputed;
    let base = if total == 0 {
        0.1
    } else {
        (confirmed as f64 / total as f64).clamp(0.1, 0.9)
    };
    let penalty = (sensational as f64 * 0.05).min(0.3);
    let bonus = (total as f64 * 0.02).min(0.2);
    round_to((base - penalty + bonus).clamp(0.0, 1.0), 2)
}
