//! Evidence weighting: four independent factors and their product.
//!
//! | factor   | range          | signal                                         |
//! |----------|----------------|------------------------------------------------|
//! | trust    | {0.4,0.7,1.0}  | domain trust tier                              |
//! | recency  | [0.5, 1.0]     | exponential decay, half-life 180 days          |
//! | entity   | [0.5, 1.0]     | overlap of capitalised tokens (entity proxy)   |
//! | numeric  | [0.4, 1.0]     | agreement of numbers and percentages           |
//!
//! `combined = trust * recency * entity * numeric`, rounded to 4 decimals.
//! Everything here is pure: malformed input degrades to the fallback values.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::trust::TrustResolver;

pub const HALF_LIFE_DAYS: f64 = 180.0;
pub const RECENCY_FLOOR: f64 = 0.5;
/// Used when the publication date is missing or unparsable.
pub const RECENCY_UNKNOWN: f64 = 0.7;

pub const ENTITY_NO_CLAIM_ENTITIES: f64 = 0.8;

pub const NUMERIC_NO_CLAIM_NUMBERS: f64 = 0.9;
pub const NUMERIC_NO_EVIDENCE_NUMBERS: f64 = 0.7;
pub const NUMERIC_NO_MATCH: f64 = 0.6;

static RE_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-zA-Z\-]{2,}\b").expect("entity regex"));
static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?%?").expect("number regex"));

/// The four factors plus their rounded product.
/// Deserialisation clamps each factor into its range and recomputes `combined`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawWeights")]
pub struct EvidenceWeights {
    pub trust: f64,
    pub recency: f64,
    pub entity: f64,
    pub numeric: f64,
    pub combined: f64,
}

#[derive(Deserialize)]
struct RawWeights {
    trust: f64,
    recency: f64,
    entity: f64,
    numeric: f64,
}

const TRUST_FLOOR: f64 = 0.4;
const ENTITY_FLOOR: f64 = 0.5;
const NUMERIC_FLOOR: f64 = 0.4;

/// Pin a caller-supplied factor into `[lo, 1.0]`; NaN lands on the floor.
fn clamp_factor(x: f64, lo: f64) -> f64 {
    if x.is_nan() {
        lo
    } else {
        x.clamp(lo, 1.0)
    }
}

impl From<RawWeights> for EvidenceWeights {
    fn from(r: RawWeights) -> Self {
        Self::from_factors(
            clamp_factor(r.trust, TRUST_FLOOR),
            clamp_factor(r.recency, RECENCY_FLOOR),
            clamp_factor(r.entity, ENTITY_FLOOR),
            clamp_factor(r.numeric, NUMERIC_FLOOR),
        )
    }
}

impl EvidenceWeights {
    /// Build from factors; `combined` is always derived, never supplied.
    pub fn from_factors(trust: f64, recency: f64, entity: f64, numeric: f64) -> Self {
        Self {
            trust,
            recency,
            entity,
            numeric,
            combined: round_to(trust * recency * entity * numeric, 4),
        }
    }
}

/// Weigh one evidence item against a claim, using the wall clock for recency.
pub fn weigh(
    trust: &TrustResolver,
    claim: &str,
    evidence_text: &str,
    url: &str,
    published_at: Option<&str>,
) -> EvidenceWeights {
    weigh_at(Utc::now(), trust, claim, evidence_text, url, published_at)
}

/// Same as [`weigh`] with an explicit "now" (deterministic in tests).
pub fn weigh_at(
    now: DateTime<Utc>,
    trust: &TrustResolver,
    claim: &str,
    evidence_text: &str,
    url: &str,
    published_at: Option<&str>,
) -> EvidenceWeights {
    EvidenceWeights::from_factors(
        trust.weight(url),
        recency_weight(now, published_at),
        entity_weight(claim, evidence_text),
        numeric_weight(claim, evidence_text),
    )
}

/// Age in whole days of an ISO-ish date string (only the `YYYY-MM-DD` prefix is read).
/// Future dates count as age 0.
pub fn age_days(now: DateTime<Utc>, published_at: &str) -> Option<i64> {
    let prefix: String = published_at.trim().chars().take(10).collect();
    let date = NaiveDate::parse_from_str(&prefix, "%Y-%m-%d").ok()?;
    let days = (now.date_naive() - date).num_days();
    Some(days.max(0))
}

pub fn recency_weight(now: DateTime<Utc>, published_at: Option<&str>) -> f64 {
    let Some(age) = published_at.and_then(|p| age_days(now, p)) else {
        return RECENCY_UNKNOWN;
    };
    let w = 0.5_f64.powf(age as f64 / HALF_LIFE_DAYS);
    w.clamp(RECENCY_FLOOR, 1.0)
}

fn entities(text: &str) -> HashSet<&str> {
    RE_ENTITY.find_iter(text).map(|m| m.as_str()).collect()
}

pub fn entity_weight(claim: &str, evidence_text: &str) -> f64 {
    let in_claim = entities(claim);
    if in_claim.is_empty() {
        return ENTITY_NO_CLAIM_ENTITIES;
    }
    let in_evidence = entities(evidence_text);
    let shared = in_claim.intersection(&in_evidence).count();
    let ratio = shared as f64 / in_claim.len() as f64;
    (0.5 + 0.5 * ratio).clamp(0.5, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Quantity {
    Percent(f64),
    Absolute(f64),
}

fn quantities(text: &str) -> Vec<Quantity> {
    RE_NUMBER
        .find_iter(text)
        .filter_map(|m| {
            let raw = m.as_str();
            match raw.strip_suffix('%') {
                Some(n) => n.parse().ok().map(Quantity::Percent),
                None => raw.parse().ok().map(Quantity::Absolute),
            }
        })
        .collect()
}

/// Percentages agree within 3 points; absolute values within 1.0 or 5% relative.
fn approx_equal(a: Quantity, b: Quantity) -> bool {
    match (a, b) {
        (Quantity::Percent(x), Quantity::Percent(y)) => (x - y).abs() <= 3.0,
        (Quantity::Absolute(x), Quantity::Absolute(y)) => {
            let diff = (x - y).abs();
            let lo = x.min(y);
            diff <= 1.0 || (lo > 0.0 && diff / lo <= 0.05)
        }
        _ => false,
    }
}

pub fn numeric_weight(claim: &str, evidence_text: &str) -> f64 {
    let in_claim = quantities(claim);
    if in_claim.is_empty() {
        return NUMERIC_NO_CLAIM_NUMBERS;
    }
    let in_evidence = quantities(evidence_text);
    if in_evidence.is_empty() {
        return NUMERIC_NO_EVIDENCE_NUMBERS;
    }
    let matched = in_claim
        .iter()
        .filter(|c| in_evidence.iter().any(|e| approx_equal(**c, *e)))
        .count();
    if matched == 0 {
        return NUMERIC_NO_MATCH;
    }
    0.7 + 0.3 * (matched as f64 / in_claim.len() as f64)
}

pub(crate) fn round_to(x: f64, decimals: i32) -> f64 {
    let p = 10_f64.powi(decimals);
    (x * p).round() / p
}
