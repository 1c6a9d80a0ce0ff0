//! verdict.rs: output shapes: verdict labels, stance totals, scored evidence, citations.
//!
//! Two verdict schemes exist side by side and are never merged:
//! - [`Verdict`]: evidence-weighted, five labels.
//! - [`CrossCheckVerdict`]: confirmed/disputed counts minus sensational language, three labels.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::stance::{Stance, StanceResult};
use crate::weighting::{round_to, EvidenceWeights};

/// Evidence-weighted verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    True,
    False,
    #[serde(rename = "Partly True")]
    PartlyTrue,
    Misleading,
    Unverified,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::True => "True",
            Verdict::False => "False",
            Verdict::PartlyTrue => "Partly True",
            Verdict::Misleading => "Misleading",
            Verdict::Unverified => "Unverified",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count-based fallback verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossCheckVerdict {
    #[serde(rename = "Likely True")]
    LikelyTrue,
    Uncertain,
    #[serde(rename = "Likely Fake")]
    LikelyFake,
}

impl CrossCheckVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrossCheckVerdict::LikelyTrue => "Likely True",
            CrossCheckVerdict::Uncertain => "Uncertain",
            CrossCheckVerdict::LikelyFake => "Likely Fake",
        }
    }
}

impl fmt::Display for CrossCheckVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stance sums of `stance_score * combined_weight`.
/// Held at full precision; serialised rounded to 3 decimals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StanceTotals {
    #[serde(serialize_with = "ser_round3")]
    pub support: f64,
    #[serde(serialize_with = "ser_round3")]
    pub refute: f64,
    #[serde(serialize_with = "ser_round3")]
    pub neutral: f64,
}

impl StanceTotals {
    pub fn sum(&self) -> f64 {
        self.support + self.refute + self.neutral
    }
}

fn ser_round3<S: Serializer>(x: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_to(*x, 3))
}

/// Result of the evidence aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClaimVerdict {
    pub verdict: Verdict,
    /// 0..=100
    pub confidence: u8,
    pub stance_totals: StanceTotals,
}

/// Result of the fallback scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossCheckScore {
    pub score: i64,
    pub verdict: CrossCheckVerdict,
}

/// One retrieved snippet after stance resolution and weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvidence {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<String>,
    pub stance: Stance,
    pub stance_score: f64,
    pub weights: EvidenceWeights,
}

impl ScoredEvidence {
    pub fn stance_result(&self) -> StanceResult {
        StanceResult::new(self.stance, self.stance_score)
    }

    /// `stance_score * combined`.
    pub fn contribution(&self) -> f64 {
        self.stance_result().score * self.weights.combined
    }

    /// Text quoted in explanations: description, else title.
    pub fn excerpt(&self) -> &str {
        [self.description.as_deref(), self.title.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }

    /// `YYYY-MM-DD` prefix of the publication date, or empty.
    pub fn date_prefix(&self) -> String {
        self.published_at
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(10)
            .collect()
    }
}

/// A numbered reference in the explanation paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub index: usize,
    pub source: String,
    pub date: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_labels_serialize_with_spaces() {
        assert_eq!(serde_json::to_value(Verdict::PartlyTrue).unwrap(), json!("Partly True"));
        assert_eq!(serde_json::to_value(Verdict::True).unwrap(), json!("True"));
        assert_eq!(
            serde_json::to_value(CrossCheckVerdict::LikelyFake).unwrap(),
            json!("Likely Fake")
        );
        assert_eq!(Verdict::Misleading.to_string(), "Misleading");
    }

    #[test]
    fn totals_serialize_rounded() {
        let t = StanceTotals {
            support: 0.123456,
            refute: 0.05,
            neutral: 0.0,
        };
        let v = serde_json::to_value(t).unwrap();
        assert_eq!(v["support"], json!(0.123));
        assert_eq!(v["refute"], json!(0.05));
    }

    #[test]
    fn scored_evidence_accepts_camel_case_date() {
        let v = json!({
            "title": "T",
            "url": "https://x.org/a",
            "publishedAt": "2024-03-05T10:00:00Z",
            "stance": "entailment",
            "stance_score": 0.8,
            "weights": {"trust": 1.0, "recency": 1.0, "entity": 1.0, "numeric": 1.0, "combined": 1.0}
        });
        let e: ScoredEvidence = serde_json::from_value(v).unwrap();
        assert_eq!(e.date_prefix(), "2024-03-05");
        assert_eq!(e.excerpt(), "T");
        assert!((e.contribution() - 0.8).abs() < 1e-12);
    }
}
