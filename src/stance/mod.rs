//! Stance resolution: `(claim, evidence)` → `(label, score)`.
//!
//! Tiers are tried in order (remote service → local model → lexical overlap);
//! the first one that answers wins. Every failure, including an open circuit
//! breaker, falls through to the next tier, and if nothing answers the result
//! is `(neutral, 0.0)`. Callers never learn which tier produced the pair.

pub mod breaker;
pub mod heuristic;
pub mod remote;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub use breaker::{BreakerSnapshot, BreakerState, CircuitBreaker, Clock, ManualClock, SystemClock};
pub use heuristic::{fuzzy_similarity, CueSimilarity, LexicalOverlap};
pub use remote::RemoteStance;

/// Relationship of an evidence item to a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Entailment,
    Contradiction,
    Neutral,
}

impl Stance {
    /// Lenient label parsing; anything unrecognised is neutral.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "entailment" | "entails" | "support" | "supports" => Stance::Entailment,
            "contradiction" | "contradicts" | "refute" | "refutes" => Stance::Contradiction,
            _ => Stance::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stance::Entailment => "entailment",
            Stance::Contradiction => "contradiction",
            Stance::Neutral => "neutral",
        }
    }

    pub fn is_decisive(&self) -> bool {
        !matches!(self, Stance::Neutral)
    }
}

/// Label and score always travel together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StanceResult {
    pub stance: Stance,
    pub score: f64,
}

impl StanceResult {
    /// Score is clamped into [0, 1]; NaN becomes 0.
    pub fn new(stance: Stance, score: f64) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self { stance, score }
    }

    pub fn neutral() -> Self {
        Self::new(Stance::Neutral, 0.0)
    }
}

/// Why a single tier did not answer.
#[derive(Debug, thiserror::Error)]
pub enum StanceError {
    #[error("circuit breaker open")]
    CircuitOpen,
    #[error("remote returned status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("undecodable response: {0}")]
    Decode(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("empty input")]
    EmptyInput,
}

/// A locally hosted NLI model. Blocking; runs on the blocking pool.
pub trait LocalModel: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    fn classify(&self, claim: &str, evidence: &str) -> Result<StanceResult, StanceError>;
}

/// What the pipeline consumes. Never fails.
#[async_trait]
pub trait StanceSource: Send + Sync {
    async fn infer(&self, claim: &str, evidence: &str) -> StanceResult;
}

/// One tier in the fallback chain.
#[derive(Clone)]
pub enum StanceBackend {
    Remote(Arc<RemoteStance>),
    Local(Arc<dyn LocalModel>),
    Lexical(LexicalOverlap),
}

impl StanceBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StanceBackend::Remote(_) => "remote",
            StanceBackend::Local(m) => m.name(),
            StanceBackend::Lexical(_) => "lexical",
        }
    }

    async fn try_infer(&self, claim: &str, evidence: &str) -> Result<StanceResult, StanceError> {
        match self {
            StanceBackend::Remote(r) => r.infer(claim, evidence).await,
            StanceBackend::Local(m) => {
                let model = Arc::clone(m);
                let (c, e) = (claim.to_string(), evidence.to_string());
                tokio::task::spawn_blocking(move || model.classify(&c, &e))
                    .await
                    .map_err(|e| StanceError::Model(e.to_string()))?
            }
            StanceBackend::Lexical(l) => l.classify(claim, evidence),
        }
    }
}

/// Ordered fallback chain over [`StanceBackend`]s.
#[derive(Clone, Default)]
pub struct StanceResolver {
    backends: Vec<StanceBackend>,
}

impl StanceResolver {
    pub fn new(backends: Vec<StanceBackend>) -> Self {
        Self { backends }
    }

    /// Remote (if given) → cue similarity → lexical overlap.
    pub fn standard(remote: Option<Arc<RemoteStance>>) -> Self {
        let mut backends = Vec::with_capacity(3);
        if let Some(r) = remote {
            backends.push(StanceBackend::Remote(r));
        }
        backends.push(StanceBackend::Local(Arc::new(CueSimilarity)));
        backends.push(StanceBackend::Lexical(LexicalOverlap));
        Self { backends }
    }

    pub fn backends(&self) -> &[StanceBackend] {
        &self.backends
    }

    pub async fn resolve(&self, claim: &str, evidence: &str) -> StanceResult {
        for backend in &self.backends {
            match backend.try_infer(claim, evidence).await {
                Ok(res) => {
                    counter!("stance_tier_total", "tier" => backend.name()).increment(1);
                    return res;
                }
                Err(StanceError::CircuitOpen) => {
                    debug!(tier = backend.name(), "stance tier short-circuited");
                }
                Err(e) => {
                    warn!(tier = backend.name(), error = %e, "stance tier failed, falling through");
                }
            }
        }
        StanceResult::neutral()
    }
}

#[async_trait]
impl StanceSource for StanceResolver {
    async fn infer(&self, claim: &str, evidence: &str) -> StanceResult {
        self.resolve(claim, evidence).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;
    impl LocalModel for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn classify(&self, _c: &str, _e: &str) -> Result<StanceResult, StanceError> {
            Err(StanceError::Model("offline".into()))
        }
    }

    struct Fixed(StanceResult);
    impl LocalModel for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }
        fn classify(&self, _c: &str, _e: &str) -> Result<StanceResult, StanceError> {
            Ok(self.0)
        }
    }

    #[test]
    fn labels_parse_leniently() {
        assert_eq!(Stance::from_label("ENTAILMENT"), Stance::Entailment);
        assert_eq!(Stance::from_label(" contradiction "), Stance::Contradiction);
        assert_eq!(Stance::from_label("whatever"), Stance::Neutral);
    }

    #[test]
    fn scores_are_clamped() {
        assert_eq!(StanceResult::new(Stance::Entailment, 1.7).score, 1.0);
        assert_eq!(StanceResult::new(Stance::Entailment, -0.2).score, 0.0);
        assert_eq!(StanceResult::new(Stance::Entailment, f64::NAN).score, 0.0);
    }

    #[tokio::test]
    async fn first_answering_tier_wins() {
        let r = StanceResolver::new(vec![
            StanceBackend::Local(Arc::new(Failing)),
            StanceBackend::Local(Arc::new(Fixed(StanceResult::new(Stance::Contradiction, 0.9)))),
            StanceBackend::Lexical(LexicalOverlap),
        ]);
        let out = r.resolve("the claim", "the evidence").await;
        assert_eq!(out, StanceResult::new(Stance::Contradiction, 0.9));
    }

    #[tokio::test]
    async fn all_tiers_failing_degrades_to_neutral_zero() {
        let r = StanceResolver::new(vec![StanceBackend::Local(Arc::new(Failing))]);
        assert_eq!(r.resolve("a", "b").await, StanceResult::neutral());

        let empty = StanceResolver::default();
        assert_eq!(empty.infer("a", "b").await, StanceResult::neutral());
    }
}
