// src/lib.rs
// Public library surface for integration tests (and the Shuttle binary).

pub mod api;
pub mod bias;
pub mod claims;
pub mod config;
pub mod corroboration;
pub mod engine;
pub mod explain;
pub mod history;
pub mod metrics;
pub mod pipeline;
pub mod retrieval;
pub mod stance;
pub mod transparency;
pub mod trust;
pub mod verdict;
pub mod weighting;

// ---- Re-exports for stable public API ----
pub use crate::api::{app, create_router, AppState};
pub use crate::engine::aggregate;
pub use crate::pipeline::{VerdictMode, VerificationReport, Verifier};
pub use crate::trust::TrustResolver;
pub use crate::verdict::{ClaimVerdict, ScoredEvidence, StanceTotals, Verdict};
