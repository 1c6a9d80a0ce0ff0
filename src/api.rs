use std::collections::HashMap;
use std::sync::Arc;

use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::config::Settings;
use crate::history::{History, HistoryEntry};
use crate::pipeline::{ClaimVerdictReport, VerdictMode, VerificationReport, Verifier};
use crate::stance::BreakerSnapshot;
use crate::trust::TrustTier;
use crate::verdict::ScoredEvidence;

#[derive(Clone)]
pub struct AppState {
    pub verifier: Verifier,
    pub history: Arc<History>,
}

impl AppState {
    pub fn new(verifier: Verifier, history_capacity: usize) -> Self {
        Self {
            verifier,
            history: Arc::new(History::with_capacity(history_capacity)),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        Ok(Self::new(
            Verifier::from_settings(settings)?,
            settings.history.capacity,
        ))
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/verify", post(verify))
        .route("/aggregate", post(aggregate))
        .route("/trust", get(trust))
        .route("/debug/history", get(debug_history))
        .route("/debug/breaker", get(debug_breaker))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Router wired from `Settings::load()` (file + environment).
pub async fn app() -> anyhow::Result<Router> {
    let settings = Settings::load()?;
    Ok(create_router(AppState::from_settings(&settings)?))
}

/// Unexpected failure → 500 `{"detail": msg}`.
pub struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

#[derive(serde::Deserialize)]
struct VerifyReq {
    #[serde(default)]
    text: String,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    mode: Option<VerdictMode>,
}

async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyReq>,
) -> Result<Json<VerificationReport>, ApiError> {
    let verifier = state.verifier.clone();
    let mode = body.mode.unwrap_or_default();
    // Own task so a panic deep in the pipeline becomes a 500, not a dropped connection.
    let report = tokio::spawn(async move {
        verifier
            .verify(&body.text, body.source_url.as_deref(), mode)
            .await
    })
    .await
    .map_err(|e| anyhow::anyhow!("verification failed: {e}"))?;

    state.history.push(&report);
    Ok(Json(report))
}

#[derive(serde::Deserialize)]
struct AggregateReq {
    #[serde(default)]
    claim: String,
    #[serde(default)]
    evidence: Vec<ScoredEvidence>,
}

async fn aggregate(Json(body): Json<AggregateReq>) -> Json<ClaimVerdictReport> {
    Json(ClaimVerdictReport::build(body.claim.trim(), &body.evidence))
}

#[derive(serde::Serialize)]
struct TrustOut {
    url: String,
    #[serde(flatten)]
    tier: TrustTier,
    explanation: String,
}

async fn trust(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<TrustOut> {
    let url = q.get("url").cloned().unwrap_or_default();
    let tier = state.verifier.trust().tier(&url);
    Json(TrustOut {
        explanation: tier.explanation(),
        url,
        tier,
    })
}

async fn debug_history(State(state): State<AppState>) -> Json<Vec<HistoryEntry>> {
    Json(state.history.snapshot_last_n(10))
}

async fn debug_breaker(State(state): State<AppState>) -> Json<Option<BreakerSnapshot>> {
    Json(state.verifier.breaker().map(|b| b.snapshot()))
}
