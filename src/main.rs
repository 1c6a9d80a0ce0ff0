//! Claim Verdict Service: Binary Entrypoint
//! Boots the Axum HTTP server with settings, shared state, metrics and tracing.

use claim_verdict::api::{create_router, AppState};
use claim_verdict::config::Settings;
use claim_verdict::metrics::Metrics;
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Structured logs; `VERDICT_LOG_JSON=1` switches to JSON lines.
/// Filter comes from `RUST_LOG`, default `claim_verdict=info,warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("claim_verdict=info,warn"));

    let json = std::env::var("VERDICT_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    // The runtime may have installed a subscriber already; keep theirs if so.
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let settings = Settings::load()?;
    let metrics = Metrics::init(settings.stance.breaker_threshold)?;

    let state = AppState::from_settings(&settings)?;
    info!(
        max_results = settings.retrieval.max_results,
        max_claims = settings.claims.max_claims,
        "claim verdict service starting"
    );

    let router = create_router(state).merge(metrics.router());
    Ok(router.into())
}
