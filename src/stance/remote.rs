//! Remote NLI service client: `POST {base}/infer-nli`.
//!
//! Request `{"claim": ..., "evidence": ...}`, response `{"stance": ..., "score": ...}`.
//! Up to `backoff.len()` attempts; retries on 5xx and transport errors only.
//! Every exhausted call counts as one breaker failure.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::{CircuitBreaker, Stance, StanceError, StanceResult};

pub const DEFAULT_BACKOFF_MS: [u64; 3] = [500, 1000, 2000];

#[derive(Serialize)]
struct InferReq<'a> {
    claim: &'a str,
    evidence: &'a str,
}

#[derive(Deserialize)]
struct InferResp {
    #[serde(default)]
    stance: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

pub struct RemoteStance {
    http: reqwest::Client,
    endpoint: String,
    backoff: Vec<Duration>,
    breaker: Arc<CircuitBreaker>,
}

impl RemoteStance {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        backoff: Vec<Duration>,
        breaker: Arc<CircuitBreaker>,
    ) -> Result<Self, StanceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("claim-verdict-engine/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()?;
        let backoff = if backoff.is_empty() {
            vec![Duration::ZERO]
        } else {
            backoff
        };
        Ok(Self {
            http,
            endpoint: format!("{}/infer-nli", base_url.trim_end_matches('/')),
            backoff,
            breaker,
        })
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub async fn infer(&self, claim: &str, evidence: &str) -> Result<StanceResult, StanceError> {
        if !self.breaker.try_acquire() {
            return Err(StanceError::CircuitOpen);
        }

        let mut last_err = StanceError::Status(0);
        let attempts = self.backoff.len();
        for (i, delay) in self.backoff.iter().enumerate() {
            let is_last = i + 1 == attempts;
            match self.call_once(claim, evidence).await {
                Ok(res) => {
                    self.breaker.record_success();
                    return Ok(res);
                }
                Err(e) if retryable(&e) && !is_last => {
                    last_err = e;
                    tokio::time::sleep(*delay).await;
                }
                Err(e) => {
                    last_err = e;
                    break;
                }
            }
        }

        if self.breaker.record_failure() {
            counter!("stance_breaker_open_total").increment(1);
            warn!(endpoint = %self.endpoint, "remote stance breaker opened");
        }
        Err(last_err)
    }

    async fn call_once(&self, claim: &str, evidence: &str) -> Result<StanceResult, StanceError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&InferReq { claim, evidence })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StanceError::Status(status.as_u16()));
        }
        let body: InferResp = resp
            .json()
            .await
            .map_err(|e| StanceError::Decode(e.to_string()))?;
        Ok(StanceResult::new(
            Stance::from_label(body.stance.as_deref().unwrap_or("neutral")),
            body.score.unwrap_or(0.0),
        ))
    }
}

fn retryable(e: &StanceError) -> bool {
    match e {
        StanceError::Status(code) => (500..600).contains(code),
        StanceError::Transport(_) => true,
        _ => false,
    }
}
