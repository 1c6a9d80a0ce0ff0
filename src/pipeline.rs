// src/pipeline.rs
//! Request-scoped verification.
//!
//! text → claims → (evidence retrieval ‖ corroboration search) → per-item
//! stance + weights (fan-out, joined before reducing) → evidence verdict,
//! cross-check verdict, explanation and transparency reports.
//!
//! Nothing here is shared across requests except the trust lists, the
//! stance resolver (and its breaker) and the search collaborator.

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::bias::{self, BiasReport};
use crate::claims::{extract_claims, extract_keywords, primary_claim, MAX_KEYWORDS};
use crate::config::Settings;
use crate::corroboration::{self, corroboration_query, Corroboration};
use crate::engine::{self, ACTIVITY_MIN, MARGIN, MIXED_MIN};
use crate::explain::{build_explanation, recommendations, red_flags};
use crate::retrieval::providers::{BingProvider, NewsApiProvider};
use crate::retrieval::{
    search_evidence_for_claim, EvidenceSearch, EvidenceSource, MultiSearch, SearchProvider,
    PER_QUERY_RESULTS,
};
use crate::stance::{CircuitBreaker, RemoteStance, StanceResolver, StanceSource};
use crate::transparency::{analyze_source, SourceReport};
use crate::trust::{TrustLists, TrustResolver, TrustTier};
use crate::verdict::{
    Citation, ClaimVerdict, CrossCheckVerdict, ScoredEvidence, StanceTotals, Verdict,
};
use crate::weighting::weigh_at;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("verify_requests_total", "Verification requests handled.");
        describe_histogram!("verify_duration_ms", "End-to-end verification time in milliseconds.");
        describe_counter!("evidence_items_total", "Evidence items scored.");
        describe_counter!(
            "evidence_task_failures_total",
            "Evidence scoring tasks that panicked and were excluded."
        );
    });
}

/// Short anonymised id for log correlation. Raw text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Which verdict scheme supplies the headline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictMode {
    Evidence,
    #[serde(alias = "crosscheck", alias = "cross-check")]
    CrossCheck,
    #[default]
    Auto,
}

/// The verdict shown first. Both schemes are always reported in full.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum Headline {
    Evidence { verdict: Verdict, confidence: u8 },
    CrossCheck { verdict: CrossCheckVerdict, confidence: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub true_minus_false: f64,
    pub min_mixed: f64,
    pub min_activity: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            true_minus_false: MARGIN,
            min_mixed: MIXED_MIN,
            min_activity: ACTIVITY_MIN,
        }
    }
}

/// Caller-facing evidence verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimVerdictReport {
    pub primary_claim: String,
    pub verdict: Verdict,
    pub confidence: u8,
    pub stance_totals: StanceTotals,
    pub citations: Vec<Citation>,
    pub evidence_count: usize,
    pub explanation_paragraph: String,
    pub thresholds: Thresholds,
}

impl ClaimVerdictReport {
    /// Aggregate and explain a finished evidence set.
    pub fn build(claim: &str, evidence: &[ScoredEvidence]) -> Self {
        let ClaimVerdict {
            verdict,
            confidence,
            stance_totals,
        } = engine::aggregate(evidence);
        let explanation = build_explanation(claim, verdict, evidence, confidence);
        Self {
            primary_claim: claim.to_string(),
            verdict,
            confidence,
            stance_totals,
            citations: explanation.citations,
            evidence_count: evidence.len(),
            explanation_paragraph: explanation.paragraph,
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossCheckReport {
    pub verdict: CrossCheckVerdict,
    pub score: i64,
    pub confirmed: usize,
    pub disputed: usize,
    pub sensational: usize,
    pub confidence: f64,
    pub calculation: String,
}

impl CrossCheckReport {
    pub fn build(confirmed: usize, disputed: usize, sensational: usize) -> Self {
        let s = engine::cross_check_score(confirmed, disputed, sensational);
        Self {
            verdict: s.verdict,
            score: s.score,
            confirmed,
            disputed,
            sensational,
            confidence: engine::cross_check_confidence(confirmed, disputed, sensational),
            calculation: format!(
                "({confirmed} confirmed - {disputed} disputed) * 2 - {sensational} sensational"
            ),
        }
    }
}

/// Trust profile of the URL the text was submitted with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceAnalysis {
    pub url: String,
    #[serde(flatten)]
    pub tier: TrustTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub request_id: String,
    pub input: String,
    pub source_url: Option<String>,
    pub mode: VerdictMode,
    pub headline: Headline,
    pub claims: Vec<String>,
    pub primary_claim: String,
    pub claim_verdict: ClaimVerdictReport,
    pub evidence: Vec<ScoredEvidence>,
    pub evidence_sources: Vec<SourceReport>,
    pub cross_check: CrossCheckReport,
    pub corroboration: Corroboration,
    pub bias: BiasReport,
    pub source_analysis: Option<SourceAnalysis>,
    pub corroboration_feedback: String,
    pub credibility_override: Option<String>,
    pub confidence_score: f64,
    pub red_flags: Vec<String>,
    pub recommendations: Vec<String>,
    pub processing_steps: Vec<String>,
}

/// Verification orchestrator. Cheap to clone; share one per process.
#[derive(Clone)]
pub struct Verifier {
    stance: Arc<dyn StanceSource>,
    trust: Arc<TrustResolver>,
    search: Arc<dyn EvidenceSearch>,
    breaker: Option<Arc<CircuitBreaker>>,
    max_results: usize,
    max_claims: usize,
    now: Option<DateTime<Utc>>,
}

impl Verifier {
    pub fn new(
        stance: Arc<dyn StanceSource>,
        trust: Arc<TrustResolver>,
        search: Arc<dyn EvidenceSearch>,
    ) -> Self {
        ensure_metrics_described();
        Self {
            stance,
            trust,
            search,
            breaker: None,
            max_results: 15,
            max_claims: crate::claims::DEFAULT_MAX_CLAIMS,
            now: None,
        }
    }

    /// Full production wiring from settings: trust lists from disk (built-in
    /// fallback), remote → local → lexical stance chain, NewsAPI + Bing search.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let trust = Arc::new(TrustResolver::new(TrustLists::load_or_builtin(
            &settings.trust.sources_path,
        )));

        let s = &settings.stance;
        let breaker = Arc::new(CircuitBreaker::new(s.breaker_threshold, s.cooldown()));
        let remote = if s.remote_enabled() {
            Some(Arc::new(RemoteStance::new(
                &s.ml_service_url,
                s.timeout(),
                s.backoff(),
                Arc::clone(&breaker),
            )?))
        } else {
            None
        };
        let stance = Arc::new(StanceResolver::standard(remote));

        let r = &settings.retrieval;
        let providers: Vec<Box<dyn SearchProvider>> = vec![
            Box::new(NewsApiProvider::new(r.newsapi_key.clone(), r.timeout())?),
            Box::new(BingProvider::new(r.bing_key.clone(), r.timeout())?),
        ];
        let search = Arc::new(MultiSearch::new(providers));

        info!(
            remote = s.remote_enabled(),
            newsapi = r.newsapi_key.is_some(),
            bing = r.bing_key.is_some(),
            "verifier wired"
        );

        Ok(Self::new(stance, trust, search)
            .with_breaker(breaker)
            .with_max_results(r.max_results)
            .with_max_claims(settings.claims.max_claims))
    }

    pub fn with_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn with_max_results(mut self, n: usize) -> Self {
        self.max_results = n.max(1);
        self
    }

    pub fn with_max_claims(mut self, n: usize) -> Self {
        self.max_claims = n.max(1);
        self
    }

    /// Pin "now" for recency weighting.
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn trust(&self) -> &TrustResolver {
        &self.trust
    }

    pub fn breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.breaker.as_ref()
    }

    /// Stance + weights for every source, concurrently. Sources without text
    /// are skipped; a panicking task drops its item. Output keeps input order.
    pub async fn score_evidence(
        &self,
        claim: &str,
        sources: Vec<EvidenceSource>,
    ) -> Vec<ScoredEvidence> {
        let now = self.now.unwrap_or_else(Utc::now);
        let claim: Arc<str> = Arc::from(claim);
        let mut set = JoinSet::new();
        let mut slots: Vec<Option<ScoredEvidence>> = Vec::new();

        for src in sources {
            let text = src.text();
            if text.is_empty() {
                continue;
            }
            let idx = slots.len();
            slots.push(None);

            let stance = Arc::clone(&self.stance);
            let trust = Arc::clone(&self.trust);
            let claim = Arc::clone(&claim);
            set.spawn(async move {
                let res = stance.infer(&claim, &text).await;
                let weights = weigh_at(
                    now,
                    &trust,
                    &claim,
                    &text,
                    &src.url,
                    src.published_at.as_deref(),
                );
                let scored = ScoredEvidence {
                    title: src.title,
                    description: src.description,
                    url: src.url,
                    source: src.source,
                    published_at: src.published_at,
                    stance: res.stance,
                    stance_score: res.score,
                    weights,
                };
                (idx, scored)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, scored)) => slots[idx] = Some(scored),
                Err(e) => {
                    counter!("evidence_task_failures_total").increment(1);
                    warn!(error = %e, "evidence scoring task failed; item excluded");
                }
            }
        }

        let scored: Vec<ScoredEvidence> = slots.into_iter().flatten().collect();
        counter!("evidence_items_total").increment(scored.len() as u64);
        scored
    }

    /// Evidence retrieval plus scoring for one claim.
    pub async fn gather_evidence(&self, claim: &str) -> Vec<ScoredEvidence> {
        if claim.trim().is_empty() {
            return Vec::new();
        }
        let sources = search_evidence_for_claim(self.search.as_ref(), claim, self.max_results).await;
        self.score_evidence(claim, sources).await
    }

    pub async fn verify(
        &self,
        text: &str,
        source_url: Option<&str>,
        mode: VerdictMode,
    ) -> VerificationReport {
        let t0 = Instant::now();
        counter!("verify_requests_total").increment(1);

        let id = anon_hash(text);
        let text = text.trim();
        let source_url = source_url.map(str::trim).filter(|u| !u.is_empty());
        let mut steps = Vec::new();

        steps.push("1. Analyzing source credibility".to_string());
        let source_analysis = source_url.map(|u| SourceAnalysis {
            url: u.to_string(),
            tier: self.trust.tier(u),
        });

        steps.push("2. Extracting claims".to_string());
        let claims = extract_claims(text, self.max_claims);
        let primary = primary_claim(text, &claims);
        let keywords = extract_keywords(text, MAX_KEYWORDS);

        steps.push("3. Retrieving evidence and cross-verifying with external sources".to_string());
        let (evidence, articles) = if text.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let query = corroboration_query(text, &keywords);
            tokio::join!(
                self.gather_evidence(&primary),
                self.search.search(&query, PER_QUERY_RESULTS)
            )
        };
        debug!(%id, evidence = evidence.len(), articles = articles.len(), "retrieval done");

        steps.push("4. Computing claim verdict from stance analysis".to_string());
        let claim_verdict = ClaimVerdictReport::build(&primary, &evidence);
        let evidence_sources = evidence
            .iter()
            .map(|e| {
                let src = EvidenceSource {
                    title: e.title.clone(),
                    description: e.description.clone(),
                    url: e.url.clone(),
                    source: e.source.clone(),
                    published_at: e.published_at.clone(),
                };
                analyze_source(&self.trust, &src, text)
            })
            .collect();

        steps.push("5. Performing bias analysis".to_string());
        let bias = bias::analyze(text);
        let corroboration = corroboration::corroborate(&self.trust, text, &keywords, &articles);
        let (confirmed, disputed) = (corroboration.confirmed_count, corroboration.disputed_count);
        let sensational = bias.sensational_count;

        steps.push("6. Computing cross-check score".to_string());
        let cross_check = CrossCheckReport::build(confirmed, disputed, sensational);
        let (corroboration_feedback, credibility_override) = corroboration::feedback(
            confirmed,
            source_analysis.as_ref().map(|s| s.tier.rank),
        );

        let headline = match (mode, evidence.is_empty()) {
            (VerdictMode::Evidence, _) | (VerdictMode::Auto, false) => Headline::Evidence {
                verdict: claim_verdict.verdict,
                confidence: claim_verdict.confidence,
            },
            (VerdictMode::CrossCheck, _) | (VerdictMode::Auto, true) => Headline::CrossCheck {
                verdict: cross_check.verdict,
                confidence: cross_check.confidence,
            },
        };

        let elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0;
        histogram!("verify_duration_ms").record(elapsed_ms);
        info!(
            %id,
            verdict = %claim_verdict.verdict,
            confidence = claim_verdict.confidence,
            cross_check = %cross_check.verdict,
            evidence = evidence.len(),
            elapsed_ms = elapsed_ms as u64,
            "verification complete"
        );

        VerificationReport {
            request_id: id,
            input: text.to_string(),
            source_url: source_url.map(str::to_string),
            mode,
            headline,
            claims,
            primary_claim: primary,
            red_flags: red_flags(sensational, confirmed, disputed),
            recommendations: recommendations(cross_check.verdict, sensational, confirmed, disputed),
            confidence_score: cross_check.confidence,
            claim_verdict,
            evidence,
            evidence_sources,
            cross_check,
            corroboration,
            bias,
            source_analysis,
            corroboration_feedback,
            credibility_override,
            processing_steps: steps,
        }
    }
}
