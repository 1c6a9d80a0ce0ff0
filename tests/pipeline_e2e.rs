// tests/pipeline_e2e.rs
//
// End-to-end verification over an offline search collaborator and a
// keyword-driven stance fake. No sockets, no remote services.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use claim_verdict::pipeline::Headline;
use claim_verdict::retrieval::{EvidenceSource, StaticSearch};
use claim_verdict::stance::{Stance, StanceResult, StanceSource};
use claim_verdict::verdict::CrossCheckVerdict;
use claim_verdict::{TrustResolver, VerdictMode, Verdict, Verifier};

const TEXT: &str = "The central bank announced a 5 percent rise in interest rates on Tuesday. \
                    Analysts were surprised.";

struct KeywordStance;

#[async_trait]
impl StanceSource for KeywordStance {
    async fn infer(&self, _claim: &str, evidence: &str) -> StanceResult {
        let e = evidence.to_lowercase();
        if e.contains("confirm") {
            StanceResult::new(Stance::Entailment, 0.95)
        } else if e.contains("denies") {
            StanceResult::new(Stance::Contradiction, 0.6)
        } else {
            StanceResult::neutral()
        }
    }
}

fn item(url: &str, source: &str, title: &str, description: Option<&str>) -> EvidenceSource {
    EvidenceSource {
        title: Some(title.to_string()),
        description: description.map(str::to_string),
        url: url.to_string(),
        source: Some(source.to_string()),
        published_at: Some("2024-06-01T08:00:00Z".to_string()),
    }
}

fn corpus() -> Vec<EvidenceSource> {
    vec![
        item(
            "https://www.reuters.com/markets/rates-1",
            "Reuters",
            "Central bank confirms 5 percent rate rise",
            None,
        ),
        item(
            "https://www.bbc.com/news/business-2",
            "BBC News",
            "Rates decision",
            Some("Officials confirm the 5 percent rise announced Tuesday"),
        ),
        item(
            "https://someblog.example/post",
            "Some Blog",
            "Blogger denies rate rise",
            None,
        ),
    ]
}

fn verifier(items: Vec<EvidenceSource>) -> Verifier {
    Verifier::new(
        Arc::new(KeywordStance),
        Arc::new(TrustResolver::builtin()),
        Arc::new(StaticSearch::new(items)),
    )
    .with_now(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
}

#[tokio::test]
async fn supported_claim_yields_true_with_citations() {
    let v = verifier(corpus());
    let r = v.verify(TEXT, None, VerdictMode::Auto).await;

    assert_eq!(
        r.claims,
        vec!["The central bank announced a 5 percent rise in interest rates on Tuesday."]
    );
    assert_eq!(r.primary_claim, r.claims[0]);

    // Expanded queries return the same three URLs; the pool dedups them.
    assert_eq!(r.evidence.len(), 3);
    let urls: HashSet<_> = r.evidence.iter().map(|e| e.url.as_str()).collect();
    assert!(urls.contains("https://someblog.example/post"));

    let cv = &r.claim_verdict;
    assert_eq!(cv.verdict, Verdict::True);
    assert_eq!(cv.evidence_count, 3);
    assert!(cv.confidence > 0 && cv.confidence <= 100);
    assert!(cv.stance_totals.support > cv.stance_totals.refute);

    // The two confirming items are the decisive ones.
    assert_eq!(cv.citations.len(), 2);
    let cited: HashSet<_> = cv.citations.iter().map(|c| c.source.as_str()).collect();
    assert_eq!(cited, HashSet::from(["Reuters", "BBC News"]));
    assert_eq!(cv.citations[0].index, 1);
    assert_eq!(cv.citations[0].date, "2024-06-01");
    assert!(cv.explanation_paragraph.starts_with(&format!("The claim: {}", r.primary_claim)));
    assert!(cv.explanation_paragraph.contains("Verdict: True (confidence"));

    assert!(matches!(
        r.headline,
        Headline::Evidence {
            verdict: Verdict::True,
            ..
        }
    ));

    // Per-source transparency and weights travel with the report.
    assert_eq!(r.evidence_sources.len(), 3);
    for e in &r.evidence {
        assert!((0.04..=1.0).contains(&e.weights.combined));
        assert_eq!(e.weights.recency, 1.0);
    }
    let blog = r
        .evidence
        .iter()
        .find(|e| e.url.contains("someblog"))
        .unwrap();
    assert_eq!(blog.stance, Stance::Contradiction);
    assert_eq!(blog.weights.trust, 0.4);

    assert_eq!(r.corroboration.articles_found, 3);
    assert_eq!(
        r.corroboration.confirmed_count + r.corroboration.disputed_count,
        3
    );
    assert_eq!(r.processing_steps.len(), 6);
    assert_eq!(r.request_id.len(), 12);
}

#[tokio::test]
async fn sensational_text_without_coverage_falls_back_to_cross_check() {
    let v = verifier(vec![]);
    let text = "Shocking secret EXPOSED: the moon is made of cheese.";
    let r = v
        .verify(text, Some("https://www.reuters.com/fact"), VerdictMode::Auto)
        .await;

    assert!(r.evidence.is_empty());
    assert_eq!(r.claim_verdict.verdict, Verdict::Unverified);
    assert_eq!(r.claim_verdict.confidence, 0);

    assert_eq!(r.bias.sensational_count, 4);
    assert_eq!(r.cross_check.score, -4);
    assert_eq!(r.cross_check.verdict, CrossCheckVerdict::LikelyFake);
    assert_eq!(r.confidence_score, 0.0);
    assert!(matches!(
        r.headline,
        Headline::CrossCheck {
            verdict: CrossCheckVerdict::LikelyFake,
            ..
        }
    ));

    let src = r.source_analysis.as_ref().unwrap();
    assert_eq!(src.tier.rank, 3);
    assert_eq!(r.credibility_override.as_deref(), Some("medium"));
    assert!(r.corroboration_feedback.starts_with("Limited corroboration"));

    assert!(r
        .red_flags
        .contains(&"High use of sensational language".to_string()));
    assert!(r
        .red_flags
        .contains(&"No corroborating sources found".to_string()));
    assert_eq!(
        r.recommendations[0],
        "Exercise extreme caution: this claim appears to be false"
    );
}

#[tokio::test]
async fn forced_modes_only_change_the_headline() {
    let v = verifier(corpus());
    let ev = v.verify(TEXT, None, VerdictMode::Evidence).await;
    let cc = v.verify(TEXT, None, VerdictMode::CrossCheck).await;

    assert_eq!(ev.claim_verdict, cc.claim_verdict);
    assert_eq!(ev.cross_check, cc.cross_check);
    assert!(matches!(ev.headline, Headline::Evidence { .. }));
    assert!(matches!(cc.headline, Headline::CrossCheck { .. }));
}

#[tokio::test]
async fn low_trust_submitted_source_gets_no_override() {
    let v = verifier(vec![]);
    let r = v
        .verify(
            "Officials announced 300 new jobs.",
            Some("https://random.blogspot.com/post"),
            VerdictMode::Auto,
        )
        .await;
    let src = r.source_analysis.as_ref().unwrap();
    assert_eq!(src.tier.rank, 1);
    assert!(!src.tier.in_trusted_db);
    assert_eq!(r.credibility_override, None);
    assert!(r.corroboration_feedback.starts_with("Low corroboration"));
}
