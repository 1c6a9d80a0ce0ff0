//! Deterministic rationale text and citations built from the same evidence
//! used for scoring, plus the advisory lists attached to the fallback verdict.

use serde::{Deserialize, Serialize};

use crate::verdict::{Citation, CrossCheckVerdict, ScoredEvidence, Verdict};

pub const MAX_DECISIVE: usize = 2;
pub const EXCERPT_CHARS: usize = 140;

const RATIONALE: &str = "Based on stance across trusted outlets and corroboration.";
const NO_DECISIVE: &str = "No decisive sources found.";
const METHOD: &str = "Method: compared the claim against trusted outlets and independent reports using stance detection and corroboration.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub paragraph: String,
    pub citations: Vec<Citation>,
}

/// Non-neutral items, highest stance score first (stable on ties), top two.
pub fn decisive(evidence: &[ScoredEvidence]) -> Vec<&ScoredEvidence> {
    let mut d: Vec<&ScoredEvidence> = evidence.iter().filter(|e| e.stance.is_decisive()).collect();
    d.sort_by(|a, b| b.stance_score.total_cmp(&a.stance_score));
    d.truncate(MAX_DECISIVE);
    d
}

pub fn build_explanation(
    claim: &str,
    verdict: Verdict,
    evidence: &[ScoredEvidence],
    confidence: u8,
) -> Explanation {
    let top = decisive(evidence);

    let citations = top
        .iter()
        .enumerate()
        .map(|(i, e)| Citation {
            index: i + 1,
            source: e.source.as_deref().unwrap_or("").trim().to_string(),
            date: e.date_prefix(),
            url: e.url.clone(),
        })
        .collect::<Vec<_>>();

    let restated = format!("The claim: {}", claim.trim());
    let judged = format!("Verdict: {verdict} (confidence {confidence}/100). {RATIONALE}");
    let refs = if top.is_empty() {
        NO_DECISIVE.to_string()
    } else {
        top.iter()
            .zip(&citations)
            .map(|(e, c)| {
                let piece: String = e.excerpt().chars().take(EXCERPT_CHARS).collect();
                format!(
                    "[{}] {} ({}): {}…",
                    c.index,
                    c.source,
                    c.date,
                    piece.trim_end().trim_end_matches('.')
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    };

    Explanation {
        paragraph: [restated, judged, refs, METHOD.to_string()].join(" "),
        citations,
    }
}

/// Warning signs derived from language and corroboration counts.
pub fn red_flags(sensational: usize, confirmed: usize, disputed: usize) -> Vec<String> {
    let mut flags = Vec::new();
    if sensational > 3 {
        flags.push("High use of sensational language".to_string());
    }
    if disputed > confirmed {
        flags.push("More sources dispute than confirm this claim".to_string());
    }
    if confirmed + disputed == 0 {
        flags.push("No corroborating sources found".to_string());
    }
    flags
}

/// Reader-facing advice for the fallback verdict.
pub fn recommendations(
    verdict: CrossCheckVerdict,
    sensational: usize,
    confirmed: usize,
    disputed: usize,
) -> Vec<String> {
    let mut out: Vec<String> = match verdict {
        CrossCheckVerdict::LikelyFake => vec![
            "Exercise extreme caution: this claim appears to be false".into(),
            "Verify with additional trusted sources before sharing".into(),
        ],
        CrossCheckVerdict::Uncertain => vec![
            "Claim requires additional verification".into(),
            "Check multiple reputable news sources".into(),
        ],
        CrossCheckVerdict::LikelyTrue => vec![
            "Claim appears to be supported by evidence".into(),
            "Still recommended to verify with primary sources".into(),
        ],
    };
    if sensational > 2 {
        out.push("Content contains sensational language: be skeptical".into());
    }
    if confirmed + disputed < 2 {
        out.push("Limited source coverage: seek additional verification".into());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stance::Stance;
    use crate::weighting::EvidenceWeights;

    fn ev(stance: Stance, score: f64, source: &str, desc: &str) -> ScoredEvidence {
        ScoredEvidence {
            title: Some(format!("{source} headline")),
            description: Some(desc.to_string()),
            url: format!("https://{}.example/a", source.to_lowercase()),
            source: Some(source.to_string()),
            published_at: Some("2024-05-01T08:00:00Z".into()),
            stance,
            stance_score: score,
            weights: EvidenceWeights::from_factors(1.0, 1.0, 1.0, 1.0),
        }
    }

    #[test]
    fn picks_top_two_non_neutral_by_score() {
        let items = vec![
            ev(Stance::Neutral, 0.99, "N", "neutral"),
            ev(Stance::Entailment, 0.6, "A", "a"),
            ev(Stance::Contradiction, 0.9, "B", "b"),
            ev(Stance::Entailment, 0.7, "C", "c"),
        ];
        let e = build_explanation("x", Verdict::Misleading, &items, 50);
        let sources: Vec<_> = e.citations.iter().map(|c| c.source.as_str()).collect();
        assert_eq!(sources, vec!["B", "C"]);
        assert_eq!(e.citations[0].index, 1);
        assert_eq!(e.citations[0].date, "2024-05-01");
    }

    #[test]
    fn paragraph_has_four_sentences_in_order() {
        let items = vec![ev(Stance::Entailment, 0.9, "Reuters", "Officials confirmed the figure.")];
        let e = build_explanation("  The figure is 5%.  ", Verdict::True, &items, 45);
        assert!(e.paragraph.starts_with("The claim: The figure is 5%. Verdict: True (confidence 45/100)."));
        assert!(e.paragraph.contains("[1] Reuters (2024-05-01): Officials confirmed the figure…"));
        assert!(e.paragraph.ends_with(METHOD));
    }

    #[test]
    fn no_decisive_sources_sentence() {
        let e = build_explanation("c", Verdict::Unverified, &[], 0);
        assert!(e.paragraph.contains(NO_DECISIVE));
        assert!(e.citations.is_empty());
    }

    #[test]
    fn excerpt_is_capped_at_140_chars() {
        let long = "x".repeat(500);
        let items = vec![ev(Stance::Contradiction, 0.9, "S", &long)];
        let e = build_explanation("c", Verdict::False, &items, 40);
        assert!(e.paragraph.contains(&format!("{}…", "x".repeat(140))));
        assert!(!e.paragraph.contains(&"x".repeat(141)));
    }

    #[test]
    fn identical_input_gives_identical_output() {
        let items = vec![
            ev(Stance::Entailment, 0.5, "A", "same"),
            ev(Stance::Contradiction, 0.5, "B", "same"),
        ];
        let a = build_explanation("c", Verdict::Misleading, &items, 50);
        let b = build_explanation("c", Verdict::Misleading, &items, 50);
        assert_eq!(a, b);
        // Ties keep input order.
        assert_eq!(a.citations[0].source, "A");
    }

    #[test]
    fn advisory_lists() {
        assert_eq!(red_flags(0, 0, 0), vec!["No corroborating sources found"]);
        assert_eq!(red_flags(4, 1, 2).len(), 2);
        let r = recommendations(CrossCheckVerdict::Uncertain, 3, 1, 0);
        assert_eq!(r.len(), 4);
    }
}
