//! # Bias scan
//! Counts sensational vocabulary and shouted (all-caps) words in a piece of
//! text; the count drives the tone label.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct BiasLexicon {
    pub sensational: Vec<String>,
    pub clickbait: Vec<String>,
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

static LEXICON: Lazy<BiasLexicon> = Lazy::new(|| {
    let raw = include_str!("../config/bias_lexicon.json");
    serde_json::from_str(raw).expect("valid bias lexicon")
});

static RE_CAPS_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{5,}\b").unwrap());
static RE_CAPS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z\s]{20,}").unwrap());

pub fn lexicon() -> &'static BiasLexicon {
    &LEXICON
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Positive => "positive",
            Tone::Negative => "negative",
            Tone::Neutral => "neutral",
        }
    }
}

/// Lexicon words that occur anywhere in `text` (substring match, lowercase).
pub fn sensational_words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    LEXICON
        .sensational
        .iter()
        .filter(|w| lowered.contains(w.as_str()))
        .cloned()
        .collect()
}

/// Shouted words: five or more consecutive capitals.
pub fn caps_words(text: &str) -> Vec<String> {
    RE_CAPS_WORD
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Distinct sensational words plus every shouted word.
pub fn sensational_count(text: &str) -> usize {
    sensational_words(text).len() + caps_words(text).len()
}

/// Occurrence counts of positive vs negative lexicon words; ties are neutral.
pub fn tone(text: &str) -> Tone {
    let lowered = text.to_lowercase();
    let count = |words: &[String]| -> usize {
        words.iter().map(|w| lowered.matches(w.as_str()).count()).sum()
    };
    let (p, n) = (count(&LEXICON.positive), count(&LEXICON.negative));
    if n > p {
        Tone::Negative
    } else if p > n {
        Tone::Positive
    } else {
        Tone::Neutral
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPatterns {
    pub has_excessive_punctuation: bool,
    pub has_all_caps_sentences: bool,
    pub question_heavy: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasDetails {
    pub sensational_words_found: Vec<String>,
    pub excessive_caps: Vec<String>,
    pub tone: Tone,
    pub bias_score: usize,
    pub text_patterns: TextPatterns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub sensational_count: usize,
    pub tone: Tone,
    pub details: BiasDetails,
    /// Human-readable indicators ("Contains N sensational words/phrases", ...).
    pub indicators: Vec<String>,
    pub explanation: String,
}

/// Whole-text scan of the submitted article.
pub fn analyze(text: &str) -> BiasReport {
    let sensational_words_found = sensational_words(text);
    let excessive_caps = caps_words(text);
    let sensational_count = sensational_words_found.len() + excessive_caps.len();
    let tone = tone(text);

    let mut indicators = Vec::new();
    if sensational_count > 0 {
        indicators.push(format!(
            "Contains {sensational_count} sensational words/phrases"
        ));
    }
    match tone {
        Tone::Negative => {
            indicators.push("Language patterns suggest potential misinformation".to_string())
        }
        Tone::Positive => {
            indicators.push("Language patterns suggest legitimate content".to_string())
        }
        Tone::Neutral => {}
    }

    let tail = if sensational_count > 2 {
        "Higher sensational language may indicate bias or misinformation."
    } else {
        "Language appears relatively neutral."
    };
    let explanation = format!(
        "Content analysis shows {} sentiment with {sensational_count} sensational elements. {tail}",
        tone.as_str()
    );

    BiasReport {
        sensational_count,
        tone,
        details: BiasDetails {
            sensational_words_found,
            excessive_caps,
            tone,
            bias_score: sensational_count,
            text_patterns: TextPatterns {
                has_excessive_punctuation: text.contains("!!!") || text.contains("???"),
                has_all_caps_sentences: RE_CAPS_RUN.is_match(text),
                question_heavy: text.matches('?').count() > 3,
            },
        },
        indicators,
        explanation,
    }
}
