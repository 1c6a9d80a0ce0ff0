//! Claim extraction.
//!
//! - Sentences end at `.`, `!` or `?` followed by whitespace.
//! - Only the first [`SCAN_SENTENCES`] sentences are considered.
//! - A sentence is claim-like if it carries a number, a percent sign or a trigger word.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_MAX_CLAIMS: usize = 3;
pub const SCAN_SENTENCES: usize = 8;
pub const PRIMARY_FALLBACK_CHARS: usize = 160;
pub const MAX_KEYWORDS: usize = 5;

static RE_CLAIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d|caus(?:e|ed|es)|lead(?:s|ing)? to|announc|claim|declare|percent|%|billion|million")
        .unwrap()
});
static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z\-]{1,}\b").unwrap());

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "for", "to", "of", "in", "on", "with", "from", "by", "as", "at",
    "is", "are", "was", "were", "be", "been", "it", "this", "that", "these", "those", "their",
    "its", "your", "our", "his", "her", "they", "them", "you", "we", "not",
];

/// Split after terminal punctuation that is followed by whitespace.
/// Terminal punctuation stays with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_terminal = false;
    let mut in_gap = false;
    for (i, ch) in text.char_indices() {
        if in_gap {
            if ch.is_whitespace() {
                continue;
            }
            in_gap = false;
            start = i;
        }
        if prev_terminal && ch.is_whitespace() {
            out.push(&text[start..i]);
            in_gap = true;
        }
        prev_terminal = matches!(ch, '.' | '!' | '?');
    }
    if !in_gap {
        out.push(&text[start..]);
    }
    out
}

pub fn is_claim_like(sentence: &str) -> bool {
    RE_CLAIM.is_match(sentence)
}

/// Up to `max_claims` claim-like sentences from the first eight; the first
/// sentence when none qualifies; empty for empty text.
pub fn extract_claims(text: &str, max_claims: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    let Some(first) = sentences.first() else {
        return Vec::new();
    };

    let mut claims: Vec<String> = sentences
        .iter()
        .take(SCAN_SENTENCES)
        .filter(|s| is_claim_like(s))
        .map(|s| s.to_string())
        .collect();
    if claims.is_empty() {
        claims.push(first.to_string());
    }
    claims.truncate(max_claims);
    claims
}

/// The claim that drives retrieval: the first extracted claim, else a
/// 160-char prefix of the raw text.
pub fn primary_claim(text: &str, claims: &[String]) -> String {
    if let Some(c) = claims.first() {
        return c.clone();
    }
    truncate_with_ellipsis(text.trim(), PRIMARY_FALLBACK_CHARS)
}

pub(crate) fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

fn is_stopword(lower: &str) -> bool {
    STOPWORDS.contains(&lower)
}

/// Up to `max_terms` search keywords: capitalised non-stopword tokens in
/// order of appearance, then lowercase tokens by frequency (ties alphabetical).
pub fn extract_keywords(text: &str, max_terms: usize) -> Vec<String> {
    let tokens: Vec<&str> = RE_WORD.find_iter(text).map(|m| m.as_str()).collect();

    let mut out: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for t in &tokens {
        if out.len() >= max_terms {
            break;
        }
        let starts_upper = t.chars().next().is_some_and(|c| c.is_ascii_uppercase());
        if starts_upper && !is_stopword(&t.to_lowercase()) && seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }

    let mut freq: HashMap<String, usize> = HashMap::new();
    for t in &tokens {
        let lower = t.to_lowercase();
        if !is_stopword(&lower) {
            *freq.entry(lower).or_default() += 1;
        }
    }
    let mut common: Vec<(String, usize)> = freq.into_iter().collect();
    common.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    for (t, _) in common {
        if out.len() >= max_terms {
            break;
        }
        let already = out
            .iter()
            .any(|o| o.eq_ignore_ascii_case(&t));
        if !already {
            out.push(t);
        }
    }
    out
}
