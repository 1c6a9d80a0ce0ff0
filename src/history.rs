//! history.rs: in-memory ring of recent verdicts for `/debug/history`.
//! Not a store: lost on restart, bounded by capacity.

use serde::Serialize;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::pipeline::{Headline, VerificationReport};
use crate::verdict::{CrossCheckVerdict, Verdict};

pub const MAX_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub ts_unix: u64,
    /// Anonymised request id, never the text itself.
    pub request_id: String,
    pub verdict: Verdict,
    pub confidence: u8,
    pub cross_check: CrossCheckVerdict,
    pub headline: Headline,
    pub evidence_count: usize,
    // short fingerprint for quick diagnosis: cited outlets
    pub cited_sources: Vec<String>,
}

#[derive(Debug)]
pub struct History {
    inner: Mutex<Vec<HistoryEntry>>,
    cap: usize,
}

impl History {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, MAX_CAPACITY);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
        }
    }

    pub fn push(&self, r: &VerificationReport) {
        let entry = HistoryEntry {
            ts_unix: now_unix(),
            request_id: r.request_id.clone(),
            verdict: r.claim_verdict.verdict,
            confidence: r.claim_verdict.confidence,
            cross_check: r.cross_check.verdict,
            headline: r.headline.clone(),
            evidence_count: r.claim_verdict.evidence_count,
            cited_sources: r
                .claim_verdict
                .citations
                .iter()
                .map(|c| c.source.clone())
                .collect(),
        };
        self.push_entry(entry);
    }

    pub fn push_entry(&self, entry: HistoryEntry) {
        let mut v = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<HistoryEntry> {
        let v = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
