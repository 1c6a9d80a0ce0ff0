// src/retrieval/mod.rs
pub mod providers;
pub mod types;

pub use types::{EvidenceSearch, EvidenceSource, SearchProvider};

use async_trait::async_trait;
use metrics::{counter, describe_counter};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Results requested per expanded query.
pub const PER_QUERY_RESULTS: usize = 10;
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

const QUERY_EXTRAS: [&str; 5] = [
    "fact check",
    "official statement",
    "press release",
    "clarification",
    "report",
];

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_RANK_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z][a-zA-Z\-']+").unwrap());

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "retrieval_provider_errors_total",
            "Search provider fetch/parse errors."
        );
        describe_counter!("retrieval_cache_hits_total", "Memoised search hits.");
    });
}

/// Normalize snippet text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s).to_string();
    let out = RE_TAGS.replace_all(&decoded, "");
    let out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let out = RE_WS.replace_all(&out, " ");
    let out = out.trim();

    if out.chars().count() > 1500 {
        out.chars().take(1500).collect()
    } else {
        out.to_string()
    }
}

/// `Some(normalized)` unless the result is empty.
pub(crate) fn clean(s: Option<&str>) -> Option<String> {
    s.map(normalize_text).filter(|t| !t.is_empty())
}

/// Recall-oriented query variants: five suffixed forms, then the bare claim.
pub fn expand_queries(claim: &str) -> Vec<String> {
    let claim = claim.trim();
    QUERY_EXTRAS
        .iter()
        .map(|e| format!("{claim} {e}"))
        .chain(std::iter::once(claim.to_string()))
        .collect()
}

fn rank_tokens(s: &str) -> HashSet<String> {
    RE_RANK_TOKEN
        .find_iter(&s.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Stable rerank by keyword overlap with the claim, highest first.
pub fn rerank(claim: &str, mut items: Vec<EvidenceSource>) -> Vec<EvidenceSource> {
    let claim_tokens = rank_tokens(claim);
    items.sort_by_cached_key(|it| {
        let words = rank_tokens(&format!("{} {}", it.title_str(), it.description_str()));
        Reverse(words.intersection(&claim_tokens).count())
    });
    items
}

/// Run expanded queries, merge by URL (pool capped at `2 * max_results`),
/// rerank and truncate.
pub async fn search_evidence_for_claim(
    search: &dyn EvidenceSearch,
    claim: &str,
    max_results: usize,
) -> Vec<EvidenceSource> {
    let cap = max_results.saturating_mul(2);
    let mut pool = Vec::new();
    let mut seen = HashSet::new();

    'queries: for q in expand_queries(claim) {
        for it in search.search(&q, PER_QUERY_RESULTS).await {
            if it.url.is_empty() || !seen.insert(it.url.clone()) {
                continue;
            }
            pool.push(it);
            if pool.len() >= cap {
                break 'queries;
            }
        }
    }

    let mut ranked = rerank(claim, pool);
    ranked.truncate(max_results);
    ranked
}

/// Providers queried in order, deduplicated by URL, memoised by `(query, max_results)`.
pub struct MultiSearch {
    providers: Vec<Box<dyn SearchProvider>>,
    cache: Mutex<HashMap<(String, usize), Vec<EvidenceSource>>>,
    cache_capacity: usize,
}

impl MultiSearch {
    pub fn new(providers: Vec<Box<dyn SearchProvider>>) -> Self {
        ensure_metrics_described();
        Self {
            providers,
            cache: Mutex::new(HashMap::new()),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    pub fn with_cache_capacity(mut self, cap: usize) -> Self {
        self.cache_capacity = cap;
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    async fn fetch(&self, query: &str, max_results: usize) -> Vec<EvidenceSource> {
        let mut results = Vec::new();
        let mut seen = HashSet::new();

        for p in &self.providers {
            let items = match p.search(query, max_results).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = ?e, provider = p.name(), "search provider error");
                    counter!("retrieval_provider_errors_total", "provider" => p.name())
                        .increment(1);
                    continue;
                }
            };
            for it in items {
                if !it.url.is_empty() && seen.insert(it.url.clone()) {
                    results.push(it);
                }
                if results.len() >= max_results {
                    return results;
                }
            }
        }
        results
    }
}

#[async_trait]
impl EvidenceSearch for MultiSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<EvidenceSource> {
        let key = (query.to_string(), max_results);
        if let Ok(cache) = self.cache.lock() {
            if let Some(hit) = cache.get(&key) {
                counter!("retrieval_cache_hits_total").increment(1);
                return hit.clone();
            }
        }

        let results = self.fetch(query, max_results).await;

        if let Ok(mut cache) = self.cache.lock() {
            if cache.len() >= self.cache_capacity {
                cache.clear();
            }
            if self.cache_capacity > 0 {
                cache.insert(key, results.clone());
            }
        }
        results
    }
}

/// Fixed result set, ignores the query. Offline mode and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSearch {
    items: Vec<EvidenceSource>,
}

impl StaticSearch {
    pub fn new(items: Vec<EvidenceSource>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl EvidenceSearch for StaticSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Vec<EvidenceSource> {
        self.items.iter().take(max_results).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn src(url: &str, title: &str) -> EvidenceSource {
        EvidenceSource {
            title: Some(title.to_string()),
            url: url.to_string(),
            ..Default::default()
        }
    }

    struct Counting {
        calls: Arc<AtomicUsize>,
        items: Vec<EvidenceSource>,
        fail: bool,
    }

    #[async_trait]
    impl SearchProvider for Counting {
        async fn search(&self, _q: &str, _n: usize) -> anyhow::Result<Vec<EvidenceSource>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("provider down");
            }
            Ok(self.items.clone())
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  <b>Hello</b>,&nbsp;&nbsp; \u{201C}world\u{201D}.  ";
        assert_eq!(normalize_text(s), "Hello, \"world\".");
    }

    #[test]
    fn expanded_queries_end_with_bare_claim() {
        let q = expand_queries("  Tax rises 5%  ");
        assert_eq!(q.len(), 6);
        assert_eq!(q[0], "Tax rises 5% fact check");
        assert_eq!(q[5], "Tax rises 5%");
    }

    #[test]
    fn rerank_is_stable_on_ties() {
        let items = vec![
            src("u1", "weather report"),
            src("u2", "budget vote passes"),
            src("u3", "sports"),
            src("u4", "city budget"),
        ];
        let out = rerank("City council budget vote", items);
        let urls: Vec<_> = out.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec!["u2", "u4", "u1", "u3"]);
    }

    #[tokio::test]
    async fn multi_search_dedups_and_survives_failing_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ms = MultiSearch::new(vec![
            Box::new(Counting {
                calls: calls.clone(),
                items: vec![],
                fail: true,
            }),
            Box::new(Counting {
                calls: calls.clone(),
                items: vec![src("a", "A"), src("a", "A again"), src("", "no url"), src("b", "B")],
                fail: false,
            }),
        ]);
        let out = ms.search("q", 10).await;
        assert_eq!(out.iter().map(|e| e.url.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn multi_search_memoises_by_query_and_size() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ms = MultiSearch::new(vec![Box::new(Counting {
            calls: calls.clone(),
            items: vec![src("a", "A")],
            fail: false,
        })]);
        ms.search("q", 5).await;
        ms.search("q", 5).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        ms.search("q", 6).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn claim_search_caps_pool_and_truncates() {
        let items: Vec<_> = (0..40).map(|i| src(&format!("u{i}"), "x")).collect();
        let out = search_evidence_for_claim(&StaticSearch::new(items), "claim", 3).await;
        assert_eq!(out.len(), 3);
    }

    #[tokio::test]
    async fn empty_search_yields_empty_pool() {
        let out = search_evidence_for_claim(&StaticSearch::default(), "claim", 15).await;
        assert!(out.is_empty());
    }
}
