// src/retrieval/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One search hit, provider-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EvidenceSource {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, rename = "publishedAt", alias = "published_at")]
    pub published_at: Option<String>,
}

impl EvidenceSource {
    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn description_str(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// `title + " " + description`, trimmed. Fed to stance and weighting.
    pub fn text(&self) -> String {
        format!("{} {}", self.title_str(), self.description_str())
            .trim()
            .to_string()
    }
}

/// A single upstream search API.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<EvidenceSource>>;
    fn name(&self) -> &'static str;
}

/// What the pipeline consumes. Never fails; an outage is an empty list.
#[async_trait::async_trait]
pub trait EvidenceSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Vec<EvidenceSource>;
}
