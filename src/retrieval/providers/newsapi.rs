// src/retrieval/providers/newsapi.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::retrieval::clean;
use crate::retrieval::types::{EvidenceSource, SearchProvider};

pub const NEWSAPI_ENDPOINT: &str = "https://newsapi.org/v2/everything";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    source: Option<SourceRef>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceRef {
    name: Option<String>,
}

/// Map a NewsAPI `everything` body to evidence sources.
pub fn parse_response(body: &str) -> Result<Vec<EvidenceSource>> {
    let resp: Response = serde_json::from_str(body).context("parsing newsapi response")?;
    Ok(resp
        .articles
        .into_iter()
        .filter_map(|a| {
            let url = a.url.filter(|u| !u.trim().is_empty())?;
            Some(EvidenceSource {
                title: clean(a.title.as_deref()),
                description: clean(a.description.as_deref()),
                url,
                source: a.source.and_then(|s| s.name),
                published_at: a.published_at,
            })
        })
        .collect())
}

/// NewsAPI `everything` search. Without a key it returns nothing.
pub struct NewsApiProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl NewsApiProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: super::http_client(timeout)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: NEWSAPI_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchProvider for NewsApiProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<EvidenceSource>> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };
        let page_size = max_results.to_string();
        let body = self
            .http
            .get(&self.endpoint)
            .header("X-Api-Key", key)
            .query(&[
                ("q", query),
                ("pageSize", page_size.as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
            ])
            .send()
            .await
            .context("newsapi request")?
            .error_for_status()
            .context("newsapi status")?
            .text()
            .await
            .context("newsapi body")?;
        parse_response(&body)
    }

    fn name(&self) -> &'static str {
        "newsapi"
    }
}
