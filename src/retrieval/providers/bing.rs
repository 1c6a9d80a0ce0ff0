// src/retrieval/providers/bing.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::retrieval::clean;
use crate::retrieval::types::{EvidenceSource, SearchProvider};

pub const BING_ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/search";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(rename = "webPages")]
    web_pages: Option<WebPages>,
}

#[derive(Debug, Deserialize)]
struct WebPages {
    #[serde(default)]
    value: Vec<WebPage>,
}

#[derive(Debug, Deserialize)]
struct WebPage {
    name: Option<String>,
    snippet: Option<String>,
    url: Option<String>,
    #[serde(rename = "displayUrl")]
    display_url: Option<String>,
}

/// Map a Bing Web Search body. Web pages carry no publication date.
pub fn parse_response(body: &str) -> Result<Vec<EvidenceSource>> {
    let resp: Response = serde_json::from_str(body).context("parsing bing response")?;
    Ok(resp
        .web_pages
        .map(|w| w.value)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| {
            let url = p.url.filter(|u| !u.trim().is_empty())?;
            Some(EvidenceSource {
                title: clean(p.name.as_deref()),
                description: clean(p.snippet.as_deref()),
                url,
                source: p.display_url,
                published_at: None,
            })
        })
        .collect())
}

pub struct BingProvider {
    http: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl BingProvider {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: super::http_client(timeout)?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            endpoint: BING_ENDPOINT.to_string(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchProvider for BingProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<EvidenceSource>> {
        let Some(key) = self.api_key.as_deref() else {
            return Ok(Vec::new());
        };
        let count = max_results.to_string();
        let body = self
            .http
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", key)
            .query(&[("q", query), ("mkt", "en-US"), ("count", count.as_str())])
            .send()
            .await
            .context("bing request")?
            .error_for_status()
            .context("bing status")?
            .text()
            .await
            .context("bing body")?;
        parse_response(&body)
    }

    fn name(&self) -> &'static str {
        "bing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_web_pages() {
        let body = r#"{"webPages": {"value": [
            {"name": "Budget passes", "snippet": "Council voted 7&ndash;2.",
             "url": "https://apnews.com/article/x", "displayUrl": "apnews.com/article/x"}
        ]}}"#;
        let out = parse_response(body).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title.as_deref(), Some("Budget passes"));
        assert_eq!(out[0].description.as_deref(), Some("Council voted 7\u{2013}2."));
        assert_eq!(out[0].source.as_deref(), Some("apnews.com/article/x"));
        assert!(out[0].published_at.is_none());
    }

    #[test]
    fn missing_web_pages_is_empty() {
        assert!(parse_response(r#"{"_type": "SearchResponse"}"#).unwrap().is_empty());
    }
}
