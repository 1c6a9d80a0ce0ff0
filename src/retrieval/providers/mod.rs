// src/retrieval/providers/mod.rs
pub mod bing;
pub mod newsapi;

pub use bing::BingProvider;
pub use newsapi::NewsApiProvider;

use std::time::Duration;

pub(crate) fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("claim-verdict-engine/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}
