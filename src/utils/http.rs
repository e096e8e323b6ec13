// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::HeaderMap;
use scraper::Html;

use crate::error::Result;
use crate::models::HttpConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<reqwest::Client> {
    create_client_with_headers(config, HeaderMap::new())
}

/// Like [`create_client`], sending `headers` with every request.
pub fn create_client_with_headers(config: &HttpConfig, headers: HeaderMap) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Fetch a page and parse it as HTML. Non-2xx responses are errors.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<Html> {
    let text = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(Html::parse_document(&text))
}
