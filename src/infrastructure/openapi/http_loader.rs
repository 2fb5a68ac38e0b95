//! HTTP-based specification loader

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::SpecSourceLoader;
use super::file_loader::{DocumentFormat, parse_document};
use crate::core::error::{Error, Result};

/// Loads specification documents from HTTP/HTTPS URLs
pub struct HttpSpecLoader {
    client: Client,
}

impl HttpSpecLoader {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

impl Default for HttpSpecLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a source string names an HTTP(S) URL
pub fn is_http_url(source: &str) -> bool {
    Url::parse(source).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

#[async_trait]
impl SpecSourceLoader for HttpSpecLoader {
    async fn load(&self, source: &str) -> Result<JsonValue> {
        let url = Url::parse(source)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .ok_or_else(|| {
                Error::config(format!("HttpSpecLoader only handles HTTP(S) URLs, got: {source}"))
            })?;

        debug!(url = %source, "Fetching specification");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Http(format!("Failed to fetch {source}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!("HTTP {status} when fetching {source}")));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let content = response.text().await?;

        let format = if content_type.contains("json") {
            // A json label still accepts YAML bodies
            DocumentFormat::Unknown
        } else if content_type.contains("yaml") {
            DocumentFormat::Yaml
        } else {
            // Query strings and fragments must not hide the extension
            DocumentFormat::from_extension(url.path())
        };
        parse_document(&content, format)
    }
}
