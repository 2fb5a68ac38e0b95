//! Composite loader that picks a loading strategy per source

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

use super::SpecSourceLoader;
use super::file_loader::FileSpecLoader;
use super::http_loader::{HttpSpecLoader, is_http_url};
use crate::core::error::{Error, Result};

/// Where a specification comes from.
///
/// When several fields are set the inline object wins, then the file, then the URL.
#[derive(Debug, Clone, Default)]
pub struct SpecSource {
    pub object: Option<JsonValue>,
    pub file: Option<PathBuf>,
    pub url: Option<String>,
}

impl SpecSource {
    pub fn from_object(object: JsonValue) -> Self {
        Self {
            object: Some(object),
            ..Default::default()
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Build a source from a CLI-style string: URLs go to the HTTP loader,
    /// everything else is treated as a path.
    pub fn parse(source: &str) -> Self {
        if is_http_url(source) {
            Self::from_url(source)
        } else {
            Self::from_file(source)
        }
    }
}

/// Dispatches to the HTTP or file loader
pub struct CompositeSpecLoader {
    http: HttpSpecLoader,
    file: FileSpecLoader,
}

impl CompositeSpecLoader {
    pub fn new() -> Self {
        Self {
            http: HttpSpecLoader::new(),
            file: FileSpecLoader::new(),
        }
    }

    /// Load a document from a [`SpecSource`]
    pub async fn load_source(&self, source: &SpecSource) -> Result<JsonValue> {
        if let Some(object) = &source.object {
            tracing::debug!("CompositeSpecLoader: Using inline specification object");
            return Ok(object.clone());
        }
        if let Some(path) = &source.file {
            tracing::debug!("CompositeSpecLoader: Using file loader");
            return self.file.load_path(path).await;
        }
        if let Some(url) = &source.url {
            tracing::debug!("CompositeSpecLoader: Using HTTP loader");
            return self.http.load(url).await;
        }
        Err(Error::config(
            "A specification source needs an object, a file path or a URL",
        ))
    }
}

impl Default for CompositeSpecLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpecSourceLoader for CompositeSpecLoader {
    async fn load(&self, source: &str) -> Result<JsonValue> {
        tracing::debug!("CompositeSpecLoader: Loading from source: {source}");
        self.load_source(&SpecSource::parse(source)).await
    }
}
