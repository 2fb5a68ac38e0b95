//! File-based specification loader
//!
//! This loader handles only file I/O and format detection. Normalization is
//! done by the version-specific normalizers.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::SpecSourceLoader;
use crate::core::error::{Error, Result};

/// Serialization format hint derived from an extension or a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Unknown,
}

impl DocumentFormat {
    /// Infer the format from a path or URL suffix
    pub fn from_extension(source: &str) -> Self {
        let lower = source.to_ascii_lowercase();
        if lower.ends_with(".json") {
            DocumentFormat::Json
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            DocumentFormat::Yaml
        } else {
            DocumentFormat::Unknown
        }
    }
}

/// Parse document text in the given format.
///
/// With an unknown format JSON is tried first, then YAML.
pub fn parse_document(content: &str, format: DocumentFormat) -> Result<JsonValue> {
    match format {
        DocumentFormat::Json => Ok(serde_json::from_str(content)?),
        DocumentFormat::Yaml => Ok(serde_yaml::from_str(content)?),
        DocumentFormat::Unknown => serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .map_err(|e| Error::spec(format!("Failed to parse document: {e}"))),
    }
}

/// Loads specification documents from local files
#[derive(Debug, Default)]
pub struct FileSpecLoader;

impl FileSpecLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a file
    pub async fn load_path(&self, path: &Path) -> Result<JsonValue> {
        debug!(path = %path.display(), "Loading specification file");
        let content = fs::read_to_string(path).await?;
        parse_document(
            &content,
            DocumentFormat::from_extension(&path.to_string_lossy()),
        )
    }
}

#[async_trait]
impl SpecSourceLoader for FileSpecLoader {
    async fn load(&self, source: &str) -> Result<JsonValue> {
        self.load_path(Path::new(source)).await
    }
}
