//! Picks and builds the normalizer for a loaded specification

use serde_json::Value as JsonValue;
use tracing::{debug, info};

use super::composite_loader::{CompositeSpecLoader, SpecSource};
use super::normalizer::SpecNormalizer;
use super::parser::{SpecDocument, detect_version};
use super::types::{NormalizedSpec, SpecOptions, SpecVersion};
use super::v2::Swagger2Normalizer;
use super::v3::OpenApi3Normalizer;
use crate::core::error::{Error, Result};

/// Loads, validates and dispatches specifications to the right normalizer
pub struct SpecGeneratorFactory {
    loader: CompositeSpecLoader,
}

impl SpecGeneratorFactory {
    pub fn new() -> Self {
        Self {
            loader: CompositeSpecLoader::new(),
        }
    }

    /// Load and validate a document, then build its normalizer.
    ///
    /// Every validation failure is reported in a single error.
    pub async fn create_generator(
        &self,
        source: &SpecSource,
        options: SpecOptions,
    ) -> Result<Box<dyn SpecNormalizer>> {
        let json = self.loader.load_source(source).await?;
        Self::from_document(SpecDocument::new(json), options)
    }

    /// Build a normalizer for an already-loaded document
    pub fn from_document(
        document: SpecDocument,
        options: SpecOptions,
    ) -> Result<Box<dyn SpecNormalizer>> {
        let validation = document.validate();
        if !validation.valid {
            return Err(Error::validation(format!(
                "Invalid specification: {}",
                validation.errors.join("; ")
            )));
        }

        let version = document.version();
        debug!(%version, "Creating normalizer");
        match version {
            SpecVersion::OpenApi3 => Ok(Box::new(OpenApi3Normalizer::new(document, options))),
            SpecVersion::Swagger2 => Ok(Box::new(Swagger2Normalizer::new(document, options))),
            SpecVersion::Unknown => Err(Error::UnsupportedVersion(
                "document declares neither 'openapi: 3.x' nor 'swagger: 2.0'".to_string(),
            )),
        }
    }

    /// Load, validate and normalize in one call
    pub async fn parse(&self, source: &SpecSource, options: SpecOptions) -> Result<NormalizedSpec> {
        let normalizer = self.create_generator(source, options).await?;
        let spec = normalizer.parse()?;
        info!(
            title = %spec.info.title,
            version = %spec.version,
            endpoints = spec.endpoints.len(),
            "Parsed specification"
        );
        Ok(spec)
    }

    /// Load a document and report its family without normalizing it
    pub async fn detect_version(&self, source: &SpecSource) -> Result<SpecVersion> {
        let json: JsonValue = self.loader.load_source(source).await?;
        Ok(detect_version(&json))
    }
}

impl Default for SpecGeneratorFactory {
    fn default() -> Self {
        Self::new()
    }
}
