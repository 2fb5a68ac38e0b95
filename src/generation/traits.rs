//! Port interfaces for the generation domain

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::path::Path;

use crate::core::error::Result;
use crate::infrastructure::templates::{RenderOptions, TemplateError};

/// Template collaborator required by the orchestrator
#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    /// Render a template file, resolved against the registered directories
    async fn render_file(
        &self,
        path: &Path,
        data: &JsonValue,
        options: &RenderOptions,
    ) -> std::result::Result<String, TemplateError>;

    /// Register a search directory; higher priority is searched first
    fn add_template_directory(&self, path: &Path, priority: i32);

    /// Names of the helpers available to templates
    fn get_helpers(&self) -> Vec<String>;
}

/// Writes generated files
#[async_trait]
pub trait OutputService: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    /// Write a file, creating parent directories as needed
    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    async fn ensure_directory(&self, path: &Path) -> Result<()>;
}
