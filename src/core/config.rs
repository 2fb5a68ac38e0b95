//! Generator configuration.
//!
//! A `servicegen.toml` file captures the settings that usually stay the same
//! between runs (output directory, template search path, secondary artifacts).
//! Per-call switches live in [`GenerateOptions`]; [`GeneratorConfig::to_options`]
//! bridges the two.
//!
//! ```toml
//! output_dir = "generated"
//! overwrite = true
//! generate_tests = true
//!
//! [[template_dirs]]
//! path = "./my-templates"
//! priority = 50
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::{Error, Result};
use crate::generation::GenerateOptions;

/// Environment variable naming an extra template directory
pub const TEMPLATE_DIR_ENV: &str = "SERVICEGEN_TEMPLATE_DIR";

/// Priority given to the directory named by [`TEMPLATE_DIR_ENV`]
pub const ENV_TEMPLATE_DIR_PRIORITY: i32 = 100;

/// Trait for reading template configuration, allowing dependency injection for testing
pub trait TemplateConfigReader {
    fn get_template_dir(&self) -> Option<String>;
}

/// Production implementation that reads from environment variables
pub struct EnvTemplateConfigReader;

impl TemplateConfigReader for EnvTemplateConfigReader {
    fn get_template_dir(&self) -> Option<String> {
        std::env::var(TEMPLATE_DIR_ENV).ok().filter(|v| !v.is_empty())
    }
}

/// Mock implementation for testing with controlled values
#[cfg(test)]
pub struct MockTemplateConfigReader(pub Option<String>);

#[cfg(test)]
impl TemplateConfigReader for MockTemplateConfigReader {
    fn get_template_dir(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A template search directory with its lookup priority (higher wins)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDirConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub priority: i32,
}

/// File-backed generator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub output_dir: PathBuf,
    pub template_dirs: Vec<TemplateDirConfig>,
    pub overwrite: bool,
    pub generate_tests: bool,
    pub generate_readme: bool,
    pub file_extension: String,
    pub protoc: String,
    pub cache: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            template_dirs: Vec::new(),
            overwrite: false,
            generate_tests: false,
            generate_readme: false,
            file_extension: "ts".to_string(),
            protoc: "protoc".to_string(),
            cache: true,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from a TOML file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), "Loaded generator config");
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Invalid config: {e}")))
    }

    /// Template directories to register, including the environment override
    pub fn resolved_template_dirs(&self, reader: &dyn TemplateConfigReader) -> Vec<TemplateDirConfig> {
        let mut dirs = self.template_dirs.clone();
        if let Some(dir) = reader.get_template_dir() {
            dirs.push(TemplateDirConfig {
                path: PathBuf::from(dir),
                priority: ENV_TEMPLATE_DIR_PRIORITY,
            });
        }
        dirs
    }

    /// Build per-call generation options from this configuration
    pub fn to_options(&self) -> GenerateOptions {
        GenerateOptions {
            output_dir: self.output_dir.clone(),
            overwrite: self.overwrite,
            generate_tests: self.generate_tests,
            generate_readme: self.generate_readme,
            file_extension: self.file_extension.clone(),
            protoc: self.protoc.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("generated"));
        assert_eq!(config.file_extension, "ts");
        assert_eq!(config.protoc, "protoc");
        assert!(config.cache);
        assert!(!config.overwrite);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = GeneratorConfig::from_toml(
            r#"
output_dir = "out"
overwrite = true

[[template_dirs]]
path = "./custom"
priority = 50
"#,
        )
        .unwrap();

        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert!(config.overwrite);
        assert!(!config.generate_tests);
        assert_eq!(config.template_dirs.len(), 1);
        assert_eq!(config.template_dirs[0].priority, 50);
    }

    #[test]
    fn test_from_toml_invalid() {
        let result = GeneratorConfig::from_toml("output_dir = [");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_env_template_dir_is_appended() {
        let config = GeneratorConfig::default();
        let dirs = config
            .resolved_template_dirs(&MockTemplateConfigReader(Some("/opt/templates".into())));
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].path, PathBuf::from("/opt/templates"));
        assert_eq!(dirs[0].priority, ENV_TEMPLATE_DIR_PRIORITY);

        let none = config.resolved_template_dirs(&MockTemplateConfigReader(None));
        assert!(none.is_empty());
    }

    #[test]
    fn test_to_options() {
        let config = GeneratorConfig {
            overwrite: true,
            generate_readme: true,
            file_extension: "js".into(),
            ..Default::default()
        };
        let options = config.to_options();
        assert!(options.overwrite);
        assert!(options.generate_readme);
        assert!(!options.generate_tests);
        assert_eq!(options.file_extension, "js");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = GeneratorConfig::load(Path::new("/nonexistent/servicegen.toml")).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
