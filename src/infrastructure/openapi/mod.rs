//! Specification loading and normalization for both supported families

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::core::error::Result;

pub mod composite_loader;
pub mod factory;
pub mod file_loader;
pub mod http_loader;
pub mod normalizer;
pub mod parser;
pub mod types;
pub mod v2;
pub mod v3;

pub use composite_loader::{CompositeSpecLoader, SpecSource};
pub use factory::SpecGeneratorFactory;
pub use file_loader::FileSpecLoader;
pub use http_loader::HttpSpecLoader;
pub use normalizer::SpecNormalizer;
pub use parser::{SpecDocument, SpecValidation, detect_version};
pub use types::*;

/// Loads a raw specification document from a source string
#[async_trait]
pub trait SpecSourceLoader: Send + Sync {
    async fn load(&self, source: &str) -> Result<JsonValue>;
}
