//! Template engine: rendering, caching, helpers and search directories

pub mod cache;
pub mod engine;
pub mod errors;
pub mod helpers;
pub mod scan;

pub use cache::{CacheEntryStats, CacheStats, TemplateMetadata};
pub use engine::{RenderOptions, TemplateEngine, TemplateIssue, TemplateValidation};
pub use errors::TemplateError;
pub use helpers::{HelperFn, HelperRegistry};
