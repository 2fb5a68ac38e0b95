//! servicegen - compiles service definitions and OpenAPI/Swagger
//! specifications into generated service sources.
//!
//! The pipeline loads a service definition, merges endpoints from an optional
//! external API specification, validates the result and renders it through a
//! cached Tera template engine.
#![deny(unsafe_code)]

pub mod core;
pub mod definition;
pub mod generation;
pub mod infrastructure;

pub use crate::core::config::GeneratorConfig;
pub use crate::core::error::{Error, Result};
pub use definition::{ServiceDefinition, ServiceType, ValidationReport, validate_definition};
pub use generation::{
    GenerateOptions, GenerationStage, ServiceGenerationResult, ServiceGenerator,
    ServiceGeneratorBuilder,
};
pub use infrastructure::openapi::{NormalizedSpec, SpecGeneratorFactory, SpecOptions, SpecSource};
pub use infrastructure::templates::TemplateEngine;
