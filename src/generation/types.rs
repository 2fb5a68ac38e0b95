//! Core types for the generation domain

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::path::PathBuf;

use crate::definition::ServiceDefinition;

/// Per-call generation switches
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOptions {
    pub output_dir: PathBuf,
    /// Template to use instead of the service type's default
    pub template: Option<PathBuf>,
    pub overwrite: bool,
    pub generate_tests: bool,
    pub generate_readme: bool,
    /// Extension of generated source files, without the dot
    pub file_extension: String,
    /// Protocol-buffer compiler binary
    pub protoc: String,
    /// Extra values merged over the template data
    pub template_data: Map<String, JsonValue>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            template: None,
            overwrite: false,
            generate_tests: false,
            generate_readme: false,
            file_extension: "ts".to_string(),
            protoc: "protoc".to_string(),
            template_data: Map::new(),
        }
    }
}

/// Pipeline position, advanced and logged by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStage {
    Idle,
    Loading,
    GeneratingStubs,
    ParsingSpec,
    MergingEndpoints,
    Validating,
    PreparingData,
    Rendering,
    Writing,
    GeneratingTests,
    GeneratingReadme,
    Done,
    Failed,
}

impl GenerationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStage::Idle => "idle",
            GenerationStage::Loading => "loading",
            GenerationStage::GeneratingStubs => "generating stubs",
            GenerationStage::ParsingSpec => "parsing spec",
            GenerationStage::MergingEndpoints => "merging endpoints",
            GenerationStage::Validating => "validating",
            GenerationStage::PreparingData => "preparing data",
            GenerationStage::Rendering => "rendering",
            GenerationStage::Writing => "writing",
            GenerationStage::GeneratingTests => "generating tests",
            GenerationStage::GeneratingReadme => "generating readme",
            GenerationStage::Done => "done",
            GenerationStage::Failed => "failed",
        }
    }
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of generating one service. Failures are reported here, never as `Err`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceGenerationResult {
    pub success: bool,
    /// Files written, in the order they were written
    pub files: Vec<PathBuf>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_definition: Option<ServiceDefinition>,
    /// Definition file this result belongs to, for batch runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl ServiceGenerationResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}
