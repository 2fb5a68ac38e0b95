//! Normalized intermediate representation shared by both specification families.
//!
//! Whatever the input looked like (format-3 `openapi: 3.x` or format-2
//! `swagger: "2.0"`), the normalizers emit these types. Schemas stay as raw JSON
//! because they are handed to templates untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Detected specification family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpecVersion {
    /// `openapi: 3.0.x` / `3.1.x`
    #[serde(rename = "format-3")]
    OpenApi3,
    /// `swagger: "2.0"`
    #[serde(rename = "format-2")]
    Swagger2,
    Unknown,
}

impl SpecVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecVersion::OpenApi3 => "format-3",
            SpecVersion::Swagger2 => "format-2",
            SpecVersion::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP methods recognized on a path item, in traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// Get all HTTP methods as an array
    pub fn all() -> &'static [HttpMethod] {
        &[
            HttpMethod::Get,
            HttpMethod::Post,
            HttpMethod::Put,
            HttpMethod::Delete,
            HttpMethod::Patch,
            HttpMethod::Head,
            HttpMethod::Options,
        ]
    }

    /// Key under which the operation appears in a path item
    pub fn key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key().to_uppercase())
    }
}

/// Parameter location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Parse the `in` field of a parameter object. Body and form locations are
    /// handled separately by the format-2 normalizer.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "path" => Some(ParameterLocation::Path),
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

fn default_param_type() -> String {
    "string".to_string()
}

fn default_location() -> ParameterLocation {
    ParameterLocation::Query
}

/// Operation parameter after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedParameter {
    pub name: String,
    #[serde(rename = "in", default = "default_location")]
    pub location: ParameterLocation,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
}

/// Request body after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRequestBody {
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse {
    pub status_code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
}

/// One path × method combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEndpoint {
    pub path: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<NormalizedParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<NormalizedRequestBody>,
    /// Responses in declaration order
    pub responses: Vec<NormalizedResponse>,
    pub deprecated: bool,
    pub authentication: bool,
}

impl NormalizedEndpoint {
    /// Look up a response by status code
    pub fn response(&self, status_code: &str) -> Option<&NormalizedResponse> {
        self.responses.iter().find(|r| r.status_code == status_code)
    }
}

/// API metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Version-tagged intermediate representation of a whole specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSpec {
    pub version: SpecVersion,
    pub info: ApiInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub endpoints: Vec<NormalizedEndpoint>,
    pub schemas: Map<String, JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<Map<String, JsonValue>>,
}

/// Options shared by both normalizers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecOptions {
    pub base_url_override: Option<String>,
    pub include_deprecated: bool,
    pub filter_tags: Vec<String>,
    pub dereference: bool,
}

impl Default for SpecOptions {
    fn default() -> Self {
        Self {
            base_url_override: None,
            include_deprecated: true,
            filter_tags: Vec::new(),
            dereference: true,
        }
    }
}

/// Read-only summary used by listing commands
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecStats {
    pub total_endpoints: usize,
    pub by_method: std::collections::BTreeMap<String, usize>,
    pub by_tag: std::collections::BTreeMap<String, usize>,
    pub deprecated: usize,
    pub authenticated: usize,
    pub schemas: usize,
}
