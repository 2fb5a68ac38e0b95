//! Hand-authored service definition documents.
//!
//! Scalar fields default to empty strings so that a missing field and an
//! empty one are reported the same way by the validator.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::core::error::{Error, Result};
use crate::infrastructure::openapi::{NormalizedParameter, NormalizedRequestBody, NormalizedResponse};

/// Kind of service being generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Rest,
    Grpc,
    Graphql,
    Sql,
    Hybrid,
}

impl ServiceType {
    pub fn all() -> &'static [ServiceType] {
        &[
            ServiceType::Rest,
            ServiceType::Grpc,
            ServiceType::Graphql,
            ServiceType::Sql,
            ServiceType::Hybrid,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Rest => "rest",
            ServiceType::Grpc => "grpc",
            ServiceType::Graphql => "graphql",
            ServiceType::Sql => "sql",
            ServiceType::Hybrid => "hybrid",
        }
    }

    /// Template used when the caller does not pick one
    pub fn default_template(&self) -> &'static str {
        match self {
            ServiceType::Rest => "rest-service.tera",
            ServiceType::Grpc => "grpc-service.tera",
            ServiceType::Graphql => "graphql-service.tera",
            ServiceType::Sql => "sql-service.tera",
            ServiceType::Hybrid => "hybrid-service.tera",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ServiceType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::validation(format!("Unknown service type '{s}'")))
    }
}

/// Top-level string fields that tolerate unquoted scalars
const SCALAR_FIELDS: [&str; 5] = ["id", "name", "nameSpace", "version", "serviceType"];

/// Service definition document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceDefinition {
    pub id: String,
    pub name: String,
    pub name_space: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Raw value; see [`ServiceDefinition::service_type`]
    #[serde(rename = "serviceType")]
    pub service_type_name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ServiceDependency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<ServiceSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caching: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<JsonValue>,
}

impl ServiceDefinition {
    /// Parse a definition document; JSON when it looks like JSON, YAML otherwise
    pub fn from_str_any(content: &str) -> Result<Self> {
        if content.trim_start().starts_with('{') {
            Self::from_json(content)
        } else {
            Ok(serde_yaml::from_str(content)?)
        }
    }

    /// Read and parse a definition file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::config(format!("Failed to read definition {}: {e}", path.display()))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_str_any(&content)
        }
    }

    /// JSON has no bare scalars, so numeric or boolean identity fields are
    /// turned into their text before deserializing, as YAML would read them.
    fn from_json(content: &str) -> Result<Self> {
        let mut value: JsonValue = serde_json::from_str(content)?;
        if let Some(fields) = value.as_object_mut() {
            for key in SCALAR_FIELDS {
                if let Some(field) = fields.get_mut(key) {
                    if field.is_number() || field.is_boolean() {
                        *field = JsonValue::String(field.to_string());
                    }
                }
            }
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Typed service kind, `None` when unrecognized
    pub fn service_type(&self) -> Option<ServiceType> {
        self.service_type_name.parse().ok()
    }

    /// `{nameSpace}.{name}@{version}`
    pub fn expected_id(&self) -> String {
        format!("{}.{}@{}", self.name_space, self.name, self.version)
    }

    pub fn rest(&self) -> Option<&RestSpec> {
        self.spec.as_ref()?.rest.as_ref()
    }

    pub fn grpc(&self) -> Option<&GrpcSpec> {
        self.spec.as_ref()?.grpc.as_ref()
    }

    /// The external API specification reference, either family
    pub fn external_spec(&self) -> Option<&ExternalSpecRef> {
        let spec = self.spec.as_ref()?;
        spec.openapi.as_ref().or(spec.swagger.as_ref())
    }
}

/// Per-type specification blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rest: Option<RestSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grpc: Option<GrpcSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphql: Option<GraphqlSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<SqlSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openapi: Option<ExternalSpecRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swagger: Option<ExternalSpecRef>,
}

/// Reference to an API specification to merge endpoints from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalSpecRef {
    /// Path, relative paths are resolved against the definition file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filter_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dereference: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestSpec {
    pub base_url: String,
    pub endpoints: Vec<RestEndpoint>,
}

/// Generation-ready endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RestEndpoint {
    pub path: String,
    pub method: String,
    pub handler: String,
    pub params: Vec<NormalizedParameter>,
    pub query: Vec<NormalizedParameter>,
    pub headers: Vec<NormalizedParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<NormalizedRequestBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<NormalizedResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrpcSpec {
    pub proto_path: String,
    pub service_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphqlSpec {
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SqlSpec {
    pub data_source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceDependency {
    pub id: String,
    pub alias: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
