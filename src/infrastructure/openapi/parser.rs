//! Specification document access: version detection, structural validation,
//! local `$ref` resolution and shared metadata extraction.
//!
//! Only same-document pointers (`#/components/schemas/Pet`) are resolved.
//! Remote and cross-document references are not supported and resolve to
//! `None`; callers decide whether that drops the fragment or keeps a
//! placeholder.

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use super::types::{ApiInfo, SpecVersion};
use crate::core::error::{Error, Result};

/// Outcome of [`SpecDocument::validate`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpecValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Detect the specification family of a raw document.
///
/// `openapi` starting with `3.0` or `3.1` is format-3, `swagger == "2.0"` is
/// format-2, anything else is unknown.
pub fn detect_version(json: &JsonValue) -> SpecVersion {
    if let Some(v) = json.get("openapi").and_then(JsonValue::as_str) {
        if v.starts_with("3.0") || v.starts_with("3.1") {
            return SpecVersion::OpenApi3;
        }
    }
    if json.get("swagger").and_then(JsonValue::as_str) == Some("2.0") {
        return SpecVersion::Swagger2;
    }
    SpecVersion::Unknown
}

/// Trailing name segment of a reference (`#/definitions/Pet` -> `Pet`)
pub fn ref_name(ref_str: &str) -> &str {
    ref_str.rsplit('/').next().unwrap_or(ref_str)
}

/// A loaded specification document
#[derive(Debug, Clone)]
pub struct SpecDocument {
    /// The raw JSON value of the spec
    pub json: JsonValue,
    version: SpecVersion,
}

impl SpecDocument {
    /// Wrap a raw document, detecting its version once
    pub fn new(json: JsonValue) -> Self {
        let version = detect_version(&json);
        Self { json, version }
    }

    pub fn version(&self) -> SpecVersion {
        self.version
    }

    /// Structural validation only; operations are checked during normalization
    pub fn validate(&self) -> SpecValidation {
        let mut errors = Vec::new();

        if self.version == SpecVersion::Unknown {
            errors.push(
                "Unable to determine specification version (expected openapi 3.0/3.1 or swagger 2.0)"
                    .to_string(),
            );
        }
        if self.title().is_none() {
            errors.push("Missing info.title".to_string());
        }
        if self.api_version().is_none() {
            errors.push("Missing info.version".to_string());
        }
        match self.json.get("paths").and_then(JsonValue::as_object) {
            Some(paths) if !paths.is_empty() => {}
            Some(_) => errors.push("'paths' must not be empty".to_string()),
            None => errors.push("Missing 'paths' object".to_string()),
        }

        SpecValidation {
            valid: errors.is_empty(),
            errors,
        }
    }

    /// Get the title of the API
    pub fn title(&self) -> Option<&str> {
        self.json.get("info")?.get("title")?.as_str()
    }

    /// Get the version of the API (`info.version`)
    pub fn api_version(&self) -> Option<&str> {
        self.json.get("info")?.get("version")?.as_str()
    }

    /// Extract the `info` block
    pub fn info(&self) -> Result<ApiInfo> {
        Ok(ApiInfo {
            title: self
                .title()
                .ok_or_else(|| Error::spec("Missing info.title"))?
                .to_string(),
            version: self
                .api_version()
                .ok_or_else(|| Error::spec("Missing info.version"))?
                .to_string(),
            description: self
                .json
                .get("info")
                .and_then(|info| info.get("description"))
                .and_then(JsonValue::as_str)
                .map(String::from),
        })
    }

    /// The `paths` object in document order
    pub fn paths(&self) -> Option<&Map<String, JsonValue>> {
        self.json.get("paths").and_then(JsonValue::as_object)
    }

    /// Resolve a local pointer of the form `#/a/b/c`.
    ///
    /// Returns `None` for external, remote or malformed references.
    pub fn resolve_ref(&self, ref_str: &str) -> Option<&JsonValue> {
        let pointer = ref_str.strip_prefix('#')?;
        if !pointer.starts_with('/') {
            return None;
        }
        self.json.pointer(pointer)
    }

    /// Base URL declared by the document.
    ///
    /// Format-3 uses the first server URL; format-2 joins
    /// `scheme://host` + `basePath`, defaulting the scheme to `https`.
    pub fn base_url(&self) -> Option<String> {
        match self.version {
            SpecVersion::OpenApi3 => self
                .json
                .get("servers")
                .and_then(JsonValue::as_array)
                .and_then(|servers| servers.first())
                .and_then(|s| s.get("url"))
                .and_then(JsonValue::as_str)
                .map(String::from),
            SpecVersion::Swagger2 => {
                let host = self.json.get("host").and_then(JsonValue::as_str)?;
                let scheme = self
                    .json
                    .get("schemes")
                    .and_then(JsonValue::as_array)
                    .and_then(|s| s.first())
                    .and_then(JsonValue::as_str)
                    .unwrap_or("https");
                let base_path = self
                    .json
                    .get("basePath")
                    .and_then(JsonValue::as_str)
                    .unwrap_or("");
                Some(format!("{scheme}://{host}{base_path}"))
            }
            SpecVersion::Unknown => None,
        }
    }

    /// Schema registry (`components.schemas` or `definitions`)
    pub fn schemas(&self) -> Map<String, JsonValue> {
        let registry = match self.version {
            SpecVersion::OpenApi3 => self.json.get("components").and_then(|c| c.get("schemas")),
            SpecVersion::Swagger2 => self.json.get("definitions"),
            SpecVersion::Unknown => None,
        };
        registry
            .and_then(JsonValue::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Security scheme declarations, if any
    pub fn security_schemes(&self) -> Option<Map<String, JsonValue>> {
        let schemes = match self.version {
            SpecVersion::OpenApi3 => self
                .json
                .get("components")
                .and_then(|c| c.get("securitySchemes")),
            SpecVersion::Swagger2 => self.json.get("securityDefinitions"),
            SpecVersion::Unknown => None,
        };
        schemes.and_then(JsonValue::as_object).cloned()
    }

    /// Whether the document declares a non-empty default `security` requirement
    pub fn has_global_security(&self) -> bool {
        has_security(self.json.get("security"))
    }

    /// Document-level tag declarations in order
    pub fn declared_tags(&self) -> Vec<String> {
        self.json
            .get("tags")
            .and_then(JsonValue::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.get("name").and_then(JsonValue::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Recursively replace every resolvable local `$ref` with its target.
    ///
    /// A reference that is already being expanded higher up the chain is left
    /// in place, so self-referential schemas terminate. Unresolvable references
    /// are also left untouched.
    pub fn dereference(&self, value: &JsonValue) -> JsonValue {
        let mut chain = Vec::new();
        self.dereference_with_chain(value, &mut chain)
    }

    fn dereference_with_chain(&self, value: &JsonValue, chain: &mut Vec<String>) -> JsonValue {
        match value {
            JsonValue::Object(obj) => {
                if let Some(ref_str) = obj.get("$ref").and_then(JsonValue::as_str) {
                    if chain.iter().any(|r| r == ref_str) {
                        return value.clone();
                    }
                    if let Some(target) = self.resolve_ref(ref_str) {
                        chain.push(ref_str.to_string());
                        let resolved = self.dereference_with_chain(target, chain);
                        chain.pop();
                        return resolved;
                    }
                    return value.clone();
                }

                let resolved = obj
                    .iter()
                    .map(|(k, v)| (k.clone(), self.dereference_with_chain(v, chain)))
                    .collect();
                JsonValue::Object(resolved)
            }
            JsonValue::Array(arr) => JsonValue::Array(
                arr.iter()
                    .map(|v| self.dereference_with_chain(v, chain))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }
}

/// `security` is considered declared when it is a non-empty array
pub(crate) fn has_security(value: Option<&JsonValue>) -> bool {
    value
        .and_then(JsonValue::as_array)
        .is_some_and(|reqs| !reqs.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn petstore_v3() -> JsonValue {
        json!({
            "openapi": "3.0.3",
            "info": {"title": "Pets", "version": "1.0.0", "description": "Pet API"},
            "servers": [{"url": "https://api.example.com/v1"}, {"url": "https://backup.example.com"}],
            "paths": {"/pets": {"get": {"responses": {"200": {"description": "ok"}}}}},
            "components": {
                "schemas": {
                    "Pet": {"type": "object", "properties": {"id": {"$ref": "#/components/schemas/PetId"}}},
                    "PetId": {"type": "integer"},
                    "Node": {"type": "object", "properties": {"child": {"$ref": "#/components/schemas/Node"}}}
                },
                "securitySchemes": {"bearer": {"type": "http", "scheme": "bearer"}}
            }
        })
    }

    #[test]
    fn test_detect_version() {
        assert_eq!(detect_version(&json!({"openapi": "3.0.0"})), SpecVersion::OpenApi3);
        assert_eq!(detect_version(&json!({"openapi": "3.1.0"})), SpecVersion::OpenApi3);
        assert_eq!(detect_version(&json!({"swagger": "2.0"})), SpecVersion::Swagger2);
        assert_eq!(detect_version(&json!({"openapi": "4.0.0"})), SpecVersion::Unknown);
        assert_eq!(detect_version(&json!({"swagger": "1.2"})), SpecVersion::Unknown);
        assert_eq!(detect_version(&json!({"openapi": 3})), SpecVersion::Unknown);
        assert_eq!(detect_version(&json!({})), SpecVersion::Unknown);
    }

    #[test]
    fn test_validate_reports_every_failure() {
        let doc = SpecDocument::new(json!({"info": {}, "paths": {}}));
        let validation = doc.validate();
        assert!(!validation.valid);
        assert_eq!(validation.errors.len(), 4);
        assert!(validation.errors.iter().any(|e| e.contains("version")));
        assert!(validation.errors.iter().any(|e| e.contains("info.title")));
        assert!(validation.errors.iter().any(|e| e.contains("info.version")));
        assert!(validation.errors.iter().any(|e| e.contains("paths")));
    }

    #[test]
    fn test_validate_valid_document() {
        let validation = SpecDocument::new(petstore_v3()).validate();
        assert!(validation.valid);
        assert!(validation.errors.is_empty());
    }

    #[test]
    fn test_resolve_ref_local_only() {
        let doc = SpecDocument::new(petstore_v3());
        assert_eq!(
            doc.resolve_ref("#/components/schemas/PetId"),
            Some(&json!({"type": "integer"}))
        );
        assert!(doc.resolve_ref("#/components/schemas/Missing").is_none());
        assert!(doc.resolve_ref("other.yaml#/Pet").is_none());
        assert!(doc.resolve_ref("https://example.com/spec.json#/Pet").is_none());
        assert!(doc.resolve_ref("#").is_none());
        assert!(doc.resolve_ref("components/schemas/Pet").is_none());
    }

    #[test]
    fn test_ref_name() {
        assert_eq!(ref_name("#/definitions/Pet"), "Pet");
        assert_eq!(ref_name("Pet"), "Pet");
    }

    #[test]
    fn test_base_url_v3_takes_first_server() {
        let doc = SpecDocument::new(petstore_v3());
        assert_eq!(doc.base_url().as_deref(), Some("https://api.example.com/v1"));
    }

    #[test]
    fn test_base_url_v2_defaults_scheme() {
        let doc = SpecDocument::new(json!({
            "swagger": "2.0",
            "host": "api.example.com",
            "basePath": "/v2"
        }));
        assert_eq!(doc.base_url().as_deref(), Some("https://api.example.com/v2"));

        let doc = SpecDocument::new(json!({
            "swagger": "2.0",
            "host": "localhost:8080",
            "schemes": ["http"]
        }));
        assert_eq!(doc.base_url().as_deref(), Some("http://localhost:8080"));

        let doc = SpecDocument::new(json!({"swagger": "2.0"}));
        assert!(doc.base_url().is_none());
    }

    #[test]
    fn test_schemas_and_security_schemes() {
        let doc = SpecDocument::new(petstore_v3());
        let schemas = doc.schemas();
        assert_eq!(schemas.keys().collect::<Vec<_>>(), vec!["Pet", "PetId", "Node"]);
        assert!(doc.security_schemes().unwrap().contains_key("bearer"));

        let v2 = SpecDocument::new(json!({
            "swagger": "2.0",
            "definitions": {"User": {"type": "object"}},
            "securityDefinitions": {"api_key": {"type": "apiKey"}}
        }));
        assert!(v2.schemas().contains_key("User"));
        assert!(v2.security_schemes().unwrap().contains_key("api_key"));
    }

    #[test]
    fn test_dereference_nested_refs() {
        let doc = SpecDocument::new(petstore_v3());
        let resolved = doc.dereference(&json!({"$ref": "#/components/schemas/Pet"}));
        assert_eq!(resolved["type"], json!("object"));
        assert_eq!(resolved["properties"]["id"], json!({"type": "integer"}));
    }

    #[test]
    fn test_dereference_terminates_on_cycles() {
        let doc = SpecDocument::new(petstore_v3());
        let resolved = doc.dereference(&json!({"$ref": "#/components/schemas/Node"}));
        assert_eq!(
            resolved["properties"]["child"],
            json!({"$ref": "#/components/schemas/Node"})
        );
    }

    #[test]
    fn test_dereference_keeps_external_refs() {
        let doc = SpecDocument::new(petstore_v3());
        let value = json!({"items": {"$ref": "common.yaml#/Thing"}});
        assert_eq!(doc.dereference(&value), value);
    }

    #[test]
    fn test_global_security_and_tags() {
        let doc = SpecDocument::new(json!({
            "openapi": "3.0.0",
            "security": [{"bearer": []}],
            "tags": [{"name": "users"}, {"name": "orders"}]
        }));
        assert!(doc.has_global_security());
        assert_eq!(doc.declared_tags(), vec!["users", "orders"]);

        let doc = SpecDocument::new(json!({"openapi": "3.0.0", "security": []}));
        assert!(!doc.has_global_security());
    }
}
