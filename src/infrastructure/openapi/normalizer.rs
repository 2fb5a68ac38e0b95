//! Shared normalization algorithm.
//!
//! Both specification families walk `paths` the same way; only parameter,
//! request-body and response extraction differ. Those pieces are the required
//! methods of [`SpecNormalizer`], the traversal is provided.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use super::parser::{SpecDocument, has_security, ref_name};
use super::types::{
    HttpMethod, NormalizedEndpoint, NormalizedParameter, NormalizedRequestBody,
    NormalizedResponse, NormalizedSpec, SpecOptions, SpecStats, SpecVersion,
};
use crate::core::error::{Error, Result};

/// Converts one loaded, validated document into a [`NormalizedSpec`]
pub trait SpecNormalizer: Send + Sync {
    /// The document being normalized
    fn document(&self) -> &SpecDocument;

    /// Options controlling filtering and dereferencing
    fn options(&self) -> &SpecOptions;

    /// Family this normalizer handles
    fn version(&self) -> SpecVersion;

    /// Turn the merged raw parameter list into normalized parameters and,
    /// where the family allows it, a request body.
    fn extract_inputs(
        &self,
        operation: &Map<String, JsonValue>,
        raw_parameters: Vec<JsonValue>,
    ) -> (Vec<NormalizedParameter>, Option<NormalizedRequestBody>);

    /// Parse a response object whose `$ref` (if any) has already been resolved
    fn parse_response(
        &self,
        status_code: &str,
        operation: &Map<String, JsonValue>,
        response: &JsonValue,
    ) -> NormalizedResponse;

    /// Normalize every path × method combination in document order
    fn parse(&self) -> Result<NormalizedSpec> {
        let doc = self.document();
        let options = self.options();
        let info = doc.info()?;
        let paths = doc
            .paths()
            .ok_or_else(|| Error::spec("Missing 'paths' object"))?;
        let global_security = doc.has_global_security();

        let mut endpoints = Vec::new();
        for (path, path_item) in paths {
            for method in HttpMethod::all() {
                let Some(operation) = path_item.get(method.key()).and_then(JsonValue::as_object)
                else {
                    continue;
                };
                if let Some(endpoint) =
                    self.parse_operation(path, *method, path_item, operation, global_security)
                {
                    endpoints.push(endpoint);
                }
            }
        }
        debug!(
            version = %self.version(),
            endpoints = endpoints.len(),
            "Normalized specification"
        );

        Ok(NormalizedSpec {
            version: self.version(),
            info,
            base_url: options.base_url_override.clone().or_else(|| doc.base_url()),
            endpoints,
            schemas: doc.schemas(),
            security_schemes: doc.security_schemes(),
        })
    }

    /// Build one endpoint, or `None` when filtered out
    fn parse_operation(
        &self,
        path: &str,
        method: HttpMethod,
        path_item: &JsonValue,
        operation: &Map<String, JsonValue>,
        global_security: bool,
    ) -> Option<NormalizedEndpoint> {
        let options = self.options();
        let deprecated = operation
            .get("deprecated")
            .and_then(JsonValue::as_bool)
            .unwrap_or(false);
        if deprecated && !options.include_deprecated {
            debug!(%path, %method, "Skipping deprecated operation");
            return None;
        }

        let tags = string_list(operation.get("tags"));
        if !options.filter_tags.is_empty() && !tags.iter().any(|t| options.filter_tags.contains(t))
        {
            debug!(%path, %method, "Skipping operation outside tag filter");
            return None;
        }

        // Path-level first, operation-level appended; duplicates are kept.
        let mut raw_parameters = self.raw_parameters(path_item.get("parameters"));
        raw_parameters.extend(self.raw_parameters(operation.get("parameters")));
        let (parameters, request_body) = self.extract_inputs(operation, raw_parameters);

        let responses = self.parse_responses(operation);

        Some(NormalizedEndpoint {
            path: path.to_string(),
            method,
            operation_id: optional_string(operation.get("operationId")),
            summary: optional_string(operation.get("summary")),
            description: optional_string(operation.get("description")),
            tags,
            parameters,
            request_body,
            responses,
            deprecated,
            authentication: has_security(operation.get("security")) || global_security,
        })
    }

    /// Parameter objects with parameter-level `$ref`s resolved
    fn raw_parameters(&self, value: Option<&JsonValue>) -> Vec<JsonValue> {
        let Some(list) = value.and_then(JsonValue::as_array) else {
            return Vec::new();
        };
        list.iter()
            .filter_map(|param| match param.get("$ref").and_then(JsonValue::as_str) {
                Some(ref_str) => {
                    let resolved = self.document().resolve_ref(ref_str).cloned();
                    if resolved.is_none() {
                        debug!(%ref_str, "Dropping unresolvable parameter reference");
                    }
                    resolved
                }
                None => Some(param.clone()),
            })
            .collect()
    }

    /// Responses in declaration order.
    ///
    /// A `$ref` response is dropped when dereferencing is off, or when it
    /// cannot be resolved.
    fn parse_responses(&self, operation: &Map<String, JsonValue>) -> Vec<NormalizedResponse> {
        let Some(responses) = operation.get("responses").and_then(JsonValue::as_object) else {
            return Vec::new();
        };
        let dereference = self.options().dereference;

        responses
            .iter()
            .filter_map(|(status, response)| {
                let response = match response.get("$ref").and_then(JsonValue::as_str) {
                    Some(_) if !dereference => return None,
                    Some(ref_str) => self.document().resolve_ref(ref_str)?,
                    None => response,
                };
                Some(self.parse_response(status, operation, response))
            })
            .collect()
    }

    /// Resolve or keep a schema according to the `dereference` option
    fn prepare_schema(&self, schema: &JsonValue) -> JsonValue {
        if self.options().dereference {
            self.document().dereference(schema)
        } else {
            schema.clone()
        }
    }

    /// Tag names: document declarations first, then operation tags
    fn tags(&self) -> Vec<String> {
        let doc = self.document();
        let mut seen = HashSet::new();
        let mut tags = Vec::new();

        let operation_tags = doc.paths().into_iter().flat_map(|paths| {
            paths.values().flat_map(|item| {
                HttpMethod::all()
                    .iter()
                    .filter_map(move |m| item.get(m.key()))
                    .flat_map(|op| string_list(op.get("tags")))
            })
        });

        for tag in doc.declared_tags().into_iter().chain(operation_tags) {
            if seen.insert(tag.clone()) {
                tags.push(tag);
            }
        }
        tags
    }

    /// Counts over the normalized endpoints
    fn stats(&self) -> Result<SpecStats> {
        let spec = self.parse()?;
        let mut by_method = BTreeMap::new();
        let mut by_tag = BTreeMap::new();
        for endpoint in &spec.endpoints {
            *by_method.entry(endpoint.method.to_string()).or_insert(0) += 1;
            for tag in &endpoint.tags {
                *by_tag.entry(tag.clone()).or_insert(0) += 1;
            }
        }

        Ok(SpecStats {
            total_endpoints: spec.endpoints.len(),
            by_method,
            by_tag,
            deprecated: spec.endpoints.iter().filter(|e| e.deprecated).count(),
            authenticated: spec.endpoints.iter().filter(|e| e.authentication).count(),
            schemas: spec.schemas.len(),
        })
    }
}

/// Map a schema to the type string used by generated code.
///
/// Arrays become `<item>[]`; an unresolved `$ref` becomes the referenced name;
/// a schema without a usable type falls back to `object` when it has
/// structure and `string` otherwise.
pub fn schema_type_name(schema: &JsonValue) -> String {
    if let Some(ref_str) = schema.get("$ref").and_then(JsonValue::as_str) {
        return ref_name(ref_str).to_string();
    }

    let declared = match schema.get("type") {
        Some(JsonValue::String(t)) => Some(t.as_str()),
        // 3.1 allows ["string", "null"]
        Some(JsonValue::Array(types)) => types
            .iter()
            .filter_map(JsonValue::as_str)
            .find(|t| *t != "null"),
        _ => None,
    };

    match declared {
        Some("array") => {
            let item = schema
                .get("items")
                .map(schema_type_name)
                .unwrap_or_else(|| "string".to_string());
            format!("{item}[]")
        }
        Some(t) => t.to_string(),
        None if schema.get("properties").is_some()
            || schema.get("allOf").is_some()
            || schema.get("oneOf").is_some()
            || schema.get("anyOf").is_some() =>
        {
            "object".to_string()
        }
        None => "string".to_string(),
    }
}

/// Pick the preferred media type: the first containing `json`, else the first declared
pub fn pick_content_type(content: &Map<String, JsonValue>) -> Option<(&String, &JsonValue)> {
    content
        .iter()
        .find(|(media_type, _)| media_type.contains("json"))
        .or_else(|| content.iter().next())
}

/// Same preference applied to a plain list of media types
pub fn pick_media_type(types: &[String]) -> Option<&String> {
    types
        .iter()
        .find(|t| t.contains("json"))
        .or_else(|| types.first())
}

pub(crate) fn optional_string(value: Option<&JsonValue>) -> Option<String> {
    value.and_then(JsonValue::as_str).map(String::from)
}

pub(crate) fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(JsonValue::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(JsonValue::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
