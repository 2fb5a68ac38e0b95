//! Format-3 (`openapi: 3.0.x` / `3.1.x`) normalizer

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use super::normalizer::{SpecNormalizer, optional_string, pick_content_type, schema_type_name};
use super::parser::SpecDocument;
use super::types::{
    NormalizedParameter, NormalizedRequestBody, NormalizedResponse, ParameterLocation,
    SpecOptions, SpecVersion,
};

/// Normalizes format-3 documents
pub struct OpenApi3Normalizer {
    document: SpecDocument,
    options: SpecOptions,
}

impl OpenApi3Normalizer {
    pub fn new(document: SpecDocument, options: SpecOptions) -> Self {
        Self { document, options }
    }

    fn parse_parameter(&self, param: &JsonValue) -> Option<NormalizedParameter> {
        let name = param.get("name").and_then(JsonValue::as_str)?;
        let Some(location) = param
            .get("in")
            .and_then(JsonValue::as_str)
            .and_then(ParameterLocation::parse)
        else {
            debug!(%name, "Skipping parameter with unrecognized location");
            return None;
        };

        let raw_schema = param.get("schema").cloned().unwrap_or(JsonValue::Null);
        let schema = self.prepare_schema(&raw_schema);
        let param_type = if schema.is_null() {
            "string".to_string()
        } else {
            schema_type_name(&schema)
        };

        Some(NormalizedParameter {
            name: name.to_string(),
            location,
            param_type,
            required: param
                .get("required")
                .and_then(JsonValue::as_bool)
                .unwrap_or(location == ParameterLocation::Path),
            default: schema.get("default").cloned(),
            enum_values: schema.get("enum").and_then(JsonValue::as_array).cloned(),
            description: optional_string(param.get("description")),
            schema: (!schema.is_null()).then_some(schema),
        })
    }

    fn parse_request_body(&self, body: &JsonValue) -> Option<NormalizedRequestBody> {
        let body = match body.get("$ref").and_then(JsonValue::as_str) {
            Some(ref_str) if self.options.dereference => self.document.resolve_ref(ref_str)?,
            Some(_) => {
                // Placeholder keeps the reference visible to templates
                return Some(NormalizedRequestBody {
                    required: false,
                    content_type: "application/json".to_string(),
                    schema: Some(body.clone()),
                    description: None,
                });
            }
            None => body,
        };

        let (content_type, schema) = body
            .get("content")
            .and_then(JsonValue::as_object)
            .and_then(pick_content_type)
            .map(|(media_type, media)| {
                (
                    media_type.clone(),
                    media.get("schema").map(|s| self.prepare_schema(s)),
                )
            })
            .unwrap_or_else(|| ("application/json".to_string(), None));

        Some(NormalizedRequestBody {
            required: body
                .get("required")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            content_type,
            schema,
            description: optional_string(body.get("description")),
        })
    }
}

impl SpecNormalizer for OpenApi3Normalizer {
    fn document(&self) -> &SpecDocument {
        &self.document
    }

    fn options(&self) -> &SpecOptions {
        &self.options
    }

    fn version(&self) -> SpecVersion {
        SpecVersion::OpenApi3
    }

    fn extract_inputs(
        &self,
        operation: &Map<String, JsonValue>,
        raw_parameters: Vec<JsonValue>,
    ) -> (Vec<NormalizedParameter>, Option<NormalizedRequestBody>) {
        let parameters = raw_parameters
            .iter()
            .filter_map(|p| self.parse_parameter(p))
            .collect();
        let request_body = operation
            .get("requestBody")
            .and_then(|b| self.parse_request_body(b));
        (parameters, request_body)
    }

    fn parse_response(
        &self,
        status_code: &str,
        _operation: &Map<String, JsonValue>,
        response: &JsonValue,
    ) -> NormalizedResponse {
        let picked = response
            .get("content")
            .and_then(JsonValue::as_object)
            .and_then(pick_content_type);

        NormalizedResponse {
            status_code: status_code.to_string(),
            description: optional_string(response.get("description")).unwrap_or_default(),
            content_type: picked.map(|(media_type, _)| media_type.clone()),
            schema: picked
                .and_then(|(_, media)| media.get("schema"))
                .map(|s| self.prepare_schema(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::openapi::types::HttpMethod;
    use serde_json::json;

    fn normalizer(spec: JsonValue, options: SpecOptions) -> OpenApi3Normalizer {
        OpenApi3Normalizer::new(SpecDocument::new(spec), options)
    }

    fn sample_spec() -> JsonValue {
        json!({
            "openapi": "3.0.0",
            "info": {"title": "Shop", "version": "2.1.0"},
            "servers": [{"url": "https://shop.example.com/api"}],
            "security": [],
            "paths": {
                "/orders/{orderId}": {
                    "parameters": [
                        {"name": "orderId", "in": "path", "required": true, "schema": {"type": "string"}},
                        {"$ref": "#/components/parameters/Trace"}
                    ],
                    "get": {
                        "operationId": "getOrder",
                        "tags": ["orders"],
                        "parameters": [
                            {"name": "orderId", "in": "path", "required": true, "schema": {"type": "string"}},
                            {"name": "expand", "in": "query", "schema": {"type": "array", "items": {"type": "string"}}},
                            {"name": "status", "in": "query", "schema": {"$ref": "#/components/schemas/Status"}}
                        ],
                        "responses": {
                            "200": {
                                "description": "The order",
                                "content": {
                                    "application/xml": {"schema": {"type": "string"}},
                                    "application/json": {"schema": {"$ref": "#/components/schemas/Order"}}
                                }
                            },
                            "404": {"$ref": "#/components/responses/NotFound"}
                        }
                    },
                    "put": {
                        "tags": ["orders", "admin"],
                        "security": [{"bearer": []}],
                        "requestBody": {
                            "required": true,
                            "content": {"application/json": {"schema": {"$ref": "#/components/schemas/Order"}}}
                        },
                        "responses": {"204": {"description": "updated"}}
                    },
                    "delete": {
                        "deprecated": true,
                        "tags": ["admin"],
                        "responses": {"204": {"description": "gone"}}
                    }
                }
            },
            "components": {
                "schemas": {
                    "Order": {"type": "object", "properties": {"status": {"$ref": "#/components/schemas/Status"}}},
                    "Status": {"type": "string", "enum": ["open", "closed"], "default": "open"}
                },
                "parameters": {
                    "Trace": {"name": "X-Trace-Id", "in": "header", "schema": {"type": "string"}}
                },
                "responses": {
                    "NotFound": {"description": "missing", "content": {"application/json": {"schema": {"type": "object"}}}}
                },
                "requestBodies": {
                    "OrderBody": {"content": {"text/plain": {"schema": {"type": "string"}}}}
                }
            }
        })
    }

    #[test]
    fn test_minimal_scenario_single_endpoint() {
        let spec = json!({
            "openapi": "3.0.0",
            "info": {"title": "T", "version": "1"},
            "paths": {"/users": {"get": {"operationId": "getUsers", "responses": {"200": {"description": "ok"}}}}}
        });
        let parsed = normalizer(spec, SpecOptions::default()).parse().unwrap();

        assert_eq!(parsed.endpoints.len(), 1);
        let endpoint = &parsed.endpoints[0];
        assert_eq!(endpoint.path, "/users");
        assert_eq!(endpoint.method, HttpMethod::Get);
        assert_eq!(endpoint.method.to_string(), "GET");
        assert_eq!(endpoint.operation_id.as_deref(), Some("getUsers"));
        assert_eq!(parsed.version, SpecVersion::OpenApi3);
        assert!(parsed.base_url.is_none());
    }

    #[test]
    fn test_endpoint_order_follows_document() {
        let parsed = normalizer(sample_spec(), SpecOptions::default()).parse().unwrap();
        let methods: Vec<_> = parsed.endpoints.iter().map(|e| e.method).collect();
        assert_eq!(methods, vec![HttpMethod::Get, HttpMethod::Put, HttpMethod::Delete]);
    }

    #[test]
    fn test_parameters_concatenate_without_dedup() {
        let parsed = normalizer(sample_spec(), SpecOptions::default()).parse().unwrap();
        let get = &parsed.endpoints[0];
        let names: Vec<_> = get.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["orderId", "X-Trace-Id", "orderId", "expand", "status"]);
        assert_eq!(get.parameters[1].location, ParameterLocation::Header);
        assert_eq!(get.parameters[3].param_type, "string[]");
    }

    #[test]
    fn test_parameter_ref_schema_dereferenced() {
        let parsed = normalizer(sample_spec(), SpecOptions::default()).parse().unwrap();
        let status = &parsed.endpoints[0].parameters[4];
        assert_eq!(status.param_type, "string");
        assert_eq!(status.enum_values.as_ref().unwrap().len(), 2);
        assert_eq!(status.default, Some(json!("open")));
    }

    #[test]
    fn test_parameter_ref_schema_placeholder_without_dereference() {
        let options = SpecOptions {
            dereference: false,
            ..Default::default()
        };
        let parsed = normalizer(sample_spec(), options).parse().unwrap();
        let status = &parsed.endpoints[0].parameters[4];
        assert_eq!(status.param_type, "Status");
        assert!(status.enum_values.is_none());
    }

    #[test]
    fn test_response_content_prefers_json_and_resolves_refs() {
        let parsed = normalizer(sample_spec(), SpecOptions::default()).parse().unwrap();
        let get = &parsed.endpoints[0];
        assert_eq!(get.responses.len(), 2);

        let ok = get.response("200").unwrap();
        assert_eq!(ok.content_type.as_deref(), Some("application/json"));
        let schema = ok.schema.as_ref().unwrap();
        assert_eq!(schema["properties"]["status"]["type"], json!("string"));

        let not_found = get.response("404").unwrap();
        assert_eq!(not_found.description, "missing");
    }

    #[test]
    fn test_ref_responses_dropped_without_dereference() {
        let options = SpecOptions {
            dereference: false,
            ..Default::default()
        };
        let parsed = normalizer(sample_spec(), options).parse().unwrap();
        let get = &parsed.endpoints[0];
        assert_eq!(get.responses.len(), 1);
        assert!(get.response("404").is_none());
        let ok = get.response("200").unwrap();
        assert_eq!(
            ok.schema,
            Some(json!({"$ref": "#/components/schemas/Order"}))
        );
    }

    #[test]
    fn test_request_body_and_authentication() {
        let parsed = normalizer(sample_spec(), SpecOptions::default()).parse().unwrap();
        let get = &parsed.endpoints[0];
        let put = &parsed.endpoints[1];

        assert!(get.request_body.is_none());
        assert!(!get.authentication);

        let body = put.request_body.as_ref().unwrap();
        assert!(body.required);
        assert_eq!(body.content_type, "application/json");
        assert_eq!(body.schema.as_ref().unwrap()["type"], json!("object"));
        assert!(put.authentication);
    }

    #[test]
    fn test_request_body_ref() {
        let mut spec = sample_spec();
        spec["paths"]["/orders/{orderId}"]["put"]["requestBody"] =
            json!({"$ref": "#/components/requestBodies/OrderBody"});

        let parsed = normalizer(spec.clone(), SpecOptions::default()).parse().unwrap();
        let body = parsed.endpoints[1].request_body.as_ref().unwrap();
        assert_eq!(body.content_type, "text/plain");

        let options = SpecOptions {
            dereference: false,
            ..Default::default()
        };
        let parsed = normalizer(spec, options).parse().unwrap();
        let body = parsed.endpoints[1].request_body.as_ref().unwrap();
        assert_eq!(
            body.schema,
            Some(json!({"$ref": "#/components/requestBodies/OrderBody"}))
        );
    }

    #[test]
    fn test_global_security_marks_all_endpoints() {
        let mut spec = sample_spec();
        spec["security"] = json!([{"bearer": []}]);
        let parsed = normalizer(spec, SpecOptions::default()).parse().unwrap();
        assert!(parsed.endpoints.iter().all(|e| e.authentication));
    }

    #[test]
    fn test_deprecated_filtering() {
        let options = SpecOptions {
            include_deprecated: false,
            ..Default::default()
        };
        let parsed = normalizer(sample_spec(), options).parse().unwrap();
        assert_eq!(parsed.endpoints.len(), 2);
        assert!(parsed.endpoints.iter().all(|e| !e.deprecated));

        let parsed = normalizer(sample_spec(), SpecOptions::default()).parse().unwrap();
        assert_eq!(parsed.endpoints.len(), 3);
        assert!(parsed.endpoints[2].deprecated);
    }

    #[test]
    fn test_tag_filtering() {
        let options = SpecOptions {
            filter_tags: vec!["admin".to_string()],
            ..Default::default()
        };
        let parsed = normalizer(sample_spec(), options).parse().unwrap();
        let methods: Vec<_> = parsed.endpoints.iter().map(|e| e.method).collect();
        assert_eq!(methods, vec![HttpMethod::Put, HttpMethod::Delete]);

        let options = SpecOptions {
            filter_tags: vec!["nothing".to_string()],
            ..Default::default()
        };
        assert!(normalizer(sample_spec(), options).parse().unwrap().endpoints.is_empty());
    }

    #[test]
    fn test_base_url_override() {
        let options = SpecOptions {
            base_url_override: Some("http://localhost:3000".to_string()),
            ..Default::default()
        };
        let parsed = normalizer(sample_spec(), options).parse().unwrap();
        assert_eq!(parsed.base_url.as_deref(), Some("http://localhost:3000"));

        let parsed = normalizer(sample_spec(), SpecOptions::default()).parse().unwrap();
        assert_eq!(parsed.base_url.as_deref(), Some("https://shop.example.com/api"));
        assert_eq!(parsed.schemas.len(), 2);
    }

    #[test]
    fn test_tags_and_stats() {
        let n = normalizer(sample_spec(), SpecOptions::default());
        assert_eq!(n.tags(), vec!["orders", "admin"]);

        let stats = n.stats().unwrap();
        assert_eq!(stats.total_endpoints, 3);
        assert_eq!(stats.by_method.get("GET"), Some(&1));
        assert_eq!(stats.by_tag.get("admin"), Some(&2));
        assert_eq!(stats.deprecated, 1);
        assert_eq!(stats.authenticated, 1);
        assert_eq!(stats.schemas, 2);
    }
}
