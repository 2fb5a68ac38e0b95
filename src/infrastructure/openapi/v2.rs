//! Format-2 (`swagger: "2.0"`) normalizer
//!
//! Format-2 has no request-body object. A parameter located `in: body` is
//! lifted out of the parameter list and becomes the request body; `formData`
//! parameters are folded into a form body when no `body` parameter exists.

use serde_json::{Map, Value as JsonValue, json};
use tracing::debug;

use super::normalizer::{
    SpecNormalizer, optional_string, pick_media_type, schema_type_name, string_list,
};
use super::parser::SpecDocument;
use super::types::{
    NormalizedParameter, NormalizedRequestBody, NormalizedResponse, ParameterLocation,
    SpecOptions, SpecVersion,
};

const DEFAULT_CONSUMES: &str = "application/json";
const DEFAULT_FORM_CONSUMES: &str = "application/x-www-form-urlencoded";

/// Normalizes format-2 documents
pub struct Swagger2Normalizer {
    document: SpecDocument,
    options: SpecOptions,
}

impl Swagger2Normalizer {
    pub fn new(document: SpecDocument, options: SpecOptions) -> Self {
        Self { document, options }
    }

    /// Media types accepted by an operation, falling back to the document list
    fn consumes(&self, operation: &Map<String, JsonValue>) -> Vec<String> {
        let own = string_list(operation.get("consumes"));
        if own.is_empty() {
            string_list(self.document.json.get("consumes"))
        } else {
            own
        }
    }

    /// Media types produced by an operation, falling back to the document list
    fn produces(&self, operation: &Map<String, JsonValue>) -> Vec<String> {
        let own = string_list(operation.get("produces"));
        if own.is_empty() {
            string_list(self.document.json.get("produces"))
        } else {
            own
        }
    }

    fn parse_parameter(
        &self,
        param: &JsonValue,
        location: ParameterLocation,
    ) -> Option<NormalizedParameter> {
        let name = param.get("name").and_then(JsonValue::as_str)?;

        // Non-body parameters carry their type inline; `schema` only shows up
        // in hand-written documents that mix families.
        let (param_type, schema) = match param.get("schema") {
            Some(schema) => {
                let schema = self.prepare_schema(schema);
                (schema_type_name(&schema), Some(schema))
            }
            None => (schema_type_name(param), None),
        };

        Some(NormalizedParameter {
            name: name.to_string(),
            location,
            param_type,
            required: param
                .get("required")
                .and_then(JsonValue::as_bool)
                .unwrap_or(location == ParameterLocation::Path),
            default: param.get("default").cloned(),
            enum_values: param.get("enum").and_then(JsonValue::as_array).cloned(),
            description: optional_string(param.get("description")),
            schema,
        })
    }

    fn body_from_parameter(
        &self,
        param: &JsonValue,
        operation: &Map<String, JsonValue>,
    ) -> NormalizedRequestBody {
        let consumes = self.consumes(operation);
        NormalizedRequestBody {
            required: param
                .get("required")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            content_type: pick_media_type(&consumes)
                .cloned()
                .unwrap_or_else(|| DEFAULT_CONSUMES.to_string()),
            schema: param.get("schema").map(|s| self.prepare_schema(s)),
            description: optional_string(param.get("description")),
        }
    }

    fn body_from_form(
        &self,
        fields: &[&JsonValue],
        operation: &Map<String, JsonValue>,
    ) -> NormalizedRequestBody {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in fields {
            let Some(name) = field.get("name").and_then(JsonValue::as_str) else {
                continue;
            };
            let mut property = Map::new();
            property.insert("type".into(), json!(schema_type_name(field)));
            if let Some(description) = field.get("description") {
                property.insert("description".into(), description.clone());
            }
            properties.insert(name.to_string(), JsonValue::Object(property));
            if field.get("required").and_then(JsonValue::as_bool) == Some(true) {
                required.push(json!(name));
            }
        }

        let consumes = self.consumes(operation);
        let content_type = consumes
            .iter()
            .find(|t| t.contains("form"))
            .cloned()
            .unwrap_or_else(|| DEFAULT_FORM_CONSUMES.to_string());

        NormalizedRequestBody {
            required: !required.is_empty(),
            content_type,
            schema: Some(json!({
                "type": "object",
                "properties": properties,
                "required": required,
            })),
            description: None,
        }
    }
}

impl SpecNormalizer for Swagger2Normalizer {
    fn document(&self) -> &SpecDocument {
        &self.document
    }

    fn options(&self) -> &SpecOptions {
        &self.options
    }

    fn version(&self) -> SpecVersion {
        SpecVersion::Swagger2
    }

    fn extract_inputs(
        &self,
        operation: &Map<String, JsonValue>,
        raw_parameters: Vec<JsonValue>,
    ) -> (Vec<NormalizedParameter>, Option<NormalizedRequestBody>) {
        let mut parameters = Vec::new();
        let mut body = None;
        let mut form_fields = Vec::new();

        for param in &raw_parameters {
            match param.get("in").and_then(JsonValue::as_str) {
                Some("body") => {
                    if body.is_none() {
                        body = Some(self.body_from_parameter(param, operation));
                    }
                }
                Some("formData") => form_fields.push(param),
                Some(other) => match ParameterLocation::parse(other) {
                    Some(location) => parameters.extend(self.parse_parameter(param, location)),
                    None => debug!(location = %other, "Skipping parameter with unrecognized location"),
                },
                None => debug!("Skipping parameter without location"),
            }
        }

        if body.is_none() && !form_fields.is_empty() {
            body = Some(self.body_from_form(&form_fields, operation));
        }

        (parameters, body)
    }

    fn parse_response(
        &self,
        status_code: &str,
        operation: &Map<String, JsonValue>,
        response: &JsonValue,
    ) -> NormalizedResponse {
        let schema = response.get("schema").map(|s| self.prepare_schema(s));
        let produces = self.produces(operation);
        let content_type = schema.as_ref().map(|_| {
            pick_media_type(&produces)
                .cloned()
                .unwrap_or_else(|| DEFAULT_CONSUMES.to_string())
        });

        NormalizedResponse {
            status_code: status_code.to_string(),
            description: optional_string(response.get("description")).unwrap_or_default(),
            content_type,
            schema,
        }
    }
}
