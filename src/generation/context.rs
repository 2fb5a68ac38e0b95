//! Template data - the values every service template is rendered with

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};

use crate::core::error::Result;
use crate::core::utils::to_pascal_case;
use crate::definition::ServiceDefinition;
use crate::infrastructure::openapi::NormalizedSpec;

use super::sanitizers::sanitize_doc;

/// Summary of a merged API specification, exposed as `specInfo`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecSummary {
    pub title: String,
    pub version: String,
    pub spec_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub endpoint_count: usize,
    pub schema_names: Vec<String>,
}

impl SpecSummary {
    pub fn from_spec(spec: &NormalizedSpec) -> Self {
        Self {
            title: spec.info.title.clone(),
            version: spec.info.version.clone(),
            spec_version: spec.version.to_string(),
            base_url: spec.base_url.clone(),
            endpoint_count: spec.endpoints.len(),
            schema_names: spec.schemas.keys().cloned().collect(),
        }
    }
}

/// Render data for one service
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    data: Map<String, JsonValue>,
}

impl TemplateData {
    /// Build the standard data set for a definition
    pub fn for_definition(
        definition: &ServiceDefinition,
        spec_summary: Option<&SpecSummary>,
    ) -> Result<Self> {
        let mut data = Self::default();
        let rest = definition.rest();
        let spec = definition.spec.as_ref();

        data.add_variable("definition", serde_json::to_value(definition)?);
        data.add_variable("serviceName", json!(definition.name));
        data.add_variable("className", json!(to_pascal_case(&definition.name)));
        data.add_variable("serviceType", json!(definition.service_type_name));
        data.add_variable(
            "description",
            json!(definition.description.as_deref().map(sanitize_doc)),
        );
        data.add_variable(
            "endpoints",
            serde_json::to_value(rest.map(|r| r.endpoints.as_slice()).unwrap_or_default())?,
        );
        data.add_variable("baseUrl", json!(rest.map(|r| r.base_url.as_str())));
        data.add_variable("dependencies", serde_json::to_value(&definition.dependencies)?);
        data.add_variable("grpc", serde_json::to_value(spec.and_then(|s| s.grpc.as_ref()))?);
        data.add_variable("graphql", serde_json::to_value(spec.and_then(|s| s.graphql.as_ref()))?);
        data.add_variable("sql", serde_json::to_value(spec.and_then(|s| s.sql.as_ref()))?);

        for (key, block) in [
            ("authentication", &definition.authentication),
            ("caching", &definition.caching),
            ("retry", &definition.retry),
            ("rateLimit", &definition.rate_limit),
            ("timeout", &definition.timeout),
        ] {
            data.add_variable(key, block.clone().unwrap_or(JsonValue::Null));
        }

        data.add_variable("specInfo", serde_json::to_value(spec_summary)?);
        data.add_variable("generatedAt", json!(Utc::now().to_rfc3339()));
        data.add_variable(
            "generator",
            json!({"name": env!("CARGO_PKG_NAME"), "version": env!("CARGO_PKG_VERSION")}),
        );
        Ok(data)
    }

    pub fn add_variable(&mut self, key: &str, value: JsonValue) {
        self.data.insert(key.to_string(), value);
    }

    pub fn has_variable(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    /// Merge caller-supplied values over the standard ones
    pub fn extend(&mut self, overrides: &Map<String, JsonValue>) {
        for (key, value) in overrides {
            self.data.insert(key.clone(), value.clone());
        }
    }

    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{RestEndpoint, RestSpec, ServiceSpec};

    fn definition() -> ServiceDefinition {
        ServiceDefinition {
            id: "shop.order-items@1.0.0".to_string(),
            name: "order-items".to_string(),
            name_space: "shop".to_string(),
            version: "1.0.0".to_string(),
            description: Some("Line  items\nfor orders".to_string()),
            service_type_name: "rest".to_string(),
            spec: Some(ServiceSpec {
                rest: Some(RestSpec {
                    base_url: "https://api.test".to_string(),
                    endpoints: vec![RestEndpoint {
                        path: "/items".to_string(),
                        method: "GET".to_string(),
                        handler: "listItems".to_string(),
                        ..Default::default()
                    }],
                }),
                ..Default::default()
            }),
            retry: Some(json!({"attempts": 2})),
            ..Default::default()
        }
    }

    #[test]
    fn test_standard_keys() {
        let data = TemplateData::for_definition(&definition(), None).unwrap();

        assert_eq!(data.get("className"), Some(&json!("OrderItems")));
        assert_eq!(data.get("baseUrl"), Some(&json!("https://api.test")));
        assert_eq!(data.get("description"), Some(&json!("Line items for orders")));
        assert_eq!(data.get("endpoints").unwrap()[0]["handler"], "listItems");
        assert_eq!(data.get("retry"), Some(&json!({"attempts": 2})));
        assert_eq!(data.get("caching"), Some(&JsonValue::Null));
        assert_eq!(data.get("specInfo"), Some(&JsonValue::Null));
        assert_eq!(data.get("generator").unwrap()["name"], "servicegen");
        assert!(data.has_variable("generatedAt"));
        assert_eq!(data.get("definition").unwrap()["nameSpace"], "shop");
    }

    #[test]
    fn test_overrides_win() {
        let mut data = TemplateData::for_definition(&definition(), None).unwrap();
        let mut overrides = Map::new();
        overrides.insert("className".to_string(), json!("Custom"));
        overrides.insert("extra".to_string(), json!(true));
        data.extend(&overrides);

        let value = data.into_value();
        assert_eq!(value["className"], "Custom");
        assert_eq!(value["extra"], true);
    }
}
