//! Service definition validation.
//!
//! Errors block generation; warnings are reported but never do.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use super::types::{ServiceDefinition, ServiceType};

static SEMVER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+\.\d+\.\d+(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?$")
        .expect("valid semver regex")
});

/// Stable machine-readable issue codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    MissingRequiredField,
    InvalidName,
    InvalidServiceType,
    IdMismatch,
    InvalidVersionFormat,
    MissingBaseUrl,
    NoEndpoints,
    MissingEndpointField,
    MissingProtoPath,
    MissingServiceName,
    MissingGraphqlEndpoint,
    MissingDataSource,
    MissingDependencyField,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingRequiredField => "MISSING_REQUIRED_FIELD",
            IssueCode::InvalidName => "INVALID_NAME",
            IssueCode::InvalidServiceType => "INVALID_SERVICE_TYPE",
            IssueCode::IdMismatch => "ID_MISMATCH",
            IssueCode::InvalidVersionFormat => "INVALID_VERSION_FORMAT",
            IssueCode::MissingBaseUrl => "MISSING_BASE_URL",
            IssueCode::NoEndpoints => "NO_ENDPOINTS",
            IssueCode::MissingEndpointField => "MISSING_ENDPOINT_FIELD",
            IssueCode::MissingProtoPath => "MISSING_PROTO_PATH",
            IssueCode::MissingServiceName => "MISSING_SERVICE_NAME",
            IssueCode::MissingGraphqlEndpoint => "MISSING_GRAPHQL_ENDPOINT",
            IssueCode::MissingDataSource => "MISSING_DATA_SOURCE",
            IssueCode::MissingDependencyField => "MISSING_DEPENDENCY_FIELD",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding, located by a dotted path into the definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
    pub code: IssueCode,
}

impl ValidationIssue {
    fn new(path: impl Into<String>, message: impl Into<String>, code: IssueCode) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            code,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.path, self.message, self.code)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// All errors on one line, for folding into a failed result
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|issue| issue.code == code)
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// The name becomes an output file stem, so it must stay a single path component
fn is_safe_file_stem(name: &str) -> bool {
    !name.contains(['/', '\\', '\0']) && name != "." && name != ".."
}

/// Validate a service definition
pub fn validate_definition(definition: &ServiceDefinition) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let required = [
        ("id", &definition.id),
        ("name", &definition.name),
        ("nameSpace", &definition.name_space),
        ("version", &definition.version),
        ("serviceType", &definition.service_type_name),
    ];
    for (field, value) in required {
        if is_blank(value) {
            errors.push(ValidationIssue::new(
                field,
                format!("Required field '{field}' is missing"),
                IssueCode::MissingRequiredField,
            ));
        }
    }

    if !is_blank(&definition.name) && !is_safe_file_stem(&definition.name) {
        errors.push(ValidationIssue::new(
            "name",
            format!(
                "Service name '{}' must not contain path separators or be '.' or '..'",
                definition.name
            ),
            IssueCode::InvalidName,
        ));
    }

    let service_type = definition.service_type();
    if service_type.is_none() && !is_blank(&definition.service_type_name) {
        errors.push(ValidationIssue::new(
            "serviceType",
            format!(
                "Invalid service type '{}', expected one of rest, grpc, graphql, sql, hybrid",
                definition.service_type_name
            ),
            IssueCode::InvalidServiceType,
        ));
    }

    if !is_blank(&definition.id)
        && !is_blank(&definition.name)
        && !is_blank(&definition.name_space)
        && !is_blank(&definition.version)
    {
        let expected = definition.expected_id();
        if definition.id != expected {
            warnings.push(ValidationIssue::new(
                "id",
                format!("Service id '{}' does not match expected '{expected}'", definition.id),
                IssueCode::IdMismatch,
            ));
        }
    }

    if !is_blank(&definition.version) && !SEMVER_RE.is_match(&definition.version) {
        warnings.push(ValidationIssue::new(
            "version",
            format!("Version '{}' is not in semver format", definition.version),
            IssueCode::InvalidVersionFormat,
        ));
    }

    match service_type {
        Some(ServiceType::Rest) => validate_rest(definition, &mut errors, &mut warnings),
        Some(ServiceType::Grpc) => validate_grpc(definition, &mut errors),
        Some(ServiceType::Graphql) => validate_graphql(definition, &mut errors),
        Some(ServiceType::Sql) => validate_sql(definition, &mut errors),
        Some(ServiceType::Hybrid) => {
            validate_rest(definition, &mut errors, &mut warnings);
            validate_grpc(definition, &mut errors);
        }
        None => {}
    }

    for (index, dependency) in definition.dependencies.iter().enumerate() {
        for (field, value) in [("id", &dependency.id), ("alias", &dependency.alias)] {
            if is_blank(value) {
                errors.push(ValidationIssue::new(
                    format!("dependencies[{index}].{field}"),
                    format!("Dependency field '{field}' is missing"),
                    IssueCode::MissingDependencyField,
                ));
            }
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

fn validate_rest(
    definition: &ServiceDefinition,
    errors: &mut Vec<ValidationIssue>,
    warnings: &mut Vec<ValidationIssue>,
) {
    let rest = definition.rest();
    if rest.is_none_or(|r| is_blank(&r.base_url)) {
        errors.push(ValidationIssue::new(
            "spec.rest.baseUrl",
            "REST services require a base URL",
            IssueCode::MissingBaseUrl,
        ));
    }

    let endpoints = rest.map(|r| r.endpoints.as_slice()).unwrap_or_default();
    if endpoints.is_empty() {
        warnings.push(ValidationIssue::new(
            "spec.rest.endpoints",
            "No REST endpoints defined",
            IssueCode::NoEndpoints,
        ));
    }

    for (index, endpoint) in endpoints.iter().enumerate() {
        let fields = [
            ("path", &endpoint.path),
            ("method", &endpoint.method),
            ("handler", &endpoint.handler),
        ];
        for (field, value) in fields {
            if is_blank(value) {
                errors.push(ValidationIssue::new(
                    format!("spec.rest.endpoints[{index}].{field}"),
                    format!("Endpoint field '{field}' is missing"),
                    IssueCode::MissingEndpointField,
                ));
            }
        }
    }
}

fn validate_grpc(definition: &ServiceDefinition, errors: &mut Vec<ValidationIssue>) {
    let grpc = definition.grpc();
    if grpc.is_none_or(|g| is_blank(&g.proto_path)) {
        errors.push(ValidationIssue::new(
            "spec.grpc.protoPath",
            "gRPC services require a proto path",
            IssueCode::MissingProtoPath,
        ));
    }
    if grpc.is_none_or(|g| is_blank(&g.service_name)) {
        errors.push(ValidationIssue::new(
            "spec.grpc.serviceName",
            "gRPC services require a service name",
            IssueCode::MissingServiceName,
        ));
    }
}

fn validate_graphql(definition: &ServiceDefinition, errors: &mut Vec<ValidationIssue>) {
    let endpoint = definition
        .spec
        .as_ref()
        .and_then(|s| s.graphql.as_ref())
        .map(|g| g.endpoint.as_str());
    if endpoint.is_none_or(is_blank) {
        errors.push(ValidationIssue::new(
            "spec.graphql.endpoint",
            "GraphQL services require an endpoint",
            IssueCode::MissingGraphqlEndpoint,
        ));
    }
}

fn validate_sql(definition: &ServiceDefinition, errors: &mut Vec<ValidationIssue>) {
    let data_source = definition
        .spec
        .as_ref()
        .and_then(|s| s.sql.as_ref())
        .map(|s| s.data_source.as_str());
    if data_source.is_none_or(is_blank) {
        errors.push(ValidationIssue::new(
            "spec.sql.dataSource",
            "SQL services require a data source",
            IssueCode::MissingDataSource,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::types::{
        GrpcSpec, RestEndpoint, RestSpec, ServiceDependency, ServiceSpec,
    };

    fn rest_definition() -> ServiceDefinition {
        ServiceDefinition {
            id: "shop.orders@1.0.0".to_string(),
            name: "orders".to_string(),
            name_space: "shop".to_string(),
            version: "1.0.0".to_string(),
            service_type_name: "rest".to_string(),
            spec: Some(ServiceSpec {
                rest: Some(RestSpec {
                    base_url: "https://api.shop.test".to_string(),
                    endpoints: vec![RestEndpoint {
                        path: "/orders".to_string(),
                        method: "GET".to_string(),
                        handler: "listOrders".to_string(),
                        ..Default::default()
                    }],
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_definition() {
        let report = validate_definition(&rest_definition());
        assert!(report.valid);
        assert!(report.errors.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_one_error_per_missing_required_field() {
        let report = validate_definition(&ServiceDefinition::default());
        let missing: Vec<_> = report
            .errors
            .iter()
            .filter(|e| e.code == IssueCode::MissingRequiredField)
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(missing, vec!["id", "name", "nameSpace", "version", "serviceType"]);
        assert_eq!(report.errors.len(), 5);
        assert!(!report.valid);

        let mut def = rest_definition();
        def.name_space = String::new();
        let report = validate_definition(&def);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "nameSpace");
    }

    #[test]
    fn test_empty_base_url_is_an_error() {
        let mut def = rest_definition();
        def.spec.as_mut().unwrap().rest.as_mut().unwrap().base_url = String::new();
        let report = validate_definition(&def);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.code == IssueCode::MissingBaseUrl));
    }

    #[test]
    fn test_warnings_do_not_block() {
        let mut def = rest_definition();
        def.id = "something-else".to_string();
        def.version = "v1".to_string();
        def.spec.as_mut().unwrap().rest.as_mut().unwrap().endpoints.clear();

        let report = validate_definition(&def);
        assert!(report.valid);
        let codes: Vec<_> = report.warnings.iter().map(|w| w.code).collect();
        assert_eq!(
            codes,
            vec![IssueCode::IdMismatch, IssueCode::InvalidVersionFormat, IssueCode::NoEndpoints]
        );
    }

    #[test]
    fn test_name_must_be_a_single_path_component() {
        for name in ["../escape", "nested/orders", "win\\orders", ".."] {
            let mut def = rest_definition();
            def.name = name.to_string();
            let report = validate_definition(&def);
            assert!(!report.valid, "{name}");
            assert_eq!(report.errors[0].code, IssueCode::InvalidName);
            assert_eq!(report.errors[0].path, "name");
        }

        let mut def = rest_definition();
        def.name = "orders..v2".to_string();
        assert!(!validate_definition(&def).has_code(IssueCode::InvalidName));
    }

    #[test]
    fn test_invalid_service_type() {
        let mut def = rest_definition();
        def.service_type_name = "soap".to_string();
        let report = validate_definition(&def);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].code, IssueCode::InvalidServiceType);
    }

    #[test]
    fn test_endpoint_and_dependency_fields() {
        let mut def = rest_definition();
        def.spec.as_mut().unwrap().rest.as_mut().unwrap().endpoints.push(RestEndpoint::default());
        def.dependencies.push(ServiceDependency {
            id: "shop.users@1.0.0".to_string(),
            ..Default::default()
        });

        let report = validate_definition(&def);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "spec.rest.endpoints[1].path",
                "spec.rest.endpoints[1].method",
                "spec.rest.endpoints[1].handler",
                "dependencies[0].alias",
            ]
        );
    }

    #[test]
    fn test_grpc_and_hybrid_checks() {
        let mut def = rest_definition();
        def.service_type_name = "grpc".to_string();
        let report = validate_definition(&def);
        assert!(report.has_code(IssueCode::MissingProtoPath));
        assert!(report.has_code(IssueCode::MissingServiceName));
        assert!(!report.has_code(IssueCode::MissingBaseUrl));

        def.service_type_name = "hybrid".to_string();
        def.spec.as_mut().unwrap().rest = None;
        def.spec.as_mut().unwrap().grpc = Some(GrpcSpec {
            proto_path: "orders.proto".to_string(),
            service_name: "Orders".to_string(),
        });
        let report = validate_definition(&def);
        assert!(report.has_code(IssueCode::MissingBaseUrl));
        assert!(!report.has_code(IssueCode::MissingProtoPath));
    }

    #[test]
    fn test_graphql_and_sql_checks() {
        let mut def = rest_definition();
        def.service_type_name = "graphql".to_string();
        assert!(validate_definition(&def).has_code(IssueCode::MissingGraphqlEndpoint));

        def.service_type_name = "sql".to_string();
        let report = validate_definition(&def);
        assert!(report.has_code(IssueCode::MissingDataSource));
        assert!(report.error_summary().contains("MISSING_DATA_SOURCE"));
    }
}
