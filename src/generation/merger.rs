//! Conversion of normalized endpoints into generation-ready REST endpoints
//! and merging them with hand-authored ones.

use crate::definition::RestEndpoint;
use crate::infrastructure::openapi::{NormalizedEndpoint, ParameterLocation};

use super::sanitizers::{sanitize_operation_id, sanitize_segment};

/// Preferred response codes, in order
const PREFERRED_RESPONSES: &[&str] = &["200", "201"];

/// Synthesize a handler name from a path and method.
///
/// The lower-cased method is followed by each path segment capitalized;
/// `{param}` segments become `ByParam`.
///
/// # Examples
/// ```
/// use servicegen::generation::merger::generate_handler_name;
///
/// assert_eq!(generate_handler_name("/users/{id}/orders", "GET"), "getUsersByIdOrders");
/// assert_eq!(
///     generate_handler_name("/users/{id}/orders/{orderId}", "post"),
///     "postUsersByIdOrdersByOrderId"
/// );
/// ```
pub fn generate_handler_name(path: &str, method: &str) -> String {
    let mut name = method.to_lowercase();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        match segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            Some(param) => {
                name.push_str("By");
                name.push_str(&sanitize_segment(param));
            }
            None => name.push_str(&sanitize_segment(segment)),
        }
    }
    name
}

/// Convert one normalized endpoint
pub fn convert_to_rest_endpoint(endpoint: &NormalizedEndpoint) -> RestEndpoint {
    let method = endpoint.method.to_string();
    let handler = endpoint
        .operation_id
        .as_deref()
        .map(sanitize_operation_id)
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| generate_handler_name(&endpoint.path, &method));

    let by_location = |location: ParameterLocation| {
        endpoint
            .parameters
            .iter()
            .filter(|p| p.location == location)
            .cloned()
            .collect::<Vec<_>>()
    };

    let response = PREFERRED_RESPONSES
        .iter()
        .find_map(|code| endpoint.response(code))
        .or_else(|| endpoint.responses.first())
        .cloned();

    RestEndpoint {
        path: endpoint.path.clone(),
        method,
        handler,
        params: by_location(ParameterLocation::Path),
        query: by_location(ParameterLocation::Query),
        headers: by_location(ParameterLocation::Header),
        body: endpoint.request_body.clone(),
        response,
        authentication: Some(endpoint.authentication),
        deprecated: Some(endpoint.deprecated),
        tags: endpoint.tags.clone(),
    }
}

/// Result of [`merge_endpoints`]
#[derive(Debug, Clone, PartialEq)]
pub struct MergedEndpoints {
    pub endpoints: Vec<RestEndpoint>,
    pub warning: Option<String>,
}

/// Spec-derived endpoints first, hand-authored ones appended.
///
/// No deduplication by path and method is done.
pub fn merge_endpoints(from_spec: Vec<RestEndpoint>, manual: &[RestEndpoint]) -> MergedEndpoints {
    let warning = (!manual.is_empty()).then(|| {
        format!(
            "Merged {} manually defined endpoint(s) after {} specification endpoint(s)",
            manual.len(),
            from_spec.len()
        )
    });

    let mut endpoints = from_spec;
    endpoints.extend(manual.iter().cloned());
    MergedEndpoints { endpoints, warning }
}
