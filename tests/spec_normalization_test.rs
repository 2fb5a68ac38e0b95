//! Specification loading and normalization through the public factory

use serde_json::json;
use servicegen::infrastructure::openapi::{HttpMethod, ParameterLocation, SpecVersion};
use servicegen::{Error, SpecGeneratorFactory, SpecOptions, SpecSource};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn petstore_v2() -> serde_json::Value {
    json!({
        "swagger": "2.0",
        "info": {"title": "Petstore", "version": "1.0.0"},
        "host": "petstore.test",
        "basePath": "/v1",
        "schemes": ["http"],
        "consumes": ["application/json"],
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "tags": ["pets"],
                    "parameters": [{"name": "limit", "in": "query", "type": "integer"}],
                    "responses": {"200": {"description": "ok", "schema": {"type": "array"}}}
                },
                "post": {
                    "operationId": "createPet",
                    "tags": ["pets"],
                    "parameters": [{"name": "pet", "in": "body", "required": true,
                                    "schema": {"$ref": "#/definitions/Pet"}}],
                    "responses": {"201": {"description": "created"}}
                }
            },
            "/pets/{petId}": {
                "delete": {
                    "operationId": "deletePet",
                    "tags": ["admin"],
                    "deprecated": true,
                    "parameters": [{"name": "petId", "in": "path", "required": true, "type": "string"}],
                    "responses": {"204": {"description": "gone"}}
                }
            }
        },
        "definitions": {
            "Pet": {"type": "object", "properties": {"name": {"type": "string"}}}
        }
    })
}

#[tokio::test]
async fn test_swagger_document_from_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/petstore.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(petstore_v2()))
        .mount(&server)
        .await;

    let factory = SpecGeneratorFactory::new();
    let source = SpecSource::parse(&format!("{}/petstore.json", server.uri()));

    assert_eq!(factory.detect_version(&source).await.unwrap(), SpecVersion::Swagger2);

    let spec = factory.parse(&source, SpecOptions::default()).await.unwrap();
    assert_eq!(spec.base_url.as_deref(), Some("http://petstore.test/v1"));
    assert_eq!(spec.endpoints.len(), 3);

    let create = &spec.endpoints[1];
    assert_eq!(create.method, HttpMethod::Post);
    let body = create.request_body.as_ref().unwrap();
    assert!(body.required);
    assert_eq!(body.content_type, "application/json");
    assert_eq!(body.schema.as_ref().unwrap()["properties"]["name"]["type"], "string");

    let delete = &spec.endpoints[2];
    assert!(delete.deprecated);
    assert_eq!(delete.parameters[0].location, ParameterLocation::Path);
}

#[tokio::test]
async fn test_options_filter_endpoints() {
    let factory = SpecGeneratorFactory::new();
    let source = SpecSource::from_object(petstore_v2());
    let options = SpecOptions {
        include_deprecated: false,
        filter_tags: vec!["pets".to_string(), "admin".to_string()],
        base_url_override: Some("https://staging.petstore.test".to_string()),
        ..Default::default()
    };

    let spec = factory.parse(&source, options).await.unwrap();

    let ids: Vec<_> = spec
        .endpoints
        .iter()
        .filter_map(|e| e.operation_id.as_deref())
        .collect();
    assert_eq!(ids, vec!["listPets", "createPet"]);
    assert_eq!(spec.base_url.as_deref(), Some("https://staging.petstore.test"));
}

#[tokio::test]
async fn test_invalid_documents_are_rejected() {
    let factory = SpecGeneratorFactory::new();

    let missing_paths = SpecSource::from_object(json!({"openapi": "3.0.0", "info": {"version": "1"}}));
    match factory.parse(&missing_paths, SpecOptions::default()).await {
        Err(Error::Validation(message)) => {
            assert!(message.contains("Missing info.title"));
            assert!(message.contains("Missing 'paths' object"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let unreachable = SpecSource::default();
    assert!(matches!(
        factory.parse(&unreachable, SpecOptions::default()).await,
        Err(Error::Config(_))
    ));
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = SpecGeneratorFactory::new()
        .parse(&SpecSource::from_url(format!("{}/missing.yaml", server.uri())), SpecOptions::default())
        .await;
    assert!(matches!(result, Err(Error::Http(_))));
}
