//! Production request pipeline against a local HTTP server

use fabric_core::api::{ApiRequestOptions, FabricApiClient};
use fabric_core::config::{ApiConfig, Environment};
use fabric_core::workspace::{CreateWorkspaceOptions, FolderMappingStorage, WorkspaceManager};
use fabric_core::{ApiClient, SessionContext, StaticTokenProvider};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> (FabricApiClient, Arc<SessionContext>) {
    let session = Arc::new(SessionContext::new(Environment::new(
        "MOCK",
        server.uri(),
        "http://localhost/portal",
    )));
    let config = ApiConfig {
        retry_backoff_ms: 1,
        max_retries: 2,
        ..ApiConfig::default()
    };
    let client = FabricApiClient::new(
        session.clone(),
        Arc::new(StaticTokenProvider::new("test-token")),
        &config,
    );
    (client, session)
}

#[tokio::test]
async fn create_workspace_sends_content_type_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/workspaces"))
        .and(header("content-type", "application/json"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({ "displayName": "Sales" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "cfafbeb1-8037-4d0c-896e-a46fb27ff229",
            "displayName": "Sales",
            "description": "",
            "type": "Workspace"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _session) = client_for(&server);
    let dir = TempDir::new().unwrap();
    let manager = WorkspaceManager::with_storage(
        Arc::new(client),
        dir.path().join("root"),
        FolderMappingStorage::new(dir.path().join("data")),
    )
    .unwrap();

    let response = manager
        .create_workspace("Sales", CreateWorkspaceOptions::default(), None)
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(manager.cached_workspaces().len(), 1);
}

#[tokio::test]
async fn transient_get_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/workspaces"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/workspaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .mount(&server)
        .await;

    let (client, _session) = client_for(&server);
    let response = client
        .send_request(ApiRequestOptions::get("/v1/workspaces"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.parsed_body, Some(json!({ "value": [] })));
}

#[tokio::test]
async fn posts_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/workspaces"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _session) = client_for(&server);
    let response = client
        .send_request(ApiRequestOptions::post("/v1/workspaces"))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(response.body_as_text, "busy");
}

#[tokio::test]
async fn non_success_is_a_response_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/workspaces/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("WorkspaceNotFound"))
        .mount(&server)
        .await;

    let (client, _session) = client_for(&server);
    let response = client
        .send_request(ApiRequestOptions::get("/v1/workspaces/missing"))
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    let err = response.error_for_status().unwrap_err();
    assert_eq!(err.api_status(), Some(404));
}

#[tokio::test]
async fn query_parameters_are_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/workspaces"))
        .and(query_param("continuationToken", "a b/c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _session) = client_for(&server);
    let response = client
        .send_request(ApiRequestOptions::get("/v1/workspaces").query("continuationToken", "a b/c"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn environment_switch_redirects_next_request() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    for server in [&first, &second] {
        Mock::given(method("GET"))
            .and(path("/v1/workspaces"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
            .expect(1)
            .mount(server)
            .await;
    }

    let (client, session) = client_for(&first);
    client
        .send_request(ApiRequestOptions::get("/v1/workspaces"))
        .await
        .unwrap();

    session.set_environment(Environment::new("OTHER", second.uri(), "http://localhost/portal"));
    client
        .send_request(ApiRequestOptions::get("/v1/workspaces"))
        .await
        .unwrap();
}
