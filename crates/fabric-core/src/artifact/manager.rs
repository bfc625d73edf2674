//! ArtifactManager - CRUD and definition operations on artifacts
//!
//! All remote I/O goes through the shared `ApiClient`. The per-workspace
//! listing cache is only touched after a request has fully succeeded.

use super::types::{
    Artifact, ArtifactId, CreateArtifactRequest, ItemDefinition, UpdateArtifactRequest,
};
use crate::api::{list_all, ApiRequestOptions, ApiResponse, SharedApiClient};
use crate::cancel::{check_cancelled, OrCancelExt};
use crate::config::ApiConfig;
use crate::error::{FabricError, Result};
use crate::workspace::WorkspaceId;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const OPERATION_ID_HEADER: &str = "x-ms-operation-id";

#[derive(Debug, Deserialize)]
struct DefinitionResponse {
    #[serde(default)]
    definition: ItemDefinition,
}

#[derive(Debug, Deserialize)]
struct OperationState {
    status: String,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Releases the context-menu gate when dropped
struct GateGuard<'a>(&'a AtomicBool);

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Manages artifacts of all workspaces
pub struct ArtifactManager {
    api: SharedApiClient,

    /// Last successful listing per workspace
    cache: RwLock<HashMap<WorkspaceId, Vec<Artifact>>>,

    /// Set while a context-menu operation runs
    context_menu_busy: AtomicBool,

    lro_poll_interval: Duration,
    lro_max_polls: u32,
}

impl ArtifactManager {
    pub fn new(api: SharedApiClient, config: &ApiConfig) -> Self {
        Self {
            api,
            cache: RwLock::new(HashMap::new()),
            context_menu_busy: AtomicBool::new(false),
            lro_poll_interval: Duration::from_millis(config.lro_poll_interval_ms),
            lro_max_polls: config.lro_max_polls,
        }
    }

    // ========== CRUD ==========

    /// All artifacts of a workspace. An empty workspace is `Ok(vec![])`;
    /// a missing one is `FabricError::NotFound`.
    pub async fn list_artifacts(
        &self,
        workspace_id: WorkspaceId,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Artifact>> {
        let path = format!("/v1/workspaces/{}/items", workspace_id);
        let artifacts: Vec<Artifact> = match list_all(self.api.as_ref(), &path, cancel).await {
            Ok(artifacts) => artifacts,
            Err(err) if err.api_status() == Some(404) => {
                return Err(FabricError::not_found(format!("Workspace {}", workspace_id)));
            }
            Err(err) => return Err(err),
        };

        tracing::debug!(workspace_id = %workspace_id, count = artifacts.len(), "Artifacts listed");
        self.cache.write().insert(workspace_id, artifacts.clone());
        Ok(artifacts)
    }

    /// Last successful listing of a workspace, if any
    pub fn cached_artifacts(&self, workspace_id: WorkspaceId) -> Option<Vec<Artifact>> {
        self.cache.read().get(&workspace_id).cloned()
    }

    pub async fn get_artifact(
        &self,
        workspace_id: WorkspaceId,
        artifact_id: ArtifactId,
        cancel: Option<&CancellationToken>,
    ) -> Result<Artifact> {
        let request = ApiRequestOptions::get(item_path(workspace_id, artifact_id))
            .with_cancellation(cancel);
        self.api.send_request(request).await?.error_for_status()?.body()
    }

    pub async fn create_artifact(
        &self,
        workspace_id: WorkspaceId,
        request: &CreateArtifactRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<ApiResponse> {
        if request.display_name.trim().is_empty() {
            return Err(FabricError::validation("Artifact name must not be empty"));
        }
        if request.artifact_type.trim().is_empty() {
            return Err(FabricError::validation("Artifact type must not be empty"));
        }

        let options = ApiRequestOptions::post(format!("/v1/workspaces/{}/items", workspace_id))
            .json(request)?
            .with_cancellation(cancel);
        let response = self.api.send_request(options).await?.error_for_status()?;
        check_cancelled(cancel)?;

        // 202 carries no body; the listing catches up on next refresh
        if let Ok(artifact) = response.body::<Artifact>() {
            tracing::info!(artifact_id = %artifact.id, artifact_type = %artifact.artifact_type, "Artifact created");
            if let Some(cached) = self.cache.write().get_mut(&workspace_id) {
                cached.push(artifact);
            }
        }

        Ok(response)
    }

    pub async fn update_artifact(
        &self,
        artifact: &Artifact,
        update: &UpdateArtifactRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<ApiResponse> {
        let options = ApiRequestOptions::patch(item_path(artifact.workspace_id, artifact.id))
            .json(update)?
            .with_cancellation(cancel);
        let response = self.api.send_request(options).await?.error_for_status()?;
        check_cancelled(cancel)?;

        let mut cache = self.cache.write();
        if let Some(cached) = cache
            .get_mut(&artifact.workspace_id)
            .and_then(|items| items.iter_mut().find(|a| a.id == artifact.id))
        {
            match response.body::<Artifact>() {
                Ok(updated) => *cached = updated,
                Err(_) => {
                    if let Some(ref name) = update.display_name {
                        cached.display_name = name.clone();
                    }
                    if let Some(ref description) = update.description {
                        cached.description = Some(description.clone());
                    }
                }
            }
        }

        Ok(response)
    }

    pub async fn delete_artifact(
        &self,
        artifact: &Artifact,
        cancel: Option<&CancellationToken>,
    ) -> Result<ApiResponse> {
        let options = ApiRequestOptions::delete(item_path(artifact.workspace_id, artifact.id))
            .with_cancellation(cancel);
        let response = self.api.send_request(options).await?.error_for_status()?;
        check_cancelled(cancel)?;

        if let Some(cached) = self.cache.write().get_mut(&artifact.workspace_id) {
            cached.retain(|a| a.id != artifact.id);
        }
        tracing::info!(artifact_id = %artifact.id, "Artifact deleted");
        Ok(response)
    }

    /// Drop every cached listing, e.g. after an environment switch
    pub fn clear_cache(&self) {
        self.cache.write().clear();
    }

    // ========== Definitions ==========

    /// Fetch the multi-part definition, following a long-running operation
    /// when the backend answers 202.
    pub async fn get_artifact_definition(
        &self,
        artifact: &Artifact,
        cancel: Option<&CancellationToken>,
    ) -> Result<ItemDefinition> {
        let path = format!("{}/getDefinition", item_path(artifact.workspace_id, artifact.id));
        let response = self
            .api
            .send_request(ApiRequestOptions::post(path).with_cancellation(cancel))
            .await?
            .error_for_status()?;

        let response = if response.status == 202 {
            self.wait_for_operation(&response, cancel).await?
        } else {
            response
        };

        Ok(response.body::<DefinitionResponse>()?.definition)
    }

    pub async fn update_artifact_definition(
        &self,
        artifact: &Artifact,
        definition: &ItemDefinition,
        cancel: Option<&CancellationToken>,
    ) -> Result<ApiResponse> {
        let path = format!(
            "{}/updateDefinition",
            item_path(artifact.workspace_id, artifact.id)
        );
        let options = ApiRequestOptions::post(path)
            .json(&serde_json::json!({ "definition": definition }))?
            .with_cancellation(cancel);

        let response = self.api.send_request(options).await?.error_for_status()?;
        if response.status == 202 {
            self.wait_for_operation(&response, cancel).await?;
        }
        Ok(response)
    }

    /// Poll `/v1/operations/{id}` until it settles, then fetch its result
    async fn wait_for_operation(
        &self,
        accepted: &ApiResponse,
        cancel: Option<&CancellationToken>,
    ) -> Result<ApiResponse> {
        let Some(operation_id) = accepted.header(OPERATION_ID_HEADER).map(str::to_string) else {
            return Err(FabricError::status(
                accepted.status,
                "Accepted without an operation id",
            ));
        };

        let mut retry_after = accepted.retry_after_secs();
        for poll in 0..self.lro_max_polls {
            let delay = retry_after
                .map(Duration::from_secs)
                .unwrap_or(self.lro_poll_interval);
            tokio::time::sleep(delay).or_cancel(cancel).await?;

            let response = self
                .api
                .send_request(
                    ApiRequestOptions::get(format!("/v1/operations/{}", operation_id))
                        .with_cancellation(cancel),
                )
                .await?
                .error_for_status()?;
            let state: OperationState = response.body()?;
            tracing::debug!(operation_id = %operation_id, poll, status = %state.status, "Polled operation");

            match state.status.as_str() {
                "Succeeded" => {
                    let result = ApiRequestOptions::get(format!(
                        "/v1/operations/{}/result",
                        operation_id
                    ))
                    .with_cancellation(cancel);
                    return self.api.send_request(result).await?.error_for_status();
                }
                "Failed" => {
                    let body = state
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| format!("Operation {} failed", operation_id));
                    return Err(FabricError::status(response.status, body));
                }
                _ => retry_after = response.retry_after_secs(),
            }
        }

        Err(FabricError::Api(crate::error::ApiRequestError::Timeout))
    }

    // ========== Context menu ==========

    /// Run a context-menu operation unless another one is in flight.
    ///
    /// Returns `Ok(false)` without calling `callback` when the gate is taken.
    /// The gate covers the whole manager, not a single artifact.
    pub async fn do_context_menu_item<A, F, Fut>(
        &self,
        args: A,
        description: &str,
        callback: F,
    ) -> Result<bool>
    where
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if self
            .context_menu_busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::info!(operation = description, "Another operation is in progress");
            return Ok(false);
        }

        let result = {
            let _guard = GateGuard(&self.context_menu_busy);
            callback(args).await
        };

        match result {
            Ok(()) => Ok(true),
            Err(err) => {
                tracing::error!(operation = description, error = %err, "Context menu operation failed");
                Err(err)
            }
        }
    }

    /// Whether a context-menu operation is running
    pub fn is_busy(&self) -> bool {
        self.context_menu_busy.load(Ordering::Acquire)
    }
}

fn item_path(workspace_id: WorkspaceId, artifact_id: ArtifactId) -> String {
    format!("/v1/workspaces/{}/items/{}", workspace_id, artifact_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApiClient;
    use crate::artifact::definition::encode_part;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn manager() -> (ArtifactManager, Arc<MockApiClient>) {
        let mock = Arc::new(MockApiClient::new());
        let config = ApiConfig {
            lro_poll_interval_ms: 1,
            lro_max_polls: 3,
            ..ApiConfig::default()
        };
        (ArtifactManager::new(mock.clone(), &config), mock)
    }

    fn artifact_json(ws: WorkspaceId, id: ArtifactId, name: &str) -> serde_json::Value {
        json!({ "id": id.to_string(), "workspaceId": ws.to_string(), "type": "Notebook", "displayName": name })
    }

    #[tokio::test]
    async fn test_empty_workspace_lists_nothing() {
        let (manager, mock) = manager();
        mock.respond_with_json(200, json!({ "value": [] }));

        let ws = WorkspaceId::new();
        assert!(manager.list_artifacts(ws, None).await.unwrap().is_empty());
        assert_eq!(manager.cached_artifacts(ws), Some(vec![]));
    }

    #[tokio::test]
    async fn test_missing_workspace_is_not_found() {
        let (manager, mock) = manager();
        mock.respond_with_text(404, "WorkspaceNotFound");

        let err = manager.list_artifacts(WorkspaceId::new(), None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_non_success_surfaces_status_and_body() {
        let (manager, mock) = manager();
        mock.respond_with_text(403, "InsufficientPrivileges");

        let err = manager
            .get_artifact(WorkspaceId::new(), ArtifactId::new(), None)
            .await
            .unwrap_err();
        match err {
            FabricError::Api(crate::error::ApiRequestError::Status { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "InsufficientPrivileges");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete_updates_cache_on_success_only() {
        let (manager, mock) = manager();
        let ws = WorkspaceId::new();
        let id = ArtifactId::new();
        mock.respond_with_json(200, json!({ "value": [artifact_json(ws, id, "A")] }));
        let listed = manager.list_artifacts(ws, None).await.unwrap();

        mock.respond_with_text(500, "boom");
        assert!(manager.delete_artifact(&listed[0], None).await.is_err());
        assert_eq!(manager.cached_artifacts(ws).unwrap().len(), 1);

        mock.respond_with_text(200, "");
        manager.delete_artifact(&listed[0], None).await.unwrap();
        assert!(manager.cached_artifacts(ws).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_update_leaves_cache_untouched() {
        let (manager, mock) = manager();
        let ws = WorkspaceId::new();
        let id = ArtifactId::new();
        mock.respond_with_json(200, json!({ "value": [artifact_json(ws, id, "Before")] }));
        let listed = manager.list_artifacts(ws, None).await.unwrap();

        mock.respond_with_json(200, artifact_json(ws, id, "After"));
        mock.set_latency(Some(Duration::from_secs(5)));
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let update = UpdateArtifactRequest {
            display_name: Some("After".into()),
            ..Default::default()
        };
        let err = manager
            .update_artifact(&listed[0], &update, Some(&token))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(manager.cached_artifacts(ws).unwrap()[0].display_name, "Before");
    }

    #[tokio::test]
    async fn test_definition_follows_long_running_operation() {
        let (manager, mock) = manager();
        let artifact = Artifact::new(ArtifactId::new(), WorkspaceId::new(), "Notebook", "N");
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();

        mock.respond_with(move |options| {
            let path = options.path_template.as_str();
            if path.ends_with("/getDefinition") {
                let mut headers = BTreeMap::new();
                headers.insert("x-ms-operation-id".to_string(), "op-1".to_string());
                ApiResponse::new(202, headers, String::new())
            } else if path == "/v1/operations/op-1" {
                let status = if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    "Running"
                } else {
                    "Succeeded"
                };
                ApiResponse::json(200, &json!({ "status": status }))
            } else if path == "/v1/operations/op-1/result" {
                let part = encode_part("notebook-content.py", b"print(1)");
                ApiResponse::json(200, &json!({ "definition": { "parts": [part] } }))
            } else {
                ApiResponse::text(404, "unexpected")
            }
        });

        let definition = manager.get_artifact_definition(&artifact, None).await.unwrap();

        assert_eq!(definition.parts.len(), 1);
        assert_eq!(polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_payload_type_is_written_back_unchanged() {
        let (manager, mock) = manager();
        let artifact = Artifact::new(ArtifactId::new(), WorkspaceId::new(), "Notebook", "N");
        mock.respond_with(|options| {
            if options.path_template.ends_with("/getDefinition") {
                ApiResponse::json(
                    200,
                    &json!({ "definition": { "parts": [
                        { "path": "cells.ipynb", "payloadType": "InlineJupyter", "payload": "{}" }
                    ] } }),
                )
            } else {
                ApiResponse::text(200, "")
            }
        });

        let definition = manager.get_artifact_definition(&artifact, None).await.unwrap();
        manager
            .update_artifact_definition(&artifact, &definition, None)
            .await
            .unwrap();

        let request = mock.last_request().unwrap();
        assert!(request.path_template.ends_with("/updateDefinition"));
        let body: serde_json::Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["definition"]["parts"][0]["payloadType"], "InlineJupyter");
    }

    #[tokio::test]
    async fn test_failed_operation_is_an_api_error() {
        let (manager, mock) = manager();
        let artifact = Artifact::new(ArtifactId::new(), WorkspaceId::new(), "Notebook", "N");
        mock.respond_with(|options| {
            if options.path_template.ends_with("/getDefinition") {
                let mut headers = BTreeMap::new();
                headers.insert("x-ms-operation-id".to_string(), "op-2".to_string());
                ApiResponse::new(202, headers, String::new())
            } else {
                ApiResponse::json(200, &json!({ "status": "Failed", "error": { "errorCode": "Bad" } }))
            }
        });

        let err = manager.get_artifact_definition(&artifact, None).await.unwrap_err();
        assert_eq!(err.api_status(), Some(200));
    }

    #[tokio::test]
    async fn test_overlapping_context_menu_call_is_rejected() {
        let (manager, _mock) = manager();
        let manager = Arc::new(manager);
        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .do_context_menu_item((), "publish", |_| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok(())
                    })
                    .await
            })
        };
        started_rx.await.unwrap();

        let second_ran = Arc::new(AtomicBool::new(false));
        let flag = second_ran.clone();
        let second = manager
            .do_context_menu_item((), "publish", |_| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await
            .unwrap();

        assert!(!second);
        assert!(!second_ran.load(Ordering::SeqCst));

        release_tx.send(()).unwrap();
        assert!(first.await.unwrap().unwrap());
        assert!(!manager.is_busy());
    }

    #[tokio::test]
    async fn test_failed_callback_releases_gate() {
        let (manager, _mock) = manager();

        let result = manager
            .do_context_menu_item(7, "rename", |n| async move {
                Err(FabricError::validation(format!("bad {}", n)))
            })
            .await;

        assert!(matches!(result, Err(FabricError::Validation(_))));
        assert!(!manager.is_busy());
        assert!(manager
            .do_context_menu_item((), "rename", |_| async { Ok(()) })
            .await
            .unwrap());
    }
}
