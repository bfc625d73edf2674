//! WorkspaceManager - owner of workspace state
//!
//! Lists and creates workspaces, caches them, tracks the current workspace
//! and connection state, and maps workspaces to local folders.

use super::folders::FolderTree;
use super::storage::{FolderMappingStorage, FolderMappings};
use super::types::{
    CacheState, ConnectionState, CreateWorkspaceOptions, Workspace, WorkspaceFolder, WorkspaceId,
};
use crate::api::{list_all, ApiRequestOptions, ApiResponse, SharedApiClient};
use crate::artifact::Artifact;
use crate::config::LocalConfig;
use crate::error::{FabricError, Result};
use crate::events::{ChangeNotifier, Subscription, TrackedProperty};
use parking_lot::RwLock;
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct WorkspaceCache {
    state: CacheState,
    workspaces: HashMap<WorkspaceId, Workspace>,
    /// Bumped by every list call; the newest call owns `Loading`
    generation: u64,
    /// Generation whose listing the cache currently holds
    loaded_generation: u64,
}

/// Manages remote workspaces and their local counterparts
pub struct WorkspaceManager {
    /// Client for all remote I/O
    api: SharedApiClient,

    /// Cached workspaces and their load state
    cache: RwLock<WorkspaceCache>,

    /// Workspace the user is working in
    current: RwLock<Option<Workspace>>,

    connection: RwLock<ConnectionState>,

    /// Workspace-to-folder mappings (persistent)
    mappings: RwLock<FolderMappings>,

    /// Storage backend for mappings
    storage: FolderMappingStorage,

    /// Root under which new workspace folders are created
    workspaces_root: PathBuf,

    notifier: ChangeNotifier,
}

impl WorkspaceManager {
    /// Create a new WorkspaceManager
    pub fn new(api: SharedApiClient, local: &LocalConfig) -> Result<Self> {
        let storage = FolderMappingStorage::new(local.data_dir.clone());
        Self::with_storage(api, local.workspaces_root.clone(), storage)
    }

    /// Create with custom storage (for testing)
    pub fn with_storage(
        api: SharedApiClient,
        workspaces_root: PathBuf,
        storage: FolderMappingStorage,
    ) -> Result<Self> {
        let mappings = storage.load()?;

        Ok(Self {
            api,
            cache: RwLock::new(WorkspaceCache::default()),
            current: RwLock::new(None),
            connection: RwLock::new(ConnectionState::default()),
            mappings: RwLock::new(mappings),
            storage,
            workspaces_root,
            notifier: ChangeNotifier::new(),
        })
    }

    // ========== Listing & lookup ==========

    /// Fetch all workspaces and replace the cache.
    ///
    /// The backend does not order workspaces; treat the result as a set.
    pub async fn list_workspaces(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<Workspace>> {
        let (generation, previous) = {
            let mut cache = self.cache.write();
            cache.generation += 1;
            let previous = std::mem::replace(&mut cache.state, CacheState::Loading);
            (cache.generation, previous)
        };

        match list_all::<Workspace>(self.api.as_ref(), "/v1/workspaces", cancel).await {
            Ok(workspaces) => {
                let applied = {
                    let mut cache = self.cache.write();
                    // An older listing never replaces a newer one
                    let applied = generation > cache.loaded_generation;
                    if applied {
                        cache.workspaces =
                            workspaces.iter().map(|ws| (ws.id, ws.clone())).collect();
                        cache.loaded_generation = generation;
                        cache.state = CacheState::Loaded;
                    }
                    applied
                };
                if applied {
                    tracing::debug!(count = workspaces.len(), "Workspace list refreshed");
                    self.notifier.emit(TrackedProperty::Workspaces);
                }
                Ok(workspaces)
            }
            Err(err) => {
                let mut cache = self.cache.write();
                // Only undo the Loading this call set; a concurrent call may
                // have settled the state since
                if cache.generation == generation && cache.state == CacheState::Loading {
                    cache.state = match previous {
                        CacheState::Loading => CacheState::Stale,
                        other => other,
                    };
                }
                Err(err)
            }
        }
    }

    /// Look up a workspace, serving from the cache when it is fresh.
    /// An unknown id is `Ok(None)`, not an error.
    pub async fn get_workspace_by_id(
        &self,
        id: WorkspaceId,
        cancel: Option<&CancellationToken>,
    ) -> Result<Option<Workspace>> {
        {
            let cache = self.cache.read();
            if cache.state == CacheState::Loaded {
                if let Some(ws) = cache.workspaces.get(&id) {
                    return Ok(Some(ws.clone()));
                }
            }
        }

        let response = self
            .api
            .send_request(
                ApiRequestOptions::get(format!("/v1/workspaces/{}", id)).with_cancellation(cancel),
            )
            .await?;

        if response.status == 404 {
            tracing::debug!(workspace_id = %id, "Workspace not found");
            return Ok(None);
        }

        let workspace: Workspace = response.error_for_status()?.body()?;
        self.cache.write().workspaces.insert(workspace.id, workspace.clone());
        Ok(Some(workspace))
    }

    /// Snapshot of cached workspaces, regardless of freshness
    pub fn cached_workspaces(&self) -> Vec<Workspace> {
        self.cache.read().workspaces.values().cloned().collect()
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.read().state
    }

    /// Mark the cache stale; the next lookup goes remote
    pub fn invalidate(&self) {
        let mut cache = self.cache.write();
        if cache.state == CacheState::Loaded {
            cache.state = CacheState::Stale;
        }
    }

    // ========== Creation ==========

    /// Create a workspace. An empty name fails before any request is sent.
    pub async fn create_workspace(
        &self,
        name: &str,
        options: CreateWorkspaceOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<ApiResponse> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FabricError::validation("Workspace name must not be empty"));
        }

        let mut body = json!({ "displayName": name });
        if let Some(description) = options.description {
            body["description"] = json!(description);
        }
        if let Some(capacity_id) = options.capacity_id {
            body["capacityId"] = json!(capacity_id);
        }

        // json() declares Content-Type; the backend rejects creation without it
        let request = ApiRequestOptions::post("/v1/workspaces")
            .json(&body)?
            .with_cancellation(cancel);

        let response = self.api.send_request(request).await?.error_for_status()?;

        if let Ok(workspace) = response.body::<Workspace>() {
            tracing::info!(workspace_id = %workspace.id, name = %workspace.display_name, "Workspace created");
            self.cache.write().workspaces.insert(workspace.id, workspace);
            self.notifier.emit(TrackedProperty::Workspaces);
        }

        Ok(response)
    }

    // ========== Folders ==========

    /// All folders of a workspace
    pub async fn list_folders(
        &self,
        workspace: &Workspace,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<WorkspaceFolder>> {
        let path = format!("/v1/workspaces/{}/folders", workspace.id);
        list_all(self.api.as_ref(), &path, cancel).await
    }

    /// Folders of a workspace nested into a tree
    pub async fn folder_tree(
        &self,
        workspace: &Workspace,
        cancel: Option<&CancellationToken>,
    ) -> Result<FolderTree> {
        let folders = self.list_folders(workspace, cancel).await?;
        Ok(FolderTree::build(&folders))
    }

    // ========== Current workspace & connection ==========

    pub fn current_workspace(&self) -> Option<Workspace> {
        self.current.read().clone()
    }

    pub fn set_current_workspace(&self, workspace: Option<Workspace>) {
        let changed = {
            let mut current = self.current.write();
            let changed = current.as_ref().map(|w| w.id) != workspace.as_ref().map(|w| w.id);
            *current = workspace;
            changed
        };

        if changed {
            self.notifier.emit(TrackedProperty::CurrentWorkspace);
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.connection.read()
    }

    pub fn set_connection_state(&self, state: ConnectionState) {
        let changed = {
            let mut connection = self.connection.write();
            let changed = *connection != state;
            *connection = state;
            changed
        };

        if changed {
            self.notifier.emit(TrackedProperty::ConnectionState);
        }
    }

    /// Listen for property changes; re-query the manager for new values
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(TrackedProperty) + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    /// Forget everything tied to the previous environment or tenant
    pub fn clear_prior_state_if_any(&self) -> Result<()> {
        {
            let mut cache = self.cache.write();
            cache.workspaces.clear();
            // Listings still in flight belong to the old environment
            cache.loaded_generation = cache.generation;
            if cache.state != CacheState::Unloaded {
                cache.state = CacheState::Stale;
            }
        }

        let had_mappings = {
            let mut mappings = self.mappings.write();
            let had = !mappings.workspaces.is_empty();
            mappings.clear();
            had
        };
        if had_mappings {
            self.save_mappings()?;
        }

        self.set_current_workspace(None);
        tracing::info!("Cleared prior workspace state");
        Ok(())
    }

    // ========== Local folder mapping ==========

    /// Local folder for a workspace. Without `create_if_not_exists`, an
    /// unmapped workspace yields `Ok(None)`.
    pub fn get_local_folder_for_workspace(
        &self,
        workspace: &Workspace,
        create_if_not_exists: bool,
    ) -> Result<Option<PathBuf>> {
        let existing = self.mappings.read().get(workspace.id).cloned();

        let folder = match existing {
            Some(folder) => folder,
            None if create_if_not_exists => {
                let folder = self.workspaces_root.join(local_folder_name(workspace));
                self.mappings.write().insert(workspace.id, folder.clone());
                self.save_mappings()?;
                folder
            }
            None => return Ok(None),
        };

        if create_if_not_exists && !folder.exists() {
            fs::create_dir_all(&folder)?;
        }

        Ok(Some(folder))
    }

    /// Local folder for an artifact, `<workspace folder>/<name>.<type>`
    pub async fn get_local_folder_for_artifact(
        &self,
        artifact: &Artifact,
        create_if_not_exists: bool,
    ) -> Result<Option<PathBuf>> {
        let Some(workspace) = self.get_workspace_by_id(artifact.workspace_id, None).await? else {
            return Err(FabricError::not_found(format!(
                "Workspace {} for artifact {}",
                artifact.workspace_id, artifact.id
            )));
        };

        let Some(workspace_folder) =
            self.get_local_folder_for_workspace(&workspace, create_if_not_exists)?
        else {
            return Ok(None);
        };

        let folder = workspace_folder.join(format!(
            "{}.{}",
            sanitize_file_name(&artifact.display_name),
            artifact.artifact_type
        ));

        if folder.exists() {
            return Ok(Some(folder));
        }
        if create_if_not_exists {
            fs::create_dir_all(&folder)?;
            return Ok(Some(folder));
        }
        Ok(None)
    }

    fn save_mappings(&self) -> Result<()> {
        let mappings = self.mappings.read().clone();
        self.storage.save(&mappings)
    }
}

/// `<display name>-<first 8 chars of id>`, safe for any file system
fn local_folder_name(workspace: &Workspace) -> String {
    let id = workspace.id.to_string();
    format!("{}-{}", sanitize_file_name(&workspace.display_name), &id[..8])
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_matches('.').trim().to_string();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
