//! Satellite-facing types
//!
//! Everything a satellite hands to the core on registration, and the
//! capability bundle it gets back.

use crate::api::SharedApiClient;
use crate::artifact::{ArtifactManager, ArtifactTreeNode, ArtifactTypeHandler};
use crate::error::Result;
use crate::workspace::WorkspaceManager;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Shared managers handed to every satellite.
///
/// All satellites receive the same instance, so a refresh done by the core
/// is visible to each of them without re-registration.
pub struct ServiceCollection {
    pub workspace_manager: Arc<WorkspaceManager>,
    pub artifact_manager: Arc<ArtifactManager>,
    pub api_client: SharedApiClient,
}

impl ServiceCollection {
    pub fn new(
        workspace_manager: Arc<WorkspaceManager>,
        artifact_manager: Arc<ArtifactManager>,
        api_client: SharedApiClient,
    ) -> Self {
        Self {
            workspace_manager,
            artifact_manager,
            api_client,
        }
    }
}

/// Recognises artifacts that live in local project folders
pub trait LocalProjectTreeNodeProvider: Send + Sync {
    fn artifact_type(&self) -> &str;

    /// Label for a local artifact folder, or `None` if it is not one of ours
    fn label_for_folder(&self, folder: &Path) -> Option<String>;
}

/// Context-menu commands contributed by a satellite
#[async_trait]
pub trait CommandManager: Send + Sync {
    /// Command ids this manager answers to
    fn commands(&self) -> Vec<String>;

    /// Run a command against a node. `Ok(false)` means it was not run.
    async fn execute(&self, command: &str, node: &ArtifactTreeNode) -> Result<bool>;
}

/// Teardown hook run when a satellite is removed
#[async_trait]
pub trait ExtensionLifecycle: Send + Sync {
    async fn dispose(&self) -> Result<()>;
}

/// What a satellite declares when it registers
#[derive(Clone, Default)]
pub struct ExtensionDescriptor {
    /// Reverse-domain id, unique among active registrations
    pub identity: String,

    /// Semantic version of the core API the satellite was built against
    pub api_version: String,

    pub artifact_types: Vec<String>,
    pub tree_node_providers: Vec<Arc<dyn ArtifactTypeHandler>>,
    pub local_project_tree_node_providers: Vec<Arc<dyn LocalProjectTreeNodeProvider>>,
    pub command_managers: Vec<Arc<dyn CommandManager>>,
    pub lifecycle: Option<Arc<dyn ExtensionLifecycle>>,
}

impl ExtensionDescriptor {
    pub fn new(identity: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            api_version: api_version.into(),
            ..Self::default()
        }
    }

    pub fn with_artifact_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_types.push(artifact_type.into());
        self
    }

    pub fn with_tree_node_provider(mut self, provider: Arc<dyn ArtifactTypeHandler>) -> Self {
        self.tree_node_providers.push(provider);
        self
    }

    pub fn with_local_project_tree_node_provider(
        mut self,
        provider: Arc<dyn LocalProjectTreeNodeProvider>,
    ) -> Self {
        self.local_project_tree_node_providers.push(provider);
        self
    }

    pub fn with_command_manager(mut self, manager: Arc<dyn CommandManager>) -> Self {
        self.command_managers.push(manager);
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn ExtensionLifecycle>) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }
}

impl std::fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("identity", &self.identity)
            .field("api_version", &self.api_version)
            .field("artifact_types", &self.artifact_types)
            .field("tree_node_providers", &self.tree_node_providers.len())
            .field("command_managers", &self.command_managers.len())
            .finish()
    }
}
