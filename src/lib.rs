//! Fabric host application
//!
//! Wires the core services together, activates the bundled satellites and
//! exposes the operations behind the `fabric` subcommands.

pub mod cli;
pub mod interaction;

use anyhow::{anyhow, Context};
use fabric_core::api::{ApiClient, FabricApiClient};
use fabric_core::config::{load_config, user_config_path, FabricConfig, FileConfigurationStore};
use fabric_core::workspace::Workspace;
use fabric_core::{
    Artifact, ArtifactId, ArtifactManager, ArtifactTreeNode, CancellationToken, DeepLinkHandler,
    DeepLinkOutcome, ExtensionRegistry, ServiceCollection, SessionContext, StaticTokenProvider,
    WorkspaceId, WorkspaceManager,
};
use fabric_notebook::NotebookExtension;
use futures::future::join_all;
use interaction::{PortalOpener, StdinPrompt};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing subscriber (only once)
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                std::env::var("RUST_LOG")
                    .unwrap_or_else(|_| "fabric=info,fabric_core=info".into()),
            ))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    });
}

/// The running host: core services plus activated satellites
pub struct Host {
    config: FabricConfig,
    session: Arc<SessionContext>,
    store: Arc<FileConfigurationStore>,
    registry: Arc<ExtensionRegistry>,
    notebook: NotebookExtension,
}

impl Host {
    /// Load configuration for `project_dir` and start with the production client
    pub fn start(project_dir: &Path) -> anyhow::Result<Self> {
        let config = load_config(project_dir).context("Failed to load configuration")?;
        let tokens = Arc::new(StaticTokenProvider::from_env()?);

        // Environment switches are written back to whichever file was loaded
        let project_config = project_dir.join(".fabric.toml");
        let store_path = if project_config.exists() {
            project_config
        } else {
            user_config_path().ok_or_else(|| anyhow!("No configuration directory on this platform"))?
        };

        let session = Arc::new(SessionContext::new(resolve_environment(&config)?));
        let api = Arc::new(FabricApiClient::new(session.clone(), tokens, &config.api));

        Self::with_client(config, store_path, session, api)
    }

    /// Start against any API client
    pub fn with_client(
        config: FabricConfig,
        store_path: PathBuf,
        session: Arc<SessionContext>,
        api: Arc<dyn ApiClient>,
    ) -> anyhow::Result<Self> {
        let workspaces = WorkspaceManager::new(api.clone(), &config.local)?;
        let artifacts = ArtifactManager::new(api.clone(), &config.api);
        let services = Arc::new(ServiceCollection::new(
            Arc::new(workspaces),
            Arc::new(artifacts),
            api,
        ));

        let store = Arc::new(FileConfigurationStore::new(store_path, config.clone()));

        let registry = Arc::new(ExtensionRegistry::new(services, session.clone())?);
        let notebook = fabric_notebook::activate(&registry)?;

        tracing::info!(
            environment = %session.environment().name,
            extensions = ?registry.extension_ids(),
            "Host started"
        );

        Ok(Self {
            config,
            session,
            store,
            registry,
            notebook,
        })
    }

    pub fn registry(&self) -> &Arc<ExtensionRegistry> {
        &self.registry
    }

    pub fn notebook(&self) -> &NotebookExtension {
        &self.notebook
    }

    /// Run a deep link through the state machine with terminal collaborators
    pub async fn open(&self, uri: &str, cancel: &CancellationToken) -> DeepLinkOutcome {
        let services = self.registry.services();
        let handler = DeepLinkHandler::new(
            &services,
            self.session.clone(),
            self.store.clone(),
            self.config.environment_table(),
            Arc::new(StdinPrompt),
            Arc::new(PortalOpener::new(self.registry.clone(), self.session.clone())),
        );
        handler.handle(uri, Some(cancel)).await
    }

    pub async fn workspaces(&self, cancel: &CancellationToken) -> anyhow::Result<Vec<Workspace>> {
        let workspaces = self
            .registry
            .services()
            .workspace_manager
            .list_workspaces(Some(cancel))
            .await?;
        Ok(workspaces)
    }

    /// Artifacts of several workspaces, fetched concurrently
    pub async fn artifacts(
        &self,
        workspace_ids: &[String],
        cancel: &CancellationToken,
    ) -> anyhow::Result<Vec<(WorkspaceId, Vec<Artifact>)>> {
        let ids = workspace_ids
            .iter()
            .map(|id| {
                id.parse::<WorkspaceId>()
                    .map_err(|_| anyhow!("Invalid workspace identifier: {}", id))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let manager = self.registry.services().artifact_manager.clone();
        let listings = join_all(ids.iter().map(|id| manager.list_artifacts(*id, Some(cancel)))).await;

        ids.into_iter()
            .zip(listings)
            .map(|(id, listing)| -> anyhow::Result<_> { Ok((id, listing?)) })
            .collect()
    }

    /// Run a satellite command against one artifact
    pub async fn run_command(
        &self,
        command: &str,
        workspace_id: &str,
        artifact_id: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<bool> {
        let workspace_id: WorkspaceId = workspace_id
            .parse()
            .map_err(|_| anyhow!("Invalid workspace identifier: {}", workspace_id))?;
        let artifact_id: ArtifactId = artifact_id
            .parse()
            .map_err(|_| anyhow!("Invalid artifact identifier: {}", artifact_id))?;

        let manager = self
            .registry
            .command_manager_for(command)
            .ok_or_else(|| anyhow!("No extension provides command {}", command))?;

        let artifact = self
            .registry
            .services()
            .artifact_manager
            .get_artifact(workspace_id, artifact_id, Some(cancel))
            .await?;

        Ok(manager
            .execute(command, &ArtifactTreeNode::for_artifact(artifact))
            .await?)
    }

    /// Dispose every satellite
    pub async fn shutdown(self) {
        self.registry.dispose().await;
    }
}

fn resolve_environment(config: &FabricConfig) -> anyhow::Result<fabric_core::Environment> {
    config
        .environment_table()
        .resolve(&config.environment)
        .cloned()
        .ok_or_else(|| anyhow!("Unknown environment in configuration: {}", config.environment))
}
