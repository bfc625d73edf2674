//! Extension registry - satellite registration and capability hand-off

use super::types::{
    CommandManager, ExtensionDescriptor, ExtensionLifecycle, LocalProjectTreeNodeProvider,
    ServiceCollection,
};
use crate::artifact::{ArtifactTypeHandler, DefaultArtifactHandler};
use crate::error::{FabricError, Result};
use crate::session::SessionContext;
use parking_lot::RwLock;
use semver::Version;
use std::collections::HashMap;
use std::sync::Arc;

/// Version of the API the core offers to satellites
pub const CORE_API_VERSION: &str = "0.8.0";

/// Closure returning the common telemetry properties as of the call
pub type TelemetryPropertiesFn = Arc<dyn Fn() -> HashMap<String, String> + Send + Sync>;

struct ExtensionRegistration {
    identity: String,
    api_version: Version,
    artifact_types: Vec<String>,
    tree_node_providers: Vec<Arc<dyn ArtifactTypeHandler>>,
    local_project_tree_node_providers: Vec<Arc<dyn LocalProjectTreeNodeProvider>>,
    command_managers: Vec<Arc<dyn CommandManager>>,
    lifecycle: Option<Arc<dyn ExtensionLifecycle>>,
}

/// Registry of active satellites
pub struct ExtensionRegistry {
    /// The one capability bundle every satellite shares
    services: Arc<ServiceCollection>,

    session: Arc<SessionContext>,

    core_version: Version,

    /// Active registrations in registration order
    registrations: RwLock<Vec<ExtensionRegistration>>,
}

impl ExtensionRegistry {
    pub fn new(services: Arc<ServiceCollection>, session: Arc<SessionContext>) -> Result<Self> {
        let core_version = parse_version(CORE_API_VERSION)?;
        Ok(Self {
            services,
            session,
            core_version,
            registrations: RwLock::new(Vec::new()),
        })
    }

    /// Register a satellite and hand it the shared services.
    ///
    /// Same major version required; the satellite's minor may not exceed
    /// the core's.
    pub fn add_extension(&self, descriptor: ExtensionDescriptor) -> Result<Arc<ServiceCollection>> {
        let identity = descriptor.identity.trim().to_string();
        if identity.is_empty() {
            return Err(FabricError::validation("Extension identity must not be empty"));
        }

        let requested = parse_version(&descriptor.api_version)?;
        if requested.major != self.core_version.major || requested.minor > self.core_version.minor
        {
            return Err(FabricError::IncompatibleApiVersion {
                identity,
                requested: requested.to_string(),
                supported: self.core_version.to_string(),
            });
        }

        let mut registrations = self.registrations.write();
        if registrations.iter().any(|r| r.identity == identity) {
            return Err(FabricError::DuplicateRegistration(identity));
        }

        tracing::info!(
            extension = %identity,
            api_version = %requested,
            artifact_types = ?descriptor.artifact_types,
            "Extension registered"
        );

        registrations.push(ExtensionRegistration {
            identity,
            api_version: requested,
            artifact_types: descriptor.artifact_types,
            tree_node_providers: descriptor.tree_node_providers,
            local_project_tree_node_providers: descriptor.local_project_tree_node_providers,
            command_managers: descriptor.command_managers,
            lifecycle: descriptor.lifecycle,
        });

        Ok(self.services.clone())
    }

    /// Remove one satellite and run its teardown hook
    pub async fn remove_extension(&self, identity: &str) -> Result<()> {
        let registration = {
            let mut registrations = self.registrations.write();
            let index = registrations
                .iter()
                .position(|r| r.identity == identity)
                .ok_or_else(|| FabricError::not_found(format!("Extension {}", identity)))?;
            registrations.remove(index)
        };

        tracing::info!(extension = %identity, "Extension removed");
        match registration.lifecycle {
            Some(lifecycle) => lifecycle.dispose().await,
            None => Ok(()),
        }
    }

    /// Dispose every registration in registration order.
    ///
    /// A failing satellite is logged and skipped.
    pub async fn dispose(&self) {
        let registrations = std::mem::take(&mut *self.registrations.write());

        for registration in registrations {
            let Some(lifecycle) = registration.lifecycle else {
                continue;
            };
            if let Err(e) = lifecycle.dispose().await {
                tracing::error!(extension = %registration.identity, error = %e, "Extension disposal failed");
            }
        }
    }

    /// Telemetry properties reader; reflects the session at each call
    pub fn get_function_to_fetch_common_telemetry_properties(&self) -> TelemetryPropertiesFn {
        let session = self.session.clone();
        Arc::new(move || session.telemetry_properties())
    }

    pub fn services(&self) -> Arc<ServiceCollection> {
        self.services.clone()
    }

    // ========== Aggregations ==========

    /// Identities of active satellites, in registration order
    pub fn extension_ids(&self) -> Vec<String> {
        self.registrations
            .read()
            .iter()
            .map(|r| r.identity.clone())
            .collect()
    }

    /// API version a satellite registered with
    pub fn api_version_of(&self, identity: &str) -> Option<String> {
        self.registrations
            .read()
            .iter()
            .find(|r| r.identity == identity)
            .map(|r| r.api_version.to_string())
    }

    /// Union of artifact types, first registration first, without duplicates
    pub fn supported_artifact_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for registration in self.registrations.read().iter() {
            for artifact_type in &registration.artifact_types {
                if !types.iter().any(|t| t.eq_ignore_ascii_case(artifact_type)) {
                    types.push(artifact_type.clone());
                }
            }
        }
        types
    }

    /// Handler for an artifact type; the first satellite to claim it wins,
    /// unclaimed types get the default handler
    pub fn handler_for(&self, artifact_type: &str) -> Arc<dyn ArtifactTypeHandler> {
        let claimed = self
            .registrations
            .read()
            .iter()
            .flat_map(|r| r.tree_node_providers.iter())
            .find(|h| h.artifact_type().eq_ignore_ascii_case(artifact_type))
            .cloned();

        match claimed {
            Some(handler) => handler,
            None => Arc::new(DefaultArtifactHandler::new(artifact_type)),
        }
    }

    pub fn local_project_tree_node_providers(&self) -> Vec<Arc<dyn LocalProjectTreeNodeProvider>> {
        self.registrations
            .read()
            .iter()
            .flat_map(|r| r.local_project_tree_node_providers.iter().cloned())
            .collect()
    }

    pub fn command_managers(&self) -> Vec<Arc<dyn CommandManager>> {
        self.registrations
            .read()
            .iter()
            .flat_map(|r| r.command_managers.iter().cloned())
            .collect()
    }

    /// Command manager answering to a command id
    pub fn command_manager_for(&self, command: &str) -> Option<Arc<dyn CommandManager>> {
        self.command_managers()
            .into_iter()
            .find(|m| m.commands().iter().any(|c| c == command))
    }
}

fn parse_version(version: &str) -> Result<Version> {
    Version::parse(version.trim()).map_err(|e| {
        FabricError::validation(format!("Invalid API version '{}': {}", version, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApiClient;
    use crate::artifact::ArtifactManager;
    use crate::config::{ApiConfig, Environment};
    use crate::workspace::{FolderMappingStorage, WorkspaceManager};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn registry(dir: &TempDir) -> ExtensionRegistry {
        let api = Arc::new(MockApiClient::new());
        let workspaces = WorkspaceManager::with_storage(
            api.clone(),
            dir.path().join("root"),
            FolderMappingStorage::new(dir.path().join("data")),
        )
        .unwrap();
        let artifacts = ArtifactManager::new(api.clone(), &ApiConfig::default());
        let services = Arc::new(ServiceCollection::new(
            Arc::new(workspaces),
            Arc::new(artifacts),
            api,
        ));
        let session = Arc::new(SessionContext::new(Environment::new(
            "PROD",
            "https://api.fabric.microsoft.com",
            "https://app.fabric.microsoft.com",
        )));
        ExtensionRegistry::new(services, session).unwrap()
    }

    #[test]
    fn test_version_policy() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        assert!(registry.add_extension(ExtensionDescriptor::new("a.same", "0.8.0")).is_ok());
        assert!(registry.add_extension(ExtensionDescriptor::new("a.older", "0.7.3")).is_ok());

        let newer = registry.add_extension(ExtensionDescriptor::new("a.newer", "0.9.0"));
        assert!(matches!(newer, Err(FabricError::IncompatibleApiVersion { .. })));

        let major = registry.add_extension(ExtensionDescriptor::new("a.major", "1.0.0"));
        assert!(matches!(major, Err(FabricError::IncompatibleApiVersion { .. })));

        let garbage = registry.add_extension(ExtensionDescriptor::new("a.bad", "eight"));
        assert!(matches!(garbage, Err(FabricError::Validation(_))));

        assert_eq!(registry.extension_ids(), vec!["a.same", "a.older"]);
        assert_eq!(registry.api_version_of("a.older").as_deref(), Some("0.7.3"));
    }

    #[test]
    fn test_unclaimed_type_gets_default_handler() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        assert_eq!(registry.handler_for("Lakehouse").artifact_type(), "Lakehouse");
    }

    #[test]
    fn test_artifact_types_are_deduplicated() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        registry
            .add_extension(ExtensionDescriptor::new("a", "0.8.0").with_artifact_type("Notebook"))
            .unwrap();
        registry
            .add_extension(
                ExtensionDescriptor::new("b", "0.8.0")
                    .with_artifact_type("notebook")
                    .with_artifact_type("Lakehouse"),
            )
            .unwrap();

        assert_eq!(registry.supported_artifact_types(), vec!["Notebook", "Lakehouse"]);
    }
}
