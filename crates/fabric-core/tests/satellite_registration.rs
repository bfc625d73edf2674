//! Satellite registration and capability hand-off

use async_trait::async_trait;
use fabric_core::api::MockApiClient;
use fabric_core::config::{ApiConfig, Environment};
use fabric_core::workspace::{FolderMappingStorage, Workspace, WorkspaceId};
use fabric_core::{
    ArtifactManager, ExtensionDescriptor, ExtensionLifecycle, ExtensionRegistry, FabricError,
    Result, ServiceCollection, SessionContext, WorkspaceManager, CORE_API_VERSION,
};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

struct Host {
    registry: ExtensionRegistry,
    session: Arc<SessionContext>,
    api: Arc<MockApiClient>,
    _dir: TempDir,
}

fn host() -> Host {
    let dir = TempDir::new().unwrap();
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
        api.clone(),
    ));
    let session = Arc::new(SessionContext::new(Environment::new(
        "PROD",
        "https://api.fabric.microsoft.com",
        "https://app.fabric.microsoft.com",
    )));

    Host {
        registry: ExtensionRegistry::new(services, session.clone()).unwrap(),
        session,
        api,
        _dir: dir,
    }
}

/// Records its disposal in a shared log; optionally fails
struct Teardown {
    name: &'static str,
    fail: bool,
    log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl ExtensionLifecycle for Teardown {
    async fn dispose(&self) -> Result<()> {
        self.log.lock().push(self.name);
        if self.fail {
            Err(FabricError::config(format!("{} refused to stop", self.name)))
        } else {
            Ok(())
        }
    }
}

fn descriptor(identity: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> ExtensionDescriptor {
    ExtensionDescriptor::new(identity, CORE_API_VERSION).with_lifecycle(Arc::new(Teardown {
        name: identity,
        fail,
        log: log.clone(),
    }))
}

#[test]
fn every_satellite_shares_one_service_collection() {
    let host = host();

    let a = host
        .registry
        .add_extension(ExtensionDescriptor::new("contoso.a", CORE_API_VERSION))
        .unwrap();
    let b = host
        .registry
        .add_extension(ExtensionDescriptor::new("contoso.b", "0.1.0"))
        .unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&a.workspace_manager, &b.workspace_manager));
}

#[tokio::test]
async fn core_refresh_is_visible_to_registered_satellites() {
    let host = host();
    let services = host
        .registry
        .add_extension(ExtensionDescriptor::new("contoso.a", CORE_API_VERSION))
        .unwrap();

    let id = WorkspaceId::new();
    host.api.respond_with_json(
        200,
        json!({ "value": [{ "id": id.to_string(), "displayName": "Sales", "type": "Workspace" }] }),
    );
    host.registry
        .services()
        .workspace_manager
        .list_workspaces(None)
        .await
        .unwrap();

    let seen: Vec<WorkspaceId> = services
        .workspace_manager
        .cached_workspaces()
        .iter()
        .map(|w| w.id)
        .collect();
    assert_eq!(seen, vec![id]);
}

#[tokio::test]
async fn duplicate_identity_is_rejected_and_first_stays_active() {
    let host = host();
    let log = Arc::new(Mutex::new(Vec::new()));

    host.registry
        .add_extension(descriptor("contoso.notebook", &log, false))
        .unwrap();
    let second = host
        .registry
        .add_extension(descriptor("contoso.notebook", &log, false));

    assert!(matches!(second, Err(FabricError::DuplicateRegistration(ref id)) if id == "contoso.notebook"));
    assert_eq!(host.registry.extension_ids(), vec!["contoso.notebook"]);

    host.registry.remove_extension("contoso.notebook").await.unwrap();
    assert_eq!(*log.lock(), vec!["contoso.notebook"]);
    assert!(host.registry.extension_ids().is_empty());
}

#[tokio::test]
async fn removing_unknown_extension_is_not_found() {
    let host = host();
    let err = host.registry.remove_extension("nobody").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn dispose_runs_in_order_and_tolerates_failures() {
    let host = host();
    let log = Arc::new(Mutex::new(Vec::new()));

    for (identity, fail) in [("first", false), ("faulty", true), ("last", false)] {
        host.registry.add_extension(descriptor(identity, &log, fail)).unwrap();
    }

    host.registry.dispose().await;

    assert_eq!(*log.lock(), vec!["first", "faulty", "last"]);
    assert!(host.registry.extension_ids().is_empty());
}

#[test]
fn telemetry_reflects_state_at_call_time() {
    let host = host();
    let fetch = host.registry.get_function_to_fetch_common_telemetry_properties();

    let before = fetch();
    assert_eq!(before.get("common.environment").map(String::as_str), Some("PROD"));
    assert!(!before.contains_key("common.tenantId"));

    host.session.set_environment(Environment::new(
        "DAILY",
        "https://dailyapi.fabric.microsoft.com",
        "https://daily.fabric.microsoft.com",
    ));
    host.session.set_identity(Some("tenant-1".into()), Some("user-1".into()));

    let after = fetch();
    assert_eq!(after.get("common.environment").map(String::as_str), Some("DAILY"));
    assert_eq!(after.get("common.tenantId").map(String::as_str), Some("tenant-1"));
    assert_eq!(after.get("common.sessionId"), before.get("common.sessionId"));
}

#[test]
fn services_are_usable_without_reaching_into_core() {
    let host = host();
    let services = host
        .registry
        .add_extension(ExtensionDescriptor::new("contoso.a", CORE_API_VERSION))
        .unwrap();

    let workspace = Workspace::new(WorkspaceId::new(), "Sales");
    services
        .workspace_manager
        .set_current_workspace(Some(workspace.clone()));

    assert_eq!(
        host.registry.services().workspace_manager.current_workspace(),
        Some(workspace)
    );
}
