//! Workspace type definitions
//!
//! Core types for workspace management - wire-compatible with the REST API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique workspace identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkspaceId(pub Uuid);

impl WorkspaceId {
    /// Generate a new random workspace ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for WorkspaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for WorkspaceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Linked source-control metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceControlInfo {
    pub provider_type: String,
    pub repository_name: String,
    pub branch_name: String,
    #[serde(default)]
    pub directory_name: Option<String>,
}

/// A remote workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: WorkspaceId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_id: Option<String>,

    /// Backend workspace kind, e.g. `Workspace` or `Personal`
    #[serde(rename = "type", default)]
    pub workspace_type: String,

    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_control: Option<SourceControlInfo>,
}

impl Workspace {
    pub fn new(id: WorkspaceId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            capacity_id: None,
            workspace_type: "Workspace".to_string(),
            display_name: display_name.into(),
            description: String::new(),
            source_control: None,
        }
    }

    pub fn is_personal(&self) -> bool {
        self.workspace_type.eq_ignore_ascii_case("Personal")
    }
}

/// A folder inside a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceFolder {
    pub id: String,
    pub display_name: String,
    pub workspace_id: WorkspaceId,
    #[serde(default)]
    pub parent_folder_id: Option<String>,
}

/// Optional fields for workspace creation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateWorkspaceOptions {
    pub description: Option<String>,
    pub capacity_id: Option<String>,
}

/// Whether the host is signed in and able to reach the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Lifecycle of the workspace cache
///
/// ```text
/// Unloaded -> Loading -> Loaded -> Stale -> Loading
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_workspace_id_roundtrip() {
        let id = WorkspaceId::new();
        let parsed: WorkspaceId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-guid".parse::<WorkspaceId>().is_err());
    }

    #[test]
    fn test_workspace_from_rest_payload() {
        let ws: Workspace = serde_json::from_value(serde_json::json!({
            "id": "cfafbeb1-8037-4d0c-896e-a46fb27ff229",
            "displayName": "Sales",
            "description": "",
            "type": "Workspace",
            "capacityId": "56bac802-080d-4f73-8a42-1b406eb1fcac"
        }))
        .unwrap();

        assert_eq!(ws.display_name, "Sales");
        assert_eq!(ws.capacity_id.as_deref(), Some("56bac802-080d-4f73-8a42-1b406eb1fcac"));
        assert!(ws.source_control.is_none());
        assert!(!ws.is_personal());
    }
}
