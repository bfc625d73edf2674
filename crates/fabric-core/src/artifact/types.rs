//! Artifact type definitions
//!
//! Wire shapes of the item endpoints.

use crate::workspace::WorkspaceId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique artifact identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(pub Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArtifactId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A remote item owned by a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    pub workspace_id: WorkspaceId,

    /// Artifact type tag, e.g. `Notebook` or `Lakehouse`
    #[serde(rename = "type")]
    pub artifact_type: String,

    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
}

impl Artifact {
    pub fn new(
        id: ArtifactId,
        workspace_id: WorkspaceId,
        artifact_type: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            workspace_id,
            artifact_type: artifact_type.into(),
            display_name: display_name.into(),
            description: None,
            folder_id: None,
        }
    }
}

/// How a definition part's payload is encoded. Unknown kinds keep their
/// wire name so they are written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PayloadType {
    InlineBase64,
    InlineText,
    Other(String),
}

impl From<String> for PayloadType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "InlineBase64" => Self::InlineBase64,
            "InlineText" => Self::InlineText,
            _ => Self::Other(value),
        }
    }
}

impl From<PayloadType> for String {
    fn from(value: PayloadType) -> Self {
        match value {
            PayloadType::InlineBase64 => "InlineBase64".to_string(),
            PayloadType::InlineText => "InlineText".to_string(),
            PayloadType::Other(name) => name,
        }
    }
}

/// One file of a multi-file artifact body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionPart {
    pub path: String,
    pub payload_type: PayloadType,
    pub payload: String,
}

/// Multi-file artifact body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default)]
    pub parts: Vec<DefinitionPart>,
}

/// Body of a create-artifact request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtifactRequest {
    pub display_name: String,
    #[serde(rename = "type")]
    pub artifact_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<ItemDefinition>,
}

impl CreateArtifactRequest {
    pub fn new(artifact_type: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            artifact_type: artifact_type.into(),
            description: None,
            folder_id: None,
            definition: None,
        }
    }
}

/// Body of an update-artifact request; unset fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArtifactRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_artifact_from_rest_payload() {
        let artifact: Artifact = serde_json::from_value(serde_json::json!({
            "id": "5b218778-e7a5-4d73-8187-f10824047715",
            "workspaceId": "cfafbeb1-8037-4d0c-896e-a46fb27ff229",
            "type": "Notebook",
            "displayName": "Forecast",
            "description": "weekly"
        }))
        .unwrap();

        assert_eq!(artifact.artifact_type, "Notebook");
        assert_eq!(artifact.description.as_deref(), Some("weekly"));
        assert!(artifact.folder_id.is_none());
    }

    #[test]
    fn test_unknown_payload_type_is_tolerated() {
        let part: DefinitionPart = serde_json::from_value(serde_json::json!({
            "path": "x.bin",
            "payloadType": "SomethingNew",
            "payload": "abc"
        }))
        .unwrap();
        assert_eq!(part.payload_type, PayloadType::Other("SomethingNew".into()));

        let written = serde_json::to_value(&part).unwrap();
        assert_eq!(written["payloadType"], "SomethingNew");
    }

    #[test]
    fn test_known_payload_types_keep_wire_names() {
        let part: DefinitionPart = serde_json::from_value(serde_json::json!({
            "path": "notebook-content.py",
            "payloadType": "InlineBase64",
            "payload": "aGk="
        }))
        .unwrap();
        assert_eq!(part.payload_type, PayloadType::InlineBase64);
        assert_eq!(serde_json::to_value(&part).unwrap()["payloadType"], "InlineBase64");
    }

    #[test]
    fn test_update_request_skips_unset_fields() {
        let body = serde_json::to_value(UpdateArtifactRequest {
            display_name: Some("Renamed".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "displayName": "Renamed" }));
    }
}
