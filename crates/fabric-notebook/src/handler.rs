//! Tree behaviour of notebook artifacts

use crate::NOTEBOOK_TYPE;
use async_trait::async_trait;
use fabric_core::artifact::{ArtifactTreeNode, ArtifactTypeHandler};
use fabric_core::extension::LocalProjectTreeNodeProvider;
use fabric_core::Artifact;
use std::path::Path;

/// Portal links and tree nodes for notebooks
#[derive(Debug, Default)]
pub struct NotebookHandler;

#[async_trait]
impl ArtifactTypeHandler for NotebookHandler {
    fn artifact_type(&self) -> &str {
        NOTEBOOK_TYPE
    }

    fn external_uri(&self, portal_url: &str, artifact: &Artifact) -> String {
        format!(
            "{}/groups/{}/synapsenotebooks/{}",
            portal_url.trim_end_matches('/'),
            artifact.workspace_id,
            artifact.id
        )
    }

    fn node_for(&self, artifact: Artifact) -> ArtifactTreeNode {
        let mut node = ArtifactTreeNode::for_artifact(artifact);
        if let Some(ref description) = node.artifact.description {
            if !description.is_empty() {
                node.label = format!("{} ({})", node.label, description);
            }
        }
        node
    }
}

/// Recognises `<name>.Notebook` folders in local projects
#[derive(Debug, Default)]
pub struct NotebookFolderProvider;

impl LocalProjectTreeNodeProvider for NotebookFolderProvider {
    fn artifact_type(&self) -> &str {
        NOTEBOOK_TYPE
    }

    fn label_for_folder(&self, folder: &Path) -> Option<String> {
        let name = folder.file_name()?.to_str()?;
        let stem = name.strip_suffix(&format!(".{}", NOTEBOOK_TYPE))?;
        (!stem.is_empty()).then(|| stem.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabric_core::{ArtifactId, WorkspaceId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_portal_uri() {
        let artifact = Artifact::new(ArtifactId::new(), WorkspaceId::new(), "Notebook", "N");
        assert_eq!(
            NotebookHandler.external_uri("https://app.fabric.microsoft.com/", &artifact),
            format!(
                "https://app.fabric.microsoft.com/groups/{}/synapsenotebooks/{}",
                artifact.workspace_id, artifact.id
            )
        );
    }

    #[test]
    fn test_folder_recognition() {
        let provider = NotebookFolderProvider;
        assert_eq!(
            provider.label_for_folder(Path::new("/ws/Forecast.Notebook")),
            Some("Forecast".to_string())
        );
        assert_eq!(provider.label_for_folder(Path::new("/ws/Lake.Lakehouse")), None);
        assert_eq!(provider.label_for_folder(Path::new("/ws/.Notebook")), None);
    }
}
