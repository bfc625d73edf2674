//! Tree presentation of artifacts
//!
//! One node shape for every artifact type. Per-type behaviour (portal URI,
//! children) lives in an `ArtifactTypeHandler` chosen by the `type` string.

use super::definition::{decode_definition, DecodedPart};
use super::manager::ArtifactManager;
use super::types::Artifact;
use crate::workspace::{FolderNode, FolderTree, WorkspaceFolder};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use tokio_util::sync::CancellationToken;

/// What a tree node stands for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactNodeKind {
    Artifact,
    /// One file of the artifact's definition
    DefinitionPart { path: String },
}

/// A node in an artifact tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactTreeNode {
    pub artifact: Artifact,
    pub label: String,
    pub kind: ArtifactNodeKind,
    /// Tag menus match on, e.g. `ItemNotebook`
    pub context_value: String,
}

impl ArtifactTreeNode {
    pub fn for_artifact(artifact: Artifact) -> Self {
        Self {
            label: artifact.display_name.clone(),
            context_value: format!("Item{}", artifact.artifact_type),
            kind: ArtifactNodeKind::Artifact,
            artifact,
        }
    }

    pub fn for_part(artifact: &Artifact, part: &DecodedPart) -> Self {
        Self {
            artifact: artifact.clone(),
            label: part.path.clone(),
            kind: ArtifactNodeKind::DefinitionPart {
                path: part.path.clone(),
            },
            context_value: "DefinitionFile".to_string(),
        }
    }
}

/// Per-type behaviour of artifact nodes
#[async_trait]
pub trait ArtifactTypeHandler: Send + Sync {
    /// The `type` string this handler serves
    fn artifact_type(&self) -> &str;

    /// Portal URI that opens the artifact in a browser
    fn external_uri(&self, portal_url: &str, artifact: &Artifact) -> String {
        format!(
            "{}/groups/{}/{}s/{}",
            portal_url.trim_end_matches('/'),
            artifact.workspace_id,
            artifact.artifact_type.to_ascii_lowercase(),
            artifact.id
        )
    }

    /// Build the node shown for an artifact
    fn node_for(&self, artifact: Artifact) -> ArtifactTreeNode {
        ArtifactTreeNode::for_artifact(artifact)
    }

    /// Children of a node. Never fails; trouble yields no children.
    async fn children(
        &self,
        node: &ArtifactTreeNode,
        artifacts: &ArtifactManager,
        cancel: Option<&CancellationToken>,
    ) -> Vec<ArtifactTreeNode> {
        definition_children(node, artifacts, cancel).await
    }
}

/// Handler for types no satellite claims
#[derive(Debug, Clone)]
pub struct DefaultArtifactHandler {
    artifact_type: String,
}

impl DefaultArtifactHandler {
    pub fn new(artifact_type: impl Into<String>) -> Self {
        Self {
            artifact_type: artifact_type.into(),
        }
    }
}

#[async_trait]
impl ArtifactTypeHandler for DefaultArtifactHandler {
    fn artifact_type(&self) -> &str {
        &self.artifact_type
    }
}

/// Decoded definition parts as child nodes, sorted by path.
///
/// A failed fetch or a malformed part degrades to an empty list so sibling
/// artifacts stay navigable.
pub async fn definition_children(
    node: &ArtifactTreeNode,
    artifacts: &ArtifactManager,
    cancel: Option<&CancellationToken>,
) -> Vec<ArtifactTreeNode> {
    if node.kind != ArtifactNodeKind::Artifact {
        return Vec::new();
    }

    let parts = match artifacts.get_artifact_definition(&node.artifact, cancel).await {
        Ok(definition) => decode_definition(&definition),
        Err(err) => Err(err),
    };

    match parts {
        Ok(mut parts) => {
            parts.sort_by(|a, b| a.path.cmp(&b.path));
            parts
                .iter()
                .map(|part| ArtifactTreeNode::for_part(&node.artifact, part))
                .collect()
        }
        Err(err) => {
            tracing::warn!(artifact_id = %node.artifact.id, error = %err, "Could not load artifact definition");
            Vec::new()
        }
    }
}

// ========== Workspace tree ==========

/// A node of the workspace view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceTreeNode {
    Folder {
        folder: WorkspaceFolder,
        children: Vec<WorkspaceTreeNode>,
    },
    /// Unfoldered artifacts of one type
    TypeGroup {
        artifact_type: String,
        children: Vec<WorkspaceTreeNode>,
    },
    Artifact(ArtifactTreeNode),
}

impl WorkspaceTreeNode {
    pub fn label(&self) -> &str {
        match self {
            WorkspaceTreeNode::Folder { folder, .. } => folder.display_name.as_str(),
            WorkspaceTreeNode::TypeGroup { artifact_type, .. } => artifact_type.as_str(),
            WorkspaceTreeNode::Artifact(node) => node.label.as_str(),
        }
    }

    pub fn children(&self) -> &[WorkspaceTreeNode] {
        match self {
            WorkspaceTreeNode::Folder { children, .. }
            | WorkspaceTreeNode::TypeGroup { children, .. } => children,
            WorkspaceTreeNode::Artifact(_) => &[],
        }
    }
}

/// Artifacts of one workspace arranged under folders, the rest grouped by type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceTree {
    pub roots: Vec<WorkspaceTreeNode>,
}

impl WorkspaceTree {
    /// Folders come first, then type groups; artifacts sort by name.
    /// An artifact pointing at an unknown folder is grouped by type.
    pub fn build<F>(artifacts: &[Artifact], folders: &FolderTree, node_for: F) -> Self
    where
        F: Fn(&Artifact) -> ArtifactTreeNode,
    {
        let mut known_folders = HashSet::new();
        collect_ids(&folders.roots, &mut known_folders);

        let mut sorted: Vec<&Artifact> = artifacts.iter().collect();
        sorted.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        let mut roots: Vec<WorkspaceTreeNode> = folders
            .roots
            .iter()
            .map(|folder| folder_node(folder, &sorted, &node_for))
            .collect();

        let mut by_type: BTreeMap<&str, Vec<WorkspaceTreeNode>> = BTreeMap::new();
        for artifact in sorted {
            let in_folder = artifact
                .folder_id
                .as_deref()
                .is_some_and(|id| known_folders.contains(id));
            if !in_folder {
                by_type
                    .entry(artifact.artifact_type.as_str())
                    .or_default()
                    .push(WorkspaceTreeNode::Artifact(node_for(artifact)));
            }
        }

        roots.extend(by_type.into_iter().map(|(artifact_type, children)| {
            WorkspaceTreeNode::TypeGroup {
                artifact_type: artifact_type.to_string(),
                children,
            }
        }));

        Self { roots }
    }
}

fn collect_ids<'a>(nodes: &'a [FolderNode], ids: &mut HashSet<&'a str>) {
    for node in nodes {
        ids.insert(node.folder.id.as_str());
        collect_ids(&node.children, ids);
    }
}

fn folder_node<F>(folder: &FolderNode, artifacts: &[&Artifact], node_for: &F) -> WorkspaceTreeNode
where
    F: Fn(&Artifact) -> ArtifactTreeNode,
{
    let mut children: Vec<WorkspaceTreeNode> = folder
        .children
        .iter()
        .map(|child| folder_node(child, artifacts, node_for))
        .collect();

    children.extend(
        artifacts
            .iter()
            .filter(|a| a.folder_id.as_deref() == Some(folder.folder.id.as_str()))
            .map(|a| WorkspaceTreeNode::Artifact(node_for(a))),
    );

    WorkspaceTreeNode::Folder {
        folder: folder.folder.clone(),
        children,
    }
}
