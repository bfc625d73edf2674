//! Context-menu commands for notebooks
//!
//! Every command runs through `ArtifactManager::do_context_menu_item`, so a
//! second click while one is running is refused rather than queued.

use async_trait::async_trait;
use fabric_core::artifact::{
    decode_definition, encode_part, ArtifactNodeKind, ArtifactTreeNode, ItemDefinition,
};
use fabric_core::extension::{CommandManager, ServiceCollection};
use fabric_core::{Artifact, FabricError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, OnceLock};

pub const EXPORT_COMMAND: &str = "fabric.notebook.exportToLocal";
pub const PUBLISH_COMMAND: &str = "fabric.notebook.publishFromLocal";

/// Notebook commands; usable once the registry has handed over services
#[derive(Default)]
pub struct NotebookCommands {
    services: OnceLock<Arc<ServiceCollection>>,
}

impl NotebookCommands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the services returned by registration. Later calls are ignored.
    pub fn bind(&self, services: Arc<ServiceCollection>) {
        let _ = self.services.set(services);
    }

    fn services(&self) -> Result<&Arc<ServiceCollection>> {
        self.services
            .get()
            .ok_or_else(|| FabricError::config("Notebook extension is not activated"))
    }

    /// Write the decoded definition into the artifact's local folder
    pub async fn export_to_local(&self, artifact: &Artifact) -> Result<PathBuf> {
        let services = self.services()?;
        let definition = services
            .artifact_manager
            .get_artifact_definition(artifact, None)
            .await?;

        let folder = services
            .workspace_manager
            .get_local_folder_for_artifact(artifact, true)
            .await?
            .ok_or_else(|| FabricError::not_found(format!("Local folder for {}", artifact.id)))?;

        for part in decode_definition(&definition)? {
            let target = folder.join(safe_relative_path(&part.path)?);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, &part.content)?;
        }

        tracing::info!(artifact_id = %artifact.id, folder = %folder.display(), "Notebook exported");
        Ok(folder)
    }

    /// Upload every file of the artifact's local folder as its definition
    pub async fn publish_from_local(&self, artifact: &Artifact) -> Result<()> {
        let services = self.services()?;
        let folder = services
            .workspace_manager
            .get_local_folder_for_artifact(artifact, false)
            .await?
            .ok_or_else(|| {
                FabricError::not_found(format!("No local folder for notebook {}", artifact.display_name))
            })?;

        let mut files = Vec::new();
        collect_files(&folder, &folder, &mut files)?;
        if files.is_empty() {
            return Err(FabricError::validation(format!(
                "Nothing to publish in {}",
                folder.display()
            )));
        }

        let mut parts = Vec::with_capacity(files.len());
        for (relative, path) in files {
            parts.push(encode_part(relative, &fs::read(&path)?));
        }

        let definition = ItemDefinition {
            format: None,
            parts,
        };
        services
            .artifact_manager
            .update_artifact_definition(artifact, &definition, None)
            .await?;

        tracing::info!(artifact_id = %artifact.id, parts = definition.parts.len(), "Notebook published");
        Ok(())
    }
}

#[async_trait]
impl CommandManager for NotebookCommands {
    fn commands(&self) -> Vec<String> {
        vec![EXPORT_COMMAND.to_string(), PUBLISH_COMMAND.to_string()]
    }

    async fn execute(&self, command: &str, node: &ArtifactTreeNode) -> Result<bool> {
        if node.kind != ArtifactNodeKind::Artifact {
            return Err(FabricError::validation("Notebook commands apply to notebook nodes"));
        }

        let manager = self.services()?.artifact_manager.clone();
        match command {
            EXPORT_COMMAND => {
                manager
                    .do_context_menu_item(&node.artifact, "Export notebook", |artifact| async move {
                        self.export_to_local(artifact).await.map(|_| ())
                    })
                    .await
            }
            PUBLISH_COMMAND => {
                manager
                    .do_context_menu_item(&node.artifact, "Publish notebook", |artifact| async move {
                        self.publish_from_local(artifact).await
                    })
                    .await
            }
            other => Err(FabricError::validation(format!("Unknown notebook command: {}", other))),
        }
    }
}

/// Part paths are relative and may not climb out of the folder
fn safe_relative_path(path: &str) -> Result<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes || relative.as_os_str().is_empty() {
        return Err(FabricError::validation(format!("Unsafe part path: {}", path)));
    }
    Ok(relative.to_path_buf())
}

/// Files under `dir`, keyed by `/`-separated path relative to `root`, sorted
fn collect_files(root: &Path, dir: &Path, files: &mut Vec<(String, PathBuf)>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((key, path));
        }
    }
    Ok(())
}
