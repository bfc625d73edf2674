//! Folder mapping persistence layer
//!
//! Handles loading and saving the workspace-to-local-folder mappings.

use super::types::WorkspaceId;
use crate::error::{FabricError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Workspace-to-folder mappings stored in `<data_dir>/folder-mappings.json`
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FolderMappings {
    /// Local folder per workspace
    #[serde(default)]
    pub workspaces: HashMap<WorkspaceId, PathBuf>,
}

impl FolderMappings {
    pub fn get(&self, id: WorkspaceId) -> Option<&PathBuf> {
        self.workspaces.get(&id)
    }

    pub fn insert(&mut self, id: WorkspaceId, path: PathBuf) {
        self.workspaces.insert(id, path);
    }

    pub fn clear(&mut self) {
        self.workspaces.clear();
    }
}

/// Storage backend for folder mappings
pub struct FolderMappingStorage {
    /// Directory holding host data
    data_dir: PathBuf,

    /// Path to the mappings file
    mappings_path: PathBuf,
}

impl FolderMappingStorage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            mappings_path: data_dir.join("folder-mappings.json"),
            data_dir,
        }
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            fs::create_dir_all(&self.data_dir).map_err(|e| {
                FabricError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create data directory: {}", e),
                ))
            })?;
        }
        Ok(())
    }

    /// Load mappings from disk
    pub fn load(&self) -> Result<FolderMappings> {
        if !self.mappings_path.exists() {
            return Ok(FolderMappings::default());
        }

        let content = fs::read_to_string(&self.mappings_path).map_err(|e| {
            FabricError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read folder mappings: {}", e),
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| FabricError::config(format!("Failed to parse folder mappings: {}", e)))
    }

    /// Save mappings to disk
    pub fn save(&self, mappings: &FolderMappings) -> Result<()> {
        self.ensure_data_dir()?;

        let content = serde_json::to_string_pretty(mappings)?;

        // Write atomically using temp file
        let temp_path = self.mappings_path.with_extension("json.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            FabricError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write folder mappings: {}", e),
            ))
        })?;

        fs::rename(&temp_path, &self.mappings_path).map_err(|e| {
            FabricError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to save folder mappings: {}", e),
            ))
        })?;

        Ok(())
    }
}
