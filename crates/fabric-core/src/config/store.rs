//! Configuration persistence seam
//!
//! The host's settings storage is an external collaborator. The core only
//! needs to read the current environment and persist a new one.

use super::types::FabricConfig;
use crate::error::{FabricError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fs;
use std::path::PathBuf;

/// Read/update access to persisted settings
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    /// Currently configured environment name
    fn environment(&self) -> String;

    /// Persist a new environment name
    async fn update_environment(&self, name: &str) -> Result<()>;
}

/// TOML file backed store
pub struct FileConfigurationStore {
    path: PathBuf,
    config: RwLock<FabricConfig>,
}

impl FileConfigurationStore {
    pub fn new(path: PathBuf, config: FabricConfig) -> Self {
        Self {
            path,
            config: RwLock::new(config),
        }
    }

    /// Snapshot of the in-memory configuration
    pub fn config(&self) -> FabricConfig {
        self.config.read().clone()
    }

    fn save(&self, config: &FabricConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(config)?;

        // Write atomically using temp file
        let temp_path = self.path.with_extension("toml.tmp");
        fs::write(&temp_path, &content).map_err(|e| {
            FabricError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write configuration: {}", e),
            ))
        })?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}

#[async_trait]
impl ConfigurationStore for FileConfigurationStore {
    fn environment(&self) -> String {
        self.config.read().environment.clone()
    }

    async fn update_environment(&self, name: &str) -> Result<()> {
        let mut updated = self.config.read().clone();
        updated.environment = name.to_ascii_uppercase();
        self.save(&updated)?;
        *self.config.write() = updated;
        tracing::info!(environment = %name, path = %self.path.display(), "Environment updated");
        Ok(())
    }
}

/// In-memory store for tests and embedders without persistence
pub struct MemoryConfigurationStore {
    environment: RwLock<String>,
    updates: RwLock<Vec<String>>,
}

impl MemoryConfigurationStore {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: RwLock::new(environment.into()),
            updates: RwLock::new(Vec::new()),
        }
    }

    /// Every environment persisted through this store, oldest first
    pub fn updates(&self) -> Vec<String> {
        self.updates.read().clone()
    }
}

#[async_trait]
impl ConfigurationStore for MemoryConfigurationStore {
    fn environment(&self) -> String {
        self.environment.read().clone()
    }

    async fn update_environment(&self, name: &str) -> Result<()> {
        let name = name.to_ascii_uppercase();
        *self.environment.write() = name.clone();
        self.updates.write().push(name);
        Ok(())
    }
}
