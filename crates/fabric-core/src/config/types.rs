//! Configuration types for Fabric
//!
//! Defines the structure of `.fabric.toml` configuration.

use super::environment::{EnvironmentTable, DEFAULT_ENVIRONMENT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FabricConfig {
    /// Name of the current backend environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Request pipeline settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Local folder mapping settings
    #[serde(default)]
    pub local: LocalConfig,

    /// User-defined environments, keyed by name
    #[serde(default)]
    pub environments: BTreeMap<String, CustomEnvironment>,
}

fn default_environment() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            api: ApiConfig::default(),
            local: LocalConfig::default(),
            environments: BTreeMap::new(),
        }
    }
}

impl FabricConfig {
    /// Environment table including any user-defined entries
    pub fn environment_table(&self) -> EnvironmentTable {
        EnvironmentTable::new(&self.environments)
    }
}

/// Request pipeline section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for idempotent requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries in milliseconds
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Delay between long-running operation polls when the backend gives no hint
    #[serde(default = "default_lro_poll_interval")]
    pub lro_poll_interval_ms: u64,

    /// Upper bound on long-running operation polls
    #[serde(default = "default_lro_max_polls")]
    pub lro_max_polls: u32,

    /// Overrides the environment's API root (testing, proxies)
    #[serde(default)]
    pub base_url_override: Option<String>,
}

fn default_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff() -> u64 {
    500
}

fn default_lro_poll_interval() -> u64 {
    1000
}

fn default_lro_max_polls() -> u32 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff(),
            lro_poll_interval_ms: default_lro_poll_interval(),
            lro_max_polls: default_lro_max_polls(),
            base_url_override: None,
        }
    }
}

/// Local folder mapping section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalConfig {
    /// Root under which workspace folders are created
    #[serde(default = "default_workspaces_root")]
    pub workspaces_root: PathBuf,

    /// Where folder mappings are persisted
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_workspaces_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fabric-workspaces")
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fabric")
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            workspaces_root: default_workspaces_root(),
            data_dir: default_data_dir(),
        }
    }
}

/// A user-defined environment entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomEnvironment {
    pub api_base_url: String,
    pub portal_url: String,
}
