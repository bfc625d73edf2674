//! Configuration module for Fabric
//!
//! Handles loading and parsing of `.fabric.toml` configuration files
//! with support for environment variable expansion, the table of known
//! backend environments, and the persistence seam used when the current
//! environment is switched.

mod environment;
mod loader;
mod store;
mod types;

pub use environment::{known_environments, Environment, EnvironmentTable, DEFAULT_ENVIRONMENT};
pub use loader::{load_config, load_from_file, sample_config, user_config_path};
pub use store::{ConfigurationStore, FileConfigurationStore, MemoryConfigurationStore};
pub use types::{ApiConfig, CustomEnvironment, FabricConfig, LocalConfig};
