//! Configuration loader with environment variable expansion
//!
//! Loads configuration from `.fabric.toml` in project root or user config directory.

use super::types::FabricConfig;
use crate::error::{FabricError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};

const ENV_VAR_PATTERN: &str = r"\$\{([^}]+)\}";

/// Load configuration from various sources
///
/// Priority order:
/// 1. Project-level `.fabric.toml`
/// 2. User-level `~/.config/fabric/config.toml`
/// 3. Default configuration
pub fn load_config(project_dir: &Path) -> Result<FabricConfig> {
    let project_config = project_dir.join(".fabric.toml");
    if project_config.exists() {
        return load_from_file(&project_config);
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            return load_from_file(&user_config);
        }
    }

    Ok(apply_env_overrides(FabricConfig::default()))
}

/// User config file path
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("fabric").join("config.toml"))
}

/// Load configuration from a specific file
pub fn load_from_file(path: &Path) -> Result<FabricConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: FabricConfig = toml::from_str(&content)?;

    expand_env_vars(&mut config)?;

    Ok(apply_env_overrides(config))
}

/// Expand ${VAR} patterns in string values
fn expand_env_vars(config: &mut FabricConfig) -> Result<()> {
    let env_regex =
        Regex::new(ENV_VAR_PATTERN).map_err(|e| FabricError::config(e.to_string()))?;

    for env in config.environments.values_mut() {
        env.api_base_url = expand_string(&env.api_base_url, &env_regex);
        env.portal_url = expand_string(&env.portal_url, &env_regex);
    }

    if let Some(ref base_url) = config.api.base_url_override {
        config.api.base_url_override = Some(expand_string(base_url, &env_regex));
    }

    let root = config.local.workspaces_root.to_string_lossy().into_owned();
    config.local.workspaces_root = PathBuf::from(expand_string(&root, &env_regex));

    Ok(())
}

/// Expand environment variables in a single string
fn expand_string(s: &str, regex: &Regex) -> String {
    regex
        .replace_all(s, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
}

/// Apply environment variable overrides for common settings
///
/// - FABRIC_ENVIRONMENT -> environment
/// - FABRIC_API_BASE_URL -> api.base_url_override
/// - FABRIC_WORKSPACES_ROOT -> local.workspaces_root
fn apply_env_overrides(mut config: FabricConfig) -> FabricConfig {
    if let Ok(env) = std::env::var("FABRIC_ENVIRONMENT") {
        if !env.is_empty() {
            config.environment = env.to_ascii_uppercase();
        }
    }

    if let Ok(url) = std::env::var("FABRIC_API_BASE_URL") {
        if !url.is_empty() {
            config.api.base_url_override = Some(url);
        }
    }

    if let Ok(root) = std::env::var("FABRIC_WORKSPACES_ROOT") {
        if !root.is_empty() {
            config.local.workspaces_root = PathBuf::from(root);
        }
    }

    config
}

/// Create a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Fabric Configuration
# Place this file in your project root as .fabric.toml
# or in ~/.config/fabric/config.toml for global settings

# Backend environment: PROD, MSIT, DXT, DAILY, EDOG, ONEBOX, MOCK
environment = "PROD"

[api]
timeout_secs = 60
max_retries = 3
retry_backoff_ms = 500

[local]
workspaces_root = "${HOME}/fabric-workspaces"

# Additional environments
[environments.staging]
api_base_url = "${FABRIC_STAGING_API}"
portal_url = "https://staging.example.com"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = FabricConfig::default();
        assert_eq!(config.environment, "PROD");
        assert_eq!(config.api.max_retries, 3);
    }

    #[test]
    fn test_expand_env_var() {
        let regex = Regex::new(ENV_VAR_PATTERN).unwrap();
        std::env::set_var("FABRIC_TEST_VAR", "test_value");
        let result = expand_string("prefix_${FABRIC_TEST_VAR}_suffix", &regex);
        assert_eq!(result, "prefix_test_value_suffix");
        std::env::remove_var("FABRIC_TEST_VAR");
    }

    #[test]
    fn test_missing_env_var() {
        let regex = Regex::new(ENV_VAR_PATTERN).unwrap();
        let result = expand_string("${FABRIC_NONEXISTENT_VAR}", &regex);
        assert_eq!(result, "${FABRIC_NONEXISTENT_VAR}");
    }

    #[test]
    fn test_sample_config_parses() {
        let config: FabricConfig = toml::from_str(sample_config()).unwrap();
        assert_eq!(config.environment, "PROD");
        assert!(config.environments.contains_key("staging"));
    }

    #[test]
    fn test_load_from_project_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".fabric.toml"),
            "environment = \"DAILY\"\n[api]\nmax_retries = 1\n",
        )
        .unwrap();

        let config = load_config(dir.path()).unwrap();
        if std::env::var("FABRIC_ENVIRONMENT").is_err() {
            assert_eq!(config.environment, "DAILY");
        }
        assert_eq!(config.api.max_retries, 1);
        assert_eq!(config.api.timeout_secs, 60);
    }
}
