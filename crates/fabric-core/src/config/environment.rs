//! Backend environments
//!
//! Every environment has a name and the two endpoints the host needs: the
//! REST API root and the portal used for external links.

use super::types::CustomEnvironment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the environment used when nothing is configured
pub const DEFAULT_ENVIRONMENT: &str = "PROD";

/// A resolved backend environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Canonical upper-case name
    pub name: String,

    /// REST root, without trailing slash
    pub api_base_url: String,

    /// Portal root, without trailing slash
    pub portal_url: String,
}

impl Environment {
    pub fn new(
        name: impl Into<String>,
        api_base_url: impl Into<String>,
        portal_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            portal_url: portal_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Built-in environments
pub fn known_environments() -> Vec<Environment> {
    vec![
        Environment::new(
            "PROD",
            "https://api.fabric.microsoft.com",
            "https://app.fabric.microsoft.com",
        ),
        Environment::new(
            "MSIT",
            "https://msitapi.fabric.microsoft.com",
            "https://msit.fabric.microsoft.com",
        ),
        Environment::new(
            "DXT",
            "https://dxtapi.fabric.microsoft.com",
            "https://dxt.fabric.microsoft.com",
        ),
        Environment::new(
            "DAILY",
            "https://dailyapi.fabric.microsoft.com",
            "https://daily.fabric.microsoft.com",
        ),
        Environment::new(
            "EDOG",
            "https://edogapi.fabric.microsoft.com",
            "https://edog.fabric.microsoft.com",
        ),
        Environment::new(
            "ONEBOX",
            "https://onebox.analysis-df.windows.net",
            "https://onebox.analysis-df.windows.net",
        ),
        Environment::new("MOCK", "http://localhost:8480", "http://localhost:8480"),
    ]
}

/// Lookup table over built-in and user-defined environments
#[derive(Debug, Clone)]
pub struct EnvironmentTable {
    environments: BTreeMap<String, Environment>,
}

impl EnvironmentTable {
    /// Built-in environments plus user-defined ones; user entries win on name clashes
    pub fn new(custom: &BTreeMap<String, CustomEnvironment>) -> Self {
        let mut environments: BTreeMap<String, Environment> = known_environments()
            .into_iter()
            .map(|env| (env.name.clone(), env))
            .collect();

        for (name, custom) in custom {
            let env = Environment::new(name, &custom.api_base_url, &custom.portal_url);
            environments.insert(env.name.clone(), env);
        }

        Self { environments }
    }

    /// Case-insensitive lookup
    pub fn resolve(&self, name: &str) -> Option<&Environment> {
        self.environments.get(&name.trim().to_ascii_uppercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }
}

impl Default for EnvironmentTable {
    fn default() -> Self {
        Self::new(&BTreeMap::new())
    }
}
