//! Process-wide session state
//!
//! Holds the active environment and signed-in identity. The production API
//! client resolves its base URL from here on every request, and the common
//! telemetry properties are read from here at call time.

use crate::config::Environment;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct SessionState {
    environment: Environment,
    tenant_id: Option<String>,
    user_id: Option<String>,
}

/// Shared, mutable session context
#[derive(Debug)]
pub struct SessionContext {
    session_id: String,
    host_version: String,
    state: RwLock<SessionState>,
}

impl SessionContext {
    pub fn new(environment: Environment) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            host_version: crate::version().to_string(),
            state: RwLock::new(SessionState {
                environment,
                tenant_id: None,
                user_id: None,
            }),
        }
    }

    pub fn environment(&self) -> Environment {
        self.state.read().environment.clone()
    }

    pub fn set_environment(&self, environment: Environment) {
        self.state.write().environment = environment;
    }

    /// Record the signed-in identity
    pub fn set_identity(&self, tenant_id: Option<String>, user_id: Option<String>) {
        let mut state = self.state.write();
        state.tenant_id = tenant_id;
        state.user_id = user_id;
    }

    pub fn tenant_id(&self) -> Option<String> {
        self.state.read().tenant_id.clone()
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Properties attached to every telemetry event, as of now
    pub fn telemetry_properties(&self) -> HashMap<String, String> {
        let state = self.state.read();
        let mut props = HashMap::new();
        props.insert("common.sessionId".to_string(), self.session_id.clone());
        props.insert("common.hostVersion".to_string(), self.host_version.clone());
        props.insert("common.environment".to_string(), state.environment.name.clone());
        if let Some(ref tenant) = state.tenant_id {
            props.insert("common.tenantId".to_string(), tenant.clone());
        }
        if let Some(ref user) = state.user_id {
            props.insert("common.userId".to_string(), user.clone());
        }
        props
    }
}
