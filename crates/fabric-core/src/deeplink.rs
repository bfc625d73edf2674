//! Deep-link handling
//!
//! Opens an artifact named by an external URI:
//!
//! ```text
//! <scheme>://<host>/?workspaceId=<guid>&artifactId=<guid>[&Environment=<name>]
//! ```
//!
//! The handler is a strict state machine. Every invalid input is logged with
//! a stable message prefix and ends the run; nothing is thrown to the caller.
//!
//! ```text
//! Parse -> ValidateIds -> ResolveEnvironment -> ResolveWorkspace
//!       -> ResolveArtifact -> ConfirmAndOpen -> Done
//!                  (any step) -> Error
//! ```

use crate::artifact::{Artifact, ArtifactId, ArtifactManager};
use crate::config::{ConfigurationStore, EnvironmentTable};
use crate::error::{FabricError, Result};
use crate::extension::ServiceCollection;
use crate::session::SessionContext;
use crate::workspace::{Workspace, WorkspaceId, WorkspaceManager};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const INVALID_WORKSPACE_ID: &str = "Invalid workspace identifier";
pub const INVALID_ARTIFACT_ID: &str = "Invalid artifact identifier";
pub const INVALID_ENVIRONMENT: &str = "Environment parameter not valid";

/// Steps of the handling state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepLinkState {
    Parse,
    ValidateIds,
    ResolveEnvironment,
    ResolveWorkspace,
    ResolveArtifact,
    ConfirmAndOpen,
    Done,
    Error,
}

impl fmt::Display for DeepLinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Raw parameters of one deep link
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLinkRequest {
    pub workspace_id: String,
    pub artifact_id: String,
    pub environment: Option<String>,
}

impl DeepLinkRequest {
    /// Extract the parameters from a URI. Query keys match case-insensitively.
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri.trim())?;
        let mut request = Self::default();

        for (key, value) in url.query_pairs() {
            if key.eq_ignore_ascii_case("workspaceId") {
                request.workspace_id = value.trim().to_string();
            } else if key.eq_ignore_ascii_case("artifactId") {
                request.artifact_id = value.trim().to_string();
            } else if key.eq_ignore_ascii_case("environment") {
                request.environment = Some(value.trim().to_string());
            }
        }

        Ok(request)
    }
}

/// How a deep link ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLinkOutcome {
    /// Done; the artifact was opened
    Opened(Artifact),
    /// Done; the user said no
    Declined,
    /// Error; `state` is where handling stopped
    Failed { state: DeepLinkState, message: String },
    /// The caller cancelled
    Cancelled,
}

impl DeepLinkOutcome {
    /// Terminal state of the machine
    pub fn final_state(&self) -> DeepLinkState {
        match self {
            DeepLinkOutcome::Opened(_) | DeepLinkOutcome::Declined => DeepLinkState::Done,
            DeepLinkOutcome::Failed { .. } | DeepLinkOutcome::Cancelled => DeepLinkState::Error,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            DeepLinkOutcome::Failed { message, .. } => Some(message.as_str()),
            _ => None,
        }
    }
}

/// Asks the user a yes/no question
#[async_trait]
pub trait UserPrompt: Send + Sync {
    /// `false` for a negative or dismissed answer
    async fn confirm(&self, message: &str) -> bool;
}

/// Opens a resolved artifact in the host
#[async_trait]
pub trait ArtifactOpener: Send + Sync {
    async fn open(&self, workspace: &Workspace, artifact: &Artifact) -> Result<()>;
}

struct Failure {
    state: DeepLinkState,
    message: String,
}

impl Failure {
    fn at(state: DeepLinkState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }
}

enum Step {
    Continue,
    Declined,
}

/// Drives one deep link from URI to opened artifact
pub struct DeepLinkHandler {
    workspaces: Arc<WorkspaceManager>,
    artifacts: Arc<ArtifactManager>,
    session: Arc<SessionContext>,
    config: Arc<dyn ConfigurationStore>,
    environments: EnvironmentTable,
    prompt: Arc<dyn UserPrompt>,
    opener: Arc<dyn ArtifactOpener>,
}

impl DeepLinkHandler {
    pub fn new(
        services: &ServiceCollection,
        session: Arc<SessionContext>,
        config: Arc<dyn ConfigurationStore>,
        environments: EnvironmentTable,
        prompt: Arc<dyn UserPrompt>,
        opener: Arc<dyn ArtifactOpener>,
    ) -> Self {
        Self {
            workspaces: services.workspace_manager.clone(),
            artifacts: services.artifact_manager.clone(),
            session,
            config,
            environments,
            prompt,
            opener,
        }
    }

    /// Handle one URI to a terminal state
    pub async fn handle(&self, uri: &str, cancel: Option<&CancellationToken>) -> DeepLinkOutcome {
        let outcome = match self.run(uri, cancel).await {
            Ok(outcome) => outcome,
            Err(failure) => DeepLinkOutcome::Failed {
                state: failure.state,
                message: failure.message,
            },
        };

        match &outcome {
            DeepLinkOutcome::Opened(artifact) => {
                tracing::info!(artifact_id = %artifact.id, "Deep link opened artifact")
            }
            DeepLinkOutcome::Declined => tracing::info!("Deep link declined by user"),
            DeepLinkOutcome::Failed { state, .. } => {
                tracing::debug!(%state, "Deep link ended in error")
            }
            DeepLinkOutcome::Cancelled => tracing::info!("Deep link cancelled"),
        }
        outcome
    }

    async fn run(
        &self,
        uri: &str,
        cancel: Option<&CancellationToken>,
    ) -> std::result::Result<DeepLinkOutcome, Failure> {
        // Parse
        let request = DeepLinkRequest::parse(uri).map_err(|e| {
            tracing::warn!(uri, error = %e, "Invalid deep link URI");
            Failure::at(DeepLinkState::Parse, format!("Invalid deep link URI: {}", e))
        })?;

        // ValidateIds
        let (workspace_id, artifact_id) = validate_ids(&request)?;

        // ResolveEnvironment
        match self.resolve_environment(&request, cancel).await {
            Ok(Step::Continue) => {}
            Ok(Step::Declined) => return Ok(DeepLinkOutcome::Declined),
            Err(FabricError::Cancelled) => return Ok(DeepLinkOutcome::Cancelled),
            Err(e) => return Err(Failure::at(DeepLinkState::ResolveEnvironment, e.to_string())),
        }

        // ResolveWorkspace
        let workspace = match self.workspaces.get_workspace_by_id(workspace_id, cancel).await {
            Ok(Some(workspace)) => workspace,
            Ok(None) => {
                tracing::warn!(workspace_id = %workspace_id, "Workspace not found for deep link");
                return Err(Failure::at(
                    DeepLinkState::ResolveWorkspace,
                    format!("Workspace {} not found", workspace_id),
                ));
            }
            Err(FabricError::Cancelled) => return Ok(DeepLinkOutcome::Cancelled),
            Err(e) => {
                tracing::warn!(workspace_id = %workspace_id, error = %e, "Could not resolve workspace");
                return Err(Failure::at(DeepLinkState::ResolveWorkspace, e.to_string()));
            }
        };

        // ResolveArtifact
        let artifact = match self.artifacts.list_artifacts(workspace.id, cancel).await {
            Ok(items) => items.into_iter().find(|a| a.id == artifact_id),
            Err(FabricError::Cancelled) => return Ok(DeepLinkOutcome::Cancelled),
            Err(e) => {
                tracing::warn!(workspace_id = %workspace.id, error = %e, "Could not list artifacts");
                return Err(Failure::at(DeepLinkState::ResolveArtifact, e.to_string()));
            }
        };
        let Some(artifact) = artifact else {
            tracing::warn!(
                workspace_id = %workspace.id,
                artifact_id = %artifact_id,
                "Artifact not found in workspace"
            );
            return Err(Failure::at(
                DeepLinkState::ResolveArtifact,
                format!(
                    "Artifact {} not found in workspace {}",
                    artifact_id, workspace.display_name
                ),
            ));
        };

        // ConfirmAndOpen
        let question = format!(
            "Open {} '{}' from workspace '{}'?",
            artifact.artifact_type, artifact.display_name, workspace.display_name
        );
        if !self.prompt.confirm(&question).await {
            return Ok(DeepLinkOutcome::Declined);
        }
        // The prompt may have waited on the user for a while
        if crate::cancel::check_cancelled(cancel).is_err() {
            return Ok(DeepLinkOutcome::Cancelled);
        }

        if let Err(e) = self.opener.open(&workspace, &artifact).await {
            tracing::warn!(artifact_id = %artifact.id, error = %e, "Could not open artifact");
            return Err(Failure::at(DeepLinkState::ConfirmAndOpen, e.to_string()));
        }
        self.workspaces.set_current_workspace(Some(workspace));

        Ok(DeepLinkOutcome::Opened(artifact))
    }

    /// Switch environment if the link asks for another one. The switch is
    /// persisted and prior state cleared before resolution continues.
    async fn resolve_environment(
        &self,
        request: &DeepLinkRequest,
        cancel: Option<&CancellationToken>,
    ) -> std::result::Result<Step, FabricError> {
        let Some(ref requested) = request.environment else {
            return Ok(Step::Continue);
        };

        let Some(target) = self.environments.resolve(requested).cloned() else {
            tracing::warn!(environment = %requested, "{}", INVALID_ENVIRONMENT);
            return Err(FabricError::validation(format!(
                "{}: {}",
                INVALID_ENVIRONMENT, requested
            )));
        };

        let current = self.config.environment();
        if current.eq_ignore_ascii_case(&target.name) {
            return Ok(Step::Continue);
        }

        let question = format!(
            "This link points to the {} environment. Switch from {}?",
            target.name, current
        );
        if !self.prompt.confirm(&question).await {
            return Ok(Step::Declined);
        }
        crate::cancel::check_cancelled(cancel)?;

        self.config.update_environment(&target.name).await?;
        tracing::info!(from = %current, to = %target.name, "Environment switched");
        self.session.set_environment(target);
        self.workspaces.clear_prior_state_if_any()?;
        self.artifacts.clear_cache();

        Ok(Step::Continue)
    }
}

fn validate_ids(request: &DeepLinkRequest) -> std::result::Result<(WorkspaceId, ArtifactId), Failure> {
    let Some(workspace_id) = parse_guid(&request.workspace_id) else {
        tracing::warn!(value = %request.workspace_id, "{}", INVALID_WORKSPACE_ID);
        return Err(Failure::at(
            DeepLinkState::ValidateIds,
            format!("{}: '{}'", INVALID_WORKSPACE_ID, request.workspace_id),
        ));
    };

    let Some(artifact_id) = parse_guid(&request.artifact_id) else {
        tracing::warn!(value = %request.artifact_id, "{}", INVALID_ARTIFACT_ID);
        return Err(Failure::at(
            DeepLinkState::ValidateIds,
            format!("{}: '{}'", INVALID_ARTIFACT_ID, request.artifact_id),
        ));
    };

    Ok((WorkspaceId::from_uuid(workspace_id), ArtifactId::from_uuid(artifact_id)))
}

/// Only the hyphenated 8-4-4-4-12 form is accepted
fn parse_guid(value: &str) -> Option<uuid::Uuid> {
    if value.len() != 36 {
        return None;
    }
    uuid::Uuid::parse_str(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_query_keys_are_case_insensitive() {
        let request = DeepLinkRequest::parse(
            "fabric://open/?WORKSPACEID=a&artifactid=b&Environment=daily",
        )
        .unwrap();
        assert_eq!(request.workspace_id, "a");
        assert_eq!(request.artifact_id, "b");
        assert_eq!(request.environment.as_deref(), Some("daily"));
    }

    #[test]
    fn test_missing_environment_is_none() {
        let request = DeepLinkRequest::parse("fabric://open/?workspaceId=a&artifactId=b").unwrap();
        assert!(request.environment.is_none());
    }

    #[test]
    fn test_guid_forms() {
        assert!(parse_guid("cfafbeb1-8037-4d0c-896e-a46fb27ff229").is_some());
        assert!(parse_guid("cfafbeb180374d0c896ea46fb27ff229").is_none());
        assert!(parse_guid("cfafbeb1-8037-4d0c-896e-a46fb27ff22z").is_none());
        assert!(parse_guid("").is_none());
    }

    #[test]
    fn test_outcome_final_states() {
        assert_eq!(DeepLinkOutcome::Declined.final_state(), DeepLinkState::Done);
        let failed = DeepLinkOutcome::Failed {
            state: DeepLinkState::ValidateIds,
            message: INVALID_WORKSPACE_ID.to_string(),
        };
        assert_eq!(failed.final_state(), DeepLinkState::Error);
        assert_eq!(failed.message(), Some(INVALID_WORKSPACE_ID));
    }
}
