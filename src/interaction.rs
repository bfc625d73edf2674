//! Terminal implementations of the deep-link collaborators

use async_trait::async_trait;
use fabric_core::deeplink::{ArtifactOpener, UserPrompt};
use fabric_core::workspace::Workspace;
use fabric_core::{Artifact, ExtensionRegistry, Result, SessionContext};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Asks yes/no questions on stdin
pub struct StdinPrompt;

#[async_trait]
impl UserPrompt for StdinPrompt {
    async fn confirm(&self, message: &str) -> bool {
        let message = message.to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            write!(stdout, "{} [y/N] ", message)?;
            stdout.flush()?;

            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match answer {
            Ok(Ok(line)) => is_affirmative(&line),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Failed to read confirmation");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "Confirmation prompt aborted");
                false
            }
        }
    }
}

/// `y` or `yes`, any case
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// "Opens" an artifact by printing its portal address
pub struct PortalOpener {
    registry: Arc<ExtensionRegistry>,
    session: Arc<SessionContext>,
}

impl PortalOpener {
    pub fn new(registry: Arc<ExtensionRegistry>, session: Arc<SessionContext>) -> Self {
        Self { registry, session }
    }

    /// Portal URI from the handler registered for the artifact's type
    pub fn portal_uri(&self, artifact: &Artifact) -> String {
        let portal = self.session.environment().portal_url;
        self.registry
            .handler_for(&artifact.artifact_type)
            .external_uri(&portal, artifact)
    }
}

#[async_trait]
impl ArtifactOpener for PortalOpener {
    async fn open(&self, workspace: &Workspace, artifact: &Artifact) -> Result<()> {
        println!(
            "{} / {} ({})\n  {}",
            workspace.display_name,
            artifact.display_name,
            artifact.artifact_type,
            self.portal_uri(artifact)
        );
        Ok(())
    }
}
