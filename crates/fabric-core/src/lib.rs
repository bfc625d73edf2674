//! Fabric Core - Backend library for hosting remote artifacts
//!
//! This crate provides the UI-agnostic core:
//! - ApiClient request pipeline and its intercepting test double
//! - WorkspaceManager and ArtifactManager over the REST API
//! - ExtensionRegistry for independently shipped satellites
//! - DeepLinkHandler for externally supplied open requests
//! - Configuration loading and the environment table
//!
//! # Architecture
//!
//! ```text
//! Satellite ── add_extension ──→ ExtensionRegistry
//!     ↑                               │
//!     └──── Arc<ServiceCollection> ───┘
//!                 │
//!     WorkspaceManager  ArtifactManager  ←── DeepLinkHandler
//!                 │
//!     ApiClient: auth → retry → tracing → HttpTransport
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fabric_core::{ExtensionDescriptor, CORE_API_VERSION};
//!
//! let services = registry.add_extension(
//!     ExtensionDescriptor::new("contoso.fabric-notebook", CORE_API_VERSION)
//!         .with_artifact_type("Notebook"),
//! )?;
//! let workspaces = services.workspace_manager.list_workspaces(None).await?;
//! ```

pub mod api;
pub mod artifact;
pub mod auth;
pub mod cancel;
pub mod config;
pub mod deeplink;
pub mod error;
pub mod events;
pub mod extension;
pub mod session;
pub mod workspace;

// Re-export commonly used types
pub use api::{
    ApiClient, ApiRequestOptions, ApiResponse, FabricApiClient, HttpMethod, MockApiClient,
    SharedApiClient,
};
pub use artifact::{
    Artifact, ArtifactId, ArtifactManager, ArtifactTreeNode, ArtifactTypeHandler, ItemDefinition,
};
pub use auth::{StaticTokenProvider, TokenProvider};
pub use config::{ConfigurationStore, Environment, EnvironmentTable, FabricConfig};
pub use deeplink::{ArtifactOpener, DeepLinkHandler, DeepLinkOutcome, DeepLinkState, UserPrompt};
pub use error::{ApiRequestError, FabricError, Result};
pub use events::{Subscription, TrackedProperty};
pub use extension::{
    CommandManager, ExtensionDescriptor, ExtensionLifecycle, ExtensionRegistry,
    ServiceCollection, CORE_API_VERSION,
};
pub use session::SessionContext;
pub use tokio_util::sync::CancellationToken;
pub use workspace::{Workspace, WorkspaceId, WorkspaceManager};

/// Get the crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
