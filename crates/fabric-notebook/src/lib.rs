//! Fabric Notebook - satellite adding notebook support to the host
//!
//! Registers through `ExtensionRegistry::add_extension` like any independently
//! shipped satellite, and only talks to the core through the returned
//! `ServiceCollection`.
//!
//! # Example
//!
//! ```ignore
//! let notebook = fabric_notebook::activate(&registry)?;
//! // ...
//! registry.remove_extension(fabric_notebook::EXTENSION_ID).await?;
//! ```

pub mod commands;
pub mod handler;

use async_trait::async_trait;
use fabric_core::extension::{ExtensionLifecycle, ServiceCollection};
use fabric_core::{ExtensionDescriptor, ExtensionRegistry, Result, CORE_API_VERSION};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use commands::{NotebookCommands, EXPORT_COMMAND, PUBLISH_COMMAND};
pub use handler::{NotebookFolderProvider, NotebookHandler};

/// Identity the satellite registers under
pub const EXTENSION_ID: &str = "fabric.notebook";

/// Artifact type served by this satellite
pub const NOTEBOOK_TYPE: &str = "Notebook";

/// Handle to the activated satellite
pub struct NotebookExtension {
    services: Arc<ServiceCollection>,
    commands: Arc<NotebookCommands>,
    disposed: Arc<AtomicBool>,
}

impl NotebookExtension {
    pub fn services(&self) -> &Arc<ServiceCollection> {
        &self.services
    }

    pub fn commands(&self) -> &Arc<NotebookCommands> {
        &self.commands
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

struct NotebookLifecycle {
    disposed: Arc<AtomicBool>,
}

#[async_trait]
impl ExtensionLifecycle for NotebookLifecycle {
    async fn dispose(&self) -> Result<()> {
        self.disposed.store(true, Ordering::Release);
        tracing::info!(extension = EXTENSION_ID, "Notebook extension disposed");
        Ok(())
    }
}

/// Register with the host and bind the returned services
pub fn activate(registry: &ExtensionRegistry) -> Result<NotebookExtension> {
    let commands = Arc::new(NotebookCommands::new());
    let disposed = Arc::new(AtomicBool::new(false));

    let descriptor = ExtensionDescriptor::new(EXTENSION_ID, CORE_API_VERSION)
        .with_artifact_type(NOTEBOOK_TYPE)
        .with_tree_node_provider(Arc::new(NotebookHandler))
        .with_local_project_tree_node_provider(Arc::new(NotebookFolderProvider))
        .with_command_manager(commands.clone())
        .with_lifecycle(Arc::new(NotebookLifecycle {
            disposed: disposed.clone(),
        }));

    let services = registry.add_extension(descriptor)?;
    commands.bind(services.clone());

    tracing::info!(extension = EXTENSION_ID, "Notebook extension activated");
    Ok(NotebookExtension {
        services,
        commands,
        disposed,
    })
}
