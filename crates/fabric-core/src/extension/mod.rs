//! Satellite extension module
//!
//! Satellites register through `ExtensionRegistry::add_extension`, the only
//! entry point between them and the core, and receive the shared
//! `ServiceCollection`.

mod registry;
mod types;

pub use registry::{ExtensionRegistry, TelemetryPropertiesFn, CORE_API_VERSION};
pub use types::{
    CommandManager, ExtensionDescriptor, ExtensionLifecycle, LocalProjectTreeNodeProvider,
    ServiceCollection,
};
