//! Workspace management module
//!
//! # Architecture
//!
//! ```text
//! WorkspaceManager
//!     │
//!     ├── WorkspaceCache (in memory)
//!     │   └── HashMap<WorkspaceId, Workspace> + CacheState
//!     │
//!     ├── FolderMappingStorage (disk I/O)
//!     │   └── <data_dir>/folder-mappings.json
//!     │
//!     └── ChangeNotifier
//!         └── currentWorkspace / connectionState / workspaces
//! ```

mod folders;
mod manager;
mod storage;
mod types;

pub use folders::{FolderNode, FolderTree};
pub use manager::WorkspaceManager;
pub use storage::{FolderMappingStorage, FolderMappings};
pub use types::{
    CacheState, ConnectionState, CreateWorkspaceOptions, SourceControlInfo, Workspace,
    WorkspaceFolder, WorkspaceId,
};
