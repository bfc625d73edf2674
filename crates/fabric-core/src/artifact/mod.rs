//! Artifact management module
//!
//! CRUD and definition operations, definition part decoding, and the tree
//! presentation strategy table.

pub mod definition;
mod manager;
mod tree;
mod types;

pub use definition::{decode_definition, decode_part, encode_part, DecodedPart, PLATFORM_PART_PATH};
pub use manager::ArtifactManager;
pub use tree::{
    definition_children, ArtifactNodeKind, ArtifactTreeNode, ArtifactTypeHandler,
    DefaultArtifactHandler, WorkspaceTree, WorkspaceTreeNode,
};
pub use types::{
    Artifact, ArtifactId, CreateArtifactRequest, DefinitionPart, ItemDefinition, PayloadType,
    UpdateArtifactRequest,
};
