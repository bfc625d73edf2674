//! Encoding and decoding of definition parts

use super::types::{DefinitionPart, ItemDefinition, PayloadType};
use crate::error::{FabricError, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

/// Path of the platform metadata part, never shown as a file
pub const PLATFORM_PART_PATH: &str = ".platform";

/// A definition part with its payload decoded to raw bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPart {
    pub path: String,
    pub content: Vec<u8>,
}

impl DecodedPart {
    /// Content as text, if it is valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Last path segment
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// Whether a part is the platform metadata file, at any depth
pub fn is_platform_part(path: &str) -> bool {
    path.trim_start_matches('/')
        .rsplit('/')
        .next()
        .is_some_and(|name| name == PLATFORM_PART_PATH)
}

/// Decode one part. `InlineBase64` is base64; anything else is UTF-8 text.
pub fn decode_part(part: &DefinitionPart) -> Result<DecodedPart> {
    let content = match part.payload_type {
        PayloadType::InlineBase64 => STANDARD.decode(part.payload.trim()).map_err(|e| {
            FabricError::Serialization(format!("Invalid base64 in part '{}': {}", part.path, e))
        })?,
        _ => part.payload.clone().into_bytes(),
    };

    Ok(DecodedPart {
        path: part.path.clone(),
        content,
    })
}

/// Decode every part except the platform metadata file
pub fn decode_definition(definition: &ItemDefinition) -> Result<Vec<DecodedPart>> {
    definition
        .parts
        .iter()
        .filter(|part| !is_platform_part(&part.path))
        .map(decode_part)
        .collect()
}

/// Build an `InlineBase64` part from raw bytes
pub fn encode_part(path: impl Into<String>, content: &[u8]) -> DefinitionPart {
    DefinitionPart {
        path: path.into(),
        payload_type: PayloadType::InlineBase64,
        payload: STANDARD.encode(content),
    }
}
