//! Error types for Fabric Core
//!
//! Provides a unified error type for all core operations, plus the
//! `ApiRequestError` carried by failed remote calls.

use thiserror::Error;

/// Result type for Fabric Core operations
pub type Result<T> = std::result::Result<T, FabricError>;

/// Failure of a single remote request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiRequestError {
    /// The backend answered with a non-success status
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The transport gave up waiting for the backend
    #[error("Request timed out")]
    Timeout,

    /// Connection, DNS or I/O failure below HTTP
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ApiRequestError {
    /// HTTP status, when the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiRequestError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a transport-level retry may help
    pub fn is_transient(&self) -> bool {
        match self {
            ApiRequestError::Status { status, .. } => is_transient_status(*status),
            ApiRequestError::Timeout | ApiRequestError::Transport(_) => true,
        }
    }
}

/// 429 and 5xx are worth retrying for idempotent requests
pub(crate) fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Unified error type for Fabric Core
#[derive(Error, Debug)]
pub enum FabricError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Malformed input rejected before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote call did not succeed
    #[error(transparent)]
    Api(#[from] ApiRequestError),

    /// A satellite with this identity is already registered
    #[error("Extension already registered: {0}")]
    DuplicateRegistration(String),

    /// A satellite declared an API version outside the supported range
    #[error("Extension {identity} requests API version {requested}, core supports {supported}")]
    IncompatibleApiVersion {
        identity: String,
        requested: String,
        supported: String,
    },

    /// Absence of a resource, as opposed to a failure
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation aborted by the caller
    #[error("Operation cancelled")]
    Cancelled,
}

impl FabricError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        FabricError::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        FabricError::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        FabricError::NotFound(msg.into())
    }

    /// Create an error for a non-success response
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        FabricError::Api(ApiRequestError::Status {
            status,
            body: body.into(),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FabricError::Cancelled)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FabricError::NotFound(_))
    }

    /// HTTP status of the failed request, if any
    pub fn api_status(&self) -> Option<u16> {
        match self {
            FabricError::Api(err) => err.status(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for FabricError {
    fn from(err: serde_json::Error) -> Self {
        FabricError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for FabricError {
    fn from(err: toml::de::Error) -> Self {
        FabricError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for FabricError {
    fn from(err: toml::ser::Error) -> Self {
        FabricError::Config(err.to_string())
    }
}

impl From<url::ParseError> for FabricError {
    fn from(err: url::ParseError) -> Self {
        FabricError::validation(format!("Invalid request URL: {}", err))
    }
}

impl From<ureq::Transport> for ApiRequestError {
    fn from(transport: ureq::Transport) -> Self {
        let timed_out = std::error::Error::source(&transport)
            .and_then(|source| source.downcast_ref::<std::io::Error>())
            .map_or(false, |io| {
                matches!(
                    io.kind(),
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                )
            });

        if timed_out {
            ApiRequestError::Timeout
        } else {
            ApiRequestError::Transport(transport.to_string())
        }
    }
}
