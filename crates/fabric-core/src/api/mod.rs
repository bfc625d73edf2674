//! HTTP API client
//!
//! Typed request/response pipeline over HTTP, with an interception layer
//! for deterministic tests.
//!
//! # Architecture
//!
//! ```text
//! ArtifactManager / WorkspaceManager
//!         │ ApiRequestOptions
//!         ▼
//!   dyn ApiClient ──────────────┬──────────────────────┐
//!         │                     │                      │
//!  FabricApiClient        MockApiClient          (any embedder)
//!   auth → retry → tracing   interceptor or pass-through
//!         │
//!   dyn HttpTransport (ureq)
//! ```

mod client;
mod mock;
mod paging;
mod pipeline;
mod transport;
mod types;

pub use client::{ApiClient, FabricApiClient, SharedApiClient};
pub use mock::{Interceptor, MockApiClient};
pub use paging::{list_all, Page};
pub use pipeline::{AuthenticationPolicy, Next, RequestPolicy, RetryPolicy, TracingPolicy};
pub use transport::{HttpRequest, HttpTransport, UreqTransport};
pub use types::{ApiRequestOptions, ApiResponse, HttpMethod};
