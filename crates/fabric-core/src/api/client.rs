//! The API client seam
//!
//! Every remote call made by the managers goes through `ApiClient`. The
//! production client runs the request pipeline; `MockApiClient` implements
//! the same trait for tests.

use super::pipeline::{AuthenticationPolicy, Next, RequestPolicy, RetryPolicy, TracingPolicy};
use super::transport::{HttpRequest, HttpTransport, UreqTransport};
use super::types::{ApiRequestOptions, ApiResponse};
use crate::auth::TokenProvider;
use crate::cancel::{check_cancelled, OrCancelExt};
use crate::config::ApiConfig;
use crate::error::Result;
use crate::session::SessionContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Typed request/response pipeline
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Send one request. Non-2xx statuses are returned as responses;
    /// only transport failures and cancellation are errors.
    async fn send_request(&self, options: ApiRequestOptions) -> Result<ApiResponse>;
}

/// Shared handle to any API client
pub type SharedApiClient = Arc<dyn ApiClient>;

/// Production client
pub struct FabricApiClient {
    session: Arc<SessionContext>,
    base_url_override: Option<String>,
    policies: Vec<Arc<dyn RequestPolicy>>,
    transport: Arc<dyn HttpTransport>,
}

impl FabricApiClient {
    /// Client with the default pipeline over `ureq`
    pub fn new(
        session: Arc<SessionContext>,
        tokens: Arc<dyn TokenProvider>,
        config: &ApiConfig,
    ) -> Self {
        let transport = Arc::new(UreqTransport::new(Duration::from_secs(config.timeout_secs)));
        Self::with_transport(session, tokens, config, transport)
    }

    /// Client with the default pipeline over a custom transport
    pub fn with_transport(
        session: Arc<SessionContext>,
        tokens: Arc<dyn TokenProvider>,
        config: &ApiConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let policies: Vec<Arc<dyn RequestPolicy>> = vec![
            Arc::new(AuthenticationPolicy::new(tokens)),
            Arc::new(RetryPolicy::new(
                config.max_retries,
                Duration::from_millis(config.retry_backoff_ms),
            )),
            Arc::new(TracingPolicy),
        ];

        Self {
            session,
            base_url_override: config.base_url_override.clone(),
            policies,
            transport,
        }
    }

    /// Resolve the request URL against the environment current right now
    fn resolve_url(&self, path: &str) -> Result<Url> {
        let base = match self.base_url_override {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None => self.session.environment().api_base_url,
        };

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Ok(Url::parse(&format!("{}{}", base, path))?)
    }
}

#[async_trait]
impl ApiClient for FabricApiClient {
    async fn send_request(&self, options: ApiRequestOptions) -> Result<ApiResponse> {
        let cancellation = options.cancellation.clone();
        check_cancelled(cancellation.as_ref())?;

        let request = HttpRequest {
            method: options.method,
            url: self.resolve_url(&options.path_template)?,
            headers: options.headers,
            body: options.body,
        };

        Next::new(&self.policies, self.transport.as_ref())
            .run(request)
            .or_cancel(cancellation.as_ref())
            .await?
    }
}
