//! Composable request pipeline
//!
//! Each stage sees the request, may change it, and hands it to the rest of
//! the chain through `Next`. The last link is the transport.
//!
//! ```text
//! authentication -> retry -> tracing -> transport
//! ```

use super::transport::{HttpRequest, HttpTransport};
use super::types::ApiResponse;
use crate::auth::TokenProvider;
use crate::error::{is_transient_status, FabricError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One stage of the pipeline
#[async_trait]
pub trait RequestPolicy: Send + Sync {
    async fn send(&self, request: HttpRequest, next: Next<'_>) -> Result<ApiResponse>;
}

/// The remainder of the pipeline after the current stage
#[derive(Clone, Copy)]
pub struct Next<'a> {
    policies: &'a [Arc<dyn RequestPolicy>],
    transport: &'a dyn HttpTransport,
}

impl<'a> Next<'a> {
    pub fn new(policies: &'a [Arc<dyn RequestPolicy>], transport: &'a dyn HttpTransport) -> Self {
        Self {
            policies,
            transport,
        }
    }

    pub async fn run(self, request: HttpRequest) -> Result<ApiResponse> {
        match self.policies.split_first() {
            Some((policy, rest)) => {
                policy
                    .send(request, Next::new(rest, self.transport))
                    .await
            }
            None => self.transport.send(request).await,
        }
    }
}

/// Adds the bearer token
pub struct AuthenticationPolicy {
    tokens: Arc<dyn TokenProvider>,
}

impl AuthenticationPolicy {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl RequestPolicy for AuthenticationPolicy {
    async fn send(&self, mut request: HttpRequest, next: Next<'_>) -> Result<ApiResponse> {
        let token = self.tokens.token().await?;
        request.set_header("Authorization", format!("Bearer {}", token));
        next.run(request).await
    }
}

/// Retries idempotent GETs on timeouts, transport failures, 429 and 5xx
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    fn delay(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        retry_after
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.backoff * (attempt + 1))
    }
}

#[async_trait]
impl RequestPolicy for RetryPolicy {
    async fn send(&self, request: HttpRequest, next: Next<'_>) -> Result<ApiResponse> {
        if !request.method.is_idempotent_read() {
            return next.run(request).await;
        }

        let mut attempt = 0;
        loop {
            let can_retry = attempt < self.max_retries;

            match next.run(request.clone()).await {
                Ok(response) if can_retry && is_transient_status(response.status) => {
                    let delay = self.delay(attempt, response.retry_after_secs());
                    tracing::debug!(
                        url = %request.url,
                        status = response.status,
                        attempt,
                        "Retrying request after {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(FabricError::Api(err)) if can_retry && err.is_transient() => {
                    let delay = self.delay(attempt, None);
                    tracing::debug!(url = %request.url, attempt, error = %err, "Retrying request after {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }

            attempt += 1;
        }
    }
}

/// Records method, URL, status and elapsed time
pub struct TracingPolicy;

#[async_trait]
impl RequestPolicy for TracingPolicy {
    async fn send(&self, request: HttpRequest, next: Next<'_>) -> Result<ApiResponse> {
        let method = request.method;
        let url = request.url.clone();
        let started = Instant::now();

        let result = next.run(request).await;

        match &result {
            Ok(response) => tracing::debug!(
                %method,
                %url,
                status = response.status,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Request completed"
            ),
            Err(err) => tracing::debug!(
                %method,
                %url,
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %err,
                "Request failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::HttpMethod;
    use crate::auth::StaticTokenProvider;
    use crate::error::ApiRequestError;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, VecDeque};

    /// Replays scripted outcomes and records what reached it
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Result<ApiResponse>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<Result<ApiResponse>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<ApiResponse> {
            self.seen.lock().push(request);
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(ApiResponse::text(200, "")))
        }
    }

    fn request(method: HttpMethod) -> HttpRequest {
        HttpRequest {
            method,
            url: "https://api.example.com/v1/workspaces".parse().unwrap(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    fn pipeline() -> Vec<Arc<dyn RequestPolicy>> {
        vec![
            Arc::new(AuthenticationPolicy::new(Arc::new(StaticTokenProvider::new("t0k")))),
            Arc::new(RetryPolicy::new(2, Duration::from_millis(1))),
            Arc::new(TracingPolicy),
        ]
    }

    #[tokio::test]
    async fn test_get_is_retried_on_server_error() {
        let transport = ScriptedTransport::new(vec![
            Ok(ApiResponse::text(503, "busy")),
            Err(ApiRequestError::Timeout.into()),
            Ok(ApiResponse::text(200, "ok")),
        ]);
        let policies = pipeline();

        let response = Next::new(&policies, &transport)
            .run(request(HttpMethod::Get))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        let seen = transport.seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].headers["authorization"], "Bearer t0k");
    }

    #[tokio::test]
    async fn test_post_is_never_retried() {
        let transport = ScriptedTransport::new(vec![Ok(ApiResponse::text(503, "busy"))]);
        let policies = pipeline();

        let response = Next::new(&policies, &transport)
            .run(request(HttpMethod::Post))
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(transport.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let transport = ScriptedTransport::new(vec![
            Ok(ApiResponse::text(500, "1")),
            Ok(ApiResponse::text(500, "2")),
            Ok(ApiResponse::text(500, "3")),
            Ok(ApiResponse::text(200, "never reached")),
        ]);
        let policies = pipeline();

        let response = Next::new(&policies, &transport)
            .run(request(HttpMethod::Get))
            .await
            .unwrap();

        assert_eq!(response.body_as_text, "3");
        assert_eq!(transport.seen.lock().len(), 3);
    }
}
