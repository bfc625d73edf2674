//! Intercepting API client for tests
//!
//! `MockApiClient` implements `ApiClient` so the managers run their
//! production code paths unchanged. At most one interceptor is active; when
//! none is set, requests pass through to the wrapped client.

use super::client::{ApiClient, SharedApiClient};
use super::types::{ApiRequestOptions, ApiResponse};
use crate::cancel::{check_cancelled, OrCancelExt};
use crate::error::{ApiRequestError, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

/// Per-request programmable responder
pub type Interceptor = Arc<dyn Fn(&ApiRequestOptions) -> Result<ApiResponse> + Send + Sync>;

/// Test double for `ApiClient`
#[derive(Default)]
pub struct MockApiClient {
    inner: Option<SharedApiClient>,
    interceptor: RwLock<Option<Interceptor>>,
    latency: RwLock<Option<Duration>>,
    requests: Mutex<Vec<ApiRequestOptions>>,
}

impl MockApiClient {
    /// Double with nothing behind it; unintercepted requests fail
    pub fn new() -> Self {
        Self::default()
    }

    /// Double that passes unintercepted requests to `inner`
    pub fn wrapping(inner: SharedApiClient) -> Self {
        Self {
            inner: Some(inner),
            ..Self::default()
        }
    }

    /// Answer every request with `status` and a JSON body
    pub fn respond_with_json(&self, status: u16, body: serde_json::Value) {
        self.set_interceptor(Arc::new(move |_| Ok(ApiResponse::json(status, &body))));
    }

    /// Answer every request with `status` and a plain-text body
    pub fn respond_with_text(&self, status: u16, body: impl Into<String>) {
        let body = body.into();
        self.set_interceptor(Arc::new(move |_| Ok(ApiResponse::text(status, body.clone()))));
    }

    /// Compute each response from the request
    pub fn respond_with<F>(&self, factory: F)
    where
        F: Fn(&ApiRequestOptions) -> ApiResponse + Send + Sync + 'static,
    {
        self.set_interceptor(Arc::new(move |options| Ok(factory(options))));
    }

    /// Fail every send with `error`
    pub fn throw_on_send(&self, error: ApiRequestError) {
        self.set_interceptor(Arc::new(move |_| Err(error.clone().into())));
    }

    pub fn interceptor(&self) -> Option<Interceptor> {
        self.interceptor.read().clone()
    }

    /// Replace the active interceptor
    pub fn set_interceptor(&self, interceptor: Interceptor) {
        *self.interceptor.write() = Some(interceptor);
    }

    /// Restore pass-through behaviour
    pub fn clear_interceptor(&self) {
        *self.interceptor.write() = None;
    }

    /// Delay every intercepted response, to open overlap windows in tests
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Every request seen so far, oldest first
    pub fn requests(&self) -> Vec<ApiRequestOptions> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<ApiRequestOptions> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn send_request(&self, options: ApiRequestOptions) -> Result<ApiResponse> {
        let cancellation = options.cancellation.clone();
        check_cancelled(cancellation.as_ref())?;
        self.requests.lock().push(options.clone());

        let interceptor = self.interceptor();
        let Some(interceptor) = interceptor else {
            return match self.inner {
                Some(ref inner) => inner.send_request(options).await,
                None => Err(ApiRequestError::Transport(format!(
                    "No interceptor configured for {} {}",
                    options.method, options.path_template
                ))
                .into()),
            };
        };

        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency)
                .or_cancel(cancellation.as_ref())
                .await?;
        }

        interceptor(&options)
    }
}
