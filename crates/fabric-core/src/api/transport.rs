//! HTTP transport at the bottom of the request pipeline
//!
//! The production transport drives blocking `ureq` on the tokio blocking
//! pool so callers stay asynchronous.

use super::types::{ApiResponse, HttpMethod};
use crate::error::{ApiRequestError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// A fully resolved outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }
}

/// Sends one request and returns whatever status the server answered with
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<ApiResponse>;
}

/// `ureq`-backed transport
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

#[async_trait]
impl HttpTransport for UreqTransport {
    async fn send(&self, request: HttpRequest) -> Result<ApiResponse> {
        let agent = self.agent.clone();

        let outcome = tokio::task::spawn_blocking(move || send_blocking(&agent, request))
            .await
            .map_err(|e| ApiRequestError::Transport(format!("Transport task failed: {}", e)))?;

        Ok(outcome?)
    }
}

fn send_blocking(
    agent: &ureq::Agent,
    request: HttpRequest,
) -> std::result::Result<ApiResponse, ApiRequestError> {
    let mut call = agent.request(request.method.as_str(), request.url.as_str());
    for (name, value) in &request.headers {
        call = call.set(name, value);
    }

    let result = match request.body {
        Some(ref body) => call.send_string(body),
        None => call.call(),
    };

    match result {
        Ok(response) => read_response(response),
        // Non-2xx is a response, not a transport failure
        Err(ureq::Error::Status(_, response)) => read_response(response),
        Err(ureq::Error::Transport(transport)) => Err(transport.into()),
    }
}

fn read_response(response: ureq::Response) -> std::result::Result<ApiResponse, ApiRequestError> {
    let status = response.status();
    let headers: BTreeMap<String, String> = response
        .headers_names()
        .into_iter()
        .filter_map(|name| {
            let value = response.header(&name)?.to_string();
            Some((name.to_ascii_lowercase(), value))
        })
        .collect();

    let body = response.into_string().map_err(|e| {
        if e.kind() == std::io::ErrorKind::TimedOut {
            ApiRequestError::Timeout
        } else {
            ApiRequestError::Transport(format!("Failed to read response body: {}", e))
        }
    })?;

    Ok(ApiResponse::new(status, headers, body))
}

