//! Request and response shapes at the HTTP boundary

use crate::error::{FabricError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// HTTP verbs used by the REST API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Safe to replay without side effects
    pub fn is_idempotent_read(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Description of one remote call
#[derive(Debug, Clone)]
pub struct ApiRequestOptions {
    /// REST path with identifiers already embedded, e.g. `/v1/workspaces/{id}`
    pub path_template: String,
    pub method: HttpMethod,
    pub body: Option<String>,
    /// Header names are stored lower-case
    pub headers: BTreeMap<String, String>,
    pub cancellation: Option<CancellationToken>,
}

impl ApiRequestOptions {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path_template: path.into(),
            method,
            body: None,
            headers: BTreeMap::new(),
            cancellation: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Serialize `body` as JSON and declare it with a Content-Type header
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_string(body)?);
        Ok(self.header("Content-Type", "application/json"))
    }

    /// Append a query parameter to the path
    pub fn query(mut self, name: &str, value: &str) -> Self {
        let separator = if self.path_template.contains('?') { '&' } else { '?' };
        let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
        self.path_template = format!("{}{}{}={}", self.path_template, separator, name, encoded);
        self
    }

    pub fn with_cancellation(mut self, token: Option<&CancellationToken>) -> Self {
        self.cancellation = token.cloned();
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Response of one remote call, success or not
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    /// Header names are stored lower-case
    pub headers: BTreeMap<String, String>,
    pub body_as_text: String,
    /// Present when the body is valid JSON
    pub parsed_body: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn new(status: u16, headers: BTreeMap<String, String>, body_as_text: String) -> Self {
        let parsed_body = if body_as_text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&body_as_text).ok()
        };

        Self {
            status,
            headers: headers
                .into_iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value))
                .collect(),
            body_as_text,
            parsed_body,
        }
    }

    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self::new(status, headers, body.to_string())
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        Self::new(status, headers, body.into())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Seconds from a numeric `Retry-After` header
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.header("retry-after")?.trim().parse().ok()
    }

    /// Turn a non-2xx response into `ApiRequestError::Status`
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(FabricError::status(self.status, self.body_as_text))
        }
    }

    /// Deserialize the body into `T`
    pub fn body<T: DeserializeOwned>(&self) -> Result<T> {
        match self.parsed_body {
            Some(ref value) => Ok(serde_json::from_value(value.clone())?),
            None => Ok(serde_json::from_str(&self.body_as_text)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_sets_content_type() {
        let options = ApiRequestOptions::post("/v1/workspaces")
            .json(&serde_json::json!({ "displayName": "ws" }))
            .unwrap();
        assert_eq!(options.header_value("content-type"), Some("application/json"));
        assert_eq!(options.body.as_deref(), Some(r#"{"displayName":"ws"}"#));
    }

    #[test]
    fn test_query_encodes_values() {
        let options = ApiRequestOptions::get("/v1/workspaces")
            .query("continuationToken", "a b&c")
            .query("type", "Notebook");
        assert_eq!(
            options.path_template,
            "/v1/workspaces?continuationToken=a+b%26c&type=Notebook"
        );
    }

    #[test]
    fn test_response_parses_json_body() {
        let response = ApiResponse::json(200, &serde_json::json!({ "id": "x" }));
        assert_eq!(response.parsed_body.unwrap()["id"], "x");
        let text = ApiResponse::text(500, "boom");
        assert!(text.parsed_body.is_none());
        let err = text.error_for_status().unwrap_err();
        assert_eq!(err.api_status(), Some(500));
    }
}
