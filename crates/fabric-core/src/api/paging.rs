//! Continuation-token paging for list endpoints

use super::client::ApiClient;
use super::types::ApiRequestOptions;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// One page of a list response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

/// Follow `continuationToken` until the backend stops returning one.
/// A non-2xx page fails the whole listing.
pub async fn list_all<T: DeserializeOwned + Send>(
    api: &dyn ApiClient,
    path: &str,
    cancel: Option<&CancellationToken>,
) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut continuation: Option<String> = None;

    loop {
        let mut options = ApiRequestOptions::get(path).with_cancellation(cancel);
        if let Some(ref token) = continuation {
            options = options.query("continuationToken", token);
        }

        let page: Page<T> = api.send_request(options).await?.error_for_status()?.body()?;
        items.extend(page.value);

        match page.continuation_token {
            Some(token) if !token.is_empty() => continuation = Some(token),
            _ => break,
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, MockApiClient};
    use serde_json::json;

    #[tokio::test]
    async fn test_follows_continuation_tokens() {
        let mock = MockApiClient::new();
        mock.respond_with(|options| {
            if options.path_template.contains("continuationToken=page2") {
                ApiResponse::json(200, &json!({ "value": [3] }))
            } else {
                ApiResponse::json(200, &json!({ "value": [1, 2], "continuationToken": "page2" }))
            }
        });

        let items: Vec<u32> = list_all(&mock, "/v1/things", None).await.unwrap();

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_is_an_error() {
        let mock = MockApiClient::new();
        mock.respond_with_text(500, "boom");

        let result: Result<Vec<u32>> = list_all(&mock, "/v1/things", None).await;

        assert_eq!(result.unwrap_err().api_status(), Some(500));
    }
}
