//! Cancellation helpers
//!
//! Operations accept an optional `CancellationToken`. A cancelled operation
//! resolves to `FabricError::Cancelled`, distinct from success and failure.

use crate::error::{FabricError, Result};
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race a future against an optional cancellation token.
#[async_trait]
pub trait OrCancelExt: Sized {
    type Output;

    /// Returns `Err(FabricError::Cancelled)` if the token fires first.
    /// A missing token never cancels.
    async fn or_cancel(self, token: Option<&CancellationToken>) -> Result<Self::Output>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, token: Option<&CancellationToken>) -> Result<Self::Output> {
        match token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(FabricError::Cancelled),
                res = self => Ok(res),
            },
            None => Ok(self.await),
        }
    }
}

/// Fail fast when the caller already gave up
pub fn check_cancelled(token: Option<&CancellationToken>) -> Result<()> {
    match token {
        Some(token) if token.is_cancelled() => Err(FabricError::Cancelled),
        _ => Ok(()),
    }
}
