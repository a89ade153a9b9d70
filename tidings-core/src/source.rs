//! Collaborator interfaces: where updates come from and where outbound
//! calls go.
//!
//! Both are implemented by the transport layer, which is not part of this
//! framework. The dispatch loop only needs [`UpdateSource`]; handlers use an
//! [`ApiClient`] (usually wrapped in a throttling layer) to talk back.

use crate::{error::BoxError, update::Update};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// A blocking fetch of the next batch of updates.
#[async_trait]
pub trait UpdateSource<E: Update>: Send + Sync + 'static {
    /// Fetch updates whose id is at least `offset`.
    ///
    /// `timeout` is the server-side wait the remote should honour; the
    /// dispatcher additionally enforces it on its side.
    async fn fetch(&self, offset: u64, timeout: Duration) -> Result<Vec<E>, BoxError>;
}

/// Errors returned by an outbound call.
#[derive(Error, Debug)]
pub enum CallError {
    /// The remote asked the caller to back off for the given delay.
    #[error("rate limited, retry after {0:?}")]
    RetryAfter(Duration),

    /// The remote rejected the request.
    #[error("api error {code}: {description}")]
    Api {
        /// Numeric error code reported by the remote.
        code: i32,
        /// Human readable description.
        description: String,
    },

    /// The request never got a response.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The call was abandoned because its scope was cancelled.
    #[error("call cancelled before it was admitted")]
    Cancelled,
}

impl CallError {
    /// The suggested backoff, if this is a rate error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CallError::RetryAfter(delay) => Some(*delay),
            _ => None,
        }
    }

    /// Whether this is the backoff-style rate error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CallError::RetryAfter(_))
    }
}

/// Performs one outbound call against the remote service.
#[async_trait]
pub trait ApiClient: Send + Sync + 'static {
    /// The request type accepted by the client.
    type Request: Send + 'static;
    /// The typed response.
    type Response: Send + 'static;

    /// Issue the call and wait for its result.
    async fn call(&self, request: Self::Request) -> Result<Self::Response, CallError>;
}
