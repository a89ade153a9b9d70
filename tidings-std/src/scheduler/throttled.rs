//! Admission-gated outbound calls.

use super::Scheduler;
use tidings_core::{ApiClient, CallError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Wraps an [`ApiClient`] so every call is admitted by a [`Scheduler`] first.
///
/// Each request is scheduled under a key (the conversation or originator id
/// it targets), issued, and its weight is handed back through
/// [`Scheduler::done`] whether the call succeeded, failed or was dropped
/// while in flight.
#[derive(Debug, Clone)]
pub struct ThrottledClient<C> {
    inner: C,
    scheduler: Scheduler,
}

impl<C: ApiClient> ThrottledClient<C> {
    /// Gate `inner` with `scheduler`.
    pub fn new(inner: C, scheduler: Scheduler) -> Self {
        Self { inner, scheduler }
    }

    /// The wrapped client.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// The scheduler admitting calls.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Issue a call of weight 1, waiting as long as admission takes.
    pub async fn call(&self, key: i64, request: C::Request) -> Result<C::Response, CallError> {
        self.call_weighted(key, 1, request).await
    }

    /// Issue a call of the given weight, waiting as long as admission takes.
    pub async fn call_weighted(
        &self,
        key: i64,
        weight: u32,
        request: C::Request,
    ) -> Result<C::Response, CallError> {
        self.scheduler.schedule(key, weight).await;
        self.issue(key, weight, request).await
    }

    /// Issue a call of weight 1 unless `scope` is cancelled before admission.
    ///
    /// A call abandoned this way returns [`CallError::Cancelled`] and commits
    /// nothing. Once admitted, the call runs to completion.
    pub async fn call_within(
        &self,
        key: i64,
        request: C::Request,
        scope: &CancellationToken,
    ) -> Result<C::Response, CallError> {
        if !self.scheduler.schedule_until(key, 1, scope).await {
            debug!(key, "call abandoned before admission");
            return Err(CallError::Cancelled);
        }
        self.issue(key, 1, request).await
    }

    async fn issue(
        &self,
        key: i64,
        weight: u32,
        request: C::Request,
    ) -> Result<C::Response, CallError> {
        let _admitted = Admitted {
            scheduler: self.scheduler.clone(),
            key,
            weight,
        };
        let result = self.inner.call(request).await;
        if let Err(CallError::RetryAfter(delay)) = &result {
            warn!(key, ?delay, "remote rate limit hit despite admission");
        }
        result
    }
}

/// Committed weight of one admitted call, handed back on drop.
struct Admitted {
    scheduler: Scheduler,
    key: i64,
    weight: u32,
}

impl Drop for Admitted {
    fn drop(&mut self) {
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(key = self.key, "admitted call dropped outside a runtime, capacity kept");
            return;
        }
        self.scheduler.done(self.key, self.weight);
    }
}
