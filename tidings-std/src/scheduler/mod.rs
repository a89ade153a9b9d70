//! # Admission Scheduler
//!
//! Gates outbound calls against several rate budgets at once. A call is
//! admitted only when every [`Clause`] has room for it; its weight is then
//! committed to every applicable clause and handed back by [`Scheduler::done`]
//! once each clause's own release delay has passed.
//!
//! ```rust,ignore
//! let scheduler = Scheduler::default_policy();
//! scheduler.schedule(chat_id, 1).await;
//! let result = client.call(request).await;
//! scheduler.done(chat_id, 1);
//! ```
//!
//! [`ThrottledClient`] wraps an [`ApiClient`](tidings_core::ApiClient) and does
//! the bookkeeping above for every request.
//!
//! # Keys
//!
//! Negative keys identify conversations, positive keys identify originators.
//! Key `0` is charged against global clauses only.

mod clause;
mod policy;
mod throttled;

pub use clause::{Clause, KeyFn, Selector};
pub use policy::{DEFAULT_POLL_INTERVAL, default_clauses};
pub use throttled::ThrottledClient;

use crate::config::{ConfigError, SchedulerConfig};
use clause::ClauseState;
use std::{sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

struct Inner {
    clauses: Vec<Clause>,
    state: Mutex<Vec<ClauseState>>,
}

/// A set of clauses behind one lock.
///
/// Cloning is cheap and every clone shares the same counters. Pass the
/// scheduler to whatever issues outbound calls.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
    poll_interval: Duration,
}

impl Scheduler {
    /// A scheduler enforcing `clauses`, polling every [`DEFAULT_POLL_INTERVAL`].
    pub fn new(clauses: Vec<Clause>) -> Self {
        let state = clauses.iter().map(|_| ClauseState::default()).collect();
        Self {
            inner: Arc::new(Inner {
                clauses,
                state: Mutex::new(state),
            }),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// The five stock clauses, see [`default_clauses`].
    pub fn default_policy() -> Self {
        Self::new(default_clauses())
    }

    /// Build from configuration. An empty clause list means the default policy.
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let clauses = if config.clauses.is_empty() {
            default_clauses()
        } else {
            config.clauses.iter().map(Clause::from).collect()
        };
        Ok(Self::new(clauses).with_poll_interval(config.poll_interval()))
    }

    /// Change the sleep between admission attempts.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The enforced clauses, in order.
    pub fn clauses(&self) -> &[Clause] {
        &self.inner.clauses
    }

    /// The sleep between admission attempts.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait until every clause admits `weight` for `key`, then commit it.
    ///
    /// Never returns if `weight` exceeds the quota of an applicable clause.
    pub async fn schedule(&self, key: i64, weight: u32) {
        self.warn_if_unsatisfiable(key, weight);
        while !self.try_admit(key, weight).await {
            sleep(self.poll_interval).await;
        }
    }

    /// [`schedule`](Scheduler::schedule), giving up once `scope` is cancelled.
    ///
    /// Returns whether the weight was committed. Nothing is committed when
    /// this returns `false`.
    pub async fn schedule_until(&self, key: i64, weight: u32, scope: &CancellationToken) -> bool {
        self.warn_if_unsatisfiable(key, weight);
        loop {
            if scope.is_cancelled() {
                return false;
            }
            if self.try_admit(key, weight).await {
                return true;
            }
            tokio::select! {
                _ = scope.cancelled() => return false,
                _ = sleep(self.poll_interval) => {}
            }
        }
    }

    /// One admission attempt. Commits and returns `true` only if every clause
    /// has room.
    pub async fn try_admit(&self, key: i64, weight: u32) -> bool {
        let mut state = self.inner.state.lock().await;
        let clauses = &self.inner.clauses;
        let admitted = clauses
            .iter()
            .zip(state.iter())
            .all(|(clause, used)| used.admits(clause, key, weight));
        if admitted {
            for (clause, used) in clauses.iter().zip(state.iter_mut()) {
                used.commit(clause, key, weight);
            }
        }
        admitted
    }

    /// Hand `weight` back to every applicable clause after its release delay.
    ///
    /// Returns immediately; the release happens on timer tasks, so this must
    /// be called from within a tokio runtime.
    pub fn done(&self, key: i64, weight: u32) {
        for (index, clause) in self.inner.clauses.iter().enumerate() {
            let Some(slot) = clause.selector().slot(key) else {
                continue;
            };
            let inner = Arc::clone(&self.inner);
            let delay = clause.release_delay();
            tokio::spawn(async move {
                sleep(delay).await;
                if let Some(used) = inner.state.lock().await.get_mut(index) {
                    used.release(slot, weight);
                }
                trace!(clause = index, key, weight, "capacity released");
            });
        }
    }

    /// Committed weight for `key` in each clause, in clause order. Clauses
    /// that do not apply to `key` report zero.
    pub async fn usage(&self, key: i64) -> Vec<u32> {
        let state = self.inner.state.lock().await;
        self.inner
            .clauses
            .iter()
            .zip(state.iter())
            .map(|(clause, used)| clause.selector().slot(key).map_or(0, |slot| used.used(slot)))
            .collect()
    }

    /// Number of keyed counters currently held across all clauses.
    pub async fn tracked_keys(&self) -> usize {
        let state = self.inner.state.lock().await;
        state.iter().map(ClauseState::tracked_keys).sum()
    }

    fn warn_if_unsatisfiable(&self, key: i64, weight: u32) {
        if let Some(clause) = self
            .inner
            .clauses
            .iter()
            .find(|clause| clause.applies_to(key) && weight > clause.quota())
        {
            warn!(
                key,
                weight,
                quota = clause.quota(),
                "weight exceeds clause quota, call can never be admitted"
            );
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("clauses", &self.inner.clauses)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
