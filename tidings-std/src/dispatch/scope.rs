//! Batch execution scope.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// The cancellable lifetime shared by all handling tasks of one batch.
///
/// The scope is cancelled as soon as one of these happens:
/// - every update of the batch has been handled,
/// - the timeout elapses,
/// - the parent lifetime is cancelled.
#[derive(Debug)]
pub struct BatchScope {
    token: CancellationToken,
    remaining: AtomicUsize,
    drained: Notify,
}

impl BatchScope {
    /// Derive a scope from `parent` for a batch of `size` updates.
    ///
    /// Spawns the task that cancels the scope, so it must be called from
    /// within a tokio runtime.
    pub fn start(parent: &CancellationToken, size: usize, timeout: Duration) -> Arc<Self> {
        let scope = Arc::new(Self {
            token: parent.child_token(),
            remaining: AtomicUsize::new(size),
            drained: Notify::new(),
        });
        if size == 0 {
            scope.token.cancel();
            return scope;
        }

        let watcher = Arc::clone(&scope);
        tokio::spawn(async move {
            tokio::select! {
                _ = watcher.drained.notified() => trace!("batch drained"),
                _ = tokio::time::sleep(timeout) => trace!(?timeout, "batch timed out"),
                _ = watcher.token.cancelled() => {}
            }
            watcher.token.cancel();
        });
        scope
    }

    /// A token handlers can watch.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the scope has ended.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Updates of the batch still being handled.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Record that one update finished handling.
    pub fn finish_one(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.drained.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_once_all_finish() {
        let parent = CancellationToken::new();
        let scope = BatchScope::start(&parent, 2, Duration::from_secs(60));

        scope.finish_one();
        tokio::task::yield_now().await;
        assert!(!scope.is_cancelled());

        scope.finish_one();
        tokio::time::timeout(Duration::from_secs(1), scope.token().cancelled())
            .await
            .expect("scope should be cancelled when drained");
        assert_eq!(scope.remaining(), 0);
        assert!(!parent.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_on_timeout() {
        let parent = CancellationToken::new();
        let scope = BatchScope::start(&parent, 1, Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!scope.is_cancelled());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(scope.is_cancelled());
        assert_eq!(scope.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_propagates() {
        let parent = CancellationToken::new();
        let scope = BatchScope::start(&parent, 3, Duration::from_secs(60));
        parent.cancel();
        assert!(scope.is_cancelled());
    }

    #[tokio::test]
    async fn test_empty_batch_is_born_cancelled() {
        let scope = BatchScope::start(&CancellationToken::new(), 0, Duration::from_secs(1));
        assert!(scope.is_cancelled());
        scope.finish_one();
        assert_eq!(scope.remaining(), 0);
    }
}
