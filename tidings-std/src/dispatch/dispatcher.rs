//! The poll-and-dispatch loop.

use super::scope::BatchScope;
use crate::{config::DispatcherConfig, hooks::HookBus, routing::Router};
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};
use tidings_core::{
    Context, DispatchError, HookEvent, Stage, Update, UpdateSource, panic_message,
};
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Extra time granted to a fetch beyond the server-side wait it asked for.
const FETCH_GRACE: Duration = Duration::from_secs(1);

/// Pulls batches of updates from an [`UpdateSource`] and routes each one.
///
/// The delivery cursor advances as soon as an update has been handed to its
/// handling task, not when handling completes: a crash in between loses that
/// update (at-most-once delivery).
pub struct Dispatcher<E: Update, S> {
    source: S,
    router: Arc<Router<E>>,
    hooks: Arc<HookBus<E>>,
    config: DispatcherConfig,
    cursor: u64,
}

impl<E, S> Dispatcher<E, S>
where
    E: Update,
    S: UpdateSource<E>,
{
    /// Take ownership of a frozen router and hook bus.
    pub fn new(source: S, router: Router<E>, hooks: HookBus<E>, config: DispatcherConfig) -> Self {
        Self {
            source,
            router: Arc::new(router),
            hooks: Arc::new(hooks),
            config,
            cursor: 0,
        }
    }

    /// Resume from a known offset instead of zero.
    pub fn with_cursor(mut self, cursor: u64) -> Self {
        self.cursor = cursor;
        self
    }

    /// The id of the next update to fetch.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// The settings the loop runs with.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Shutdown is observed between iterations; an iteration in progress
    /// finishes first. Fetches start at most once per poll interval.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        info!(cursor = self.cursor, "dispatch loop started");
        while !shutdown.is_cancelled() {
            let started = Instant::now();
            self.poll_once(&shutdown).await;

            let pause = self.config.poll_interval().saturating_sub(started.elapsed());
            if !pause.is_zero() {
                tokio::select! {
                    _ = shutdown.cancelled() => {}
                    _ = sleep(pause) => {}
                }
            }
        }
        info!(cursor = self.cursor, "dispatch loop stopped");
    }

    /// Run one fetch-and-dispatch iteration, returning the batch size.
    ///
    /// A failed fetch is reported at [`Stage::Error`] and leaves the cursor
    /// untouched so the same batch is requested again next time.
    pub async fn poll_once(&mut self, lifetime: &CancellationToken) -> usize {
        let wait = self.config.fetch_timeout();
        let fetched = match timeout(wait + FETCH_GRACE, self.source.fetch(self.cursor, wait)).await
        {
            Ok(Ok(updates)) => updates,
            Ok(Err(err)) => {
                warn!(cursor = self.cursor, error = %err, "fetching updates failed");
                self.hooks.fire_error(DispatchError::Fetch(err), None).await;
                return 0;
            }
            Err(_) => {
                warn!(cursor = self.cursor, ?wait, "fetching updates timed out");
                self.hooks
                    .fire_error(DispatchError::FetchTimeout(wait + FETCH_GRACE), None)
                    .await;
                return 0;
            }
        };
        if fetched.is_empty() {
            return 0;
        }

        let size = fetched.len();
        let scope = BatchScope::start(lifetime, size, self.config.handler_timeout());
        debug!(size, cursor = self.cursor, "dispatching batch");

        for update in fetched.into_iter().rev() {
            let update = Arc::new(update);
            let id = update.id();
            self.hooks
                .fire(HookEvent::new(Stage::UpdateReceived, Arc::clone(&update)))
                .await;

            let task = handle_update(
                Arc::clone(&self.router),
                Arc::clone(&self.hooks),
                update,
                Arc::clone(&scope),
            );
            if self.config.concurrent {
                tokio::spawn(task);
            } else {
                task.await;
            }

            self.cursor = self.cursor.max(id.saturating_add(1));
        }
        debug!(cursor = self.cursor, "batch dispatched");
        size
    }
}

/// Route one update, turning a panic anywhere below into an error event.
async fn handle_update<E: Update>(
    router: Arc<Router<E>>,
    hooks: Arc<HookBus<E>>,
    update: Arc<E>,
    scope: Arc<BatchScope>,
) {
    let ctx = Context::new(Arc::clone(&update), scope.token());
    let outcome = AssertUnwindSafe(router.route(&ctx, &hooks))
        .catch_unwind()
        .await;
    if let Err(payload) = outcome {
        let message = panic_message(payload.as_ref());
        error!(update_id = update.id(), %message, "handling panicked");
        hooks
            .fire_error(DispatchError::Panic(message), Some(update))
            .await;
    }
    scope.finish_one();
}
