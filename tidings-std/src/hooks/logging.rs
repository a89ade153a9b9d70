//! Logging observer for dispatch stages.

use tidings_core::{BoxError, HookEvent, Observer, Update};
use tracing::{debug, warn};

/// An observer that logs every stage it is registered for.
///
/// Errors are logged at `warn`, every other stage at `debug`. Nothing is
/// logged for stages it is not registered for, so register it with
/// [`Stages::all()`](tidings_core::Stages::all) to see everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl<E: Update> Observer<E> for LoggingObserver {
    async fn on_event(&self, event: HookEvent<E>) -> Result<(), BoxError> {
        let update_id = event.update().map(Update::id);
        let stage = event.stage();
        match event.dispatch_error() {
            Some(error) => warn!(?update_id, %error, "dispatch error"),
            None => debug!(?update_id, stage = %stage, "dispatch stage"),
        }
        Ok(())
    }
}
