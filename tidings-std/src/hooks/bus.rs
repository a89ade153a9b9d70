//! The hook bus: stage-keyed observer registry with concurrent fan-out.

use futures::future::join_all;
use std::{collections::HashMap, sync::Arc};
use tidings_core::{
    DispatchError, DynObserver, HookError, HookEvent, Observer, Stage, Stages, Update,
    panic_message,
};
use tracing::error;

/// Observers keyed by the stage they watch.
///
/// The registry is filled through [`HookBusBuilder`] and is read-only
/// afterwards, so firing needs no locking.
pub struct HookBus<E: Update> {
    observers: HashMap<Stage, Vec<Arc<dyn DynObserver<E>>>>,
}

impl<E: Update> Default for HookBus<E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<E: Update> HookBus<E> {
    /// A bus without observers. Firing on it does nothing.
    pub fn empty() -> Self {
        Self {
            observers: HashMap::new(),
        }
    }

    /// Start registering observers.
    pub fn builder() -> HookBusBuilder<E> {
        HookBusBuilder::new()
    }

    /// Number of observers watching `stage`.
    pub fn observer_count(&self, stage: Stage) -> usize {
        self.observers.get(&stage).map_or(0, Vec::len)
    }

    /// Notify every observer of the event's stage and wait for all of them.
    ///
    /// Each observer runs on its own task. A failing or panicking observer is
    /// logged and does not affect its siblings or the caller.
    pub async fn fire(&self, event: HookEvent<E>) {
        let stage = event.stage();
        let Some(observers) = self.observers.get(&stage) else {
            return;
        };

        let tasks = observers.iter().map(|observer| {
            let observer = Arc::clone(observer);
            let event = event.clone();
            tokio::spawn(async move { observer.on_event_dyn(event).await })
        });

        for outcome in join_all(tasks).await {
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => HookError::Custom(err),
                Err(join) if join.is_panic() => {
                    HookError::Panic(panic_message(join.into_panic().as_ref()))
                }
                Err(join) => HookError::Custom(Box::new(join)),
            };
            error!(stage = %stage, error = %failure, "observer failed");
        }
    }

    /// Fire a [`Stage::Error`] event.
    pub async fn fire_error(&self, error: DispatchError, update: Option<Arc<E>>) {
        self.fire(HookEvent::error(error, update)).await;
    }
}

impl<E: Update> std::fmt::Debug for HookBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .observers
            .iter()
            .map(|(stage, observers)| (stage.as_str(), observers.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("HookBus").field("observers", &counts).finish()
    }
}

/// Builder for constructing a [`HookBus`].
pub struct HookBusBuilder<E: Update> {
    observers: HashMap<Stage, Vec<Arc<dyn DynObserver<E>>>>,
}

impl<E: Update> Default for HookBusBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Update> HookBusBuilder<E> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            observers: HashMap::new(),
        }
    }

    /// Register an observer for one or more stages.
    ///
    /// The same instance is shared across all the given stages.
    pub fn observe<O>(mut self, stages: impl Into<Stages>, observer: O) -> Self
    where
        O: Observer<E>,
    {
        let observer: Arc<dyn DynObserver<E>> = Arc::new(observer);
        for stage in stages.into().stages() {
            self.observers
                .entry(stage)
                .or_default()
                .push(Arc::clone(&observer));
        }
        self
    }

    /// Build the bus.
    pub fn build(self) -> HookBus<E> {
        HookBus {
            observers: self.observers,
        }
    }
}
