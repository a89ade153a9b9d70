//! # Observers
//!
//! Observers watch the dispatch pipeline at fixed [`Stage`]s without being
//! able to alter it. They are the only externally visible failure channel:
//! everything that goes wrong while dispatching ends up as a
//! [`Stage::Error`] event.
//!
//! # Use Cases
//!
//! - Logging and metrics
//! - Reporting handler failures
//! - Auditing which updates were filtered out

use crate::{
    error::{BoxError, DispatchError},
    update::Update,
};
use bitflags::bitflags;
use std::{fmt, future::Future, pin::Pin, sync::Arc};

/// A point in the dispatch of an update where observers are notified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// An update was taken from a fetched batch.
    UpdateReceived,
    /// A filter rejected the update, ending the chain it gates.
    FilteredOut,
    /// A handler is about to run.
    HandlingStarted,
    /// A handler returned, successfully or not.
    HandlingFinished,
    /// Something failed while fetching or handling.
    Error,
}

impl Stage {
    /// Every stage, in dispatch order.
    pub const ALL: [Stage; 5] = [
        Stage::UpdateReceived,
        Stage::FilteredOut,
        Stage::HandlingStarted,
        Stage::HandlingFinished,
        Stage::Error,
    ];

    /// The flag matching this stage.
    pub const fn flag(self) -> Stages {
        match self {
            Stage::UpdateReceived => Stages::UPDATE_RECEIVED,
            Stage::FilteredOut => Stages::FILTERED_OUT,
            Stage::HandlingStarted => Stages::HANDLING_STARTED,
            Stage::HandlingFinished => Stages::HANDLING_FINISHED,
            Stage::Error => Stages::ERROR,
        }
    }

    /// A stable lowercase name, used in log fields.
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::UpdateReceived => "update_received",
            Stage::FilteredOut => "filtered_out",
            Stage::HandlingStarted => "handling_started",
            Stage::HandlingFinished => "handling_finished",
            Stage::Error => "error",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// A set of stages an observer subscribes to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Stages: u8 {
        /// See [`Stage::UpdateReceived`].
        const UPDATE_RECEIVED = 1 << 0;
        /// See [`Stage::FilteredOut`].
        const FILTERED_OUT = 1 << 1;
        /// See [`Stage::HandlingStarted`].
        const HANDLING_STARTED = 1 << 2;
        /// See [`Stage::HandlingFinished`].
        const HANDLING_FINISHED = 1 << 3;
        /// See [`Stage::Error`].
        const ERROR = 1 << 4;
        /// Both handling stages.
        const HANDLING = Self::HANDLING_STARTED.bits() | Self::HANDLING_FINISHED.bits();
    }
}

impl Stages {
    /// Iterate over the individual stages contained in this set.
    pub fn stages(self) -> impl Iterator<Item = Stage> {
        Stage::ALL
            .into_iter()
            .filter(move |stage| self.contains(stage.flag()))
    }
}

impl From<Stage> for Stages {
    fn from(stage: Stage) -> Self {
        stage.flag()
    }
}

/// The payload handed to observers.
///
/// Cloning is cheap: the update and the error are shared.
pub struct HookEvent<E> {
    stage: Stage,
    update: Option<Arc<E>>,
    error: Option<Arc<DispatchError>>,
}

impl<E> HookEvent<E> {
    /// An event about an update at the given stage.
    pub fn new(stage: Stage, update: Arc<E>) -> Self {
        Self {
            stage,
            update: Some(update),
            error: None,
        }
    }

    /// An [`Stage::Error`] event, optionally tied to the update that caused it.
    pub fn error(error: DispatchError, update: Option<Arc<E>>) -> Self {
        Self {
            stage: Stage::Error,
            update,
            error: Some(Arc::new(error)),
        }
    }

    /// The stage being reported.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// The update involved, absent for fetch failures.
    pub fn update(&self) -> Option<&E> {
        self.update.as_deref()
    }

    /// The error, present only for [`Stage::Error`].
    pub fn dispatch_error(&self) -> Option<&DispatchError> {
        self.error.as_deref()
    }
}

impl<E> Clone for HookEvent<E> {
    fn clone(&self) -> Self {
        Self {
            stage: self.stage,
            update: self.update.clone(),
            error: self.error.clone(),
        }
    }
}

impl<E: fmt::Debug> fmt::Debug for HookEvent<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEvent")
            .field("stage", &self.stage)
            .field("update", &self.update)
            .field("error", &self.error)
            .finish()
    }
}

/// Watches one or more dispatch stages.
///
/// A returned error is logged by the hook bus and otherwise ignored; it never
/// reaches the dispatch loop or sibling observers.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement `Observer<{E}>`",
    label = "missing `Observer` implementation",
    note = "Observers must implement `on_event` for the update type `{E}`."
)]
pub trait Observer<E: Update>: Send + Sync + 'static {
    /// Called for every event at a subscribed stage.
    fn on_event(&self, event: HookEvent<E>) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Dynamic object-safe version of [`Observer`].
pub trait DynObserver<E: Update>: Send + Sync + 'static {
    /// Called for every event at a subscribed stage (dynamic dispatch version).
    fn on_event_dyn(
        &self,
        event: HookEvent<E>,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + '_>>;
}

impl<E: Update, T: Observer<E>> DynObserver<E> for T {
    fn on_event_dyn(
        &self,
        event: HookEvent<E>,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + '_>> {
        Box::pin(self.on_event(event))
    }
}

/// An observer built from a closure.
///
/// ```rust,ignore
/// let observer = FnObserver::new(|event: HookEvent<MyUpdate>| async move {
///     println!("{}", event.stage());
///     Ok(())
/// });
/// ```
pub struct FnObserver<F>(F);

impl<F> FnObserver<F> {
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<E, F, Fut> Observer<E> for FnObserver<F>
where
    E: Update,
    F: Fn(HookEvent<E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    fn on_event(&self, event: HookEvent<E>) -> impl Future<Output = Result<(), BoxError>> + Send {
        (self.0)(event)
    }
}
