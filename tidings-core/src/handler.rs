//! # Handlers
//!
//! The terminal point of a routing chain. A handler receives a [`Context`]
//! holding the update and the cancellation scope of the batch it arrived in,
//! performs its business logic, and reports success or an error.
//!
//! # Usage Patterns
//!
//! 1. **Direct closure**: `|ctx: Context<MyUpdate>| async move { ... }`
//! 2. **Struct implementation**: `impl Handler<MyUpdate> for MyHandler`
//!
//! Handlers may return `()` or any `Result<(), E>` where `E` converts into a
//! [`BoxError`]; see [`IntoOutcome`].

use crate::{error::BoxError, update::Update};
use std::{future::Future, ops::Deref, pin::Pin, sync::Arc};
use tokio_util::sync::CancellationToken;

/// What a handler sees: the update plus the batch execution scope.
///
/// Handlers are expected to watch [`scope`](Context::scope) cooperatively and
/// abandon outbound work once it is cancelled.
pub struct Context<E> {
    update: Arc<E>,
    scope: CancellationToken,
}

impl<E> Context<E> {
    /// Create a context for one update.
    pub fn new(update: Arc<E>, scope: CancellationToken) -> Self {
        Self { update, scope }
    }

    /// The update being handled.
    pub fn update(&self) -> &E {
        &self.update
    }

    /// A shared handle to the update.
    pub fn shared(&self) -> Arc<E> {
        Arc::clone(&self.update)
    }

    /// The cancellation scope of the batch this update belongs to.
    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    /// Whether the batch scope has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.scope.is_cancelled()
    }
}

impl<E> Clone for Context<E> {
    fn clone(&self) -> Self {
        Self {
            update: Arc::clone(&self.update),
            scope: self.scope.clone(),
        }
    }
}

impl<E> Deref for Context<E> {
    type Target = E;

    fn deref(&self) -> &Self::Target {
        &self.update
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for Context<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("update", &self.update)
            .field("cancelled", &self.scope.is_cancelled())
            .finish()
    }
}

/// Conversion of a handler's return value into a dispatch outcome.
pub trait IntoOutcome: Send {
    /// Convert into `Ok(())` or the reported error.
    fn into_outcome(self) -> Result<(), BoxError>;
}

impl IntoOutcome for () {
    fn into_outcome(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<Er> IntoOutcome for Result<(), Er>
where
    Er: Into<BoxError> + Send,
{
    fn into_outcome(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// The terminal endpoint of a routing chain.
#[diagnostic::on_unimplemented(
    message = "`{Self}` cannot handle updates of type `{E}`",
    label = "missing `Handler<{E}>` implementation",
    note = "Handlers must implement `call` taking a `Context<{E}>`."
)]
pub trait Handler<E: Update>: Send + Sync + 'static {
    /// Executes the handler logic.
    fn call(&self, ctx: Context<E>) -> impl Future<Output = Result<(), BoxError>> + Send;
}

// Blanket impl for closures
impl<F, E, Fut> Handler<E> for F
where
    E: Update,
    F: Fn(Context<E>) -> Fut + Send + Sync + 'static,
    Fut: Future + Send,
    Fut::Output: IntoOutcome,
{
    async fn call(&self, ctx: Context<E>) -> Result<(), BoxError> {
        (self)(ctx).await.into_outcome()
    }
}

/// Dynamic object-safe version of [`Handler`].
///
/// Routing nodes store handlers behind `Arc<dyn DynHandler<E>>`.
pub trait DynHandler<E: Update>: Send + Sync + 'static {
    /// Executes the handler logic (dynamic dispatch version).
    fn call_dyn(
        &self,
        ctx: Context<E>,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + '_>>;
}

impl<E: Update, T: Handler<E>> DynHandler<E> for T {
    fn call_dyn(
        &self,
        ctx: Context<E>,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + '_>> {
        Box::pin(self.call(ctx))
    }
}
