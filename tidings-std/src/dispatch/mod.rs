//! # Dispatch Loop
//!
//! [`Dispatcher`] fetches batches, fires [`Stage::UpdateReceived`], routes
//! every update (newest first) and advances the delivery cursor. Each batch
//! gets a [`BatchScope`] that handlers can watch for cancellation.
//!
//! # Execution Modes
//!
//! | `concurrent` | Behavior |
//! |--------------|----------|
//! | `true` (default) | one task per update, the loop does not wait for handlers |
//! | `false` | updates are routed inline, one after the other |
//!
//! [`Stage::UpdateReceived`]: tidings_core::Stage::UpdateReceived

mod dispatcher;
mod scope;

pub use dispatcher::Dispatcher;
pub use scope::BatchScope;
