//! # tidings-core
//!
//! Core traits for the tidings update dispatch framework.
//!
//! This crate has minimal dependencies and is designed to be imported by
//! transports and extensions that don't need the full `tidings-std`
//! implementation.
//!
//! # Vocabulary
//!
//! - [`Update`] - an inbound event with a monotonically increasing id
//! - [`Handler`] - the terminal endpoint of a routing chain, called with a [`Context`]
//! - [`Observer`] - watches a dispatch [`Stage`] without altering it
//! - [`UpdateSource`] - fetches batches of updates
//! - [`ApiClient`] - issues one outbound call
//!
//! # Error Types
//!
//! - [`TidingsError`] - Top-level error type
//! - [`DispatchError`] - What observers see at [`Stage::Error`]
//! - [`HookError`] - Observer failures
//! - [`CallError`] - Outbound call failures

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

mod error;
mod handler;
mod hook;
mod source;
mod update;

// Re-exports
pub use error::{BoxError, DispatchError, HookError, TidingsError, panic_message};
pub use handler::{Context, DynHandler, Handler, IntoOutcome};
pub use hook::{DynObserver, FnObserver, HookEvent, Observer, Stage, Stages};
pub use source::{ApiClient, CallError, UpdateSource};
pub use update::Update;

/// Re-exported so implementors of the collaborator traits share the macro version.
pub use async_trait::async_trait;
/// Re-exported for handlers that need to inspect their batch scope.
pub use tokio_util::sync::CancellationToken;
