//! # tidings-std
//!
//! Standard implementations for the tidings update dispatch framework.
//!
//! This crate provides:
//! - **Routing**: [`RouterBuilder`](routing::RouterBuilder), [`Router`](routing::Router)
//! - **Hooks**: [`HookBus`](hooks::HookBus), [`LoggingObserver`](hooks::LoggingObserver)
//! - **Dispatch loop**: [`Dispatcher`](dispatch::Dispatcher), [`BatchScope`](dispatch::BatchScope)
//! - **Admission scheduling**: [`Scheduler`](scheduler::Scheduler),
//!   [`ThrottledClient`](scheduler::ThrottledClient)
//! - **Predicates**: [`filters`]
//! - **Configuration**: [`config`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use tidings_core;

// Modules
pub mod config;
pub mod dispatch;
pub mod filters;
pub mod hooks;
pub mod routing;
pub mod scheduler;
pub mod testing;
