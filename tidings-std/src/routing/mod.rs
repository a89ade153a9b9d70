//! # Routing Pipeline
//!
//! A tree of filter / handle / branch nodes declared once with
//! [`RouterBuilder`] and then frozen into a [`Router`].
//!
//! | Node | Passes | Fails |
//! |------|--------|-------|
//! | filter | continue with the next node | stop, chain not handled |
//! | handle | stop, handled (even if the handler errors) | - |
//! | branch | stop if its sub-chain handled the update | continue with the next node |
//!
//! Building consumes the builder, so the tree cannot change once the
//! dispatch loop owns it.

mod builder;
mod node;
mod router;

pub use builder::{RouterBuilder, SubChain};
pub use node::Predicate;
pub use router::{RouteOutcome, Router};
