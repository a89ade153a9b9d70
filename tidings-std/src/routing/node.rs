//! Routing tree nodes.
//!
//! A chain is a sequence of nodes where each node's successor is the next
//! element. Branch sub-chains are made of [`Step`]s only, so a branch can
//! never contain another branch.

use std::sync::Arc;
use tidings_core::{DynHandler, Update};

/// A predicate over updates.
pub type Predicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// A node that may appear in any chain.
pub(crate) enum Step<E: Update> {
    /// Gates the rest of its chain.
    Filter(Predicate<E>),
    /// Terminal for its chain.
    Handle(Arc<dyn DynHandler<E>>),
}

/// A node of the top-level chain.
pub(crate) enum Node<E: Update> {
    Step(Step<E>),
    /// A nested sub-chain tried before continuing with the enclosing chain.
    Branch(Vec<Step<E>>),
}

impl<E: Update> Step<E> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Step::Filter(_) => "filter",
            Step::Handle(_) => "handle",
        }
    }
}

impl<E: Update> Node<E> {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Node::Step(step) => step.kind(),
            Node::Branch(_) => "branch",
        }
    }
}
