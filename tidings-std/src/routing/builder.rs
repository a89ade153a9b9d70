//! Fluent declaration of a routing tree.

use super::{
    node::{Node, Predicate, Step},
    router::Router,
};
use crate::filters;
use std::sync::Arc;
use tidings_core::{DynHandler, Handler, Update};

/// Builds a [`Router`] by appending nodes to the tail of the top-level chain.
///
/// Every node appended after a [`filter`](RouterBuilder::filter) is only
/// reachable when that filter passes. A [`handle`](RouterBuilder::handle)
/// ends its chain: nodes appended after it are never visited.
///
/// # Example
///
/// ```rust,ignore
/// let router = RouterBuilder::<TestUpdate>::new()
///     .filter(filters::is_private)
///     .command("/start", reply_hi)
///     .default_handler(reply_generic)
///     .build();
/// ```
pub struct RouterBuilder<E: Update> {
    nodes: Vec<Node<E>>,
    fallback: Option<Arc<dyn DynHandler<E>>>,
}

impl<E: Update> Default for RouterBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Update> RouterBuilder<E> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            fallback: None,
        }
    }

    /// Append a filter gating everything appended after it.
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.nodes.push(Node::Step(Step::Filter(Arc::new(predicate))));
        self
    }

    /// Append a handler. It ends the chain.
    pub fn handle<H: Handler<E>>(mut self, handler: H) -> Self {
        self.nodes.push(Node::Step(Step::Handle(Arc::new(handler))));
        self
    }

    /// Append a branch: `handler` runs if `predicate` passes, otherwise the
    /// chain continues with whatever is appended next.
    pub fn branch<P, H>(self, predicate: P, handler: H) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
        H: Handler<E>,
    {
        self.group(|chain| chain.filter(predicate).handle(handler))
    }

    /// Append a branch matching a bot command such as `/start`.
    pub fn command<H: Handler<E>>(self, name: &str, handler: H) -> Self {
        self.branch(filters::command(name), handler)
    }

    /// Append a branch whose sub-chain is declared by `declare`.
    ///
    /// The sub-chain builder has no `branch` method, so branches cannot nest.
    pub fn group<F>(mut self, declare: F) -> Self
    where
        F: FnOnce(SubChain<E>) -> SubChain<E>,
    {
        let chain = declare(SubChain { steps: Vec::new() });
        self.nodes.push(Node::Branch(chain.steps));
        self
    }

    /// Declare the handler invoked when nothing in the tree handles an update.
    pub fn default_handler<H: Handler<E>>(mut self, handler: H) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    /// Freeze the tree. No structural change is possible afterwards.
    pub fn build(self) -> Router<E> {
        Router::new(self.nodes, self.fallback)
    }
}

/// Builder for the sub-chain of a branch.
pub struct SubChain<E: Update> {
    steps: Vec<Step<E>>,
}

impl<E: Update> SubChain<E> {
    /// Append a filter gating the rest of the sub-chain.
    pub fn filter<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let predicate: Predicate<E> = Arc::new(predicate);
        self.steps.push(Step::Filter(predicate));
        self
    }

    /// Append a handler. It ends the sub-chain.
    pub fn handle<H: Handler<E>>(mut self, handler: H) -> Self {
        self.steps.push(Step::Handle(Arc::new(handler)));
        self
    }

    /// Append a command filter followed by its handler.
    pub fn command<H: Handler<E>>(self, name: &str, handler: H) -> Self {
        self.filter(filters::command(name)).handle(handler)
    }
}
