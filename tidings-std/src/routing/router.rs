//! Traversal of a frozen routing tree.

use super::node::{Node, Step};
use crate::hooks::HookBus;
use futures::FutureExt;
use std::{
    panic::{AssertUnwindSafe, resume_unwind},
    sync::Arc,
};
use tidings_core::{Context, DispatchError, DynHandler, HookEvent, Stage, Update};

/// How an update left the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A handle node in the tree was reached.
    Matched,
    /// Nothing matched and the default handler ran.
    Fallback,
    /// Nothing matched and there is no default handler.
    Unmatched,
}

impl RouteOutcome {
    /// Whether some handler, including the default one, ran.
    pub fn is_handled(self) -> bool {
        !matches!(self, RouteOutcome::Unmatched)
    }
}

/// Where traversal goes after one step.
enum Flow {
    Next,
    Done(bool),
}

/// An immutable routing tree.
///
/// Built once by [`RouterBuilder`](super::RouterBuilder) and shared read-only
/// by every handling task afterwards.
pub struct Router<E: Update> {
    nodes: Vec<Node<E>>,
    fallback: Option<Arc<dyn DynHandler<E>>>,
}

impl<E: Update> Router<E> {
    pub(crate) fn new(nodes: Vec<Node<E>>, fallback: Option<Arc<dyn DynHandler<E>>>) -> Self {
        Self { nodes, fallback }
    }

    /// Number of nodes in the top-level chain.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the top-level chain is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a default handler was declared.
    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Walk the tree for one update and report whether a handle node was reached.
    ///
    /// - A failing filter fires [`Stage::FilteredOut`] and ends the chain it sits in.
    /// - A handle node always counts as handled, even when its handler fails.
    /// - A branch is tried first; the enclosing chain continues only if the
    ///   branch did not handle the update.
    pub async fn dispatch(&self, ctx: &Context<E>, hooks: &HookBus<E>) -> bool {
        for node in &self.nodes {
            let flow = match node {
                Node::Step(step) => run_step(step, ctx, hooks).await,
                Node::Branch(steps) => {
                    if run_chain(steps, ctx, hooks).await {
                        Flow::Done(true)
                    } else {
                        Flow::Next
                    }
                }
            };
            if let Flow::Done(handled) = flow {
                return handled;
            }
        }
        false
    }

    /// [`dispatch`](Router::dispatch), falling back to the default handler.
    ///
    /// The default handler's failure goes to the error stage like any other.
    pub async fn route(&self, ctx: &Context<E>, hooks: &HookBus<E>) -> RouteOutcome {
        if self.dispatch(ctx, hooks).await {
            return RouteOutcome::Matched;
        }
        let Some(fallback) = &self.fallback else {
            return RouteOutcome::Unmatched;
        };
        if let Err(err) = invoke(fallback.as_ref(), ctx, hooks).await {
            hooks
                .fire(HookEvent::error(
                    DispatchError::DefaultHandler(err),
                    Some(ctx.shared()),
                ))
                .await;
        }
        RouteOutcome::Fallback
    }
}

impl<E: Update> std::fmt::Debug for Router<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.nodes.iter().map(Node::kind).collect();
        f.debug_struct("Router")
            .field("nodes", &kinds)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

async fn run_chain<E: Update>(steps: &[Step<E>], ctx: &Context<E>, hooks: &HookBus<E>) -> bool {
    for step in steps {
        if let Flow::Done(handled) = run_step(step, ctx, hooks).await {
            return handled;
        }
    }
    false
}

async fn run_step<E: Update>(step: &Step<E>, ctx: &Context<E>, hooks: &HookBus<E>) -> Flow {
    match step {
        Step::Filter(predicate) => {
            if predicate(ctx.update()) {
                Flow::Next
            } else {
                hooks
                    .fire(HookEvent::new(Stage::FilteredOut, ctx.shared()))
                    .await;
                Flow::Done(false)
            }
        }
        Step::Handle(handler) => {
            if let Err(err) = invoke(handler.as_ref(), ctx, hooks).await {
                hooks
                    .fire(HookEvent::error(
                        DispatchError::Handler(err),
                        Some(ctx.shared()),
                    ))
                    .await;
            }
            Flow::Done(true)
        }
    }
}

/// Run a handler between the handling-started and handling-finished stages.
///
/// Handling-finished fires even when the handler panics; the panic is then
/// resumed for the dispatcher to report.
async fn invoke<E: Update>(
    handler: &dyn DynHandler<E>,
    ctx: &Context<E>,
    hooks: &HookBus<E>,
) -> Result<(), tidings_core::BoxError> {
    hooks
        .fire(HookEvent::new(Stage::HandlingStarted, ctx.shared()))
        .await;
    let result = AssertUnwindSafe(handler.call_dyn(ctx.clone()))
        .catch_unwind()
        .await;
    hooks
        .fire(HookEvent::new(Stage::HandlingFinished, ctx.shared()))
        .await;
    result.unwrap_or_else(|payload| resume_unwind(payload))
}
