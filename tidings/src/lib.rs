//! # tidings - Poll-Based Update Dispatch for Chat Integrations
//!
//! `tidings` pulls batches of updates from a remote service, routes each one
//! through a declared tree of filters and handlers, lets observers watch every
//! stage of dispatch, and throttles the outbound calls handlers make against
//! several rate budgets at once.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tidings::prelude::*;
//!
//! let router = RouterBuilder::new()
//!     .filter(filters::is_private)
//!     .command("/start", |ctx: Context<MyUpdate>| async move {
//!         client.call(ctx.chat_id().unwrap_or_default(), "hi".into()).await?;
//!         Ok::<(), BoxError>(())
//!     })
//!     .default_handler(reply_generic)
//!     .build();
//!
//! let hooks = HookBus::builder()
//!     .observe(Stages::all(), LoggingObserver)
//!     .build();
//!
//! let mut dispatcher = Dispatcher::new(source, router, hooks, DispatcherConfig::default());
//! dispatcher.run(shutdown).await;
//! ```
//!
//! ## Layers
//!
//! | Layer | Type | Role |
//! |-------|------|------|
//! | Routing | [`Router`] | decides which handler sees an update |
//! | Hooks | [`HookBus`] | notifies observers at each stage |
//! | Dispatch | [`Dispatcher`] | fetches batches and advances the cursor |
//! | Admission | [`Scheduler`] | gates outbound calls |

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

pub use tidings_core::{
    // Collaborators
    ApiClient,
    // Errors
    BoxError,
    CallError,
    CancellationToken,
    // Handler
    Context,
    DispatchError,
    DynHandler,
    // Hooks
    DynObserver,
    FnObserver,
    Handler,
    HookError,
    HookEvent,
    IntoOutcome,
    Observer,
    Stage,
    Stages,
    TidingsError,
    // Update
    Update,
    UpdateSource,
    async_trait,
};

pub use tidings_std::{
    config::{
        ClauseConfig, ClauseScope, ConfigError, DispatcherConfig, SchedulerConfig, TidingsConfig,
    },
    dispatch::{BatchScope, Dispatcher},
    filters,
    hooks::{HookBus, HookBusBuilder, LoggingObserver},
    routing::{Predicate, RouteOutcome, Router, RouterBuilder, SubChain},
    scheduler::{Clause, Scheduler, Selector, ThrottledClient},
};

/// Admission scheduling, including the stock policy.
pub mod scheduler {
    #![allow(clippy::wildcard_imports)]
    pub use tidings_std::scheduler::*;
}

/// Testing utilities.
pub mod testing {
    #![allow(clippy::wildcard_imports)]
    pub use tidings_std::testing::*;
}

/// Prelude module - common imports for tidings.
///
/// # Usage
///
/// ```rust,ignore
/// use tidings::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ApiClient, BoxError, CancellationToken, Context, Dispatcher, DispatcherConfig, Handler,
        HookBus, HookEvent, LoggingObserver, Observer, RouterBuilder, Scheduler, Stage, Stages,
        ThrottledClient, Update, UpdateSource, filters,
    };
}
