//! # Hook Bus
//!
//! Observers registered per [`Stage`](tidings_core::Stage), fired as a
//! concurrent, panic-isolated fan-out.
//!
//! - [`HookBus`]: the registry and its `fire` operation
//! - [`LoggingObserver`]: logs stages through `tracing`

mod bus;
mod logging;

pub use bus::{HookBus, HookBusBuilder};
pub use logging::LoggingObserver;
