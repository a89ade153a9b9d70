//! Error types for tidings.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`TidingsError`] - Top-level error type
//! - [`DispatchError`] - Errors delivered to the error stage of the hook bus
//! - [`HookError`] - Errors from individual observers

use std::any::Any;
use std::time::Duration;
use thiserror::Error;

/// A boxed error type for dynamic error handling.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all tidings operations.
#[derive(Error, Debug)]
pub enum TidingsError {
    /// An error occurred while dispatching updates.
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// An error occurred in an observer.
    #[error("hook error: {0}")]
    Hook(#[from] HookError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors raised while fetching or handling updates.
///
/// None of these escape the dispatch loop; they are routed to the
/// [`Stage::Error`](crate::Stage::Error) observers instead.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Fetching the next batch failed. The cursor is left untouched.
    #[error("fetching updates failed: {0}")]
    Fetch(#[source] BoxError),

    /// Fetching the next batch did not finish in time.
    #[error("fetching updates timed out after {0:?}")]
    FetchTimeout(Duration),

    /// A handle node's handler returned an error.
    #[error("handler failed: {0}")]
    Handler(#[source] BoxError),

    /// The default handler returned an error.
    #[error("default handler failed: {0}")]
    DefaultHandler(#[source] BoxError),

    /// Handling an update panicked.
    #[error("handling panicked: {0}")]
    Panic(String),
}

/// Errors that can occur in observers.
#[derive(Error, Debug)]
pub enum HookError {
    /// The observer panicked during execution.
    #[error("observer panicked: {0}")]
    Panic(String),

    /// A custom observer error.
    #[error(transparent)]
    Custom(BoxError),
}

// Convenience conversions
impl From<BoxError> for TidingsError {
    fn from(err: BoxError) -> Self {
        TidingsError::Custom(err)
    }
}

impl From<BoxError> for HookError {
    fn from(err: BoxError) -> Self {
        HookError::Custom(err)
    }
}

/// Renders a panic payload as a message.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_from_str_and_string() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(payload.as_ref()), "kaboom");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::Handler("bad input".into());
        assert_eq!(err.to_string(), "handler failed: bad input");

        let err: TidingsError = DispatchError::Panic("oops".into()).into();
        assert_eq!(err.to_string(), "dispatch error: handling panicked: oops");
    }
}
