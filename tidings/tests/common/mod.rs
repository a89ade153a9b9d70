#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tidings::{
    BoxError, CancellationToken, Context, HookBus, Stages, Update,
    testing::{RecordingObserver, TestUpdate},
};

// ============================================================================
// Helpers
// ============================================================================

pub fn ctx(update: TestUpdate) -> Context<TestUpdate> {
    Context::new(Arc::new(update), CancellationToken::new())
}

/// A bus with one recorder watching `stages`.
pub fn recorded(stages: Stages) -> (HookBus<TestUpdate>, RecordingObserver) {
    let recorder = RecordingObserver::new();
    let bus = HookBus::builder().observe(stages, recorder.clone()).build();
    (bus, recorder)
}

// ============================================================================
// Test Handlers
// ============================================================================

/// A handler that appends `(name, update id)` to a shared transcript.
#[derive(Clone)]
pub struct Reply {
    pub name: &'static str,
    pub transcript: Arc<Mutex<Vec<(&'static str, u64)>>>,
}

impl Reply {
    pub fn pair(
        first: &'static str,
        second: &'static str,
    ) -> (Reply, Reply, Arc<Mutex<Vec<(&'static str, u64)>>>) {
        let transcript = Arc::new(Mutex::new(Vec::new()));
        (
            Reply {
                name: first,
                transcript: transcript.clone(),
            },
            Reply {
                name: second,
                transcript: transcript.clone(),
            },
            transcript,
        )
    }
}

impl tidings::Handler<TestUpdate> for Reply {
    async fn call(&self, ctx: Context<TestUpdate>) -> Result<(), BoxError> {
        self.transcript.lock().unwrap().push((self.name, ctx.id()));
        Ok(())
    }
}

/// A handler that always reports `message`.
pub fn failing(message: &'static str) -> impl tidings::Handler<TestUpdate> {
    move |_ctx: Context<TestUpdate>| async move { Err::<(), BoxError>(message.into()) }
}
