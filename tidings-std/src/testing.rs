//! Testing utilities for tidings.
//!
//! Test doubles for every seam of the dispatch core, so routing, hooks, the
//! dispatch loop and throttled calls can be exercised without a remote
//! service.
//!
//! # Features
//!
//! - [`TestUpdate`]: A chat-shaped update with builder constructors
//! - [`RecordingObserver`]: An observer that records every event it receives
//! - [`CountingHandler`]: A handler that counts invocations
//! - [`ScriptedSource`]: An update source that replays scripted batches
//! - [`RecordingClient`]: An API client that records requests

use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tidings_core::{
    ApiClient, BoxError, CallError, Context, Handler, HookEvent, Observer, Stage, Update,
    UpdateSource,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Test Update
// ============================================================================

/// A minimal chat update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestUpdate {
    /// Delivery id.
    pub id: u64,
    /// Conversation id, positive for private chats and negative for groups.
    pub chat_id: Option<i64>,
    /// Originator id.
    pub sender_id: Option<i64>,
    /// Message text.
    pub text: Option<String>,
}

impl TestUpdate {
    /// An update with nothing but an id.
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// A text message in a private chat, sent by the chat's owner.
    pub fn private(id: u64, chat: i64, text: &str) -> Self {
        Self {
            id,
            chat_id: Some(chat.abs()),
            sender_id: Some(chat.abs()),
            text: Some(text.to_string()),
        }
    }

    /// A text message in a group chat.
    pub fn group(id: u64, chat: i64, text: &str) -> Self {
        Self {
            id,
            chat_id: Some(-chat.abs()),
            sender_id: None,
            text: Some(text.to_string()),
        }
    }

    /// Set the originator.
    pub fn with_sender(mut self, sender: i64) -> Self {
        self.sender_id = Some(sender);
        self
    }
}

impl Update for TestUpdate {
    fn id(&self) -> u64 {
        self.id
    }

    fn chat_id(&self) -> Option<i64> {
        self.chat_id
    }

    fn sender_id(&self) -> Option<i64> {
        self.sender_id
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

// ============================================================================
// Recording Observer
// ============================================================================

/// One event as seen by a [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The stage the event was fired at.
    pub stage: Stage,
    /// Id of the update involved, if any.
    pub update_id: Option<u64>,
    /// Rendered error for [`Stage::Error`] events.
    pub error: Option<String>,
}

/// An observer that records every event it receives.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingObserver::new();
/// let bus = HookBus::builder().observe(Stages::all(), recorder.clone()).build();
///
/// // Dispatch...
///
/// assert_eq!(recorder.stages(), vec![Stage::UpdateReceived]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    records: Arc<Mutex<Vec<Record>>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded so far.
    pub fn records(&self) -> Vec<Record> {
        lock(&self.records).clone()
    }

    /// The stages recorded so far, in order.
    pub fn stages(&self) -> Vec<Stage> {
        lock(&self.records).iter().map(|r| r.stage).collect()
    }

    /// The update ids recorded so far, in order.
    pub fn update_ids(&self) -> Vec<Option<u64>> {
        lock(&self.records).iter().map(|r| r.update_id).collect()
    }

    /// The rendered errors recorded so far, in order.
    pub fn errors(&self) -> Vec<String> {
        lock(&self.records)
            .iter()
            .filter_map(|r| r.error.clone())
            .collect()
    }

    /// Number of events recorded at `stage`.
    pub fn count(&self, stage: Stage) -> usize {
        lock(&self.records)
            .iter()
            .filter(|r| r.stage == stage)
            .count()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        lock(&self.records).clear();
    }
}

impl<E: Update> Observer<E> for RecordingObserver {
    async fn on_event(&self, event: HookEvent<E>) -> Result<(), BoxError> {
        lock(&self.records).push(Record {
            stage: event.stage(),
            update_id: event.update().map(Update::id),
            error: event.dispatch_error().map(ToString::to_string),
        });
        Ok(())
    }
}

// ============================================================================
// Counting Handler
// ============================================================================

/// A handler that counts invocations.
///
/// # Example
///
/// ```rust,ignore
/// let counter = CountingHandler::new();
/// let router = RouterBuilder::<TestUpdate>::new().handle(counter.clone()).build();
///
/// // Dispatch...
///
/// assert_eq!(counter.count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CountingHandler {
    count: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<u64>>>,
}

impl CountingHandler {
    /// Create a new counting handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current count.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Ids of the handled updates, in invocation order.
    pub fn seen(&self) -> Vec<u64> {
        lock(&self.seen).clone()
    }
}

impl<E: Update> Handler<E> for CountingHandler {
    async fn call(&self, ctx: Context<E>) -> Result<(), BoxError> {
        lock(&self.seen).push(ctx.id());
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Scripted Source
// ============================================================================

enum Step<E> {
    Batch(Vec<E>),
    Failure(String),
    Stall,
}

/// An update source that replays a script, one step per fetch.
///
/// Once the script runs out every fetch returns an empty batch. Requested
/// offsets are recorded.
pub struct ScriptedSource<E> {
    steps: Arc<Mutex<VecDeque<Step<E>>>>,
    offsets: Arc<Mutex<Vec<u64>>>,
}

impl<E> ScriptedSource<E> {
    /// An empty script.
    pub fn new() -> Self {
        Self {
            steps: Arc::new(Mutex::new(VecDeque::new())),
            offsets: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `updates` on the next unscripted fetch.
    pub fn batch(self, updates: Vec<E>) -> Self {
        lock(&self.steps).push_back(Step::Batch(updates));
        self
    }

    /// Fail the next unscripted fetch with `message`.
    pub fn failure(self, message: &str) -> Self {
        lock(&self.steps).push_back(Step::Failure(message.to_string()));
        self
    }

    /// Never answer the next unscripted fetch.
    pub fn stall(self) -> Self {
        lock(&self.steps).push_back(Step::Stall);
        self
    }

    /// Offsets passed to every fetch so far.
    pub fn offsets(&self) -> Vec<u64> {
        lock(&self.offsets).clone()
    }

    /// Steps not consumed yet.
    pub fn pending(&self) -> usize {
        lock(&self.steps).len()
    }
}

impl<E> Default for ScriptedSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ScriptedSource<E> {
    fn clone(&self) -> Self {
        Self {
            steps: Arc::clone(&self.steps),
            offsets: Arc::clone(&self.offsets),
        }
    }
}

#[async_trait]
impl<E: Update> UpdateSource<E> for ScriptedSource<E> {
    async fn fetch(&self, offset: u64, _timeout: Duration) -> Result<Vec<E>, BoxError> {
        lock(&self.offsets).push(offset);
        let step = lock(&self.steps).pop_front();
        match step {
            Some(Step::Batch(updates)) => Ok(updates),
            Some(Step::Failure(message)) => Err(message.into()),
            Some(Step::Stall) => std::future::pending().await,
            None => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// Recording Client
// ============================================================================

/// An API client that records requests and answers with a sequence number.
#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    requests: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingClient {
    /// A client whose calls succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose calls are rejected with a `400` API error.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ApiClient for RecordingClient {
    type Request = String;
    type Response = usize;

    async fn call(&self, request: String) -> Result<usize, CallError> {
        let mut requests = lock(&self.requests);
        requests.push(request);
        if self.fail {
            return Err(CallError::Api {
                code: 400,
                description: "Bad Request".into(),
            });
        }
        Ok(requests.len())
    }
}
