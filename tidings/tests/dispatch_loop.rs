use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use tidings::{
    CancellationToken, Context, Dispatcher, DispatcherConfig, HookBus, RouterBuilder, Stage,
    Stages, Update,
    testing::{CountingHandler, ScriptedSource, TestUpdate},
};
use tokio::time::{Instant, sleep};

mod common;
use common::recorded;

fn updates(ids: &[u64]) -> Vec<TestUpdate> {
    ids.iter().copied().map(TestUpdate::new).collect()
}

#[tokio::test(start_paused = true)]
async fn test_cursor_is_one_past_highest_id() {
    let source = ScriptedSource::new()
        .batch(updates(&[3, 1, 2]))
        .batch(updates(&[5, 4]));
    let counter = CountingHandler::new();
    let mut dispatcher = Dispatcher::new(
        source.clone(),
        RouterBuilder::<TestUpdate>::new().handle(counter.clone()).build(),
        HookBus::empty(),
        DispatcherConfig::default(),
    );
    let lifetime = CancellationToken::new();

    assert_eq!(dispatcher.poll_once(&lifetime).await, 3);
    assert_eq!(dispatcher.cursor(), 4);
    assert_eq!(dispatcher.poll_once(&lifetime).await, 2);
    assert_eq!(dispatcher.cursor(), 6);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(counter.count(), 5);
    assert_eq!(source.offsets(), vec![0, 4]);
}

#[tokio::test(start_paused = true)]
async fn test_stage_sequence_for_one_update() {
    let source = ScriptedSource::new().batch(updates(&[1]));
    let (hooks, recorder) = recorded(Stages::all());
    let mut dispatcher = Dispatcher::new(
        source,
        RouterBuilder::<TestUpdate>::new()
            .filter(|u: &TestUpdate| u.id > 0)
            .handle(CountingHandler::new())
            .build(),
        hooks,
        DispatcherConfig::default().serial(),
    );

    dispatcher.poll_once(&CancellationToken::new()).await;

    assert_eq!(
        recorder.stages(),
        vec![
            Stage::UpdateReceived,
            Stage::HandlingStarted,
            Stage::HandlingFinished
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_paces_fetches_and_stops_on_shutdown() {
    let source = ScriptedSource::new().batch(updates(&[10]));
    let mut dispatcher = Dispatcher::new(
        source.clone(),
        RouterBuilder::<TestUpdate>::new().handle(CountingHandler::new()).build(),
        HookBus::empty(),
        DispatcherConfig::default()
            .with_poll_interval(Duration::from_millis(300))
            .serial(),
    );

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(1_000)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    dispatcher.run(shutdown).await;

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1_000));
    assert!(elapsed < Duration::from_millis(1_200));
    assert_eq!(source.offsets(), vec![0, 11, 11, 11]);
    assert_eq!(dispatcher.cursor(), 11);
}

#[tokio::test(start_paused = true)]
async fn test_stalled_fetch_times_out() {
    let source = ScriptedSource::new().stall().batch(updates(&[1]));
    let (hooks, recorder) = recorded(Stages::ERROR);
    let mut dispatcher = Dispatcher::new(
        source,
        RouterBuilder::<TestUpdate>::new().build(),
        hooks,
        DispatcherConfig::default().with_fetch_timeout(Duration::from_secs(1)),
    );
    let lifetime = CancellationToken::new();

    assert_eq!(dispatcher.poll_once(&lifetime).await, 0);
    assert_eq!(dispatcher.cursor(), 0);
    assert_eq!(
        recorder.errors(),
        vec!["fetching updates timed out after 2s"]
    );

    assert_eq!(dispatcher.poll_once(&lifetime).await, 1);
    assert_eq!(dispatcher.cursor(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_batch_scope_cancelled_when_all_handlers_finish() {
    let scopes = Arc::new(Mutex::new(Vec::new()));
    let captured = scopes.clone();
    let router = RouterBuilder::<TestUpdate>::new()
        .handle(move |ctx: Context<TestUpdate>| {
            let captured = captured.clone();
            async move {
                captured.lock().unwrap().push(ctx.scope().clone());
            }
        })
        .build();
    let mut dispatcher = Dispatcher::new(
        ScriptedSource::new().batch(updates(&[1, 2])),
        router,
        HookBus::empty(),
        DispatcherConfig::default(),
    );

    let started = Instant::now();
    dispatcher.poll_once(&CancellationToken::new()).await;
    sleep(Duration::from_millis(10)).await;

    let scopes = scopes.lock().unwrap().clone();
    assert_eq!(scopes.len(), 2);
    assert!(scopes.iter().all(CancellationToken::is_cancelled));
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_slow_handler_scope_expires_after_timeout() {
    let waited = Arc::new(Mutex::new(None));
    let slot = waited.clone();
    let router = RouterBuilder::<TestUpdate>::new()
        .handle(move |ctx: Context<TestUpdate>| {
            let slot = slot.clone();
            async move {
                if ctx.id() == 2 {
                    let started = Instant::now();
                    ctx.scope().cancelled().await;
                    *slot.lock().unwrap() = Some(started.elapsed());
                }
            }
        })
        .build();
    let mut dispatcher = Dispatcher::new(
        ScriptedSource::new().batch(updates(&[1, 2])),
        router,
        HookBus::empty(),
        DispatcherConfig::default().with_handler_timeout(Duration::from_secs(3)),
    );

    dispatcher.poll_once(&CancellationToken::new()).await;
    sleep(Duration::from_secs(1)).await;
    assert_eq!(*waited.lock().unwrap(), None);

    sleep(Duration::from_secs(5)).await;
    assert_eq!(*waited.lock().unwrap(), Some(Duration::from_secs(3)));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_running_batch_scope() {
    let finished = CountingHandler::new();
    let observed = finished.clone();
    let router = RouterBuilder::<TestUpdate>::new()
        .handle(move |ctx: Context<TestUpdate>| {
            let observed = observed.clone();
            async move {
                ctx.scope().cancelled().await;
                tidings::Handler::call(&observed, ctx).await
            }
        })
        .build();
    let mut dispatcher = Dispatcher::new(
        ScriptedSource::new().batch(updates(&[1])),
        router,
        HookBus::empty(),
        DispatcherConfig::default(),
    );

    let lifetime = CancellationToken::new();
    dispatcher.poll_once(&lifetime).await;
    sleep(Duration::from_secs(1)).await;
    assert_eq!(finished.count(), 0);

    lifetime.cancel();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(finished.count(), 1);
}
