use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tidings::{
    BoxError, CancellationToken, Dispatcher, DispatcherConfig, FnObserver, HookBus, HookEvent,
    LoggingObserver, RouterBuilder, Stage, Stages, filters,
    testing::{CountingHandler, RecordingObserver, ScriptedSource, TestUpdate},
};

mod common;
use common::failing;

#[tokio::test]
async fn test_failing_observers_do_not_stop_dispatch() {
    let recorder = RecordingObserver::new();
    let handled = CountingHandler::new();
    let hooks = HookBus::builder()
        .observe(
            Stages::UPDATE_RECEIVED,
            FnObserver::new(|event: HookEvent<TestUpdate>| async move {
                if event.update().is_some() {
                    panic!("observer crashed");
                }
                Ok::<(), BoxError>(())
            }),
        )
        .observe(
            Stages::UPDATE_RECEIVED,
            FnObserver::new(|_event: HookEvent<TestUpdate>| async move {
                Err::<(), BoxError>("observer refused".into())
            }),
        )
        .observe(Stages::all(), recorder.clone())
        .observe(Stages::all(), LoggingObserver)
        .build();
    let mut dispatcher = Dispatcher::new(
        ScriptedSource::new().batch(vec![TestUpdate::new(1), TestUpdate::new(2)]),
        RouterBuilder::<TestUpdate>::new().handle(handled.clone()).build(),
        hooks,
        DispatcherConfig::default().serial(),
    );

    dispatcher.poll_once(&CancellationToken::new()).await;

    assert_eq!(handled.seen(), vec![2, 1]);
    assert_eq!(recorder.count(Stage::UpdateReceived), 2);
    assert_eq!(recorder.count(Stage::HandlingFinished), 2);
    assert_eq!(recorder.count(Stage::Error), 0);
}

#[tokio::test]
async fn test_observers_of_one_stage_run_concurrently() {
    let started = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(tokio::sync::Barrier::new(3));
    let mut builder = HookBus::builder();
    for _ in 0..3 {
        let started = started.clone();
        let barrier = barrier.clone();
        builder = builder.observe(
            Stages::FILTERED_OUT,
            FnObserver::new(move |_event: HookEvent<TestUpdate>| {
                let started = started.clone();
                let barrier = barrier.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    barrier.wait().await;
                    Ok::<(), BoxError>(())
                }
            }),
        );
    }
    let hooks = builder.build();
    let router = RouterBuilder::<TestUpdate>::new()
        .filter(filters::is_group)
        .handle(CountingHandler::new())
        .build();

    let ctx = common::ctx(TestUpdate::private(1, 4, "hello"));
    assert!(!router.dispatch(&ctx, &hooks).await);
    assert_eq!(started.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_error_events_carry_update_and_message() {
    let recorder = RecordingObserver::new();
    let hooks = HookBus::builder()
        .observe(Stage::Error, recorder.clone())
        .build();
    let mut dispatcher = Dispatcher::new(
        ScriptedSource::new()
            .failure("upstream 502")
            .batch(vec![TestUpdate::new(7)]),
        RouterBuilder::<TestUpdate>::new().handle(failing("bad payload")).build(),
        hooks,
        DispatcherConfig::default().serial(),
    );
    let lifetime = CancellationToken::new();

    dispatcher.poll_once(&lifetime).await;
    dispatcher.poll_once(&lifetime).await;

    assert_eq!(recorder.update_ids(), vec![None, Some(7)]);
    assert_eq!(
        recorder.errors(),
        vec![
            "fetching updates failed: upstream 502",
            "handler failed: bad payload"
        ]
    );
}

#[test]
fn test_observer_counts_per_stage() {
    let hooks: HookBus<TestUpdate> = HookBus::builder()
        .observe(Stages::HANDLING | Stages::ERROR, LoggingObserver)
        .observe(Stage::Error, RecordingObserver::new())
        .build();

    assert_eq!(hooks.observer_count(Stage::UpdateReceived), 0);
    assert_eq!(hooks.observer_count(Stage::HandlingStarted), 1);
    assert_eq!(hooks.observer_count(Stage::HandlingFinished), 1);
    assert_eq!(hooks.observer_count(Stage::Error), 2);
}
