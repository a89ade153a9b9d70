use std::{sync::Arc, time::Duration};
use tidings::{
    BoxError, CancellationToken, Clause, Context, Dispatcher, DispatcherConfig, RouterBuilder,
    Scheduler, SchedulerConfig, Stages, ThrottledClient, Update,
    testing::{RecordingClient, ScriptedSource, TestUpdate},
};
use tokio::time::{Instant, sleep, timeout};

mod common;
use common::recorded;

#[tokio::test(start_paused = true)]
async fn test_second_call_waits_for_tightest_clause() {
    let scheduler = Scheduler::new(vec![
        Clause::global(5, Duration::from_secs(1)),
        Clause::conversation(1, Duration::from_secs(2)),
    ]);

    scheduler.schedule(-100, 1).await;
    scheduler.schedule(-200, 1).await;
    scheduler.done(-100, 1);

    let blocked = timeout(Duration::from_millis(1_500), scheduler.schedule(-100, 1)).await;
    assert!(blocked.is_err());

    let started = Instant::now();
    scheduler.schedule(-100, 1).await;
    assert!(started.elapsed() <= Duration::from_millis(600));
    assert_eq!(scheduler.usage(-100).await, vec![2, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_default_policy_global_ceiling() {
    let scheduler = Scheduler::from_config(&SchedulerConfig::default()).unwrap();

    for originator in 1..=30 {
        assert!(scheduler.try_admit(originator, 1).await);
    }
    assert!(!scheduler.try_admit(31, 1).await);

    for originator in 1..=30 {
        scheduler.done(originator, 1);
    }
    sleep(Duration::from_millis(1_600)).await;
    assert!(scheduler.try_admit(31, 1).await);
    assert_eq!(scheduler.usage(31).await, vec![1, 0, 0, 1, 1]);
    assert_eq!(scheduler.usage(1).await, vec![1, 0, 0, 1, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_handlers_share_one_scheduler() {
    let scheduler = Scheduler::new(vec![Clause::conversation(1, Duration::from_secs(1))]);
    let client = Arc::new(ThrottledClient::new(RecordingClient::new(), scheduler));
    let replies = client.clone();
    let router = RouterBuilder::<TestUpdate>::new()
        .handle(move |ctx: Context<TestUpdate>| {
            let client = replies.clone();
            async move {
                let chat = ctx.chat_id().unwrap_or_default();
                client.call(chat, format!("reply to {}", ctx.id())).await?;
                Ok::<(), BoxError>(())
            }
        })
        .build();
    let mut dispatcher = Dispatcher::new(
        ScriptedSource::new().batch(vec![
            TestUpdate::group(1, 50, "a"),
            TestUpdate::group(2, 50, "b"),
            TestUpdate::group(3, 60, "c"),
        ]),
        router,
        tidings::HookBus::empty(),
        DispatcherConfig::default(),
    );

    dispatcher.poll_once(&CancellationToken::new()).await;
    sleep(Duration::from_millis(100)).await;
    let mut early = client.inner().requests();
    early.sort();
    assert_eq!(early, vec!["reply to 2", "reply to 3"]);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(client.inner().requests().len(), 3);
    assert_eq!(client.inner().requests()[2], "reply to 1");
}

#[tokio::test(start_paused = true)]
async fn test_expired_batch_scope_abandons_waiting_call() {
    let scheduler = Scheduler::new(vec![Clause::global(1, Duration::from_secs(60))]);
    let client = Arc::new(ThrottledClient::new(RecordingClient::new(), scheduler));
    let replies = client.clone();
    let router = RouterBuilder::<TestUpdate>::new()
        .handle(move |ctx: Context<TestUpdate>| {
            let client = replies.clone();
            async move {
                let request = format!("reply to {}", ctx.id());
                client.call_within(0, request, ctx.scope()).await?;
                Ok::<(), BoxError>(())
            }
        })
        .build();
    let (hooks, recorder) = recorded(Stages::ERROR);
    let mut dispatcher = Dispatcher::new(
        ScriptedSource::new().batch(vec![TestUpdate::new(1), TestUpdate::new(2)]),
        router,
        hooks,
        DispatcherConfig::default().with_handler_timeout(Duration::from_secs(1)),
    );

    dispatcher.poll_once(&CancellationToken::new()).await;
    sleep(Duration::from_secs(2)).await;

    assert_eq!(client.inner().requests(), vec!["reply to 2"]);
    assert_eq!(
        recorder.errors(),
        vec!["handler failed: call cancelled before it was admitted"]
    );
    assert_eq!(recorder.update_ids(), vec![Some(1)]);
}
