use std::sync::Arc;
use std::time::Duration;

use asyncops::prelude::*;
use asyncops::testing::TestHarness;
use asyncops::{count_phase, error_kind};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Sleeps for `args[0]` milliseconds, then succeeds with the delay or fails
/// when `args[1]` is `"fail"`.
fn delayed() -> Operation {
    operation(|args| async move {
        let delay = args.first().and_then(Value::as_u64).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        match args.get(1).and_then(Value::as_str) {
            Some("fail") => Err(json!({ "after": delay })),
            _ => Ok(json!(delay)),
        }
    })
}

fn registry() -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    registry.register("delayed", delayed(), None).unwrap();
    registry
        .register(
            "explode",
            operation(|args| async move {
                if args.is_empty() {
                    panic!("implementation bug");
                }
                Ok(json!(null))
            }),
            None,
        )
        .unwrap();
    registry
}

#[tokio::test(start_paused = true)]
async fn test_operations_run_side_by_side() {
    let mut harness = TestHarness::with_registry(registry());

    for (channel, delay) in [("a", 300), ("b", 100), ("c", 200)] {
        harness.dispatch(
            OpAction::new("OPERATION/delayed")
                .with_channel(channel)
                .with_args(vec![json!(delay)]),
        );
    }
    assert_eq!(harness.in_flight(), 3);
    assert_eq!(harness.state.loading_count(), 3);

    let started = tokio::time::Instant::now();
    let emitted = harness.settle().await;

    // Concurrent, so total time is the longest delay rather than the sum
    assert!(started.elapsed() < Duration::from_millis(400));
    let order: Vec<_> = emitted
        .iter()
        .map(|a| a.channel.clone().unwrap_or_default())
        .collect();
    assert_eq!(order, vec!["b", "c", "a"]);
    assert!(harness.state.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_out_of_order_same_key_last_reduced_wins() {
    let mut harness = TestHarness::with_registry(registry());

    // Slow success started first, fast failure started second
    harness.dispatch(OpAction::new("OPERATION/delayed").with_args(vec![json!(200)]));
    harness.dispatch(
        OpAction::new("OPERATION/delayed").with_args(vec![json!(50), json!("fail")]),
    );

    let first = harness
        .next_emitted(Duration::from_secs(1))
        .await
        .expect("fast failure");
    assert_eq!(first.kind, "FAILURE/delayed");
    harness.apply(&first);
    assert!(harness.state.get("delayed").unwrap().has_error());

    let second = harness
        .next_emitted(Duration::from_secs(1))
        .await
        .expect("slow success");
    assert_eq!(second.kind, "COMPLETE/delayed");
    harness.apply(&second);

    // The stale success is reduced last and clears the newer failure
    assert!(harness.state.get("delayed").is_none());
}

#[tokio::test]
async fn test_panic_becomes_failure_and_spares_others() {
    let mut harness = TestHarness::with_registry(registry());

    harness.dispatch(OpAction::new("OPERATION/explode"));
    harness.dispatch(OpAction::new("OPERATION/delayed").with_args(vec![json!(5)]));

    let emitted = harness.settle().await;
    assert_eq!(emitted.len(), 2);
    assert_eq!(count_phase!(emitted, Phase::Failure), 1);
    assert_eq!(count_phase!(emitted, Phase::Complete), 1);

    let failure = emitted
        .iter()
        .find(|a| a.kind == "FAILURE/explode")
        .unwrap();
    let error = failure.error.as_ref().unwrap();
    assert_eq!(error_kind(error), Some("OperationPanicked"));
    assert_eq!(error["message"], "implementation bug");
}

#[tokio::test]
async fn test_runtime_loop_processes_actions_until_cancelled() {
    let mut runtime = OpsRuntime::new(registry());
    let tx = runtime.action_tx();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            runtime.run(cancel).await;
            runtime
        }
    });

    for channel in ["1", "2", "3"] {
        tx.send(
            OpAction::new("OPERATION/delayed")
                .with_channel(channel)
                .with_args(vec![json!(10), json!("fail")]),
        )
        .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(200)).await;
    cancel.cancel();

    let mut runtime = handle.await.unwrap();
    runtime.settle().await;

    let state = runtime.state();
    assert_eq!(state.len(), 3);
    for channel in ["1", "2", "3"] {
        let status = status(state, "delayed", Some(channel));
        assert!(!status.loading);
        assert_eq!(status.error, Some(json!({ "after": 10 })));
    }
}

#[tokio::test(start_paused = true)]
async fn test_dispatcher_answers_every_start() {
    let registry = registry();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<OpAction>();
    let dispatcher = Dispatcher::new(registry, tx);

    let mut map = StatusMap::new();
    let starts: Vec<OpAction> = (0..20)
        .map(|i| {
            OpAction::new("OPERATION/delayed")
                .with_channel(i.to_string())
                .with_args(vec![json!(20 - i)])
        })
        .collect();
    for start in &starts {
        map = reduce(&map, start);
        dispatcher.observe(start);
    }
    assert_eq!(map.loading_count(), 20);

    dispatcher.wait_idle().await;
    let mut terminals = 0;
    while let Ok(action) = rx.try_recv() {
        map = reduce(&map, &action);
        terminals += 1;
    }
    assert_eq!(terminals, 20);
    assert!(map.is_empty());
}
