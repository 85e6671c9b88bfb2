//! Dispatch loop: events are handled concurrently and cleanup never
//! blocks intake.

use std::sync::Arc;
use std::time::Duration;

use super::test_helpers::{capture_logs, drain, group_text, pipeline, MockGateway, DELAY};
use query_relay::relay::{report_task_exit, spawn_dispatch};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn handles_events_without_waiting_for_cleanup() {
    let gateway = MockGateway::with_posts(&[(31, "abc"), (32, "def")]);
    let pipeline = Arc::new(pipeline(&gateway));
    let (tx, rx) = mpsc::channel(8);
    let ct = CancellationToken::new();
    let handle = spawn_dispatch(Arc::clone(&pipeline), rx, ct.clone());

    tx.send(group_text(5, "abc")).await.expect("send");
    tx.send(group_text(6, "ab")).await.expect("send");
    tx.send(group_text(7, "def")).await.expect("send");

    // Well inside the grace period both relays have happened.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(gateway.copies(), 2);
    assert_eq!(gateway.searches(), 2);
    assert!(gateway.deletes().is_empty());
    assert_eq!(pipeline.cleanup().in_flight(), 2);

    tokio::time::sleep(DELAY).await;
    drain(pipeline.cleanup()).await;
    assert_eq!(gateway.deletes().len(), 2);

    ct.cancel();
    handle.await.expect("dispatch loop exits cleanly");
}

#[tokio::test]
async fn exits_when_event_stream_closes() {
    let gateway = MockGateway::new();
    let (tx, rx) = mpsc::channel(1);
    let handle = spawn_dispatch(Arc::new(pipeline(&gateway)), rx, CancellationToken::new());

    drop(tx);

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop exits")
        .expect("no panic");
}

#[tokio::test]
async fn exits_on_cancellation() {
    let gateway = MockGateway::new();
    let (_tx, rx) = mpsc::channel(1);
    let ct = CancellationToken::new();
    let handle = spawn_dispatch(Arc::new(pipeline(&gateway)), rx, ct.clone());

    ct.cancel();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop exits")
        .expect("no panic");
}

#[tokio::test]
async fn panicked_background_task_is_logged_on_join() {
    let (_guard, logs) = capture_logs();

    let handle = tokio::spawn(async { panic!("poll loop exploded") });
    assert!(!report_task_exit("telegram_poller", handle.await));

    let lines = logs.lines_containing("background task failed");
    assert_eq!(lines.len(), 1, "{}", logs.contents());
    assert!(lines[0].contains("telegram_poller"), "{}", lines[0]);
    assert!(lines[0].contains("panicked=true"), "{}", lines[0]);
}

#[tokio::test]
async fn clean_exit_is_not_reported() {
    let (_guard, logs) = capture_logs();

    let handle = tokio::spawn(async {});
    assert!(report_task_exit("dispatch", handle.await));
    assert!(logs.lines_containing("background task failed").is_empty());
}
