//! Reconciliation and arbitration integration tests
//!
//! Drives the registry against simulated workers over the in-process broker.

mod common;

use std::sync::Arc;

use serde_json::json;

use dcx_core::config::CoordinatorConfig;
use dcx_core::error::ContextError;
use dcx_core::types::Bounds;
use dcx_core::DcxError;
use dcx_coordinator::sim::SimulatedWorker;
use dcx_coordinator::{Activation, ReconcileOutcome};
use dcx_protocol::topic::{self, ContextChanged};
use dcx_protocol::Command;

use common::{assert_no_dangling_panes, layout, Harness};

#[tokio::test]
async fn test_unknown_context_is_initialized_from_declared_layout() {
    let h = Harness::new(&["left", "right"]);
    let declared = layout(&[("main", "left"), ("side", "right")]);

    let (context, activation, outcome) = h
        .registry
        .activate("alpha", Some(declared), false)
        .await
        .unwrap();

    assert_eq!(activation, Activation::Switched { previous: None });
    assert_eq!(outcome, Some(ReconcileOutcome::Initialized { windows: 2 }));
    assert_eq!(h.worker("left").windows("alpha"), vec!["main".to_string()]);
    assert_eq!(h.worker("right").windows("alpha"), vec!["side".to_string()]);
    assert!(h.worker("left").is_visible("alpha"));

    let windows = context.windows();
    assert_eq!(windows.len(), 2);
    assert_eq!(windows[0].window_name, "main");
    assert_eq!(windows[0].display_name.as_str(), "left");
}

#[tokio::test]
async fn test_without_declared_layout_each_worker_gets_a_screen_window() {
    let h = Harness::new(&["left", "right"]);

    let (context, _, outcome) = h.registry.activate("alpha", None, false).await.unwrap();

    assert_eq!(outcome, Some(ReconcileOutcome::Initialized { windows: 2 }));
    assert_eq!(h.worker("left").call_count(Command::GetDisplayBounds), 1);
    let names: Vec<_> = context.windows().into_iter().map(|w| w.window_name).collect();
    assert_eq!(names, vec!["left".to_string(), "right".to_string()]);
    assert_eq!(context.window("right").unwrap().bounds.width, 1920.0);
}

#[tokio::test]
async fn test_remembered_context_is_shown_without_creating_windows() {
    let h = Harness::new(&["left", "right"]);
    h.worker("left")
        .seed_window("alpha", "main", Bounds::new(0.0, 0.0, 640.0, 480.0));
    h.worker("left").seed_view_object("alpha", "main", "p1");

    let (context, _, outcome) = h
        .registry
        .activate("alpha", Some(layout(&[("main", "left"), ("side", "right")])), false)
        .await
        .unwrap();

    assert_eq!(outcome, Some(ReconcileOutcome::Shown { windows: 1 }));
    assert_eq!(h.worker("left").call_count(Command::CreateWindow), 0);
    assert_eq!(h.worker("right").call_count(Command::CreateWindow), 0);
    assert_eq!(h.worker("left").call_count(Command::Reload), 0);
    assert!(h.worker("left").is_visible("alpha"));
    assert_eq!(context.pane("p1").unwrap().display_name.as_str(), "left");
}

#[tokio::test]
async fn test_reset_reloads_every_pane_on_its_owner() {
    let h = Harness::new(&["left", "right"]);
    h.worker("left").seed_window("alpha", "main", Bounds::default());
    h.worker("left").seed_view_object("alpha", "main", "p1");
    h.worker("right").seed_window("alpha", "side", Bounds::default());
    h.worker("right").seed_view_object("alpha", "side", "p2");
    h.worker("right").seed_view_object("alpha", "side", "p3");

    let (_, _, outcome) = h.registry.activate("alpha", None, true).await.unwrap();

    assert_eq!(outcome, Some(ReconcileOutcome::Reset { reloaded: 3 }));
    assert_eq!(h.worker("left").call_count(Command::Reload), 1);
    assert_eq!(h.worker("right").call_count(Command::Reload), 2);
}

#[tokio::test]
async fn test_reset_after_pane_closed_elsewhere_reloads_only_survivors() {
    let h = Harness::new(&["left"]);
    let context = h
        .registry
        .create("alpha", Some(layout(&[("main", "left")])))
        .await
        .unwrap();
    let kept = context.create_pane("main", json!({})).await.unwrap();
    let gone = context.create_pane("main", json!({})).await.unwrap();
    assert!(h.worker("left").forget_view_object("alpha", &gone.pane_id));
    h.registry.activate("beta", None, false).await.unwrap();

    let (_, _, outcome) = h.registry.activate("alpha", None, true).await.unwrap();

    assert_eq!(outcome, Some(ReconcileOutcome::Reset { reloaded: 1 }));
    assert_eq!(context.panes(), vec![kept]);
    assert!(context.pane(&gone.pane_id).is_none());
    assert_eq!(
        h.registry.active_context().await.unwrap().as_deref(),
        Some("alpha")
    );
}

#[tokio::test]
async fn test_sync_forgets_windows_no_worker_reports() {
    let h = Harness::new(&["left", "right"]);
    let context = h
        .registry
        .create("alpha", Some(layout(&[("main", "left"), ("side", "right")])))
        .await
        .unwrap();
    context.create_pane("side", json!({})).await.unwrap();

    // The right worker restarts and forgets everything it hosted
    h.broker
        .bind("rpc-display-right", Arc::new(SimulatedWorker::new("right")));

    let tally = context.sync().await.unwrap();

    assert_eq!(tally.windows, 1);
    assert!(context.window("side").is_none());
    assert!(context.panes().is_empty());
    assert_no_dangling_panes(&context);
}

#[tokio::test]
async fn test_pane_without_window_is_dropped() {
    let h = Harness::new(&["left"]);
    h.worker("left").seed_window("alpha", "main", Bounds::default());
    h.worker("left").seed_view_object("alpha", "main", "p1");
    h.worker("left").seed_view_object("alpha", "gone", "orphan");

    let (context, _, _) = h.registry.activate("alpha", None, false).await.unwrap();

    assert!(context.pane("p1").is_some());
    assert!(context.pane("orphan").is_none());
    assert_no_dangling_panes(&context);
}

#[tokio::test]
async fn test_activating_twice_reconciles_and_publishes_once() {
    let h = Harness::new(&["left"]);

    h.registry.activate("alpha", None, false).await.unwrap();
    let (_, activation, outcome) = h.registry.activate("alpha", None, false).await.unwrap();

    assert_eq!(activation, Activation::AlreadyActive);
    assert!(outcome.is_none());
    assert_eq!(h.worker("left").call_count(Command::DescribeContext), 1);
    assert_eq!(h.broker.published_on(topic::CONTEXT_CHANGED).len(), 1);
}

#[tokio::test]
async fn test_switching_publishes_previous_context() {
    let h = Harness::new(&["left"]);

    h.registry.create("alpha", None).await.unwrap();
    let (_, activation, _) = h.registry.activate("beta", None, false).await.unwrap();

    assert_eq!(activation.previous(), Some("alpha"));
    assert_eq!(
        h.registry.active_context().await.unwrap().as_deref(),
        Some("beta")
    );

    let changed = h.broker.published_on(topic::CONTEXT_CHANGED);
    let last: ContextChanged = serde_json::from_value(changed[1].clone()).unwrap();
    assert_eq!(last.display_context, "beta");
    assert_eq!(last.last_display_context.as_deref(), Some("alpha"));
    assert_eq!(h.broker.published_on(topic::CONTEXT_CREATED).len(), 1);
    assert!(h.worker("left").is_visible("beta"));
    assert!(!h.worker("left").is_visible("alpha"));
}

#[tokio::test]
async fn test_no_workers_fails_activation_and_withdraws_pointer() {
    let h = Harness::new(&[]);

    let err = h.registry.activate("alpha", None, false).await.unwrap_err();

    assert!(err.is_no_workers());
    assert_eq!(h.registry.active_context().await.unwrap(), None);
    assert!(h.broker.published_on(topic::CONTEXT_CHANGED).is_empty());
}

#[tokio::test]
async fn test_failed_activation_restores_previous_context() {
    let h = Harness::new(&["left"]);
    h.registry.create("beta", None).await.unwrap();
    h.worker("left")
        .fail_command(Command::DescribeContext, "renderer crashed");

    h.registry.activate("alpha", None, false).await.unwrap_err();

    assert_eq!(
        h.registry.active_context().await.unwrap().as_deref(),
        Some("beta")
    );
    assert_eq!(h.broker.published_on(topic::CONTEXT_CHANGED).len(), 1);
}

#[tokio::test]
async fn test_worker_error_surfaces_with_its_message() {
    let h = Harness::new(&["left", "right"]);
    h.worker("right")
        .fail_command(Command::DescribeContext, "renderer crashed");

    let err = h.registry.activate("alpha", None, false).await.unwrap_err();

    match err {
        DcxError::Context(ContextError::WorkerReported {
            display, message, ..
        }) => {
            assert_eq!(display, "right");
            assert_eq!(message, "renderer crashed");
        }
        other => panic!("Expected WorkerReported, got {:?}", other),
    }
    // Nothing was created while the snapshot was incomplete
    assert_eq!(h.worker("left").call_count(Command::CreateWindow), 0);

    // Failure is not remembered as active, so a retry reconciles again
    h.worker("right").heal_command(Command::DescribeContext);
    let (_, activation, outcome) = h.registry.activate("alpha", None, false).await.unwrap();
    assert!(activation.is_switch());
    assert_eq!(outcome, Some(ReconcileOutcome::Initialized { windows: 2 }));
}

#[tokio::test]
async fn test_configured_default_layout_is_used() {
    let config = CoordinatorConfig {
        default_layout: layout(&[("panel", "left")]),
        ..Default::default()
    };
    let h = Harness::with_config(&["left"], config);

    let (context, _, outcome) = h.registry.activate("alpha", None, false).await.unwrap();

    assert_eq!(outcome, Some(ReconcileOutcome::Initialized { windows: 1 }));
    assert_eq!(h.worker("left").call_count(Command::GetDisplayBounds), 0);
    assert_eq!(h.worker("left").windows("alpha"), vec!["panel".to_string()]);
    assert!(context.window("panel").is_some());
}
