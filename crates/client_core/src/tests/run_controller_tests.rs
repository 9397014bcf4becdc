use super::*;
use shared::domain::ThemeStatus;

use crate::fake_backend::{run_for, theme, FakeBackend};

fn controller_with(backend: Arc<FakeBackend>) -> (RunController, broadcast::Receiver<ClientEvent>) {
    let (events, rx) = broadcast::channel(64);
    (RunController::new(backend, events), rx)
}

fn two_themes() -> (Theme, Theme, Arc<FakeBackend>) {
    let a = theme("a", "Alpha", ThemeStatus::Draft);
    let b = theme("b", "Beta", ThemeStatus::Active);
    let backend = Arc::new(FakeBackend::with_themes(vec![a.clone(), b.clone()]));
    (a, b, backend)
}

fn phases(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<RunPhase> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ClientEvent::RunStateChanged(phase) = event {
            seen.push(phase);
        }
    }
    seen
}

#[tokio::test]
async fn run_walks_dispatching_awaiting_settled() {
    let (a, _, backend) = two_themes();
    let (controller, mut rx) = controller_with(backend);

    let outcome = controller.run(a.clone()).await.expect("run");
    let RunOutcome::Settled(run) = outcome else {
        panic!("expected a settled run");
    };
    assert_eq!(run.theme_id, a.id);

    assert_eq!(
        phases(&mut rx),
        vec![
            RunPhase::Idle,
            RunPhase::Dispatching,
            RunPhase::Awaiting,
            RunPhase::Settled
        ]
    );
    let view = controller.view().await;
    assert_eq!(view.phase, RunPhase::Settled);
    assert_eq!(view.run, Some(run));
    assert_eq!(view.title(), Some("Alpha"));
    assert_eq!(view.buckets().len(), 5);
}

#[tokio::test]
async fn running_without_a_selection_fails() {
    let (_, _, backend) = two_themes();
    let (controller, _rx) = controller_with(backend.clone());

    let err = controller.run_selected().await.expect_err("nothing selected");
    assert_eq!(err, ClientError::NoThemeSelected);
    assert_eq!(controller.phase().await, RunPhase::Idle);
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn switching_theme_mid_run_drops_the_late_response() {
    let (a, b, backend) = two_themes();
    let (controller, _rx) = controller_with(backend.clone());
    let gate_a = backend.hold_run("a").await;

    let (first, second) = tokio::join!(controller.run(a.clone()), async {
        backend.wait_for_call("run_research:a").await;
        let second = controller.run(b.clone()).await;
        let _ = gate_a.send(());
        second
    });

    assert_eq!(first, Ok(RunOutcome::Superseded));
    let RunOutcome::Settled(run_b) = second.expect("run b") else {
        panic!("expected b to settle");
    };
    let view = controller.view().await;
    assert_eq!(view.phase, RunPhase::Settled);
    assert_eq!(view.theme.map(|t| t.id), Some(b.id.clone()));
    assert_eq!(view.run.map(|r| r.id), Some(run_b.id));
}

#[tokio::test]
async fn selecting_another_theme_while_awaiting_resets_to_idle() {
    let (a, b, backend) = two_themes();
    let (controller, _rx) = controller_with(backend.clone());
    let gate_a = backend.hold_run("a").await;

    let (first, ()) = tokio::join!(controller.run(a.clone()), async {
        backend.wait_for_call("run_research:a").await;
        assert_eq!(controller.phase().await, RunPhase::Awaiting);
        controller.select(b.clone()).await;
        let _ = gate_a.send(());
    });

    assert_eq!(first, Ok(RunOutcome::Superseded));
    let view = controller.view().await;
    assert_eq!(view.phase, RunPhase::Idle);
    assert!(view.run.is_none());
    assert_eq!(view.theme.map(|t| t.id), Some(b.id));
}

#[tokio::test]
async fn rerun_keeps_previous_run_visible_until_replaced() {
    let (a, _, backend) = two_themes();
    let (controller, _rx) = controller_with(backend.clone());
    let RunOutcome::Settled(first) = controller.run(a.clone()).await.expect("first run") else {
        panic!("expected a settled run");
    };
    let gate = backend.hold_run("a").await;

    let (second, ()) = tokio::join!(controller.run_selected(), async {
        backend.wait_for_call("run_research:a").await;
        while backend.count_calls("run_research:a").await < 2 {
            tokio::task::yield_now().await;
        }
        let view = controller.view().await;
        assert!(view.is_stale_pending());
        assert_eq!(view.run.as_ref().map(|r| &r.id), Some(&first.id));
        let _ = gate.send(());
    });

    let RunOutcome::Settled(second) = second.expect("second run") else {
        panic!("expected a settled run");
    };
    assert_ne!(second.id, first.id);
    assert_eq!(controller.view().await.run.map(|r| r.id), Some(second.id));
}

#[tokio::test]
async fn failed_run_keeps_the_prior_run_and_reports() {
    let (a, _, backend) = two_themes();
    let (controller, mut rx) = controller_with(backend.clone());
    let RunOutcome::Settled(first) = controller.run(a.clone()).await.expect("first run") else {
        panic!("expected a settled run");
    };

    backend.set_fail_run(true).await;
    let err = controller.run_selected().await.expect_err("failure");
    assert!(matches!(err, ClientError::Request { status: Some(500), .. }));

    let view = controller.view().await;
    assert_eq!(view.phase, RunPhase::Failed);
    assert_eq!(view.run.map(|r| r.id), Some(first.id));
    assert_eq!(view.last_error.as_deref(), Some("search provider unavailable"));

    let notice = std::iter::from_fn(|| rx.try_recv().ok())
        .find_map(|event| match event {
            ClientEvent::Notice(notice) => Some(notice),
            _ => None,
        })
        .expect("notice");
    assert_eq!(
        notice.to_string(),
        "Research run failed: search provider unavailable"
    );

    // Failed is a resting phase; retry is allowed straight away.
    backend.set_fail_run(false).await;
    assert!(matches!(
        controller.run_selected().await,
        Ok(RunOutcome::Settled(_))
    ));
}

#[tokio::test]
async fn historical_run_of_deleted_theme_cannot_be_rerun() {
    let (a, _, backend) = two_themes();
    let (controller, _rx) = controller_with(backend);
    let gone = theme("gone", "Retired", ThemeStatus::Draft);

    controller
        .show_historical(run_for("r_old", &gone, "2023-05-01T00:00:00"), None)
        .await;

    let view = controller.view().await;
    assert_eq!(view.phase, RunPhase::Settled);
    assert!(!view.can_run_again());
    assert_eq!(view.title(), Some("Retired"));
    assert_eq!(
        controller.run_selected().await,
        Err(ClientError::NoThemeSelected)
    );

    controller
        .show_historical(run_for("r_a", &a, "2024-05-01T00:00:00"), Some(a.clone()))
        .await;
    assert!(controller.view().await.can_run_again());
}

#[tokio::test]
async fn reconcile_refreshes_or_drops_the_selected_copy() {
    let (a, _, backend) = two_themes();
    let (controller, _rx) = controller_with(backend);
    controller.run(a.clone()).await.expect("run");

    let mut renamed = a.clone();
    renamed.name = "Alpha prime".to_string();
    controller.reconcile_selection(&[renamed]).await;
    assert_eq!(controller.view().await.title(), Some("Alpha prime"));
    assert_eq!(controller.selected_theme_id().await, Some(a.id.clone()));

    controller.reconcile_selection(&[]).await;
    assert_eq!(controller.selected_theme_id().await, None);
    let view = controller.view().await;
    assert!(view.theme.is_none());
    assert!(view.run.is_some());
    assert!(!view.can_run_again());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn last_phase_event_matches_final_state() {
    let (a, b, backend) = two_themes();
    let (events, mut rx) = broadcast::channel(1024);
    let controller = Arc::new(RunController::new(backend, events));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let controller = controller.clone();
            let theme = if i % 2 == 0 { a.clone() } else { b.clone() };
            tokio::spawn(async move {
                let _ = controller.run(theme).await;
            })
        })
        .collect();
    for task in futures::future::join_all(tasks).await {
        task.expect("task");
    }

    let last = phases(&mut rx).pop().expect("phase events");
    assert_eq!(last, controller.phase().await);
    assert!(!last.is_pending());
    assert!(controller.selected_theme_id().await.is_some());
}
