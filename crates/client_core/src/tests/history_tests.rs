use super::*;
use shared::domain::ThemeStatus;

use crate::fake_backend::{run_for, theme, FakeBackend};

fn cache_with(backend: Arc<FakeBackend>) -> (HistoryCache, broadcast::Receiver<ClientEvent>) {
    let (events, rx) = broadcast::channel(64);
    (HistoryCache::new(backend, events), rx)
}

#[tokio::test]
async fn refresh_orders_newest_first() {
    let a = theme("a", "Alpha", ThemeStatus::Draft);
    let backend = Arc::new(FakeBackend::with_themes(vec![a.clone()]));
    backend
        .set_runs(vec![
            run_for("r1", &a, "2024-01-01T00:00:00"),
            run_for("r2", &a, "2024-02-01T00:00:00"),
            run_for("r3", &a, "2024-03-01T00:00:00"),
        ])
        .await;
    let (cache, mut rx) = cache_with(backend);

    let runs = cache.refresh().await.expect("refresh");
    let ids: Vec<&str> = runs.iter().map(|run| run.id.as_str()).collect();
    assert_eq!(ids, vec!["r3", "r2", "r1"]);
    assert_eq!(cache.runs().await, runs);
    assert!(matches!(
        rx.try_recv(),
        Ok(ClientEvent::HistoryChanged { runs: 3 })
    ));
}

#[tokio::test]
async fn load_pairs_cached_run_with_live_theme() {
    let a = theme("a", "Alpha", ThemeStatus::Active);
    let gone = theme("gone", "Retired", ThemeStatus::Draft);
    let backend = Arc::new(FakeBackend::with_themes(vec![a.clone()]));
    backend
        .set_runs(vec![
            run_for("r1", &gone, "2023-01-01T00:00:00"),
            run_for("r2", &a, "2024-01-01T00:00:00"),
        ])
        .await;
    let (cache, _rx) = cache_with(backend.clone());
    cache.refresh().await.expect("refresh");
    let themes = vec![a.clone()];

    let live = cache.load(&"r2".into(), &themes).await.expect("cached");
    assert_eq!(live.theme, Some(a));
    assert!(live.can_run_again());

    let orphan = cache.load(&"r1".into(), &themes).await.expect("cached");
    assert!(orphan.theme.is_none());
    assert!(!orphan.can_run_again());
    assert_eq!(orphan.run.theme_name, "Retired");

    assert!(cache.load(&"r9".into(), &themes).await.is_none());
    assert_eq!(backend.count_calls("fetch_run").await, 0);
}

#[tokio::test]
async fn fetch_run_reports_missing_runs() {
    let backend = Arc::new(FakeBackend::with_themes(Vec::new()));
    let (cache, mut rx) = cache_with(backend);

    let err = cache.fetch_run(&"r404".into()).await.expect_err("missing");
    assert!(matches!(err, ClientError::Request { status: Some(404), .. }));
    let Ok(ClientEvent::Notice(notice)) = rx.try_recv() else {
        panic!("expected a notice");
    };
    assert_eq!(notice.to_string(), "Failed to load run: Run not found");
}

#[tokio::test]
async fn overtaken_history_response_is_dropped() {
    let a = theme("a", "Alpha", ThemeStatus::Draft);
    let backend = Arc::new(FakeBackend::with_themes(vec![a.clone()]));
    backend
        .set_runs(vec![run_for("r1", &a, "2024-01-01T00:00:00")])
        .await;
    let (cache, mut rx) = cache_with(backend.clone());
    let gate = backend.hold_history().await;

    let (first, second) = tokio::join!(cache.refresh(), async {
        backend.wait_for_call("list_runs").await;
        backend
            .set_runs(vec![
                run_for("r1", &a, "2024-01-01T00:00:00"),
                run_for("r2", &a, "2024-02-01T00:00:00"),
            ])
            .await;
        let second = cache.refresh().await;
        let _ = gate.send(());
        second
    });

    let second = second.expect("second refresh");
    let ids: Vec<&str> = second.iter().map(|run| run.id.as_str()).collect();
    assert_eq!(ids, vec!["r2", "r1"]);
    assert_eq!(first.expect("first refresh"), second);
    assert_eq!(cache.runs().await, second);

    let changes: Vec<usize> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter_map(|event| match event {
            ClientEvent::HistoryChanged { runs } => Some(runs),
            _ => None,
        })
        .collect();
    assert_eq!(changes, vec![2]);
}

#[tokio::test]
async fn failed_refresh_keeps_cached_runs() {
    let a = theme("a", "Alpha", ThemeStatus::Draft);
    let backend = Arc::new(FakeBackend::with_themes(vec![a.clone()]));
    backend
        .set_runs(vec![run_for("r1", &a, "2024-01-01T00:00:00")])
        .await;
    let (cache, mut rx) = cache_with(backend.clone());
    let cached = cache.refresh().await.expect("refresh");
    while rx.try_recv().is_ok() {}

    backend.set_fail_history(true).await;
    let err = cache.refresh().await.expect_err("history offline");
    assert!(matches!(err, ClientError::Request { status: Some(503), .. }));
    assert_eq!(cache.runs().await, cached);

    let Ok(ClientEvent::Notice(notice)) = rx.try_recv() else {
        panic!("expected a notice");
    };
    assert_eq!(
        notice.to_string(),
        "Failed to load run history: history store offline"
    );
    assert!(rx.try_recv().is_err());
}
