use std::collections::HashMap;

use shared::domain::{BucketId, BucketResult, ResultItem, Run};

use super::*;

fn item(title: &str, href: &str) -> ResultItem {
    ResultItem {
        title: title.to_string(),
        body: format!("{title} body"),
        href: href.to_string(),
    }
}

fn run_with(buckets: Vec<(&str, BucketResult)>) -> Run {
    Run {
        id: "run_1".into(),
        theme_id: "t1".into(),
        theme_name: "AI Agents".to_string(),
        timestamp: "2024-01-01T10:00:00".to_string(),
        buckets: buckets
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<HashMap<_, _>>(),
    }
}

#[test]
fn every_known_bucket_is_present_in_declared_order() {
    let run = run_with(vec![
        (
            "mbb",
            BucketResult {
                summary: Some("consultants agree".to_string()),
                results: vec![
                    item("a", "https://www.mckinsey.com/a"),
                    item("b", "https://bcg.com/b"),
                    item("c", "https://bain.com/c"),
                ],
            },
        ),
        ("arxiv", BucketResult::default()),
    ]);

    let views = aggregate_known(&run);
    let ids: Vec<BucketId> = views.iter().map(|v| v.meta.id).collect();
    assert_eq!(ids, BucketId::ALL.to_vec());

    assert_eq!(views[0].results.len(), 3);
    assert_eq!(views[0].summary.as_deref(), Some("consultants agree"));
    for view in &views[1..] {
        assert!(view.is_empty(), "{} should be empty", view.meta.id);
        assert!(view.summary.is_none());
    }
}

#[test]
fn result_order_is_preserved_and_duplicates_kept() {
    let run = run_with(vec![(
        "reddit",
        BucketResult {
            summary: None,
            results: vec![
                item("z", "https://reddit.com/r/z"),
                item("a", "https://reddit.com/r/a"),
                item("z", "https://reddit.com/r/z"),
            ],
        },
    )]);
    let views = aggregate_known(&run);
    let reddit = &views[2];
    assert_eq!(reddit.meta.id, BucketId::Reddit);
    let titles: Vec<&str> = reddit.results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["z", "a", "z"]);
}

#[test]
fn unknown_buckets_are_ignored() {
    let run = run_with(vec![(
        "podcasts",
        BucketResult {
            summary: Some("ignored".to_string()),
            results: vec![item("p", "https://example.com/p")],
        },
    )]);
    let views = aggregate_known(&run);
    assert_eq!(views.len(), KNOWN_BUCKETS.len());
    assert!(views.iter().all(BucketView::is_empty));
}

#[test]
fn aggregate_follows_caller_supplied_layout() {
    let run = run_with(vec![("youtube", BucketResult::default())]);
    let layout = [KNOWN_BUCKETS[4], KNOWN_BUCKETS[0]];
    let views = aggregate(&run, &layout);
    assert_eq!(views[0].meta.label, "Media (YouTube)");
    assert_eq!(views[1].meta.id, BucketId::Mbb);
}

#[test]
fn display_host_is_verbatim_and_tolerates_garbage() {
    assert_eq!(
        display_host("https://www.mckinsey.com/insights/x"),
        Some("www.mckinsey.com".to_string())
    );
    assert_eq!(
        display_host("https://blog.www.example.com:8443/post"),
        Some("blog.www.example.com".to_string())
    );
    assert_eq!(
        display_host("http://arxiv.org/abs/1234"),
        Some("arxiv.org".to_string())
    );
    assert_eq!(display_host("not a url"), None);
    assert_eq!(display_host("/relative/path"), None);
    assert_eq!(display_host("mailto:someone@example.com"), None);
}
