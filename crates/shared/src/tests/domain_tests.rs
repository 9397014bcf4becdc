use crate::{
    domain::{BucketId, Run, Schedule, Theme, ThemeStatus},
    protocol::UpdateThemeRequest,
};

#[test]
fn theme_without_schedule_or_status_defaults_to_weekly_draft() {
    let theme: Theme = serde_json::from_str(
        r#"{"id":"t1","name":"AI Agents","description":"d","keywords":["ai","agents"]}"#,
    )
    .expect("theme");
    assert_eq!(theme.schedule, Schedule::Weekly);
    assert_eq!(theme.status, ThemeStatus::Draft);
    assert_eq!(theme.keywords, vec!["ai".to_string(), "agents".to_string()]);
}

#[test]
fn theme_ignores_extra_backend_fields() {
    let theme: Theme = serde_json::from_str(
        r#"{"id":"t2","name":"Supply Chain","description":"d2","keywords":[],
            "status":"active","schedule":"monthly","created_at":"2024-01-01T00:00:00"}"#,
    )
    .expect("theme");
    assert!(theme.is_active());
    assert_eq!(theme.schedule, Schedule::Monthly);
}

#[test]
fn run_tolerates_unknown_and_partial_buckets() {
    let run: Run = serde_json::from_str(
        r#"{"id":"run_1","theme_id":"t1","theme_name":"AI Agents",
            "timestamp":"2024-01-01T10:05:00.123456",
            "buckets":{"reddit":{"results":[],"summary":"ok"},"podcasts":{"results":[]},
                       "mbb":{"results":[{"title":"t","body":"b","href":"https://mckinsey.com/x"}]}}}"#,
    )
    .expect("run");
    assert_eq!(run.bucket(BucketId::Reddit).and_then(|b| b.summary.as_deref()), Some("ok"));
    assert_eq!(run.bucket(BucketId::Mbb).map(|b| b.results.len()), Some(1));
    assert!(run.bucket(BucketId::Mbb).and_then(|b| b.summary.as_ref()).is_none());
    assert!(run.bucket(BucketId::Arxiv).is_none());
    assert!(run.recorded_at().is_some());
}

#[test]
fn recorded_at_accepts_rfc3339_and_rejects_garbage() {
    let mut run: Run = serde_json::from_str(
        r#"{"id":"r","theme_id":"t","theme_name":"n","timestamp":"2024-01-01T00:00:00Z"}"#,
    )
    .expect("run");
    assert!(run.buckets.is_empty());
    assert!(run.recorded_at().is_some());

    run.timestamp = "yesterday".to_string();
    assert!(run.recorded_at().is_none());
}

#[test]
fn schedule_parses_case_insensitively() {
    assert_eq!("Daily".parse::<Schedule>(), Ok(Schedule::Daily));
    assert_eq!(" monthly ".parse::<Schedule>(), Ok(Schedule::Monthly));
    assert!("hourly".parse::<Schedule>().is_err());
}

#[test]
fn update_request_carries_every_field() {
    let theme: Theme = serde_json::from_str(
        r#"{"id":"t3","name":"Robotics","description":"d3","keywords":["robots"],
            "status":"active","schedule":"daily"}"#,
    )
    .expect("theme");
    let body = serde_json::to_value(UpdateThemeRequest::from(&theme)).expect("json");
    for key in ["name", "description", "keywords", "schedule", "status"] {
        assert!(body.get(key).is_some(), "missing {key}");
    }
    assert_eq!(body["status"], "active");
    assert_eq!(body["schedule"], "daily");
}
