//! End-to-end flow over canned server payloads: parse the wire types,
//! interpret a classification reply, and aggregate the resulting history.

use chrono::{Duration, Utc};
use masklens::core::admin::{self, AdminAnalytics};
use masklens::core::history::{EmotionKind, HistoryAggregator, WeeklyGraph};
use masklens::core::interpreter::{interpret_response, EmotionLabel, MaskState};
use masklens::service::protocol::{
    AdminStatsResponse, EmotionListResponse, LoginResponse, UserRecord, WeeklySummaryRaw,
};

#[test]
fn login_reply_carries_profile_fields() {
    let body = r#"{"access_token": "abc.def.ghi", "fullname": "Grace Hopper", "role": "admin"}"#;
    let login: LoginResponse = serde_json::from_str(body).unwrap();
    assert_eq!(login.access_token, "abc.def.ghi");
    assert_eq!(login.fullname.as_deref(), Some("Grace Hopper"));
    assert_eq!(login.role.as_deref(), Some("admin"));
}

#[test]
fn capture_reply_flows_into_history() {
    // The /predict reply the capture workflow hands to the interpreter
    let body = r#"{"emotion": "Happy", "mask_status": "NO MASK", "faces_detected": 2}"#;
    let interpretation = interpret_response(200, body);
    assert_eq!(interpretation.label, EmotionLabel::Happy);
    assert_eq!(interpretation.mask_state, MaskState::NoMask);
    assert_eq!(interpretation.faces_detected, 2);

    // After a successful capture the client refetches /my_emotions
    let now = Utc::now();
    let recent = (now - Duration::days(1)).format("%Y-%m-%d %H:%M:%S").to_string();
    let old = (now - Duration::days(20)).format("%Y-%m-%d %H:%M:%S").to_string();
    let list: EmotionListResponse = serde_json::from_str(&format!(
        r#"{{"emotions": [
            {{"id": 3, "emotion": "Happy", "timestamp": "{recent}"}},
            {{"id": 2, "emotion": "Sad", "timestamp": "{recent}"}},
            {{"id": 1, "emotion": "Happy", "timestamp": "{old}"}}
        ]}}"#
    ))
    .unwrap();

    let mut history = HistoryAggregator::new();
    let seq = history.begin_refresh();
    assert!(history.apply_refresh(seq, list.emotions));

    let summary = history.weekly_summary(now);
    assert_eq!((summary.total, summary.happy, summary.sad), (2, 1, 1));
    // Happy and Sad are tied inside the window
    assert_eq!(history.most_frequent(now), None);
}

#[test]
fn error_reply_surfaces_server_message() {
    let interpretation = interpret_response(400, r#"{"error": "No face detected"}"#);
    assert_eq!(interpretation.label, EmotionLabel::Error("No face detected".into()));
    assert_eq!(interpretation.mask_state, MaskState::Unknown);
}

#[test]
fn weekly_summary_sentinel_renders_as_empty_graph() {
    let raw: WeeklySummaryRaw =
        serde_json::from_str(r#"{"message": "No data for weekly summary"}"#).unwrap();
    assert!(WeeklyGraph::from_response(raw).is_empty());
}

#[test]
fn weekly_summary_reply_shapes_into_graph() {
    let raw: WeeklySummaryRaw = serde_json::from_str(
        r#"{
            "most_frequent": "Happy",
            "daily_graph": {
                "2025-08-25": {"Happy": 3, "Sad": 1},
                "2025-08-26": {"Sad": 2}
            },
            "quote": "Smile, it confuses people."
        }"#,
    )
    .unwrap();

    let graph = WeeklyGraph::from_response(raw);
    assert_eq!(graph.daily_graph.len(), 2);
    assert_eq!(graph.most_frequent, Some(EmotionKind::Happy));

    let first = graph.daily_graph.values().next().unwrap();
    assert_eq!((first.happy, first.sad), (3, 1));
    // Absent count defaults to zero
    let second = graph.daily_graph.values().nth(1).unwrap();
    assert_eq!((second.happy, second.sad), (0, 2));
}

#[test]
fn admin_stats_reply_reshapes_to_chronological() {
    // The server emits both rollups most-recent-first
    let raw: AdminStatsResponse = serde_json::from_str(
        r#"{
            "monthly_users": [
                {"month": "2025-08", "count": 3},
                {"month": "2025-07", "count": 5},
                {"month": "2025-06", "count": 2}
            ],
            "daily_activity": [
                {"date": "2025-08-26", "count": 1},
                {"date": "2025-08-25", "count": 4}
            ],
            "top_users": [
                {"fullname": "A", "email": "a@x.io", "emotion_count": 9},
                {"fullname": "B", "email": "b@x.io", "emotion_count": 7}
            ]
        }"#,
    )
    .unwrap();

    let analytics = AdminAnalytics::shape(&raw);
    assert_eq!(analytics.monthly_users[0].month, "2025-06");
    assert_eq!(analytics.monthly_users[2].month, "2025-08");
    assert_eq!(analytics.daily_activity[0].date, "2025-08-25");
    // Top users keep the server's ordering
    assert_eq!(analytics.top_users[0].fullname, "A");
    // The input is left untouched for re-shaping
    assert_eq!(raw.monthly_users[0].month, "2025-08");
}

#[test]
fn admin_accounts_are_delete_protected() {
    let admin_user: UserRecord = serde_json::from_str(
        r#"{"id": 1, "fullname": "Root", "email": "root@x.io", "role": "admin", "created_at": "2025-01-01"}"#,
    )
    .unwrap();
    let regular: UserRecord = serde_json::from_str(
        r#"{"id": 2, "fullname": "User", "email": "u@x.io", "created_at": "2025-01-02"}"#,
    )
    .unwrap();

    assert!(!admin::can_delete_user(&admin_user));
    assert!(admin::can_delete_user(&regular));
}
