use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ===== Auth =====

#[derive(Serialize, Debug, Clone)]
pub struct RegisterRequest {
    pub fullname: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginResponse {
    pub access_token: String,
    pub fullname: Option<String>,
    pub role: Option<String>,
}

/// Failure bodies carry `error` and sometimes `msg` (the JWT layer uses
/// both). Either may be present.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ErrorEnvelope {
    pub error: Option<String>,
    pub msg: Option<String>,
}

impl ErrorEnvelope {
    /// Most specific message available, else a generic fallback naming the
    /// status code.
    pub fn message_or_status(body: &str, status: u16) -> String {
        if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
            if let Some(msg) = envelope.error.or(envelope.msg) {
                return msg;
            }
        }
        format!("Server error ({})", status)
    }
}

// ===== Emotion records =====

#[derive(Deserialize, Debug, Clone)]
pub struct EmotionRecord {
    pub id: i64,
    pub emotion: String,
    pub timestamp: String,
    // Present on the admin listing only
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl EmotionRecord {
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct EmotionListResponse {
    pub emotions: Vec<EmotionRecord>,
}

// ===== Weekly summary =====

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounts {
    #[serde(rename = "Happy", default)]
    pub happy: u32,
    #[serde(rename = "Sad", default)]
    pub sad: u32,
}

/// Raw `/weekly_summary` body. The endpoint answers 200 either with the
/// summary fields or with the `{"message": "No data for weekly summary"}`
/// sentinel, so everything is optional here.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct WeeklySummaryRaw {
    pub message: Option<String>,
    pub most_frequent: Option<String>,
    pub daily_graph: Option<BTreeMap<String, DayCounts>>,
    pub quote: Option<String>,
}

// ===== Admin =====

#[derive(Deserialize, Debug, Clone)]
pub struct UserRecord {
    pub id: i64,
    pub fullname: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub created_at: String,
}

fn default_role() -> String {
    "user".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserListResponse {
    pub users: Vec<UserRecord>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateUserRequest {
    pub fullname: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LabelCount {
    pub emotion: String,
    pub count: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RecentUser {
    pub id: i64,
    pub fullname: String,
    pub email: String,
    pub created_at: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AdminDashboardResponse {
    pub total_users: u64,
    pub total_emotions: u64,
    #[serde(default)]
    pub emotion_stats: Vec<LabelCount>,
    #[serde(default)]
    pub recent_users: Vec<RecentUser>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MonthCount {
    pub month: String,
    pub count: u64,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DateCount {
    pub date: String,
    pub count: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TopUser {
    pub fullname: String,
    pub email: String,
    pub emotion_count: u64,
}

/// `/admin/stats` sequences arrive most-recent-first from the server.
#[derive(Deserialize, Debug, Clone)]
pub struct AdminStatsResponse {
    #[serde(default)]
    pub monthly_users: Vec<MonthCount>,
    #[serde(default)]
    pub daily_activity: Vec<DateCount>,
    #[serde(default)]
    pub top_users: Vec<TopUser>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ToggleMaskLogicResponse {
    pub current_logic: String,
}

// ===== Timestamp handling =====

/// The backend emits timestamps in three shapes depending on the code path:
/// sqlite CURRENT_TIMESTAMP ("2025-08-01 14:03:22"), the same with a `T`
/// separator, and RFC 3339 with an offset. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_all_backend_timestamp_shapes() {
        for raw in [
            "2025-08-01 14:03:22",
            "2025-08-01T14:03:22",
            "2025-08-01T14:03:22+00:00",
        ] {
            let ts = parse_timestamp(raw).unwrap();
            assert_eq!(ts.year(), 2025);
            assert_eq!(ts.hour(), 14);
        }
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn weekly_sentinel_deserializes() {
        let raw: WeeklySummaryRaw =
            serde_json::from_str(r#"{"message": "No data for weekly summary"}"#).unwrap();
        assert!(raw.daily_graph.is_none());
        assert_eq!(raw.message.as_deref(), Some("No data for weekly summary"));
    }

    #[test]
    fn weekly_summary_deserializes() {
        let raw: WeeklySummaryRaw = serde_json::from_str(
            r#"{
                "most_frequent": "Happy",
                "daily_graph": {"2025-08-20": {"Happy": 3, "Sad": 1}},
                "quote": "Keep smiling!"
            }"#,
        )
        .unwrap();
        let graph = raw.daily_graph.unwrap();
        assert_eq!(graph["2025-08-20"], DayCounts { happy: 3, sad: 1 });
    }

    #[test]
    fn day_counts_default_missing_labels_to_zero() {
        let counts: DayCounts = serde_json::from_str(r#"{"Happy": 2}"#).unwrap();
        assert_eq!(counts, DayCounts { happy: 2, sad: 0 });
    }

    #[test]
    fn error_envelope_prefers_explicit_error_field() {
        assert_eq!(
            ErrorEnvelope::message_or_status(r#"{"error": "Email already registered"}"#, 400),
            "Email already registered"
        );
        assert_eq!(
            ErrorEnvelope::message_or_status(r#"{"msg": "Token has expired"}"#, 401),
            "Token has expired"
        );
        assert_eq!(ErrorEnvelope::message_or_status("<html>", 502), "Server error (502)");
    }

    #[test]
    fn admin_emotion_record_carries_owner_fields() {
        let record: EmotionRecord = serde_json::from_str(
            r#"{"id": 7, "emotion": "Sad", "timestamp": "2025-08-01 09:00:00",
                "fullname": "Ada", "email": "ada@example.com"}"#,
        )
        .unwrap();
        assert_eq!(record.fullname.as_deref(), Some("Ada"));
        assert!(record.timestamp_utc().is_some());
    }
}
