use crate::common::Result;
use crate::service::protocol::{parse_date, DayCounts, EmotionRecord, WeeklySummaryRaw};
use crate::service::ApiClient;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

/// The two durable emotion kinds. `EmotionLabel::Analyzing`/`Error` are
/// transient capture states and never appear in stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionKind {
    Happy,
    Sad,
}

impl EmotionKind {
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw {
            "Happy" => Some(EmotionKind::Happy),
            "Sad" => Some(EmotionKind::Sad),
            _ => None,
        }
    }
}

impl std::fmt::Display for EmotionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmotionKind::Happy => write!(f, "Happy"),
            EmotionKind::Sad => write!(f, "Sad"),
        }
    }
}

/// Flat counts over the rolling 7-day window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeeklySummary {
    pub total: u32,
    pub happy: u32,
    pub sad: u32,
}

/// Day-bucketed weekly view used for charting. Sparse: dates with zero
/// records are absent, and callers must render them as "no data".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyGraph {
    pub daily_graph: BTreeMap<NaiveDate, DayCounts>,
    pub most_frequent: Option<EmotionKind>,
    pub quote: Option<String>,
}

impl WeeklyGraph {
    pub fn is_empty(&self) -> bool {
        self.daily_graph.is_empty()
    }

    /// Shape the server's weekly summary reply. The "No data for weekly
    /// summary" sentinel maps to an empty graph, not an error.
    pub fn from_response(raw: WeeklySummaryRaw) -> Self {
        let daily_graph = match raw.daily_graph {
            Some(graph) => graph
                .into_iter()
                .filter_map(|(date, counts)| parse_date(&date).map(|d| (d, counts)))
                .collect(),
            None => BTreeMap::new(),
        };

        Self {
            daily_graph,
            most_frequent: raw.most_frequent.as_deref().and_then(EmotionKind::from_label),
            quote: raw.quote,
        }
    }
}

/// Local cache of the authenticated user's emotion records.
///
/// Refreshes replace the cache wholesale; each refresh carries an issue
/// sequence number and a stale payload (issued before one that already
/// landed) is discarded rather than applied last-write-wins.
#[derive(Default)]
pub struct HistoryAggregator {
    records: Vec<EmotionRecord>,
    issued_seq: u64,
    applied_seq: u64,
}

impl HistoryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[EmotionRecord] {
        &self.records
    }

    pub fn begin_refresh(&mut self) -> u64 {
        self.issued_seq += 1;
        self.issued_seq
    }

    /// Apply a completed refresh. Returns false (and leaves the cache
    /// untouched) when a newer payload has already been applied.
    pub fn apply_refresh(&mut self, seq: u64, records: Vec<EmotionRecord>) -> bool {
        if seq <= self.applied_seq {
            tracing::debug!("Discarding stale history refresh (seq {})", seq);
            return false;
        }
        self.applied_seq = seq;
        self.records = records;
        true
    }

    /// Fetch-and-replace convenience used by the synchronous CLI path.
    pub fn refresh(&mut self, client: &ApiClient) -> Result<()> {
        let seq = self.begin_refresh();
        let records = client.my_emotions()?;
        self.apply_refresh(seq, records);
        Ok(())
    }

    fn window_records(&self, now: DateTime<Utc>) -> impl Iterator<Item = (&EmotionRecord, EmotionKind)> {
        let cutoff = now - Duration::days(7);
        self.records.iter().filter_map(move |record| {
            let ts = record.timestamp_utc()?;
            // Inclusive lower bound: a record exactly 7 days old counts
            if ts < cutoff {
                return None;
            }
            let kind = EmotionKind::from_label(&record.emotion)?;
            Some((record, kind))
        })
    }

    /// Flat 7-day counts, derived locally over the cached records.
    pub fn weekly_summary(&self, now: DateTime<Utc>) -> WeeklySummary {
        let mut summary = WeeklySummary::default();
        for (_, kind) in self.window_records(now) {
            summary.total += 1;
            match kind {
                EmotionKind::Happy => summary.happy += 1,
                EmotionKind::Sad => summary.sad += 1,
            }
        }
        summary
    }

    /// Per-calendar-date counts over the same window, sparse by date.
    pub fn daily_buckets(&self, now: DateTime<Utc>) -> BTreeMap<NaiveDate, DayCounts> {
        let mut buckets: BTreeMap<NaiveDate, DayCounts> = BTreeMap::new();
        for (record, kind) in self.window_records(now) {
            let date = match record.timestamp_utc() {
                Some(ts) => ts.date_naive(),
                None => continue,
            };
            let counts = buckets.entry(date).or_default();
            match kind {
                EmotionKind::Happy => counts.happy += 1,
                EmotionKind::Sad => counts.sad += 1,
            }
        }
        buckets
    }

    /// Label with the strictly higher count in the window; an exact tie
    /// (including the empty window) yields None.
    pub fn most_frequent(&self, now: DateTime<Utc>) -> Option<EmotionKind> {
        let summary = self.weekly_summary(now);
        match summary.happy.cmp(&summary.sad) {
            std::cmp::Ordering::Greater => Some(EmotionKind::Happy),
            std::cmp::Ordering::Less => Some(EmotionKind::Sad),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: i64, emotion: &str, timestamp: String) -> EmotionRecord {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "emotion": emotion,
            "timestamp": timestamp,
        }))
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 27, 12, 0, 0).unwrap()
    }

    fn days_ago(n: i64) -> String {
        (now() - Duration::days(n)).format("%Y-%m-%d %H:%M:%S").to_string()
    }

    #[test]
    fn weekly_window_is_seven_days_inclusive() {
        let mut history = HistoryAggregator::new();
        let seq = history.begin_refresh();
        history.apply_refresh(
            seq,
            vec![
                record(1, "Happy", days_ago(0)),
                record(2, "Sad", days_ago(3)),
                record(3, "Happy", days_ago(7)), // exactly on the boundary
                record(4, "Happy", days_ago(10)),
            ],
        );

        let summary = history.weekly_summary(now());
        assert_eq!(summary, WeeklySummary { total: 3, happy: 2, sad: 1 });
    }

    #[test]
    fn unparseable_timestamps_and_labels_are_skipped() {
        let mut history = HistoryAggregator::new();
        let seq = history.begin_refresh();
        history.apply_refresh(
            seq,
            vec![
                record(1, "Happy", days_ago(1)),
                record(2, "Happy", "not a timestamp".into()),
                record(3, "Confused", days_ago(1)),
            ],
        );
        assert_eq!(history.weekly_summary(now()).total, 1);
    }

    #[test]
    fn daily_buckets_are_sparse() {
        let mut history = HistoryAggregator::new();
        let seq = history.begin_refresh();
        history.apply_refresh(
            seq,
            vec![
                record(1, "Happy", days_ago(1)),
                record(2, "Happy", days_ago(1)),
                record(3, "Sad", days_ago(4)),
            ],
        );

        let buckets = history.daily_buckets(now());
        assert_eq!(buckets.len(), 2);
        let day1 = (now() - Duration::days(1)).date_naive();
        assert_eq!(buckets[&day1], DayCounts { happy: 2, sad: 0 });
        // A date with no records is absent, not zero-filled
        let day2 = (now() - Duration::days(2)).date_naive();
        assert!(!buckets.contains_key(&day2));
    }

    #[test]
    fn empty_window_yields_empty_mapping() {
        let history = HistoryAggregator::new();
        assert!(history.daily_buckets(now()).is_empty());
        assert_eq!(history.weekly_summary(now()), WeeklySummary::default());
    }

    #[test]
    fn most_frequent_tie_is_none() {
        let mut history = HistoryAggregator::new();
        let seq = history.begin_refresh();
        history.apply_refresh(
            seq,
            vec![
                record(1, "Happy", days_ago(1)),
                record(2, "Sad", days_ago(2)),
            ],
        );
        assert_eq!(history.most_frequent(now()), None);

        let seq = history.begin_refresh();
        history.apply_refresh(
            seq,
            vec![
                record(1, "Happy", days_ago(1)),
                record(2, "Happy", days_ago(1)),
                record(3, "Sad", days_ago(2)),
            ],
        );
        assert_eq!(history.most_frequent(now()), Some(EmotionKind::Happy));
    }

    #[test]
    fn stale_refresh_is_discarded() {
        let mut history = HistoryAggregator::new();
        let first = history.begin_refresh();
        let second = history.begin_refresh();

        // Issued-second resolves first
        assert!(history.apply_refresh(second, vec![record(1, "Happy", days_ago(1))]));
        // Issued-first resolves late and must not clobber newer data
        assert!(!history.apply_refresh(first, vec![]));
        assert_eq!(history.records().len(), 1);
    }

    #[test]
    fn weekly_graph_maps_sentinel_to_empty() {
        let raw: WeeklySummaryRaw =
            serde_json::from_str(r#"{"message": "No data for weekly summary"}"#).unwrap();
        let graph = WeeklyGraph::from_response(raw);
        assert!(graph.is_empty());
        assert_eq!(graph.most_frequent, None);
        assert_eq!(graph.quote, None);
    }

    #[test]
    fn weekly_graph_parses_dates_and_label() {
        let raw: WeeklySummaryRaw = serde_json::from_str(
            r#"{
                "most_frequent": "Sad",
                "daily_graph": {"2025-08-20": {"Happy": 1, "Sad": 4}, "bogus": {"Happy": 1}},
                "quote": "Keep going."
            }"#,
        )
        .unwrap();
        let graph = WeeklyGraph::from_response(raw);
        assert_eq!(graph.daily_graph.len(), 1);
        assert_eq!(graph.most_frequent, Some(EmotionKind::Sad));
        assert_eq!(graph.quote.as_deref(), Some("Keep going."));
    }
}
