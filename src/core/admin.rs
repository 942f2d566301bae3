use crate::service::protocol::{
    AdminDashboardResponse, AdminStatsResponse, DateCount, MonthCount, TopUser, UserRecord,
};

const TOP_USERS_DISPLAY_LIMIT: usize = 10;

/// Display-ready administrative rollups. Purely a reshaping layer over
/// server-computed counts.
#[derive(Debug, Clone)]
pub struct AdminAnalytics {
    /// Chronological (oldest first), reshaped from the server's
    /// recent-first ordering.
    pub monthly_users: Vec<MonthCount>,
    /// Chronological, most recent 30 days.
    pub daily_activity: Vec<DateCount>,
    /// At most 10 entries, server order trusted (pre-sorted by count).
    pub top_users: Vec<TopUser>,
}

impl AdminAnalytics {
    /// Borrows the response rather than consuming it so a shared copy is
    /// never mutated in place.
    pub fn shape(stats: &AdminStatsResponse) -> Self {
        let mut monthly_users = stats.monthly_users.clone();
        monthly_users.reverse();

        let mut daily_activity = stats.daily_activity.clone();
        daily_activity.reverse();

        let top_users = stats
            .top_users
            .iter()
            .take(TOP_USERS_DISPLAY_LIMIT)
            .cloned()
            .collect();

        Self {
            monthly_users,
            daily_activity,
            top_users,
        }
    }
}

/// Per-label count from the overview, defaulting to 0 when the server's
/// list omits the label entirely.
pub fn label_count(dashboard: &AdminDashboardResponse, label: &str) -> u64 {
    dashboard
        .emotion_stats
        .iter()
        .find(|entry| entry.emotion == label)
        .map(|entry| entry.count)
        .unwrap_or(0)
}

/// Admin-role accounts are never offered for deletion through the admin
/// surface; the delete action is refused client-side before any request.
pub fn can_delete_user(user: &UserRecord) -> bool {
    user.role != "admin"
}
