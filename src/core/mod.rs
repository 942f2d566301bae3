pub mod admin;
pub mod capture;
pub mod guard;
pub mod history;
pub mod interpreter;
pub mod password;

pub use admin::{can_delete_user, label_count, AdminAnalytics};
pub use capture::{CapturePipeline, CaptureResult};
pub use guard::{check_admin_access, AccessState};
pub use history::{EmotionKind, HistoryAggregator, WeeklyGraph, WeeklySummary};
pub use interpreter::{interpret_response, EmotionLabel, Interpretation, MaskState};
pub use password::validate_password;
