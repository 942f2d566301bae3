// Core modules
pub mod camera;
pub mod common;
pub mod core;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use camera::Camera;
pub use common::{Config, DevMode, MaskLensError, Result};
pub use core::{
    check_admin_access, interpret_response, validate_password, AccessState, AdminAnalytics,
    CapturePipeline, CaptureResult, EmotionKind, EmotionLabel, HistoryAggregator, MaskState,
    WeeklyGraph, WeeklySummary,
};
pub use service::{protocol, ApiClient, ProbeOutcome};
pub use storage::{Role, Session, SessionStore};
