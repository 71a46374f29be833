//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Draft defaults
pub const DEFAULT_DURATION_MINUTES: i64 = 60;
pub const DEFAULT_HOUR_WHEN_UNSPECIFIED: u32 = 9;
pub const FALLBACK_TITLE: &str = "予定";

// Confirmation policy
pub const CONFIRMATION_CONFIDENCE_THRESHOLD: f64 = 0.6;

// Duplicate detection
pub const DUPLICATE_WINDOW_MINUTES: i64 = 30;
pub const DUPLICATE_SEARCH_MAX_RESULTS: u32 = 20;

// Session bookkeeping
pub const MAX_HISTORY_ITEMS: usize = 5;
pub const MAX_ATTACHED_IMAGES: usize = 3;

// Interpretation defaults
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_TIMEZONE: &str = "Asia/Tokyo";

// Image attachment limits (enforced by the interpretation gateway)
pub const MAX_IMAGE_SIZE_BYTES: usize = 6 * 1024 * 1024;
pub const MAX_TOTAL_IMAGE_BYTES: usize = 18 * 1024 * 1024;

// Canonical local timestamp layout
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// Clarification question texts shared by the extractor and the dialogue
// engine
pub const QUESTION_MISSING_TITLE: &str = "予定タイトルを教えてください。";
pub const QUESTION_MISSING_START: &str = "開始日時を教えてください（例: 2026-02-14 19:00）。";
pub const QUESTION_MISSING_END: &str = "終了日時を教えてください（例: 2026-02-14 20:00）。";
