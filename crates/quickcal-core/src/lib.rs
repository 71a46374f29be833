//! # QuickCal Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The clarification dialogue engine ([`SchedulerService`])
//! - Port/adapter interfaces (traits)
//! - Draft normalization and merge rules
//!
//! ## Architecture Principles
//! - Only depends on `quickcal-domain`
//! - No HTTP or platform code
//! - All external dependencies via traits
//! - Pure, testable business logic

pub mod scheduling;

// Re-export specific items to avoid ambiguity
pub use scheduling::draft::{merge_images, sanitize_draft, sanitize_images};
pub use scheduling::ports::{
    CalendarGateway, HistoryStore, Interpreter, InterpretRequest, RefineRequest, SessionStore,
    SettingsProvider,
};
pub use scheduling::SchedulerService;
