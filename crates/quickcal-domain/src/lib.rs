//! # QuickCal Domain
//!
//! Business domain types and models for QuickCal.
//!
//! This crate contains:
//! - Domain data types (EventDraft, ClarificationSession, etc.)
//! - Domain error types and Result definitions
//! - Scheduler settings and constants
//! - Pure parsing utilities (temporal parser, direct-input extractor)
//!
//! ## Architecture
//! - No dependencies on other QuickCal crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
// Re-export the temporal parser entry points
pub use utils::datetime::{
    add_minutes, coerce_datetime, format_local, is_start_before_end, parse_flexible_datetime,
};
