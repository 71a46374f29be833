//! # QuickCal Infra
//!
//! Infrastructure layer - adapters for the ports defined in `quickcal-core`.
//!
//! This crate contains:
//! - HTTP client with retry/backoff ([`http::HttpClient`])
//! - Gemini interpretation gateway ([`integrations::gemini::GeminiClient`])
//! - Google Calendar gateway ([`integrations::calendar::GoogleCalendarClient`])
//! - In-memory session/history stores ([`store`])

pub mod http;
pub mod integrations;
pub mod store;

pub use http::HttpClient;
pub use integrations::calendar::{AccessTokenProvider, GoogleCalendarClient, StaticTokenProvider};
pub use integrations::gemini::GeminiClient;
pub use store::{InMemoryHistoryStore, InMemorySessionStore, StaticSettingsProvider};
