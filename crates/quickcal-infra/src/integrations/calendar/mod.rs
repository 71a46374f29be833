//! Google Calendar gateway.

pub mod client;
pub mod types;

pub use client::{AccessTokenProvider, GoogleCalendarClient, StaticTokenProvider};
