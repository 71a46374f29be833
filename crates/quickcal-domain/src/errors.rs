//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for QuickCal
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum QuickCalError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Interpretation error: {0}")]
    Interpretation(String),

    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for QuickCal operations
pub type Result<T> = std::result::Result<T, QuickCalError>;
