//! Pure domain utilities

pub mod affirmation;
pub mod datetime;
pub mod direct_input;
pub mod title;
