pub mod calendar;
pub mod gemini;
