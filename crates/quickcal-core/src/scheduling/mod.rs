//! Clarification dialogue engine

pub mod draft;
pub mod ports;
pub mod service;

pub use service::SchedulerService;
