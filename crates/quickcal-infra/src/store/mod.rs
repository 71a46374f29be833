pub mod memory;

pub use memory::{InMemoryHistoryStore, InMemorySessionStore, StaticSettingsProvider};
