//! In-memory adapters for the session, history and settings ports.
//!
//! Sessions are ephemeral conversation state, so process memory is the
//! reference backing. History is bounded and most-recent-first.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use quickcal_core::{HistoryStore, SessionStore, SettingsProvider};
use quickcal_domain::constants::MAX_HISTORY_ITEMS;
use quickcal_domain::{ClarificationSession, HistoryEntry, Result, SchedulerSettings};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemorySessionStore {
    inner: Mutex<HashMap<Uuid, ClarificationSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, session_id: Uuid) -> Result<Option<ClarificationSession>> {
        Ok(self.inner.lock().await.get(&session_id).cloned())
    }

    async fn insert(&self, session_id: Uuid, session: ClarificationSession) -> Result<()> {
        self.inner.lock().await.insert(session_id, session);
        Ok(())
    }

    async fn remove(&self, session_id: Uuid) -> Result<Option<ClarificationSession>> {
        Ok(self.inner.lock().await.remove(&session_id))
    }
}

#[derive(Default)]
pub struct InMemoryHistoryStore {
    inner: Mutex<VecDeque<HistoryEntry>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.inner.lock().await;
        entries.push_front(entry);
        entries.truncate(MAX_HISTORY_ITEMS);
        Ok(())
    }

    async fn recent(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.inner.lock().await.iter().cloned().collect())
    }
}

/// Settings provider over a mutable in-process snapshot.
pub struct StaticSettingsProvider {
    inner: Mutex<SchedulerSettings>,
}

impl StaticSettingsProvider {
    pub fn new(settings: SchedulerSettings) -> Arc<Self> {
        Arc::new(Self { inner: Mutex::new(settings) })
    }

    pub async fn update(&self, settings: SchedulerSettings) {
        *self.inner.lock().await = settings;
    }
}

#[async_trait]
impl SettingsProvider for StaticSettingsProvider {
    async fn current(&self) -> Result<SchedulerSettings> {
        Ok(self.inner.lock().await.clone())
    }
}
