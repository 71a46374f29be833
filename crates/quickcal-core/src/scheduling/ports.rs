//! Port interfaces for the dialogue engine
//!
//! All external collaborators are reached through these traits: the
//! interpretation gateway, the calendar gateway, the session/history
//! stores and the settings source. Adapters live in `quickcal-infra`.

use async_trait::async_trait;
use quickcal_domain::{
    ClarificationSession, CreatedEvent, DuplicateCandidate, EventDraft, HistoryEntry, ImageInput,
    InterpretedDraft, Result, SchedulerSettings,
};
use uuid::Uuid;

/// Inputs for a single-shot structured extraction.
#[derive(Debug, Clone)]
pub struct InterpretRequest {
    pub text: String,
    pub images: Vec<ImageInput>,
    pub settings: SchedulerSettings,
    pub instruction_text: String,
}

/// Inputs for a refinement round-trip over an existing draft.
#[derive(Debug, Clone)]
pub struct RefineRequest {
    pub draft: EventDraft,
    pub question: String,
    pub answer: String,
    pub images: Vec<ImageInput>,
    pub settings: SchedulerSettings,
    pub instruction_text: String,
}

/// External interpretation gateway.
///
/// Both calls are network-bound and may be slow; implementations retry
/// internally on timeouts and fail closed (return `Err`) when the response
/// cannot be parsed as a draft-shaped structure.
#[async_trait]
pub trait Interpreter: Send + Sync {
    /// Extract a draft from raw input.
    async fn interpret(&self, request: InterpretRequest) -> Result<InterpretedDraft>;

    /// Produce a partial draft whose fields overwrite the prior draft's on
    /// merge, given a question/answer pair.
    async fn refine(&self, request: RefineRequest) -> Result<InterpretedDraft>;
}

/// Calendar backend used to commit events and search for near-duplicates.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    /// Insert the draft as a new calendar event.
    async fn insert_event(
        &self,
        draft: &EventDraft,
        settings: &SchedulerSettings,
    ) -> Result<CreatedEvent>;

    /// Events within a ±30-minute window of the draft's start whose
    /// normalized title exactly matches the draft's.
    async fn find_duplicates(
        &self,
        draft: &EventDraft,
        settings: &SchedulerSettings,
    ) -> Result<Vec<DuplicateCandidate>>;
}

/// Injected session storage. The dialogue engine is the only mutator; the
/// backing may be in-memory, persistent or distributed.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: Uuid) -> Result<Option<ClarificationSession>>;

    async fn insert(&self, session_id: Uuid, session: ClarificationSession) -> Result<()>;

    async fn remove(&self, session_id: Uuid) -> Result<Option<ClarificationSession>>;
}

/// Bounded record of committed events, most recent first.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, entry: HistoryEntry) -> Result<()>;

    async fn recent(&self) -> Result<Vec<HistoryEntry>>;
}

/// Source of the settings snapshot for a scheduling turn.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn current(&self) -> Result<SchedulerSettings>;
}
