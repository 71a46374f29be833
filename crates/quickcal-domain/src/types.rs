//! Common data types used throughout the application

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SchedulerSettings;

/// The working, possibly-incomplete representation of a calendar event
/// being assembled through the clarification dialogue.
///
/// `start` and `end` hold canonical local timestamps
/// (`YYYY-MM-DDTHH:mm:ss`) or the empty string while unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventDraft {
    pub title: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub description: String,
    /// Supplied by the interpretation source; consumed only for policy
    /// gating, never itself validated.
    pub confidence: f64,
    pub uncertain: bool,
    pub needs_clarification: bool,
    pub clarification_question: String,
    pub user_confirmed: bool,
    pub duplicate_confirmed: bool,
}

impl EventDraft {
    pub fn has_title(&self) -> bool {
        !self.title.is_empty()
    }

    pub fn has_start(&self) -> bool {
        !self.start.is_empty()
    }

    pub fn has_end(&self) -> bool {
        !self.end.is_empty()
    }

    /// True while any of title/start/end is still unknown.
    pub fn has_missing_fields(&self) -> bool {
        !(self.has_title() && self.has_start() && self.has_end())
    }
}

/// Draft shape returned by the interpretation gateway.
///
/// This is the wire contract: unknown keys are dropped at deserialization
/// and the confirmation flags deliberately do not exist here, so a
/// refinement can never flip them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterpretedDraft {
    pub title: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub description: String,
    pub confidence: f64,
    pub uncertain: bool,
    pub needs_clarification: bool,
    pub clarification_question: String,
    pub reasoning: String,
}

/// An image attached to the input or to a clarification answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    pub name: String,
    pub mime_type: String,
    pub data_base64: String,
    #[serde(default)]
    pub size_bytes: usize,
}

impl ImageInput {
    /// Declared size when present, otherwise estimated from the base64 payload.
    pub fn resolved_size(&self) -> usize {
        if self.size_bytes > 0 {
            self.size_bytes
        } else {
            self.data_base64.len() * 3 / 4
        }
    }
}

/// The question currently pending on a clarification session.
///
/// A session always has exactly one of these; variants carry the data
/// needed to re-ask or resolve the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PendingQuestion {
    MissingTitle,
    MissingStart,
    MissingEnd,
    InvalidTimeRange,
    /// A clarification question supplied by the interpretation gateway,
    /// unrelated to the canonical fields.
    ModelFollowup { question: String },
    ConfirmBeforeCreate,
    DuplicateConfirm { candidate: DuplicateCandidate },
}

/// Server-held, ephemeral conversation state for one in-progress draft.
///
/// Created on first ambiguity, mutated in place on each answer, deleted on
/// terminal outcome. Lifetime is bounded by conversational activity only;
/// no TTL is enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarificationSession {
    pub draft: EventDraft,
    pub pending: PendingQuestion,
    /// The last question text shown to the user.
    pub question: String,
    /// Settings snapshot active when the session was created.
    pub settings: SchedulerSettings,
    pub source_text: String,
    pub source_images: Vec<ImageInput>,
    pub instruction_text: String,
}

/// Draft fields safe to show to the caller. Internal flags such as
/// `userConfirmed` are never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPreview {
    pub title: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub description: String,
}

impl From<&EventDraft> for DraftPreview {
    fn from(draft: &EventDraft) -> Self {
        Self {
            title: draft.title.clone(),
            start: draft.start.clone(),
            end: draft.end.clone(),
            location: draft.location.clone(),
            description: draft.description.clone(),
        }
    }
}

/// The event as created by the calendar gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatedEvent {
    pub id: String,
    pub html_link: String,
    pub title: String,
    pub start: String,
    pub end: String,
}

/// A pre-existing calendar entry that likely duplicates the draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuplicateCandidate {
    pub summary: String,
    pub start: String,
    pub end: String,
}

/// A bounded, most-recent-first record of committed events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub start: String,
    pub end: String,
    pub html_link: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Outcome of one scheduling turn.
///
/// Hard failures surface as `Err(QuickCalError)` instead of a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchedulerOutcome {
    NeedsClarification {
        session_id: Uuid,
        question: String,
        draft: DraftPreview,
    },
    Success {
        message: String,
        event: CreatedEvent,
    },
    Cancelled {
        message: String,
    },
}
