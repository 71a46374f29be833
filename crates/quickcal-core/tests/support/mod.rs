//! Scripted test doubles for the dialogue engine's ports.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quickcal_core::{
    CalendarGateway, HistoryStore, Interpreter, InterpretRequest, RefineRequest, SchedulerService,
    SessionStore, SettingsProvider,
};
use quickcal_domain::{
    ClarificationSession, CreatedEvent, DuplicateCandidate, EventDraft, HistoryEntry,
    InterpretedDraft, QuickCalError, Result, SchedulerSettings,
};
use uuid::Uuid;

/// Interpreter double that replays queued responses and records every
/// request it saw. An exhausted queue fails closed, so a test that never
/// scripts a response also proves the call path tolerates (or surfaces)
/// gateway failure.
#[derive(Default)]
pub struct ScriptedInterpreter {
    interpret_responses: Mutex<VecDeque<Result<InterpretedDraft>>>,
    refine_responses: Mutex<VecDeque<Result<InterpretedDraft>>>,
    pub interpret_requests: Mutex<Vec<InterpretRequest>>,
    pub refine_requests: Mutex<Vec<RefineRequest>>,
}

impl ScriptedInterpreter {
    pub fn push_interpret(&self, response: Result<InterpretedDraft>) {
        self.interpret_responses.lock().unwrap().push_back(response);
    }

    pub fn push_refine(&self, response: Result<InterpretedDraft>) {
        self.refine_responses.lock().unwrap().push_back(response);
    }

    pub fn refine_request_count(&self) -> usize {
        self.refine_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Interpreter for ScriptedInterpreter {
    async fn interpret(&self, request: InterpretRequest) -> Result<InterpretedDraft> {
        self.interpret_requests.lock().unwrap().push(request);
        self.interpret_responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(QuickCalError::Interpretation("no scripted interpret response".to_string()))
        })
    }

    async fn refine(&self, request: RefineRequest) -> Result<InterpretedDraft> {
        self.refine_requests.lock().unwrap().push(request);
        self.refine_responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(QuickCalError::Interpretation("no scripted refine response".to_string()))
        })
    }
}

/// Calendar double: inserts succeed with a fixed id unless a failure has
/// been queued, and the duplicate scan returns whatever was configured.
#[derive(Default)]
pub struct FakeCalendar {
    pub duplicates: Mutex<Vec<DuplicateCandidate>>,
    pub duplicates_unavailable: Mutex<bool>,
    pub insert_failures: Mutex<VecDeque<QuickCalError>>,
    pub inserted: Mutex<Vec<EventDraft>>,
}

impl FakeCalendar {
    pub fn set_duplicates(&self, candidates: Vec<DuplicateCandidate>) {
        *self.duplicates.lock().unwrap() = candidates;
    }

    pub fn fail_next_insert(&self, error: QuickCalError) {
        self.insert_failures.lock().unwrap().push_back(error);
    }

    pub fn inserted_count(&self) -> usize {
        self.inserted.lock().unwrap().len()
    }
}

#[async_trait]
impl CalendarGateway for FakeCalendar {
    async fn insert_event(
        &self,
        draft: &EventDraft,
        _settings: &SchedulerSettings,
    ) -> Result<CreatedEvent> {
        if let Some(error) = self.insert_failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        self.inserted.lock().unwrap().push(draft.clone());
        Ok(CreatedEvent {
            id: "evt-1".to_string(),
            html_link: "https://calendar.example/evt-1".to_string(),
            title: draft.title.clone(),
            start: draft.start.clone(),
            end: draft.end.clone(),
        })
    }

    async fn find_duplicates(
        &self,
        _draft: &EventDraft,
        _settings: &SchedulerSettings,
    ) -> Result<Vec<DuplicateCandidate>> {
        if *self.duplicates_unavailable.lock().unwrap() {
            return Err(QuickCalError::Network("calendar listing unavailable".to_string()));
        }
        Ok(self.duplicates.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MemorySessions {
    inner: Mutex<HashMap<Uuid, ClarificationSession>>,
}

impl MemorySessions {
    pub fn snapshot(&self, session_id: Uuid) -> Option<ClarificationSession> {
        self.inner.lock().unwrap().get(&session_id).cloned()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[async_trait]
impl SessionStore for MemorySessions {
    async fn get(&self, session_id: Uuid) -> Result<Option<ClarificationSession>> {
        Ok(self.inner.lock().unwrap().get(&session_id).cloned())
    }

    async fn insert(&self, session_id: Uuid, session: ClarificationSession) -> Result<()> {
        self.inner.lock().unwrap().insert(session_id, session);
        Ok(())
    }

    async fn remove(&self, session_id: Uuid) -> Result<Option<ClarificationSession>> {
        Ok(self.inner.lock().unwrap().remove(&session_id))
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, entry: HistoryEntry) -> Result<()> {
        self.entries.lock().unwrap().insert(0, entry);
        Ok(())
    }

    async fn recent(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }
}

pub struct FixedSettings(pub SchedulerSettings);

#[async_trait]
impl SettingsProvider for FixedSettings {
    async fn current(&self) -> Result<SchedulerSettings> {
        Ok(self.0.clone())
    }
}

/// A fully wired service over the doubles above.
pub struct TestBed {
    pub interpreter: Arc<ScriptedInterpreter>,
    pub calendar: Arc<FakeCalendar>,
    pub sessions: Arc<MemorySessions>,
    pub history: Arc<MemoryHistory>,
    pub service: SchedulerService,
}

pub fn testbed(settings: SchedulerSettings) -> TestBed {
    let interpreter = Arc::new(ScriptedInterpreter::default());
    let calendar = Arc::new(FakeCalendar::default());
    let sessions = Arc::new(MemorySessions::default());
    let history = Arc::new(MemoryHistory::default());
    let service = SchedulerService::new(
        interpreter.clone(),
        calendar.clone(),
        sessions.clone(),
        history.clone(),
        Arc::new(FixedSettings(settings)),
    );

    TestBed { interpreter, calendar, sessions, history, service }
}

/// A complete, confident interpretation.
pub fn interpreted(title: &str, start: &str, end: &str, confidence: f64) -> InterpretedDraft {
    InterpretedDraft {
        title: title.to_string(),
        start: start.to_string(),
        end: end.to_string(),
        confidence,
        ..InterpretedDraft::default()
    }
}
