//! Clarification dialogue engine - core business logic
//!
//! Runs the validation pipeline on every draft revision: normalize, fill
//! gaps, then ask the first unmet question or commit. Session state is kept
//! behind the injected [`SessionStore`] and mutated only by the turn
//! currently processing that session id.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use quickcal_domain::constants::{
    CONFIRMATION_CONFIDENCE_THRESHOLD, QUESTION_MISSING_END, QUESTION_MISSING_START,
    QUESTION_MISSING_TITLE,
};
use quickcal_domain::utils::affirmation::{classify, Affirmation};
use quickcal_domain::utils::datetime::{
    coerce_datetime, format_local, is_start_before_end, parse_flexible_datetime,
};
use quickcal_domain::utils::direct_input::parse_direct_input;
use quickcal_domain::{
    ClarificationSession, ConfirmationPolicy, CreatedEvent, DraftPreview, EventDraft, HistoryEntry,
    ImageInput, PendingQuestion, QuickCalError, Result, SchedulerOutcome, SchedulerSettings,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::draft::{
    apply_interpreted, draft_from_interpreted, merge_images, sanitize_draft, sanitize_images,
};
use super::ports::{
    CalendarGateway, HistoryStore, Interpreter, InterpretRequest, RefineRequest, SessionStore,
    SettingsProvider,
};

const QUESTION_INVALID_TIME_RANGE: &str =
    "開始日時より後の終了日時を入力してください（例: 2026-02-14 20:00）。";
const REASK_MISSING_START: &str =
    "開始日時を確定できませんでした。もう少し具体的に入力してください（例: 2026-02-14 19:00）";
const REASK_MISSING_END: &str =
    "終了日時を確定できませんでした。もう少し具体的に入力してください（例: 2026-02-14 20:00）";
const REASK_INVALID_TIME_RANGE: &str =
    "終了日時を再確認したいです。開始より後になる時刻を具体的に入力してください（例: 2026-02-14 20:00）";
const REASK_CONFIRM: &str = "登録してよければ「はい」、中止なら「いいえ」と入力してください。";
const GAP_FILL_QUESTION: &str =
    "元の入力文から不足項目を補完してください。推定できる場合は補完し、どうしても不明な場合のみ needsClarification=true にしてください。";
const MESSAGE_CANCELLED: &str = "登録をキャンセルしました。";
const MESSAGE_DUPLICATE_CANCELLED: &str = "重複候補があるため登録を中止しました。";
const MESSAGE_CREATED: &str = "カレンダーに登録しました。";
const MESSAGE_EMPTY_INPUT: &str = "入力文または画像を指定してください。";
const MESSAGE_SESSION_NOT_FOUND: &str =
    "確認セッションが見つかりません。もう一度入力してください。";

/// Everything one pipeline run needs, independent of where the draft came
/// from (fresh input or a session answer).
struct TurnContext {
    settings: SchedulerSettings,
    draft: EventDraft,
    source_text: String,
    source_images: Vec<ImageInput>,
    instruction_text: String,
    session_id: Option<Uuid>,
}

#[derive(Clone, Copy)]
enum DateField {
    Start,
    End,
}

fn now_local() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn clear_pending_question(draft: &mut EventDraft) {
    draft.needs_clarification = false;
    draft.clarification_question.clear();
}

/// Dialogue engine and session manager.
pub struct SchedulerService {
    interpreter: Arc<dyn Interpreter>,
    calendar: Arc<dyn CalendarGateway>,
    sessions: Arc<dyn SessionStore>,
    history: Arc<dyn HistoryStore>,
    settings: Arc<dyn SettingsProvider>,
}

impl SchedulerService {
    /// Create a new scheduler service.
    pub fn new(
        interpreter: Arc<dyn Interpreter>,
        calendar: Arc<dyn CalendarGateway>,
        sessions: Arc<dyn SessionStore>,
        history: Arc<dyn HistoryStore>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self { interpreter, calendar, sessions, history, settings }
    }

    /// Start a scheduling dialogue from raw input.
    ///
    /// Empty submissions (no text, no images) are rejected without creating
    /// a session. An interpretation failure on this initial turn is a hard
    /// error; the caller must resubmit from scratch.
    pub async fn create_from_input(
        &self,
        text: &str,
        images: Vec<ImageInput>,
    ) -> Result<SchedulerOutcome> {
        let images = sanitize_images(images);
        let text = text.trim().to_string();
        if text.is_empty() && images.is_empty() {
            return Err(QuickCalError::InvalidInput(MESSAGE_EMPTY_INPUT.to_string()));
        }

        let settings = self.settings.current().await?;
        let instruction_text = settings.active_instruction_text();
        info!(
            input_chars = text.chars().count(),
            image_count = images.len(),
            model = %settings.model,
            calendar_id = %settings.calendar_id,
            "starting scheduling dialogue"
        );

        let draft = if settings.uses_ai() {
            let request = InterpretRequest {
                text: text.clone(),
                images: images.clone(),
                settings: settings.clone(),
                instruction_text: instruction_text.clone(),
            };
            match self.interpreter.interpret(request).await {
                Ok(interpreted) => draft_from_interpreted(interpreted),
                Err(err) => {
                    warn!(error = %err, "initial interpretation failed");
                    return Err(QuickCalError::Interpretation(format!(
                        "入力の解釈に失敗しました: {err}"
                    )));
                }
            }
        } else {
            parse_direct_input(&text, settings.default_duration_minutes, now_local())
        };

        self.progress(TurnContext {
            settings,
            draft,
            source_text: text,
            source_images: images,
            instruction_text,
            session_id: None,
        })
        .await
    }

    /// Answer the pending clarification question of an existing session.
    pub async fn answer_clarification(
        &self,
        session_id: Uuid,
        text: &str,
        images: Vec<ImageInput>,
    ) -> Result<SchedulerOutcome> {
        let Some(mut session) = self.sessions.get(session_id).await? else {
            warn!(%session_id, "answer submitted for unknown session");
            return Err(QuickCalError::SessionNotFound(MESSAGE_SESSION_NOT_FOUND.to_string()));
        };

        let answer = text.trim().to_string();
        let answer_images = sanitize_images(images);
        let merged_images = merge_images(session.source_images.clone(), answer_images.clone());
        info!(
            %session_id,
            question_type = ?session.pending,
            answer_chars = answer.chars().count(),
            image_count = answer_images.len(),
            "processing clarification answer"
        );

        // An empty answer re-presents the pending question, except for the
        // explicit confirmation where emptiness counts as "neither".
        if answer.is_empty()
            && answer_images.is_empty()
            && !matches!(session.pending, PendingQuestion::ConfirmBeforeCreate)
        {
            return Ok(SchedulerOutcome::NeedsClarification {
                session_id,
                question: session.question.clone(),
                draft: DraftPreview::from(&session.draft),
            });
        }

        match session.pending.clone() {
            PendingQuestion::MissingTitle => {
                if answer.is_empty() && !answer_images.is_empty() && session.settings.uses_ai() {
                    let request = RefineRequest {
                        draft: session.draft.clone(),
                        question: session.question.clone(),
                        answer: String::new(),
                        images: merged_images.clone(),
                        settings: session.settings.clone(),
                        instruction_text: session.instruction_text.clone(),
                    };
                    let refined = self.interpreter.refine(request).await.map_err(|err| {
                        QuickCalError::Interpretation(format!("確認処理に失敗しました: {err}"))
                    })?;
                    session.draft.title = refined.title.trim().to_string();
                } else {
                    session.draft.title = answer.clone();
                }
                clear_pending_question(&mut session.draft);
            }
            PendingQuestion::MissingStart => {
                match self
                    .resolve_datetime_from_answer(&session, &answer, DateField::Start, &merged_images)
                    .await
                {
                    Some(parsed) => {
                        session.draft.start = parsed;
                        clear_pending_question(&mut session.draft);
                    }
                    None => {
                        return self
                            .reask(session_id, session, merged_images, REASK_MISSING_START)
                            .await
                    }
                }
            }
            PendingQuestion::MissingEnd => {
                match self
                    .resolve_datetime_from_answer(&session, &answer, DateField::End, &merged_images)
                    .await
                {
                    Some(parsed) => {
                        session.draft.end = parsed;
                        clear_pending_question(&mut session.draft);
                    }
                    None => {
                        return self
                            .reask(session_id, session, merged_images, REASK_MISSING_END)
                            .await
                    }
                }
            }
            PendingQuestion::InvalidTimeRange => {
                match self
                    .resolve_datetime_from_answer(&session, &answer, DateField::End, &merged_images)
                    .await
                {
                    Some(parsed) => {
                        session.draft.end = parsed;
                        clear_pending_question(&mut session.draft);
                    }
                    None => {
                        return self
                            .reask(session_id, session, merged_images, REASK_INVALID_TIME_RANGE)
                            .await
                    }
                }
            }
            PendingQuestion::ModelFollowup { question } => {
                let request = RefineRequest {
                    draft: session.draft.clone(),
                    question,
                    answer: answer.clone(),
                    images: merged_images.clone(),
                    settings: session.settings.clone(),
                    instruction_text: session.instruction_text.clone(),
                };
                let refined = self.interpreter.refine(request).await.map_err(|err| {
                    QuickCalError::Interpretation(format!("確認処理に失敗しました: {err}"))
                })?;
                session.draft = apply_interpreted(&session.draft, &refined);
            }
            PendingQuestion::ConfirmBeforeCreate => match classify(&answer) {
                Affirmation::No => {
                    self.sessions.remove(session_id).await?;
                    info!(%session_id, "confirmation declined, session deleted");
                    return Ok(SchedulerOutcome::Cancelled {
                        message: MESSAGE_CANCELLED.to_string(),
                    });
                }
                Affirmation::Unclear => {
                    return self.reask(session_id, session, merged_images, REASK_CONFIRM).await
                }
                Affirmation::Yes => session.draft.user_confirmed = true,
            },
            PendingQuestion::DuplicateConfirm { .. } => {
                if classify(&answer) != Affirmation::Yes {
                    self.sessions.remove(session_id).await?;
                    info!(%session_id, "duplicate not accepted, session deleted");
                    return Ok(SchedulerOutcome::Cancelled {
                        message: MESSAGE_DUPLICATE_CANCELLED.to_string(),
                    });
                }
                session.draft.duplicate_confirmed = true;
            }
        }

        session.source_images = merged_images;
        self.sessions.insert(session_id, session.clone()).await?;

        self.progress(TurnContext {
            settings: session.settings,
            draft: session.draft,
            source_text: session.source_text,
            source_images: session.source_images,
            instruction_text: session.instruction_text,
            session_id: Some(session_id),
        })
        .await
    }

    /// Delete a session immediately, regardless of pending external calls.
    pub async fn cancel_session(&self, session_id: Uuid) -> Result<SchedulerOutcome> {
        self.sessions.remove(session_id).await?;
        info!(%session_id, "session cancelled");
        Ok(SchedulerOutcome::Cancelled { message: MESSAGE_CANCELLED.to_string() })
    }

    /// Resolve a canonical timestamp from a clarification answer.
    ///
    /// The refinement candidate is tried through the strict temporal parser
    /// first, then through general coercion; as a last resort the raw
    /// answer itself is parsed locally. Refinement failure is not fatal
    /// here, it simply yields `None` and the same question is re-asked.
    async fn resolve_datetime_from_answer(
        &self,
        session: &ClarificationSession,
        answer: &str,
        field: DateField,
        images: &[ImageInput],
    ) -> Option<String> {
        let now = now_local();

        if session.settings.uses_ai() {
            let request = RefineRequest {
                draft: session.draft.clone(),
                question: session.question.clone(),
                answer: answer.to_string(),
                images: images.to_vec(),
                settings: session.settings.clone(),
                instruction_text: session.instruction_text.clone(),
            };
            match self.interpreter.refine(request).await {
                Ok(refined) => {
                    let candidate = match field {
                        DateField::Start => refined.start,
                        DateField::End => refined.end,
                    };
                    if let Some(strict) = parse_flexible_datetime(&candidate, now) {
                        return Some(strict);
                    }
                    if let Some(coerced) = coerce_datetime(&candidate) {
                        return Some(format_local(coerced));
                    }
                }
                Err(err) => {
                    warn!(error = %err, "datetime refinement failed");
                }
            }
        }

        parse_flexible_datetime(answer, now)
    }

    /// One optional refinement round-trip to fill title/start/end gaps from
    /// the original source text and images. Failure is swallowed.
    async fn fill_missing_fields(&self, ctx: &TurnContext, draft: EventDraft) -> EventDraft {
        if !draft.has_missing_fields() || !ctx.settings.uses_ai() {
            return draft;
        }

        info!(
            has_title = draft.has_title(),
            has_start = draft.has_start(),
            has_end = draft.has_end(),
            "refining draft to fill missing fields"
        );

        let request = RefineRequest {
            draft: draft.clone(),
            question: GAP_FILL_QUESTION.to_string(),
            answer: ctx.source_text.clone(),
            images: ctx.source_images.clone(),
            settings: ctx.settings.clone(),
            instruction_text: ctx.instruction_text.clone(),
        };
        match self.interpreter.refine(request).await {
            Ok(refined) => sanitize_draft(
                apply_interpreted(&draft, &refined),
                ctx.settings.default_duration_minutes,
            ),
            Err(err) => {
                warn!(error = %err, "gap-filling refinement failed, continuing with known fields");
                draft
            }
        }
    }

    /// The validation pipeline. First unmet condition wins and issues that
    /// question; a fully valid draft is committed.
    async fn progress(&self, ctx: TurnContext) -> Result<SchedulerOutcome> {
        let normalized = sanitize_draft(ctx.draft.clone(), ctx.settings.default_duration_minutes);
        let normalized = self.fill_missing_fields(&ctx, normalized).await;

        info!(
            has_title = normalized.has_title(),
            has_start = normalized.has_start(),
            has_end = normalized.has_end(),
            needs_clarification = normalized.needs_clarification,
            confidence = normalized.confidence,
            "draft normalized"
        );

        if !normalized.has_title() {
            return self
                .ask(ctx, normalized, PendingQuestion::MissingTitle, QUESTION_MISSING_TITLE.to_string())
                .await;
        }

        if !normalized.has_start() {
            return self
                .ask(ctx, normalized, PendingQuestion::MissingStart, QUESTION_MISSING_START.to_string())
                .await;
        }

        if !normalized.has_end() {
            return self
                .ask(ctx, normalized, PendingQuestion::MissingEnd, QUESTION_MISSING_END.to_string())
                .await;
        }

        if !is_start_before_end(&normalized.start, &normalized.end) {
            warn!(start = %normalized.start, end = %normalized.end, "invalid time range");
            return self
                .ask(
                    ctx,
                    normalized,
                    PendingQuestion::InvalidTimeRange,
                    QUESTION_INVALID_TIME_RANGE.to_string(),
                )
                .await;
        }

        if normalized.needs_clarification && !normalized.clarification_question.is_empty() {
            let question = normalized.clarification_question.clone();
            return self
                .ask(
                    ctx,
                    normalized,
                    PendingQuestion::ModelFollowup { question: question.clone() },
                    question,
                )
                .await;
        }

        let needs_explicit_confirm = match ctx.settings.confirmation_policy {
            ConfirmationPolicy::Always => true,
            ConfirmationPolicy::UncertainOnly => {
                normalized.uncertain || normalized.confidence < CONFIRMATION_CONFIDENCE_THRESHOLD
            }
        };
        if needs_explicit_confirm && !normalized.user_confirmed {
            let question = build_confirm_question(&normalized);
            return self
                .ask(ctx, normalized, PendingQuestion::ConfirmBeforeCreate, question)
                .await;
        }

        let duplicates = match self.calendar.find_duplicates(&normalized, &ctx.settings).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!(error = %err, "duplicate check failed, treating as no candidates");
                Vec::new()
            }
        };
        info!(count = duplicates.len(), "duplicate check done");

        if let Some(candidate) = duplicates.first() {
            if !normalized.duplicate_confirmed {
                let question = build_duplicate_question(candidate);
                let candidate = candidate.clone();
                return self
                    .ask(ctx, normalized, PendingQuestion::DuplicateConfirm { candidate }, question)
                    .await;
            }
        }

        self.commit(ctx, normalized).await
    }

    /// Store (or refresh) the session and surface the question.
    async fn ask(
        &self,
        ctx: TurnContext,
        draft: EventDraft,
        pending: PendingQuestion,
        question: String,
    ) -> Result<SchedulerOutcome> {
        let session_id = ctx.session_id.unwrap_or_else(Uuid::new_v4);
        let preview = DraftPreview::from(&draft);
        let session = ClarificationSession {
            draft,
            pending,
            question: question.clone(),
            settings: ctx.settings,
            source_text: ctx.source_text,
            source_images: ctx.source_images,
            instruction_text: ctx.instruction_text,
        };
        self.sessions.insert(session_id, session).await?;

        info!(%session_id, question = %question, "clarification question issued");
        Ok(SchedulerOutcome::NeedsClarification { session_id, question, draft: preview })
    }

    /// Re-issue the current question with a more directive text, keeping
    /// the same session and question type.
    async fn reask(
        &self,
        session_id: Uuid,
        mut session: ClarificationSession,
        images: Vec<ImageInput>,
        question: &str,
    ) -> Result<SchedulerOutcome> {
        session.source_images = images;
        session.question = question.to_string();
        let preview = DraftPreview::from(&session.draft);
        self.sessions.insert(session_id, session).await?;

        info!(%session_id, question = %question, "re-issuing clarification question");
        Ok(SchedulerOutcome::NeedsClarification {
            session_id,
            question: question.to_string(),
            draft: preview,
        })
    }

    /// Insert the event and close the session. On insert failure the
    /// session is preserved so the confirmed draft can be retried without
    /// re-asking already-answered questions.
    async fn commit(&self, ctx: TurnContext, draft: EventDraft) -> Result<SchedulerOutcome> {
        info!(
            calendar_id = %ctx.settings.calendar_id,
            title = %draft.title,
            start = %draft.start,
            end = %draft.end,
            "inserting calendar event"
        );

        let created = self.calendar.insert_event(&draft, &ctx.settings).await.map_err(|err| {
            warn!(error = %err, "calendar insert failed, session preserved");
            QuickCalError::Calendar(format!("カレンダー登録に失敗しました: {err}"))
        })?;

        let entry = HistoryEntry {
            id: created.id.clone(),
            title: draft.title.clone(),
            start: draft.start.clone(),
            end: draft.end.clone(),
            html_link: created.html_link.clone(),
            created_at: Utc::now(),
        };
        if let Err(err) = self.history.append(entry).await {
            warn!(error = %err, "failed to record history entry");
        }

        if let Some(session_id) = ctx.session_id {
            if let Err(err) = self.sessions.remove(session_id).await {
                warn!(%session_id, error = %err, "failed to delete committed session");
            }
        }

        info!(event_id = %created.id, "calendar event created");
        Ok(SchedulerOutcome::Success {
            message: MESSAGE_CREATED.to_string(),
            event: CreatedEvent {
                id: created.id,
                html_link: created.html_link,
                title: draft.title,
                start: draft.start,
                end: draft.end,
            },
        })
    }
}

fn build_confirm_question(draft: &EventDraft) -> String {
    let location = if draft.location.is_empty() { "(なし)" } else { &draft.location };
    format!(
        "以下で登録しますか？\nタイトル: {}\n開始: {}\n終了: {}\n場所: {}\n\n登録するなら「はい」、中止するなら「いいえ」と入力してください。",
        draft.title, draft.start, draft.end, location
    )
}

fn build_duplicate_question(candidate: &quickcal_domain::DuplicateCandidate) -> String {
    let summary = if candidate.summary.is_empty() { "無題" } else { &candidate.summary };
    format!(
        "重複候補があります（{} / {}）。それでも登録しますか？\n登録するなら「はい」、中止するなら「いいえ」と入力してください。",
        summary, candidate.start
    )
}
