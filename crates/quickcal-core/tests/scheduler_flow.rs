//! End-to-end dialogue flows over scripted gateways.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod support;

use quickcal_domain::constants::{
    QUESTION_MISSING_START, QUESTION_MISSING_TITLE,
};
use quickcal_domain::{
    ConfirmationPolicy, DuplicateCandidate, ImageInput, InputMode, InterpretedDraft,
    PendingQuestion, QuickCalError, SchedulerOutcome, SchedulerSettings,
};
use uuid::Uuid;

use support::{interpreted, testbed};

fn clarification(outcome: SchedulerOutcome) -> (Uuid, String) {
    match outcome {
        SchedulerOutcome::NeedsClarification { session_id, question, .. } => (session_id, question),
        other => panic!("expected a clarification, got {other:?}"),
    }
}

fn image(name: &str) -> ImageInput {
    ImageInput {
        name: name.to_string(),
        mime_type: "image/png".to_string(),
        data_base64: "aGVsbG8=".to_string(),
        size_bytes: 0,
    }
}

#[tokio::test]
async fn empty_input_is_rejected_without_a_session() {
    let bed = testbed(SchedulerSettings::default());

    let result = bed.service.create_from_input("   ", Vec::new()).await;

    assert!(matches!(result, Err(QuickCalError::InvalidInput(_))));
    assert_eq!(bed.sessions.count(), 0);
}

#[tokio::test]
async fn missing_title_is_asked_before_missing_start() {
    let bed = testbed(SchedulerSettings::default());
    // Neither title nor start; the title question must win.
    bed.interpreter.push_interpret(Ok(InterpretedDraft {
        end: "2026-02-16T20:00:00".to_string(),
        confidence: 0.9,
        ..InterpretedDraft::default()
    }));

    let outcome = bed.service.create_from_input("なにか登録して", Vec::new()).await.unwrap();

    let (session_id, question) = clarification(outcome);
    assert_eq!(question, QUESTION_MISSING_TITLE);
    let session = bed.sessions.snapshot(session_id).unwrap();
    assert_eq!(session.pending, PendingQuestion::MissingTitle);
}

#[tokio::test]
async fn confident_draft_commits_without_confirmation_under_uncertain_only() {
    let bed = testbed(SchedulerSettings::default());
    bed.interpreter.push_interpret(Ok(interpreted(
        "歯医者",
        "2026-02-20T10:00:00",
        "2026-02-20T11:00:00",
        0.92,
    )));

    let outcome = bed.service.create_from_input("2/20 10時に歯医者", Vec::new()).await.unwrap();

    match outcome {
        SchedulerOutcome::Success { event, .. } => {
            assert_eq!(event.title, "歯医者");
            assert_eq!(event.start, "2026-02-20T10:00:00");
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert_eq!(bed.calendar.inserted_count(), 1);
    assert_eq!(bed.history.count(), 1);
    assert_eq!(bed.sessions.count(), 0);
}

#[tokio::test]
async fn uncertain_flag_forces_confirmation_despite_high_confidence() {
    let bed = testbed(SchedulerSettings::default());
    bed.interpreter.push_interpret(Ok(InterpretedDraft {
        uncertain: true,
        ..interpreted("飲み会", "2026-02-20T19:00:00", "2026-02-20T21:00:00", 0.95)
    }));

    let outcome = bed.service.create_from_input("金曜に飲み会かも", Vec::new()).await.unwrap();

    let (session_id, question) = clarification(outcome);
    assert!(question.contains("以下で登録しますか"));
    let session = bed.sessions.snapshot(session_id).unwrap();
    assert_eq!(session.pending, PendingQuestion::ConfirmBeforeCreate);
    assert_eq!(bed.calendar.inserted_count(), 0);
}

#[tokio::test]
async fn always_policy_asks_then_affirmative_commits() {
    let settings = SchedulerSettings {
        confirmation_policy: ConfirmationPolicy::Always,
        ..SchedulerSettings::default()
    };
    let bed = testbed(settings);
    bed.interpreter.push_interpret(Ok(interpreted(
        "ランチ",
        "2026-02-20T12:00:00",
        "2026-02-20T13:00:00",
        0.9,
    )));

    let outcome = bed.service.create_from_input("2/20ランチ", Vec::new()).await.unwrap();
    let (session_id, _) = clarification(outcome);

    let outcome = bed.service.answer_clarification(session_id, "はい", Vec::new()).await.unwrap();

    assert!(matches!(outcome, SchedulerOutcome::Success { .. }));
    assert_eq!(bed.calendar.inserted_count(), 1);
    assert_eq!(bed.sessions.count(), 0);
}

#[tokio::test]
async fn negative_confirmation_cancels_and_deletes_session() {
    let settings = SchedulerSettings {
        confirmation_policy: ConfirmationPolicy::Always,
        ..SchedulerSettings::default()
    };
    let bed = testbed(settings);
    bed.interpreter.push_interpret(Ok(interpreted(
        "ランチ",
        "2026-02-20T12:00:00",
        "2026-02-20T13:00:00",
        0.9,
    )));

    let outcome = bed.service.create_from_input("2/20ランチ", Vec::new()).await.unwrap();
    let (session_id, _) = clarification(outcome);

    // Mixed answer: the negative cue wins over「はい」.
    let outcome = bed
        .service
        .answer_clarification(session_id, "はい、と言いたいけどやめる", Vec::new())
        .await
        .unwrap();

    assert!(matches!(outcome, SchedulerOutcome::Cancelled { .. }));
    assert_eq!(bed.calendar.inserted_count(), 0);
    assert_eq!(bed.sessions.count(), 0);
}

#[tokio::test]
async fn unclear_confirmation_reasks_with_directive_text() {
    let settings = SchedulerSettings {
        confirmation_policy: ConfirmationPolicy::Always,
        ..SchedulerSettings::default()
    };
    let bed = testbed(settings);
    bed.interpreter.push_interpret(Ok(interpreted(
        "ランチ",
        "2026-02-20T12:00:00",
        "2026-02-20T13:00:00",
        0.9,
    )));

    let outcome = bed.service.create_from_input("2/20ランチ", Vec::new()).await.unwrap();
    let (session_id, _) = clarification(outcome);

    let outcome =
        bed.service.answer_clarification(session_id, "うーん", Vec::new()).await.unwrap();

    let (reask_id, question) = clarification(outcome);
    assert_eq!(reask_id, session_id);
    assert!(question.contains("「はい」"));
    let session = bed.sessions.snapshot(session_id).unwrap();
    assert_eq!(session.pending, PendingQuestion::ConfirmBeforeCreate);
}

#[tokio::test]
async fn invalid_time_range_never_commits() {
    let bed = testbed(SchedulerSettings::default());
    bed.interpreter.push_interpret(Ok(interpreted(
        "会議",
        "2026-02-20T15:00:00",
        "2026-02-20T14:00:00",
        0.9,
    )));

    let outcome = bed.service.create_from_input("会議", Vec::new()).await.unwrap();

    let (session_id, question) = clarification(outcome);
    assert!(question.contains("開始日時より後"));
    let session = bed.sessions.snapshot(session_id).unwrap();
    assert_eq!(session.pending, PendingQuestion::InvalidTimeRange);
    assert_eq!(bed.calendar.inserted_count(), 0);
}

#[tokio::test]
async fn unparseable_start_answer_reasks_then_local_parse_recovers() {
    let bed = testbed(SchedulerSettings::default());
    bed.interpreter.push_interpret(Ok(InterpretedDraft {
        title: "打ち合わせ".to_string(),
        confidence: 0.9,
        ..InterpretedDraft::default()
    }));

    let outcome = bed.service.create_from_input("打ち合わせ入れて", Vec::new()).await.unwrap();
    let (session_id, question) = clarification(outcome);
    assert_eq!(question, QUESTION_MISSING_START);

    // No scripted refinement and nothing parseable: same session, firmer text.
    let outcome =
        bed.service.answer_clarification(session_id, "たぶん午後", Vec::new()).await.unwrap();
    let (reask_id, question) = clarification(outcome);
    assert_eq!(reask_id, session_id);
    assert!(question.contains("開始日時を確定できませんでした"));

    // A concrete answer resolves locally even with the gateway down.
    let outcome =
        bed.service.answer_clarification(session_id, "2026-02-20 19:00", Vec::new()).await.unwrap();
    match outcome {
        SchedulerOutcome::Success { event, .. } => {
            assert_eq!(event.start, "2026-02-20T19:00:00");
            // End was filled from the default duration.
            assert_eq!(event.end, "2026-02-20T20:00:00");
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn model_followup_routes_answer_through_refinement() {
    let bed = testbed(SchedulerSettings::default());
    bed.interpreter.push_interpret(Ok(InterpretedDraft {
        needs_clarification: true,
        clarification_question: "会議室はどこですか？".to_string(),
        ..interpreted("定例会", "2026-02-20T10:00:00", "2026-02-20T11:00:00", 0.9)
    }));
    bed.interpreter.push_refine(Ok(InterpretedDraft {
        location: "3F 会議室A".to_string(),
        ..interpreted("定例会", "2026-02-20T10:00:00", "2026-02-20T11:00:00", 0.9)
    }));

    let outcome = bed.service.create_from_input("来週の定例会", Vec::new()).await.unwrap();
    let (session_id, question) = clarification(outcome);
    assert_eq!(question, "会議室はどこですか？");

    let outcome =
        bed.service.answer_clarification(session_id, "3Fの会議室Aで", Vec::new()).await.unwrap();

    assert!(matches!(outcome, SchedulerOutcome::Success { .. }));
    let refines = bed.interpreter.refine_requests.lock().unwrap();
    let last = refines.last().unwrap();
    assert_eq!(last.question, "会議室はどこですか？");
    assert_eq!(last.answer, "3Fの会議室Aで");
}

#[tokio::test]
async fn duplicate_decline_deletes_session_and_later_answers_fail() {
    let bed = testbed(SchedulerSettings::default());
    bed.interpreter.push_interpret(Ok(interpreted(
        "歯医者",
        "2026-02-20T10:00:00",
        "2026-02-20T11:00:00",
        0.9,
    )));
    bed.calendar.set_duplicates(vec![DuplicateCandidate {
        summary: "歯医者".to_string(),
        start: "2026-02-20T10:15:00".to_string(),
        end: "2026-02-20T11:15:00".to_string(),
    }]);

    let outcome = bed.service.create_from_input("2/20 10時 歯医者", Vec::new()).await.unwrap();
    let (session_id, question) = clarification(outcome);
    assert!(question.contains("重複候補"));

    let outcome =
        bed.service.answer_clarification(session_id, "いいえ", Vec::new()).await.unwrap();
    match outcome {
        SchedulerOutcome::Cancelled { message } => assert!(message.contains("重複")),
        other => panic!("expected cancellation, got {other:?}"),
    }
    assert_eq!(bed.calendar.inserted_count(), 0);

    let result = bed.service.answer_clarification(session_id, "はい", Vec::new()).await;
    assert!(matches!(result, Err(QuickCalError::SessionNotFound(_))));
}

#[tokio::test]
async fn duplicate_accept_commits_once() {
    let bed = testbed(SchedulerSettings::default());
    bed.interpreter.push_interpret(Ok(interpreted(
        "歯医者",
        "2026-02-20T10:00:00",
        "2026-02-20T11:00:00",
        0.9,
    )));
    bed.calendar.set_duplicates(vec![DuplicateCandidate {
        summary: "歯医者".to_string(),
        start: "2026-02-20T10:15:00".to_string(),
        end: "2026-02-20T11:15:00".to_string(),
    }]);

    let outcome = bed.service.create_from_input("2/20 10時 歯医者", Vec::new()).await.unwrap();
    let (session_id, _) = clarification(outcome);

    let outcome = bed.service.answer_clarification(session_id, "はい", Vec::new()).await.unwrap();

    assert!(matches!(outcome, SchedulerOutcome::Success { .. }));
    assert_eq!(bed.calendar.inserted_count(), 1);
}

#[tokio::test]
async fn duplicate_check_failure_is_treated_as_no_candidates() {
    let bed = testbed(SchedulerSettings::default());
    bed.interpreter.push_interpret(Ok(interpreted(
        "歯医者",
        "2026-02-20T10:00:00",
        "2026-02-20T11:00:00",
        0.9,
    )));
    *bed.calendar.duplicates_unavailable.lock().unwrap() = true;

    let outcome = bed.service.create_from_input("2/20 10時 歯医者", Vec::new()).await.unwrap();

    assert!(matches!(outcome, SchedulerOutcome::Success { .. }));
    assert_eq!(bed.calendar.inserted_count(), 1);
}

#[tokio::test]
async fn commit_failure_preserves_session_for_retry() {
    let settings = SchedulerSettings {
        confirmation_policy: ConfirmationPolicy::Always,
        ..SchedulerSettings::default()
    };
    let bed = testbed(settings);
    bed.interpreter.push_interpret(Ok(interpreted(
        "ランチ",
        "2026-02-20T12:00:00",
        "2026-02-20T13:00:00",
        0.9,
    )));
    bed.calendar.fail_next_insert(QuickCalError::Network("503".to_string()));

    let outcome = bed.service.create_from_input("2/20ランチ", Vec::new()).await.unwrap();
    let (session_id, _) = clarification(outcome);

    let result = bed.service.answer_clarification(session_id, "はい", Vec::new()).await;
    assert!(matches!(result, Err(QuickCalError::Calendar(_))));

    // The session survived with the confirmation flag, so a second
    // affirmative does not re-run the whole dialogue.
    let session = bed.sessions.snapshot(session_id).unwrap();
    assert!(session.draft.user_confirmed);

    let outcome = bed.service.answer_clarification(session_id, "はい", Vec::new()).await.unwrap();
    assert!(matches!(outcome, SchedulerOutcome::Success { .. }));
    assert_eq!(bed.calendar.inserted_count(), 1);
}

#[tokio::test]
async fn empty_answer_re_presents_the_pending_question() {
    let bed = testbed(SchedulerSettings::default());
    bed.interpreter.push_interpret(Ok(InterpretedDraft {
        title: "打ち合わせ".to_string(),
        confidence: 0.9,
        ..InterpretedDraft::default()
    }));

    let outcome = bed.service.create_from_input("打ち合わせ", Vec::new()).await.unwrap();
    let (session_id, _) = clarification(outcome);
    let refines_before = bed.interpreter.refine_request_count();

    let outcome = bed.service.answer_clarification(session_id, "  ", Vec::new()).await.unwrap();

    let (reask_id, question) = clarification(outcome);
    assert_eq!(reask_id, session_id);
    assert_eq!(question, QUESTION_MISSING_START);
    assert_eq!(bed.interpreter.refine_request_count(), refines_before);
}

#[tokio::test]
async fn session_keeps_only_three_most_recent_images() {
    let settings = SchedulerSettings {
        confirmation_policy: ConfirmationPolicy::Always,
        ..SchedulerSettings::default()
    };
    let bed = testbed(settings);
    bed.interpreter.push_interpret(Ok(InterpretedDraft {
        start: "2026-02-20T19:00:00".to_string(),
        end: "2026-02-20T20:00:00".to_string(),
        confidence: 0.9,
        ..InterpretedDraft::default()
    }));

    let outcome = bed
        .service
        .create_from_input("画像の予定を登録して", vec![image("a"), image("b")])
        .await
        .unwrap();
    let (session_id, question) = clarification(outcome);
    assert_eq!(question, QUESTION_MISSING_TITLE);

    let outcome = bed
        .service
        .answer_clarification(session_id, "ラーメン会", vec![image("c"), image("d")])
        .await
        .unwrap();

    let (session_id, _) = clarification(outcome);
    let session = bed.sessions.snapshot(session_id).unwrap();
    let names: Vec<_> = session.source_images.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["b", "c", "d"]);
}

#[tokio::test]
async fn direct_mode_never_touches_the_interpreter() {
    let settings = SchedulerSettings {
        input_mode: InputMode::Direct,
        ai_enabled: false,
        ..SchedulerSettings::default()
    };
    let bed = testbed(settings);

    let outcome = bed
        .service
        .create_from_input(
            "タイトル: ラーメン会\n開始: 2026-02-20 19:00\n終了: 2026-02-20 21:00",
            Vec::new(),
        )
        .await
        .unwrap();

    match outcome {
        SchedulerOutcome::Success { event, .. } => {
            assert_eq!(event.title, "ラーメン会");
            assert_eq!(event.start, "2026-02-20T19:00:00");
            assert_eq!(event.end, "2026-02-20T21:00:00");
        }
        other => panic!("expected success, got {other:?}"),
    }
    assert!(bed.interpreter.interpret_requests.lock().unwrap().is_empty());
    assert_eq!(bed.interpreter.refine_request_count(), 0);
}

#[tokio::test]
async fn direct_mode_with_ai_enabled_skips_refinement_rounds() {
    let settings = SchedulerSettings {
        input_mode: InputMode::Direct,
        ai_enabled: true,
        ..SchedulerSettings::default()
    };
    let bed = testbed(settings);

    // Start missing: the gap-fill round must not reach the gateway.
    let outcome = bed.service.create_from_input("ランチに行く", Vec::new()).await.unwrap();
    let (session_id, question) = clarification(outcome);
    assert_eq!(question, QUESTION_MISSING_START);
    assert_eq!(bed.interpreter.refine_request_count(), 0);

    // The answer resolves through the local parser, again without a call.
    let outcome = bed
        .service
        .answer_clarification(session_id, "2026-02-20 19:00", Vec::new())
        .await
        .unwrap();

    let (_, question) = clarification(outcome);
    assert!(question.contains("以下で登録しますか"));
    assert!(bed.interpreter.interpret_requests.lock().unwrap().is_empty());
    assert_eq!(bed.interpreter.refine_request_count(), 0);
}

#[tokio::test]
async fn initial_interpretation_failure_is_a_hard_error() {
    let bed = testbed(SchedulerSettings::default());
    // Nothing scripted: the interpret call fails.

    let result = bed.service.create_from_input("2/20ランチ", Vec::new()).await;

    assert!(matches!(result, Err(QuickCalError::Interpretation(_))));
    assert_eq!(bed.sessions.count(), 0);
}

#[tokio::test]
async fn cancel_session_is_terminal() {
    let settings = SchedulerSettings {
        confirmation_policy: ConfirmationPolicy::Always,
        ..SchedulerSettings::default()
    };
    let bed = testbed(settings);
    bed.interpreter.push_interpret(Ok(interpreted(
        "ランチ",
        "2026-02-20T12:00:00",
        "2026-02-20T13:00:00",
        0.9,
    )));

    let outcome = bed.service.create_from_input("2/20ランチ", Vec::new()).await.unwrap();
    let (session_id, _) = clarification(outcome);

    let outcome = bed.service.cancel_session(session_id).await.unwrap();
    assert!(matches!(outcome, SchedulerOutcome::Cancelled { .. }));

    let result = bed.service.answer_clarification(session_id, "はい", Vec::new()).await;
    assert!(matches!(result, Err(QuickCalError::SessionNotFound(_))));
}
