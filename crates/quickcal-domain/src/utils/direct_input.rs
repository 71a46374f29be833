//! Deterministic structured-input extraction.
//!
//! Fallback draft builder that works without the interpretation gateway:
//! explicit labeled lines win, then a `DATE TIME-TIME` range anywhere in the
//! text, then loose date expressions scattered through the input. Exactly
//! one clarification question is attached, title taking priority over
//! start, start over end.

use chrono::{NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{
    FALLBACK_TITLE, QUESTION_MISSING_END, QUESTION_MISSING_START, QUESTION_MISSING_TITLE,
};
use crate::types::EventDraft;
use crate::utils::datetime::{add_minutes, format_local, parse_flexible_datetime};

const TITLE_LABELS: [&str; 2] = ["タイトル:", "Title:"];
const START_LABELS: [&str; 2] = ["開始:", "Start:"];
const END_LABELS: [&str; 2] = ["終了:", "End:"];
const LOCATION_LABELS: [&str; 2] = ["場所:", "Location:"];
const DESCRIPTION_LABELS: [&str; 2] = ["説明:", "Description:"];

#[allow(clippy::unwrap_used)] // pattern literal is a compile-time constant
static RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4}[/-]\d{1,2}[/-]\d{1,2})\s+(\d{1,2}:\d{2})\s*[-~〜]\s*(\d{1,2}:\d{2})")
        .unwrap()
});

#[allow(clippy::unwrap_used)] // pattern literal is a compile-time constant
static CANDIDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(\d{4}[/-]\d{1,2}[/-]\d{1,2}(?:\s+\d{1,2}(?::\d{2})?)?|\d{1,2}[/-]\d{1,2}(?:\s+\d{1,2}(?::\d{2})?)?|(?:今日|明日)\s*[0-9０-９〇零一二三四五六七八九十]{1,3}(?:(?::|：)\s*[0-9０-９〇零一二三四五六七八九十]{1,3}|時\s*[0-9０-９〇零一二三四五六七八九十]{0,3}\s*分?|時半|時)?)",
    )
    .unwrap()
});

#[allow(clippy::unwrap_used)] // pattern literals are compile-time constants
static LEADING_SCHEDULE_PREFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{4}[/-]\d{1,2}[/-]\d{1,2}\s+\d{1,2}:\d{2}\s*[-~〜]\s*\d{1,2}:\d{2}\s*",
        r"^\d{4}[/-]\d{1,2}[/-]\d{1,2}\s+\d{1,2}(?::\d{2})?\s*",
        r"^\d{1,2}[/-]\d{1,2}\s+\d{1,2}(?::\d{2})?\s*",
        r"^(今日|明日)\s*[0-9０-９〇零一二三四五六七八九十]{1,3}(?:(?::|：)\s*[0-9０-９〇零一二三四五六七八九十]{1,3}|時\s*[0-9０-９〇零一二三四五六七八九十]{0,3}\s*分?|時半|時)?\s*(?:から|より)?\s*",
        r"^(今日|明日)\s*\d{1,2}(?::\d{2})?\s*",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

fn extract_line_value(lines: &[&str], labels: &[&str]) -> String {
    for line in lines {
        for label in labels {
            if let Some(value) = line.strip_prefix(label) {
                return value.trim().to_string();
            }
        }
    }
    String::new()
}

/// A `DATE TIME-TIME` range found on a single line of the input.
fn extract_range(text: &str, now: NaiveDateTime) -> Option<(String, String)> {
    let caps = RANGE_RE.captures(text)?;
    let date_text = caps[1].replace('/', "-");

    let start = parse_flexible_datetime(&format!("{date_text} {}", &caps[2]), now)?;
    let end = parse_flexible_datetime(&format!("{date_text} {}", &caps[3]), now)?;
    Some((start, end))
}

/// All date-like substrings of the text, resolved through the temporal
/// parser, in order of appearance.
fn extract_date_candidates(text: &str, now: NaiveDateTime) -> Vec<String> {
    CANDIDATE_RE
        .find_iter(text)
        .filter_map(|m| parse_flexible_datetime(m.as_str(), now))
        .collect()
}

/// Remove a leading date/time expression (plus a trailing から/より
/// connector) from a candidate title line.
fn strip_leading_schedule_prefix(text: &str) -> String {
    let mut result = text.trim().to_string();
    for re in LEADING_SCHEDULE_PREFIXES.iter() {
        result = re.replace(&result, "").into_owned();
    }
    result.trim().to_string()
}

/// Extract an [`EventDraft`] from raw text without any external service.
///
/// Confidence is 0.8 when title, start and end were all found, 0.4
/// otherwise, with `uncertain` mirroring that split.
pub fn parse_direct_input(
    text: &str,
    default_duration_minutes: i64,
    now: NaiveDateTime,
) -> EventDraft {
    let normalized_text = text.trim();
    let lines: Vec<&str> = normalized_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let explicit_title = extract_line_value(&lines, &TITLE_LABELS);
    let explicit_start = extract_line_value(&lines, &START_LABELS);
    let explicit_end = extract_line_value(&lines, &END_LABELS);
    let explicit_location = extract_line_value(&lines, &LOCATION_LABELS);
    let explicit_description = extract_line_value(&lines, &DESCRIPTION_LABELS);

    let range = extract_range(normalized_text, now);
    let whole_text = parse_flexible_datetime(normalized_text, now);
    let candidates = extract_date_candidates(normalized_text, now);

    let start = parse_flexible_datetime(&explicit_start, now)
        .or_else(|| range.as_ref().map(|(start, _)| start.clone()))
        .or(whole_text)
        .or_else(|| candidates.first().cloned())
        .unwrap_or_default();

    let end = parse_flexible_datetime(&explicit_end, now)
        .or_else(|| range.as_ref().map(|(_, end)| end.clone()))
        .or_else(|| candidates.get(1).cloned())
        .or_else(|| {
            if start.is_empty() {
                None
            } else {
                add_minutes(&start, default_duration_minutes)
            }
        })
        .unwrap_or_default();

    let mut title = explicit_title;
    if title.is_empty() {
        title = strip_leading_schedule_prefix(lines.first().copied().unwrap_or_default());
    }
    if title.is_empty() && !start.is_empty() {
        title = FALLBACK_TITLE.to_string();
    }

    let description = if explicit_description.is_empty() {
        normalized_text.to_string()
    } else {
        explicit_description
    };

    let complete = !title.is_empty() && !start.is_empty() && !end.is_empty();
    let mut draft = EventDraft {
        title,
        start,
        end,
        location: explicit_location,
        description,
        confidence: if complete { 0.8 } else { 0.4 },
        uncertain: !complete,
        ..EventDraft::default()
    };

    if draft.title.is_empty() {
        draft.needs_clarification = true;
        draft.clarification_question = QUESTION_MISSING_TITLE.to_string();
    } else if draft.start.is_empty() {
        draft.needs_clarification = true;
        draft.clarification_question = QUESTION_MISSING_START.to_string();
    } else if draft.end.is_empty() {
        draft.needs_clarification = true;
        draft.clarification_question = QUESTION_MISSING_END.to_string();
    }

    draft
}

/// Low-confidence draft anchored to the current time, used when nothing in
/// the input parsed. The start is rounded up to the next 5-minute mark and
/// the caller is asked for the real start time.
pub fn fallback_draft_from_now(
    title: &str,
    default_duration_minutes: i64,
    now: NaiveDateTime,
) -> EventDraft {
    let zeroed = now.with_second(0).unwrap_or(now);
    let rounded_minute = zeroed.minute().div_ceil(5) * 5;
    let start_at = zeroed + chrono::Duration::minutes(i64::from(rounded_minute - zeroed.minute()));

    let start = format_local(start_at);
    let end = add_minutes(&start, default_duration_minutes).unwrap_or_default();

    EventDraft {
        title: if title.is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            title.to_string()
        },
        start,
        end,
        confidence: 0.2,
        uncertain: true,
        needs_clarification: true,
        clarification_question: QUESTION_MISSING_START.to_string(),
        ..EventDraft::default()
    }
}
