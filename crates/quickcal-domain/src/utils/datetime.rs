//! Flexible natural-language date/time parsing.
//!
//! Converts expressions like `2026-02-14 19:00`, `2/20 19:00`, `明日五時半`
//! or `今日 9:00` into the canonical local timestamp format
//! `YYYY-MM-DDTHH:mm:ss`. Relative-day patterns are tried before absolute
//! dates, and strict (whole-string) matching is tried before loose
//! (substring) matching so that a date embedded in a longer sentence is
//! still recognized.
//!
//! Calendar validation is delegated to `chrono`: a date such as Feb 31 is
//! rejected outright rather than rolled over into March.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{DEFAULT_HOUR_WHEN_UNSPECIFIED, LOCAL_DATETIME_FORMAT};

/// Kanji/half-width numeral class used by the relative-day patterns.
const JA_NUM: &str = "[0-9〇零一二三四五六七八九十]{1,3}";

/// One relative-day pattern in strict (anchored) and loose form, plus how
/// to read minutes out of a match.
struct RelativePattern {
    strict: Regex,
    loose: Regex,
    minutes: MinuteRule,
}

enum MinuteRule {
    /// Minutes captured in group 3.
    Captured,
    /// Trailing 半 means half past.
    HalfPast,
    /// No minute component.
    Zero,
}

#[allow(clippy::unwrap_used)] // pattern literals are compile-time constants
static RELATIVE_PATTERNS: Lazy<Vec<RelativePattern>> = Lazy::new(|| {
    let specs: Vec<(String, MinuteRule)> = vec![
        (
            format!(r"(今日|明日)\s*({JA_NUM})\s*:\s*({JA_NUM})"),
            MinuteRule::Captured,
        ),
        (
            format!(r"(今日|明日)\s*({JA_NUM})時\s*({JA_NUM})\s*分?"),
            MinuteRule::Captured,
        ),
        (format!(r"(今日|明日)\s*({JA_NUM})時半"), MinuteRule::HalfPast),
        (format!(r"(今日|明日)\s*({JA_NUM})時"), MinuteRule::Zero),
        (format!(r"(今日|明日)\s*({JA_NUM})(?-u:\b)"), MinuteRule::Zero),
    ];

    specs
        .into_iter()
        .map(|(body, minutes)| RelativePattern {
            strict: Regex::new(&format!("^{body}$")).unwrap(),
            loose: Regex::new(&body).unwrap(),
            minutes,
        })
        .collect()
});

#[allow(clippy::unwrap_used)] // pattern literal is a compile-time constant
static FULL_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})(?:[ T](\d{1,2})(?::(\d{1,2}))?(?::\d{1,2})?)?$")
        .unwrap()
});

#[allow(clippy::unwrap_used)] // pattern literal is a compile-time constant
static SHORT_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})-(\d{1,2})(?:[ T](\d{1,2})(?::(\d{1,2}))?(?::\d{1,2})?)?$").unwrap()
});

/// Fold full-width digits (０-９) into their ASCII equivalents.
pub(crate) fn to_half_width_digits(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '０'..='９' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Parse a numeric token that may use kanji numerals.
///
/// Supports positional tens composition: 十 = 10, 十九 = 19, 二十 = 20,
/// 二十三 = 23. Returns `None` for tokens containing anything else.
fn parse_ja_number_token(token: &str) -> Option<u32> {
    let normalized = to_half_width_digits(token.trim());
    if normalized.is_empty() {
        return None;
    }

    if normalized.chars().all(|c| c.is_ascii_digit()) {
        return normalized.parse().ok();
    }

    let digit = |c: char| -> Option<u32> {
        match c {
            '零' | '〇' => Some(0),
            '一' => Some(1),
            '二' => Some(2),
            '三' => Some(3),
            '四' => Some(4),
            '五' => Some(5),
            '六' => Some(6),
            '七' => Some(7),
            '八' => Some(8),
            '九' => Some(9),
            _ => None,
        }
    };

    let mut total = 0u32;
    let mut current = 0u32;
    for c in normalized.chars() {
        if c == '十' {
            total += if current == 0 { 10 } else { current * 10 };
            current = 0;
            continue;
        }
        current += digit(c)?;
    }

    Some(total + current)
}

/// Build a validated local datetime, rejecting out-of-range components and
/// invalid calendar dates instead of normalizing them.
fn validated_date(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}

fn relative_base(day_keyword: &str, now: NaiveDateTime) -> NaiveDateTime {
    if day_keyword == "明日" {
        now + Duration::days(1)
    } else {
        now
    }
}

fn resolve_relative(text: &str, now: NaiveDateTime, loose: bool) -> Option<String> {
    for pattern in RELATIVE_PATTERNS.iter() {
        let re = if loose { &pattern.loose } else { &pattern.strict };
        let Some(caps) = re.captures(text) else {
            continue;
        };

        let hour = parse_ja_number_token(caps.get(2)?.as_str())?;
        let minute = match pattern.minutes {
            MinuteRule::Captured => parse_ja_number_token(caps.get(3)?.as_str())?,
            MinuteRule::HalfPast => 30,
            MinuteRule::Zero => 0,
        };

        let base = relative_base(caps.get(1)?.as_str(), now).date();
        if let Some(resolved) = validated_date(base.year(), base.month(), base.day(), hour, minute)
        {
            return Some(format_local(resolved));
        }
    }

    None
}

/// Format a local datetime in the canonical `YYYY-MM-DDTHH:mm:ss` layout
/// with seconds zeroed.
pub fn format_local(datetime: NaiveDateTime) -> String {
    datetime
        .with_second(0)
        .unwrap_or(datetime)
        .format(LOCAL_DATETIME_FORMAT)
        .to_string()
}

/// Parse a flexible date/time expression into a canonical local timestamp.
///
/// Priority order: relative day expressions (今日/明日, strict then loose),
/// then absolute slash/dash dates with optional time, then the year-optional
/// short form anchored to `now`'s year. Returns `None` when nothing matches
/// or the resulting calendar date is invalid.
pub fn parse_flexible_datetime(input: &str, now: NaiveDateTime) -> Option<String> {
    let text = to_half_width_digits(input.trim());
    if text.is_empty() {
        return None;
    }

    // 今日/明日 first; stripping 日 beforehand would break the keywords.
    let relative_prepared = collapse_whitespace(&text.replace('：', ":"));
    if let Some(resolved) = resolve_relative(&relative_prepared, now, false) {
        return Some(resolved);
    }
    if let Some(resolved) = resolve_relative(&relative_prepared, now, true) {
        return Some(resolved);
    }

    let normalized = collapse_whitespace(
        &text
            .replace('：', ":")
            .replace('年', "-")
            .replace('月', "-")
            .replace('日', "")
            .replace('時', ":")
            .replace('分', "")
            .replace('/', "-"),
    );

    if let Some(caps) = FULL_DATE_RE.captures(&normalized) {
        let date = validated_date(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
            opt_component(caps.get(4), DEFAULT_HOUR_WHEN_UNSPECIFIED)?,
            opt_component(caps.get(5), 0)?,
        )?;
        return Some(format_local(date));
    }

    if let Some(caps) = SHORT_DATE_RE.captures(&normalized) {
        let date = validated_date(
            now.year(),
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            opt_component(caps.get(3), DEFAULT_HOUR_WHEN_UNSPECIFIED)?,
            opt_component(caps.get(4), 0)?,
        )?;
        return Some(format_local(date));
    }

    None
}

fn opt_component(capture: Option<regex::Match<'_>>, default: u32) -> Option<u32> {
    match capture {
        Some(m) => m.as_str().parse().ok(),
        None => Some(default),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Coerce a loosely formatted timestamp into a local datetime.
///
/// Accepts the canonical layout with `T` or space separators, minute-level
/// precision, bare dates, and RFC 3339 values (offset discarded, the local
/// wall-clock components are kept).
pub fn coerce_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    const LAYOUTS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for layout in LAYOUTS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, layout) {
            return Some(parsed);
        }
    }

    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_local());
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}

/// Add `minutes` to a canonical local timestamp.
pub fn add_minutes(local_datetime: &str, minutes: i64) -> Option<String> {
    let base = coerce_datetime(local_datetime)?;
    Some(format_local(base + Duration::minutes(minutes)))
}

/// Strict ordering check over two canonical local timestamps.
///
/// Returns `false` when either side fails to parse.
pub fn is_start_before_end(start: &str, end: &str) -> bool {
    match (coerce_datetime(start), coerce_datetime(end)) {
        (Some(start), Some(end)) => start < end,
        _ => false,
    }
}
