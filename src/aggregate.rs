//! Pure operations over a habit's date-indexed log.
//!
//! Every function borrows the input log and returns a new one; callers swap
//! the result in, so a failed action never leaves a half-edited log behind.

use crate::models::{HabitLog, LogEntry};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UpsertMode {
    /// Add to the value already logged for the date.
    #[default]
    Accumulate,
    /// Overwrite the value logged for the date.
    Replace,
}

pub fn upsert(log: &HabitLog, date: NaiveDate, value: u64, mode: UpsertMode) -> HabitLog {
    let mut next = log.clone();
    let merged = match (mode, next.get(&date)) {
        (UpsertMode::Accumulate, Some(existing)) => existing.saturating_add(value),
        _ => value,
    };
    next.insert(date, merged);
    next
}

pub fn remove(log: &HabitLog, date: NaiveDate) -> HabitLog {
    let mut next = log.clone();
    next.remove(&date);
    next
}

/// Rewrites the entry at `original` as `(date, value)`, moving it when the
/// date changed. Returns `None` when there is no entry at `original`.
pub fn edit_entry(
    log: &HabitLog,
    original: NaiveDate,
    date: NaiveDate,
    value: u64,
) -> Option<HabitLog> {
    if !log.contains_key(&original) {
        return None;
    }
    let without = remove(log, original);
    Some(upsert(&without, date, value, UpsertMode::Replace))
}

/// Entries newest first, keeping those whose ISO date contains `search`.
pub fn history(log: &HabitLog, search: &str) -> Vec<LogEntry> {
    let search = search.trim();
    log.iter()
        .rev()
        .filter(|(date, _)| search.is_empty() || date.to_string().contains(search))
        .map(|(date, value)| LogEntry {
            date: *date,
            value: *value,
        })
        .collect()
}

pub fn total(log: &HabitLog) -> u64 {
    log.values().fold(0u64, |acc, value| acc.saturating_add(*value))
}

/// Coerces a user-entered quantity: fractional input is truncated,
/// negative or unparsable input counts as zero, and the result is at least 1.
pub fn coerce_entry_value(raw: &serde_json::Value) -> u64 {
    let parsed = match raw {
        serde_json::Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|v| *v >= 0.0).map(|v| v.trunc() as u64)),
        serde_json::Value::String(text) => parse_leading_int(text).map(clamp_non_negative),
        _ => None,
    };
    parsed.unwrap_or(0).max(1)
}

/// Parses a form field the way number inputs are read: leading digits only,
/// zero when nothing parses.
pub fn parse_form_number(text: &str) -> u64 {
    parse_leading_int(text).map(clamp_non_negative).unwrap_or(0)
}

/// Whole minutes for a timer-driven log, rounding any started minute up.
pub fn elapsed_minutes(elapsed_secs: u64) -> u64 {
    elapsed_secs.div_ceil(60)
}

fn clamp_non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}
