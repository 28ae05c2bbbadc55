//! Cell formatters shared by every table. The format descriptions are compiled
//! once and only read afterwards.

use chrono::{
    NaiveDate, NaiveDateTime,
    format::{Item, StrftimeItems},
};
use lazy_static::lazy_static;
use serde_json::Value;

pub const MISSING: &str = "—";

lazy_static! {
    static ref DATE_ITEMS: Vec<Item<'static>> = StrftimeItems::new("%d/%m/%Y").collect();
    static ref DATETIME_ITEMS: Vec<Item<'static>> = StrftimeItems::new("%d/%m/%Y %H:%M").collect();
}

const DATETIME_INPUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Visual emphasis for a rendered cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Muted,
    Success,
    Alert,
    Neutral,
    Caution,
    Warning,
    Critical,
}

pub fn format_date(value: Option<&Value>) -> String {
    let Some(text) = value.and_then(Value::as_str) else {
        return MISSING.to_string();
    };
    parse_date(text)
        .map(|date| date.format_with_items(DATE_ITEMS.iter()).to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

pub fn format_datetime(value: Option<&Value>) -> String {
    let Some(text) = value.and_then(Value::as_str) else {
        return MISSING.to_string();
    };
    parse_datetime(text)
        .map(|moment| moment.format_with_items(DATETIME_ITEMS.iter()).to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Whole number with `.` as the thousands separator.
pub fn format_integer(value: Option<&Value>) -> String {
    let number = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) if !text.trim().is_empty() => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    let Some(number) = number.filter(|n| n.is_finite()) else {
        return MISSING.to_string();
    };
    let rounded = number.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn status_tone(value: Option<&str>) -> Tone {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Tone::Neutral;
    };
    let normalized = value.to_lowercase();
    if normalized.contains("sim") || normalized.contains("concl") {
        Tone::Success
    } else if normalized.contains("não") || normalized.contains("pend") {
        Tone::Alert
    } else {
        Tone::Neutral
    }
}

pub fn severity_tone(grade: Option<f64>) -> Tone {
    match grade {
        Some(g) if g >= 8.0 => Tone::Critical,
        Some(g) if g >= 5.0 => Tone::Warning,
        Some(g) if g >= 3.0 => Tone::Caution,
        _ => Tone::Neutral,
    }
}

pub fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(text).map(|moment| moment.date()))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    // Offsets are dropped; the backend stores naive timestamps.
    let text = text
        .strip_suffix('Z')
        .or_else(|| strip_offset(text))
        .unwrap_or(text);
    DATETIME_INPUTS
        .iter()
        .find_map(|pattern| NaiveDateTime::parse_from_str(text, pattern).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn strip_offset(text: &str) -> Option<&str> {
    let idx = text.len().checked_sub(6)?;
    if !text.is_char_boundary(idx) {
        return None;
    }
    let (head, tail) = text.split_at(idx);
    let bytes = tail.as_bytes();
    let is_offset = (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' && head.contains('T');
    is_offset.then_some(head)
}
