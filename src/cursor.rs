// src/cursor.rs
//
// Cursor-based incremental extraction. The stored cursor is an opaque
// string; for comparison both it and each item's cursor field are coerced
// to a number first, then to a timestamp.

use chrono::{NaiveDate, NaiveDateTime};
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::item::Item;

/// Coerces a raw cursor to a comparable value: numeric parse first, then a
/// timestamp in the common feed formats. `None` when nothing matches.
pub fn parse(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return Some(f as i64);
        }
    }
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(parsed.unix_timestamp());
    }
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc2822) {
        return Some(parsed.unix_timestamp());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc().timestamp());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(parsed.and_hms_opt(0, 0, 0)?.and_utc().timestamp());
    }
    None
}

/// Filters a transformed batch against the stored cursor and computes the
/// next cursor value.
///
/// An item is retained iff it has no cursor field, there is no stored
/// cursor, or its parsed cursor is strictly greater than the stored one. An
/// item whose cursor fails to parse while a stored cursor exists is dropped.
/// Extraction order is preserved, and the cursor advances to the raw cursor
/// of the *last retained item* — last seen, not max seen.
pub fn filter(items: Vec<Item>, stored: Option<&str>) -> (Vec<Item>, Option<String>) {
    let watermark = stored.and_then(parse);

    let kept: Vec<Item> = match watermark {
        None => items,
        Some(watermark) => items
            .into_iter()
            .filter(|item| match item.cursor.as_deref() {
                None => true,
                Some(raw) => parse(raw).is_some_and(|cursor| cursor > watermark),
            })
            .collect(),
    };

    let next = kept
        .last()
        .and_then(|item| item.cursor.clone())
        .filter(|cursor| !cursor.trim().is_empty());

    (kept, next)
}
