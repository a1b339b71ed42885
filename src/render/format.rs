use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::models::{Elapsed, NOT_AVAILABLE};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Formats a duration as `2m 30s`, `45s` or `N/A`.
///
/// Values that are not whole seconds are shown as they were received.
pub fn format_duration(duration: Option<&Elapsed>) -> String {
    match duration {
        None => NOT_AVAILABLE.to_string(),
        Some(Elapsed::Seconds(seconds)) => format_seconds(*seconds),
        Some(Elapsed::Text(text)) => text.clone(),
    }
}

pub fn format_seconds(seconds: i64) -> String {
    let minutes = seconds.div_euclid(60);
    if minutes > 0 {
        format!("{minutes}m {}s", seconds.rem_euclid(60))
    } else {
        format!("{seconds}s")
    }
}

/// Formats an ISO 8601 timestamp as `YYYY-MM-DD HH:MM` in its own offset.
///
/// Missing or empty input gives `N/A`; unparsable input is returned unchanged.
pub fn format_timestamp(timestamp: Option<&str>) -> String {
    let Some(raw) = timestamp.filter(|ts| !ts.trim().is_empty()) else {
        return NOT_AVAILABLE.to_string();
    };

    parse_timestamp(raw.trim()).map_or_else(
        || raw.to_string(),
        |parsed| parsed.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_local());
    }

    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(parsed.naive_local());
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Escapes text for inclusion in Confluence storage format.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
