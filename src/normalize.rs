//! Scalar normalizers shared by every extractor
//!
//! None of these functions fail: an unparsable timestamp is `None`, an
//! unparsable duration or size is `0`, a bogus phone number is `None`. One bad
//! field must never discard an otherwise valid record.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;

/// Epoch values at or above this are milliseconds, below it seconds
pub const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

/// Minimum digit count for a cleaned phone number
pub const MIN_PHONE_DIGITS: usize = 7;

/// Absolute datetime formats tried in order; first successful parse wins.
/// All are interpreted as UTC.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%Y%m%d%H%M%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

/// Binary multipliers, longest suffix first so "KB" is not read as "B"
const SIZE_SUFFIXES: &[(&str, u64)] = &[
    ("KIB", 1024),
    ("MIB", 1024 * 1024),
    ("GIB", 1024 * 1024 * 1024),
    ("KB", 1024),
    ("MB", 1024 * 1024),
    ("GB", 1024 * 1024 * 1024),
    ("B", 1),
];

fn phone_like_regex() -> &'static Regex {
    static PHONE_LIKE: OnceLock<Regex> = OnceLock::new();
    PHONE_LIKE.get_or_init(|| {
        Regex::new(r"^\+?[\d\s().\-/]{5,}$").expect("Invalid phone-like regex")
    })
}

// =============================================================================
// Text
// =============================================================================

/// Render a scalar JSON value as trimmed, non-empty text
pub fn value_to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Interpret a deleted/flag-like value
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "t" | "1" | "yes" | "y" | "deleted"
        ),
        _ => false,
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// Coerce a JSON scalar into an absolute UTC timestamp
pub fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(epoch_to_datetime),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

/// Convert an epoch value, seconds or milliseconds by magnitude
pub fn epoch_to_datetime(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() || epoch <= 0.0 {
        return None;
    }
    if epoch >= EPOCH_MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(epoch as i64)
    } else {
        let secs = epoch.trunc() as i64;
        let nanos = ((epoch - epoch.trunc()) * 1e9).round() as u32;
        DateTime::from_timestamp(secs, nanos.min(999_999_999))
    }
}

/// Parse a textual timestamp: epoch digits, RFC 3339, then the format list
pub fn parse_timestamp_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        // 14 digits is far more likely YYYYMMDDHHMMSS than a year-2600 epoch
        if s.len() == 14 {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y%m%d%H%M%S") {
                return Some(naive.and_utc());
            }
        }
        return s.parse::<f64>().ok().and_then(epoch_to_datetime);
    }

    if is_decimal_number(s) {
        return s.parse::<f64>().ok().and_then(epoch_to_datetime);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

fn is_decimal_number(s: &str) -> bool {
    let mut parts = s.splitn(2, '.');
    let int = parts.next().unwrap_or("");
    let frac = parts.next().unwrap_or("");
    !int.is_empty()
        && !frac.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

// =============================================================================
// Durations and sizes
// =============================================================================

/// Coerce a call duration into whole seconds
pub fn coerce_duration(value: &Value) -> u64 {
    match value {
        Value::Number(n) => non_negative(n.as_f64()),
        Value::String(s) => parse_duration_str(s),
        _ => 0,
    }
}

/// Parse `SS`, `MM:SS` or `HH:MM:SS`
pub fn parse_duration_str(raw: &str) -> u64 {
    let s = raw.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return secs;
    }
    if let Ok(secs) = s.parse::<f64>() {
        return non_negative(Some(secs));
    }

    let parts: Option<Vec<u64>> = s.split(':').map(|p| p.trim().parse::<u64>().ok()).collect();
    let seconds = match parts.as_deref() {
        Some([m, sec]) => clock_seconds(0, *m, *sec),
        Some([h, m, sec]) => clock_seconds(*h, *m, *sec),
        _ => None,
    };
    seconds.unwrap_or(0)
}

/// `h:m:s` in seconds, None on overflow
fn clock_seconds(h: u64, m: u64, sec: u64) -> Option<u64> {
    h.checked_mul(3600)?.checked_add(m.checked_mul(60)?)?.checked_add(sec)
}

/// Coerce a file size into bytes
pub fn coerce_file_size(value: &Value) -> u64 {
    match value {
        Value::Number(n) => non_negative(n.as_f64()),
        Value::String(s) => parse_file_size_str(s),
        _ => 0,
    }
}

/// Parse plain byte counts or `B`/`KB`/`MB`/`GB` suffixed sizes
pub fn parse_file_size_str(raw: &str) -> u64 {
    let s = raw.trim().to_uppercase();
    if let Ok(bytes) = s.parse::<u64>() {
        return bytes;
    }

    for (suffix, multiplier) in SIZE_SUFFIXES {
        if let Some(number) = s.strip_suffix(suffix) {
            if let Ok(value) = number.trim().parse::<f64>() {
                return non_negative(Some(value * *multiplier as f64));
            }
        }
    }

    s.parse::<f64>().map(|v| non_negative(Some(v))).unwrap_or(0)
}

fn non_negative(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.trunc() as u64,
        _ => 0,
    }
}

// =============================================================================
// Phone numbers
// =============================================================================

/// Whether a value reads like a phone number rather than a handle/JID/email
pub fn looks_like_phone(raw: &str) -> bool {
    phone_like_regex().is_match(raw.trim())
}

/// Standardize a phone number
///
/// Keeps digits and a leading `+`, turns an international `00` prefix into
/// `+`, drops one national trunk `0`, and rejects anything under
/// [`MIN_PHONE_DIGITS`] digits.
pub fn clean_phone_number(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let mut international = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    let digits = if !international && digits.starts_with("00") {
        international = true;
        &digits[2..]
    } else if !international && digits.starts_with('0') {
        &digits[1..]
    } else {
        &digits[..]
    };

    if digits.len() < MIN_PHONE_DIGITS {
        return None;
    }

    Some(if international { format!("+{}", digits) } else { digits.to_string() })
}
