//! Prometheus-style duration parsing and formatting.
//!
//! The grammar is the one rule files use: one or more `<int><unit>` pairs
//! with strictly descending units, from `y` (365 days) down to `ms`.
//! Formatting factorizes greedily but emits `y` and `w` only when the
//! remainder divides exactly, so a 30-day period renders as `30d` rather
//! than `4w2d`.

use crate::error::DurationError;
use std::time::Duration;

/// Unit table in descending order. Values are milliseconds.
const UNITS: &[(&str, u64)] = &[
    ("y", 365 * 24 * 60 * 60 * 1000),
    ("w", 7 * 24 * 60 * 60 * 1000),
    ("d", 24 * 60 * 60 * 1000),
    ("h", 60 * 60 * 1000),
    ("m", 60 * 1000),
    ("s", 1000),
    ("ms", 1),
];

/// Parses a Prometheus duration string such as `"5m"` or `"1h30m"`.
///
/// # Errors
///
/// Fails on an empty string, a missing or unknown unit, units out of
/// order, or a value that overflows.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use oxslo_core::duration::parse_duration;
///
/// assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
/// assert!(parse_duration("30").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let err = |reason: &str| DurationError {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if input.is_empty() {
        return Err(err("empty duration"));
    }

    let mut rest = input;
    let mut total_ms: u64 = 0;
    let mut prev_unit: Option<usize> = None;

    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(err("expected a number"));
        }
        let (digits, tail) = rest.split_at(digits_end);
        let value: u64 = digits.parse().map_err(|_| err("number too large"))?;

        // "ms" before "m", longest unit first
        let (unit_idx, unit_len) = if tail.starts_with("ms") {
            (UNITS.len() - 1, 2)
        } else {
            let idx = match tail.as_bytes().first() {
                Some(b'y') => 0,
                Some(b'w') => 1,
                Some(b'd') => 2,
                Some(b'h') => 3,
                Some(b'm') => 4,
                Some(b's') => 5,
                _ => return Err(err("expected a unit (y, w, d, h, m, s, ms)")),
            };
            (idx, 1)
        };

        if let Some(prev) = prev_unit {
            if unit_idx <= prev {
                return Err(err("units must appear once each, largest first"));
            }
        }
        prev_unit = Some(unit_idx);

        total_ms = value
            .checked_mul(UNITS[unit_idx].1)
            .and_then(|v| total_ms.checked_add(v))
            .ok_or_else(|| err("duration overflows"))?;

        rest = &tail[unit_len..];
    }

    Ok(Duration::from_millis(total_ms))
}

/// Formats a duration in Prometheus notation; the inverse of
/// [`parse_duration`] for millisecond-precision values.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use oxslo_core::duration::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(300)), "5m");
/// assert_eq!(format_duration(Duration::from_secs(30 * 24 * 60 * 60)), "30d");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let mut ms = duration.as_millis() as u64;
    if ms == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    for (name, unit_ms) in UNITS {
        // years and weeks only when exact: 90d reads better than 12w6d
        if (*name == "y" || *name == "w") && ms % unit_ms != 0 {
            continue;
        }
        let value = ms / unit_ms;
        if value > 0 {
            out.push_str(&format!("{value}{name}"));
            ms -= value * unit_ms;
        }
    }
    out
}
