//! Text encoding for activity durations.
//!
//! Durations are stored and exported as `H:MM:SS`, with a `.ffffff` suffix
//! when there is a sub-second part and an `N day(s), ` prefix when the value
//! spans more than a day. The front end parses exactly this shape.
//!
//! Older databases stored intervals as an offset from the Unix epoch
//! (`1970-01-01 00:44:10.000000`); [`parse_duration`] accepts that form too.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Deserializer, Serializer};

const MICROS_PER_SECOND: i64 = 1_000_000;
const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

const LEGACY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Error returned when a duration string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration: {0:?}")]
pub struct ParseDurationError(pub String);

/// Formats a duration as `[N day(s), ]H:MM:SS[.ffffff]`.
///
/// Negative values borrow whole days, so `-1s` renders as
/// `-1 day, 23:59:59`.
pub fn format_duration(delta: TimeDelta) -> String {
    let micros = delta.num_microseconds().unwrap_or(i64::MAX);
    let days = micros.div_euclid(MICROS_PER_DAY);
    let rem = micros.rem_euclid(MICROS_PER_DAY);

    let total_secs = rem / MICROS_PER_SECOND;
    let frac = rem % MICROS_PER_SECOND;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if days != 0 {
        let unit = if days.abs() == 1 { "day" } else { "days" };
        out.push_str(&format!("{days} {unit}, "));
    }
    out.push_str(&format!("{hours}:{minutes:02}:{seconds:02}"));
    if frac != 0 {
        out.push_str(&format!(".{frac:06}"));
    }
    out
}

/// Parses a duration written by [`format_duration`] or by the legacy
/// epoch-offset encoding.
pub fn parse_duration(text: &str) -> Result<TimeDelta, ParseDurationError> {
    let text = text.trim();
    let invalid = || ParseDurationError(text.to_string());

    if let Ok(at) = NaiveDateTime::parse_from_str(text, LEGACY_FORMAT) {
        return Ok(TimeDelta::microseconds(at.and_utc().timestamp_micros()));
    }

    let (days, clock) = match text.split_once(", ") {
        Some((day_part, clock)) => {
            let count = day_part
                .strip_suffix(" days")
                .or_else(|| day_part.strip_suffix(" day"))
                .ok_or_else(invalid)?;
            (count.parse::<i64>().map_err(|_| invalid())?, clock)
        }
        None => (0, text),
    };

    let mut parts = clock.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let hours: i64 = h.parse().map_err(|_| invalid())?;
    let minutes: i64 = m.parse().map_err(|_| invalid())?;
    let (whole, frac) = match s.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (s, ""),
    };
    let seconds: i64 = whole.parse().map_err(|_| invalid())?;
    if hours < 0 || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return Err(invalid());
    }

    let micros = if frac.is_empty() {
        0
    } else {
        if frac.len() > 6 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        // Right-pad to microsecond precision: ".5" is 500000us.
        format!("{frac:0<6}").parse::<i64>().map_err(|_| invalid())?
    };

    // Any i64 microsecond count fits in a TimeDelta, so overflow here is the
    // only range check needed.
    let clock_secs = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .ok_or_else(invalid)?;
    let total = days
        .checked_mul(MICROS_PER_DAY)
        .and_then(|d| d.checked_add(clock_secs.checked_mul(MICROS_PER_SECOND)?))
        .and_then(|t| t.checked_add(micros))
        .ok_or_else(invalid)?;
    Ok(TimeDelta::microseconds(total))
}

/// Serializes a duration in the text format.
pub fn serialize_text<S>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*delta))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Seconds(f64),
    Text(String),
}

/// Deserializes a duration given either as a number of seconds or as text.
///
/// Upstream providers disagree here: Strava reports integer seconds, while
/// re-exported running_page data carries the text form.
pub fn deserialize_flexible<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
where
    D: Deserializer<'de>,
{
    match DurationRepr::deserialize(deserializer)? {
        DurationRepr::Seconds(secs) if secs.is_finite() => Ok(TimeDelta::microseconds(
            (secs * MICROS_PER_SECOND as f64).round() as i64,
        )),
        DurationRepr::Seconds(secs) => Err(serde::de::Error::custom(format!(
            "duration seconds must be finite, got {secs}"
        ))),
        DurationRepr::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
