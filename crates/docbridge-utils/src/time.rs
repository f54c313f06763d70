//! Relative-time phrases ("in 2 days", "3 hours ago", "now") resolved
//! against a caller-supplied reference instant.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

const SECONDS_PER_YEAR: i64 = 365 * 24 * 60 * 60;
const SECONDS_PER_WEEK: i64 = 7 * 24 * 60 * 60;
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;
const SECONDS_PER_HOUR: i64 = 60 * 60;
const SECONDS_PER_MINUTE: i64 = 60;

///
/// Tense
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tense {
    Future,
    Past,
    Present,
}

///
/// RelativeTime
///
/// Successful parse: the absolute instant plus the direction it was
/// resolved in.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RelativeTime {
    pub tense: Tense,
    pub date: DateTime<Utc>,
}

///
/// RelativeTimeError
///
/// Display text is the user-facing diagnostic and is surfaced verbatim by
/// callers.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum RelativeTimeError {
    #[error("Time should either start with 'in' or end with 'ago'")]
    MissingDirection,

    #[error("Time cannot have both 'in' and 'ago'")]
    ConflictingDirection,

    #[error("Invalid time string. Dangling unit or number.")]
    DanglingToken,

    #[error("'{0}' is not an integer.")]
    NotAnInteger(String),

    #[error("Invalid interval: '{0}'")]
    InvalidInterval(String),

    #[error("Time offset is out of range.")]
    OutOfRange,
}

/// Resolve a relative-time phrase against `now`.
///
/// Grammar: an optional leading `in` (future) or a trailing `ago` (past),
/// never both, or the bare literal `now`. The body is a sequence of
/// `<integer> <unit>` pairs. Matching is case-insensitive and tolerates
/// repeated spaces.
pub fn relative_time_to_date(
    text: &str,
    now: DateTime<Utc>,
) -> Result<RelativeTime, RelativeTimeError> {
    let text = text.to_lowercase();
    let mut parts: Vec<&str> = text.split(' ').filter(|part| !part.is_empty()).collect();

    let is_now = text == "now";
    let future = parts.first() == Some(&"in");
    let past = parts.last() == Some(&"ago");

    if !future && !past && !is_now {
        return Err(RelativeTimeError::MissingDirection);
    }
    if future && past {
        return Err(RelativeTimeError::ConflictingDirection);
    }

    if future {
        parts.remove(0);
    } else {
        parts.pop();
    }

    if parts.len() % 2 != 0 && !is_now {
        return Err(RelativeTimeError::DanglingToken);
    }

    let mut seconds: i64 = 0;
    for pair in parts.chunks(2) {
        let [count, interval] = pair else {
            return Err(RelativeTimeError::DanglingToken);
        };

        let count = parse_integer(count)?;
        let unit = unit_seconds(interval)
            .ok_or_else(|| RelativeTimeError::InvalidInterval((*interval).to_string()))?;

        seconds = count
            .checked_mul(unit)
            .and_then(|delta| seconds.checked_add(delta))
            .ok_or(RelativeTimeError::OutOfRange)?;
    }

    let offset = Duration::try_seconds(seconds).ok_or(RelativeTimeError::OutOfRange)?;

    let (tense, date) = if future {
        (Tense::Future, now.checked_add_signed(offset))
    } else if past {
        (Tense::Past, now.checked_sub_signed(offset))
    } else {
        (Tense::Present, Some(now))
    };

    let date = date.ok_or(RelativeTimeError::OutOfRange)?;

    Ok(RelativeTime { tense, date })
}

// Integral spellings such as "2" or "2.0" are accepted; anything with a
// fractional part or that is not numeric is rejected.
#[allow(clippy::cast_possible_truncation)]
fn parse_integer(token: &str) -> Result<i64, RelativeTimeError> {
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value);
    }

    match token.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 && value.abs() < 9.0e15 => {
            Ok(value as i64)
        }
        _ => Err(RelativeTimeError::NotAnInteger(token.to_string())),
    }
}

fn unit_seconds(interval: &str) -> Option<i64> {
    let seconds = match interval {
        "yr" | "yrs" | "year" | "years" => SECONDS_PER_YEAR,
        "wk" | "wks" | "week" | "weeks" => SECONDS_PER_WEEK,
        "d" | "day" | "days" => SECONDS_PER_DAY,
        "hr" | "hrs" | "hour" | "hours" => SECONDS_PER_HOUR,
        "min" | "mins" | "minute" | "minutes" => SECONDS_PER_MINUTE,
        "sec" | "secs" | "second" | "seconds" => 1,
        _ => return None,
    };

    Some(seconds)
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 10, 31, 12, 0, 0)
            .single()
            .expect("valid reference instant")
    }

    #[test]
    fn past_phrase_subtracts_offset() {
        let parsed = relative_time_to_date("1 day ago", reference()).expect("parse");

        assert_eq!(parsed.tense, Tense::Past);
        assert_eq!(parsed.date, reference() - Duration::seconds(86_400));
    }

    #[test]
    fn future_phrase_adds_every_pair() {
        let parsed = relative_time_to_date("in 1 year 2 weeks 3 hrs 4 mins 5 secs", reference())
            .expect("parse");

        let expected = 31_536_000 + 2 * 604_800 + 3 * 3_600 + 4 * 60 + 5;
        assert_eq!(parsed.tense, Tense::Future);
        assert_eq!(parsed.date, reference() + Duration::seconds(expected));
    }

    #[test]
    fn now_resolves_to_reference() {
        let parsed = relative_time_to_date("NOW", reference()).expect("parse");

        assert_eq!(parsed.tense, Tense::Present);
        assert_eq!(parsed.date, reference());
    }

    #[test]
    fn extra_whitespace_is_ignored() {
        let parsed = relative_time_to_date("  in   12   d ", reference()).expect("parse");

        assert_eq!(parsed.date, reference() + Duration::days(12));
    }

    #[test]
    fn direction_is_required() {
        assert_eq!(
            relative_time_to_date("12 days", reference()),
            Err(RelativeTimeError::MissingDirection)
        );
        assert_eq!(
            relative_time_to_date("in 12 days ago", reference()),
            Err(RelativeTimeError::ConflictingDirection)
        );
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        assert_eq!(
            relative_time_to_date("in 1 day 2", reference()),
            Err(RelativeTimeError::DanglingToken)
        );
        assert_eq!(
            relative_time_to_date("in 1.5 days", reference()),
            Err(RelativeTimeError::NotAnInteger("1.5".to_string()))
        );
        assert_eq!(
            relative_time_to_date("in 1 fortnight", reference()),
            Err(RelativeTimeError::InvalidInterval("fortnight".to_string()))
        );
    }

    #[test]
    fn diagnostic_text_is_stable() {
        let err = relative_time_to_date("in 1 fortnight", reference()).expect_err("bad unit");

        assert_eq!(err.to_string(), "Invalid interval: 'fortnight'");
    }
}
