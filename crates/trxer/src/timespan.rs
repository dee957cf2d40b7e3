//! Elapsed-time parsing and humanized display.
//!
//! TRX files record durations as .NET timespans (`00:00:01.2345678`);
//! some producers write ISO 8601 durations (`PT1.5S`) instead. Both parse
//! to a [`TimeDelta`], and [`humanize_millis`] renders whole milliseconds
//! in the largest fitting unit with two truncated decimals.

use crate::error::{Result, TrxerError};
use chrono::TimeDelta;
use once_cell::sync::Lazy;
use regex::Regex;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR as i64;

/// Ticks are 100ns, up to seven fraction digits
const FRACTION_DIGITS: usize = 7;
const TICKS_PER_MS: u64 = 10_000;

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-)?P(?:([0-9]+)W)?(?:([0-9]+)D)?(?:T(?:([0-9]+)H)?(?:([0-9]+)M)?(?:([0-9]+)(?:[.,]([0-9]+))?S)?)?$",
    )
    .expect("static regex")
});

/// Parse a .NET timespan or an ISO 8601 duration
pub fn parse_timespan(input: &str) -> Result<TimeDelta> {
    let text = input.trim();
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    if unsigned.starts_with('P') {
        parse_iso8601(text)
    } else {
        parse_dotnet(text)
    }
}

/// Render whole milliseconds as "N ms", "N.NN seconds", "N.NN minutes" or "N.NN hours"
pub fn humanize_millis(ms: i64) -> String {
    let sign = if ms < 0 { "-" } else { "" };
    let magnitude = ms.unsigned_abs();

    if magnitude < MS_PER_SECOND {
        format!("{sign}{magnitude} ms")
    } else if magnitude < MS_PER_MINUTE {
        format!("{sign}{} seconds", hundredths(magnitude, MS_PER_SECOND))
    } else if magnitude < MS_PER_HOUR {
        format!("{sign}{} minutes", hundredths(magnitude, MS_PER_MINUTE))
    } else {
        format!("{sign}{} hours", hundredths(magnitude, MS_PER_HOUR))
    }
}

/// `value / unit` with two decimals, truncated
fn hundredths(value: u64, unit: u64) -> String {
    let scaled = value / (unit / 100);
    format!("{}.{:02}", scaled / 100, scaled % 100)
}

fn parse_dotnet(text: &str) -> Result<TimeDelta> {
    let invalid = || TrxerError::format(format!("Invalid timespan '{text}'"));
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let millis = match body.find(':') {
        None => parse_number(body).ok_or_else(invalid)?.checked_mul(MS_PER_DAY),
        Some(first_colon) => {
            let (days, clock) = match body[..first_colon].find('.') {
                Some(dot) => (
                    parse_number(&body[..dot]).ok_or_else(invalid)?,
                    &body[dot + 1..],
                ),
                None => (0, body),
            };
            let clock_ms = parse_clock(clock).ok_or_else(invalid)?;
            days.checked_mul(MS_PER_DAY)
                .and_then(|d| d.checked_add(clock_ms))
        }
    }
    .ok_or_else(invalid)?;

    to_delta(if negative { -millis } else { millis }, text)
}

/// `hh:mm[:ss[.fffffff]]` in milliseconds
fn parse_clock(clock: &str) -> Option<i64> {
    let mut parts = clock.split(':');
    let hours = parse_number(parts.next()?)?;
    let minutes = parse_number(parts.next()?)?;
    let seconds_part = parts.next();
    if parts.next().is_some() || hours > 23 || minutes > 59 {
        return None;
    }

    let (seconds, fraction_ms) = match seconds_part {
        None => (0, 0),
        Some(part) => {
            let (whole, fraction) = match part.split_once('.') {
                Some((whole, fraction)) => (whole, Some(fraction)),
                None => (part, None),
            };
            let seconds = parse_number(whole)?;
            if seconds > 59 {
                return None;
            }
            let fraction_ms = match fraction {
                Some(digits) if digits.len() <= FRACTION_DIGITS => fraction_to_millis(digits)?,
                Some(_) => return None,
                None => 0,
            };
            (seconds, fraction_ms)
        }
    };

    Some(hours * MS_PER_HOUR as i64 + minutes * MS_PER_MINUTE as i64 + seconds * 1000 + fraction_ms)
}

fn parse_iso8601(text: &str) -> Result<TimeDelta> {
    let invalid = || TrxerError::format(format!("Invalid ISO 8601 duration '{text}'"));
    let caps = ISO_DURATION.captures(text).ok_or_else(invalid)?;
    if (2..=6).all(|i| caps.get(i).is_none()) || text.ends_with('T') {
        return Err(invalid());
    }

    let number = |index: usize| -> Result<i64> {
        caps.get(index)
            .map_or(Some(0), |m| parse_number(m.as_str()))
            .ok_or_else(invalid)
    };
    let fraction_ms = match caps.get(7) {
        Some(m) => {
            let digits: String = m.as_str().chars().take(FRACTION_DIGITS).collect();
            fraction_to_millis(&digits).ok_or_else(invalid)?
        }
        None => 0,
    };

    let units = [
        (number(2)?, 7 * MS_PER_DAY),
        (number(3)?, MS_PER_DAY),
        (number(4)?, MS_PER_HOUR as i64),
        (number(5)?, MS_PER_MINUTE as i64),
        (number(6)?, MS_PER_SECOND as i64),
    ];
    let millis = units
        .iter()
        .try_fold(fraction_ms, |total, (count, unit)| {
            count.checked_mul(*unit).and_then(|ms| total.checked_add(ms))
        })
        .ok_or_else(invalid)?;

    let negative = caps.get(1).is_some();
    to_delta(if negative { -millis } else { millis }, text)
}

fn parse_number(digits: &str) -> Option<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Fraction digits as whole milliseconds, sub-millisecond ticks dropped
fn fraction_to_millis(digits: &str) -> Option<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{digits:0<width$}", width = FRACTION_DIGITS);
    let ticks: u64 = padded.parse().ok()?;
    Some((ticks / TICKS_PER_MS) as i64)
}

fn to_delta(millis: i64, text: &str) -> Result<TimeDelta> {
    TimeDelta::try_milliseconds(millis)
        .ok_or_else(|| TrxerError::format(format!("Timespan out of range '{text}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ms(text: &str) -> i64 {
        parse_timespan(text).unwrap().num_milliseconds()
    }

    #[test]
    fn test_dotnet_forms() {
        assert_eq!(ms("00:00:00"), 0);
        assert_eq!(ms("00:00:01.5000000"), 1500);
        assert_eq!(ms("00:00:00.0009999"), 0);
        assert_eq!(ms("00:01:02.25"), 62_250);
        assert_eq!(ms("01:00"), 3_600_000);
        assert_eq!(ms("1.02:00:00"), 93_600_000);
        assert_eq!(ms("2"), 2 * 86_400_000);
        assert_eq!(ms("-00:00:02.5"), -2500);
        assert_eq!(ms("  00:00:03  "), 3000);
    }

    #[test]
    fn test_dotnet_rejects_out_of_range_fields() {
        for text in ["24:00:00", "00:60:00", "00:00:60", "00:00:00.12345678", "1:2:3:4", "abc", ""] {
            assert!(parse_timespan(text).is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn test_iso8601_forms() {
        assert_eq!(ms("PT0S"), 0);
        assert_eq!(ms("PT1.5S"), 1500);
        assert_eq!(ms("PT2M"), 120_000);
        assert_eq!(ms("PT1H30M"), 5_400_000);
        assert_eq!(ms("P1DT1S"), 86_401_000);
        assert_eq!(ms("P1W"), 7 * 86_400_000);
        assert_eq!(ms("-PT0.25S"), -250);
    }

    #[test]
    fn test_fraction_digits_must_be_ascii() {
        for text in ["00:00:01.+5", "00:00:01.-5", "00:00:01.\u{0661}", "PT1.\u{0661}\u{0661}\u{0661}\u{0661}\u{0661}\u{0661}\u{0661}\u{0661}S", "PT\u{0661}S"] {
            assert!(
                matches!(parse_timespan(text), Err(TrxerError::FormatError { .. })),
                "{text} should be rejected"
            );
        }
        assert_eq!(ms("PT1.123456789S"), 1123);
    }

    #[test]
    fn test_iso8601_rejects_empty_or_calendar_units() {
        for text in ["P", "PT", "P1Y", "P1M", "PT1.S"] {
            assert!(parse_timespan(text).is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn test_humanize_bands() {
        assert_eq!(humanize_millis(0), "0 ms");
        assert_eq!(humanize_millis(999), "999 ms");
        assert_eq!(humanize_millis(1000), "1.00 seconds");
        assert_eq!(humanize_millis(1500), "1.50 seconds");
        assert_eq!(humanize_millis(59_999), "59.99 seconds");
        assert_eq!(humanize_millis(60_000), "1.00 minutes");
        assert_eq!(humanize_millis(90_000), "1.50 minutes");
        assert_eq!(humanize_millis(3_599_999), "59.99 minutes");
        assert_eq!(humanize_millis(3_600_000), "1.00 hours");
        assert_eq!(humanize_millis(90_000_000), "25.00 hours");
    }

    #[test]
    fn test_humanize_negative_is_signed() {
        assert_eq!(humanize_millis(-2500), "-2.50 seconds");
        assert_eq!(humanize_millis(-5), "-5 ms");
    }
}
