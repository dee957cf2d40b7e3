//! Formatting helpers exposed to report templates.
//!
//! Each function is pure apart from [`current_timestamp`], which reads the
//! clock. Template-facing names are bound in [`crate::functions`].

use crate::error::{Result, TrxerError};
use crate::timespan::{humanize_millis, parse_timespan};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

/// Display format for every rendered date-time
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

static IMAGE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)['"][^\s]+\.(?:jpg|png|gif|bmp)['"]"#).expect("static regex"));

/// `"Namespace.Type, Assembly"` → `"Namespace.Type"`
pub fn strip_type_qualifier(full_name: &str) -> &str {
    match full_name.split_once(',') {
        Some((type_name, _)) => type_name,
        None => full_name,
    }
}

/// `"Namespace.Type, Assembly"` → `"Assembly"`.
///
/// Skips the comma and the character after it. Without a comma the input
/// comes back unchanged.
pub fn strip_assembly_qualifier(full_name: &str) -> &str {
    let Some(comma) = full_name.find(',') else {
        return full_name;
    };
    let mut rest = full_name[comma + 1..].chars();
    rest.next();
    rest.as_str()
}

/// Parse a timestamp into the local zone.
///
/// Offset-bearing input is converted; naive input is taken as local time.
pub fn parse_date_time(input: &str) -> Result<DateTime<Local>> {
    let text = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Local));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Ok(dt.with_timezone(&Local));
        }
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| TrxerError::format(format!("Invalid date-time '{text}'")))?;

    // Wall-clock times skipped by a DST change have no local mapping; read them as UTC.
    Ok(Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive)))
}

/// Local `YYYY-MM-DD HH:MM:SS`, or "" for empty input
pub fn format_date_time(input: &str) -> Result<String> {
    if input.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(parse_date_time(input)?.format(DISPLAY_FORMAT).to_string())
}

/// Humanized form of a timespan such as `00:00:01.5000000`, or "" for empty input
pub fn humanize_duration(input: &str) -> Result<String> {
    if input.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(humanize_millis(parse_timespan(input)?.num_milliseconds()))
}

/// Humanized time elapsed from `start` to `end`
pub fn humanize_interval(start: &str, end: &str) -> Result<String> {
    let elapsed = parse_date_time(end)? - parse_date_time(start)?;
    Ok(humanize_millis(elapsed.num_milliseconds()))
}

pub fn current_timestamp() -> String {
    Local::now().format(DISPLAY_FORMAT).to_string()
}

/// First quoted image path in free text, unquoted with backslashes doubled
pub fn extract_image_url(text: &str) -> String {
    IMAGE_URL
        .find(text)
        .map(|m| {
            m.as_str()
                .chars()
                .filter(|c| *c != '\'' && *c != '"')
                .collect::<String>()
                .replace('\\', "\\\\")
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_strip_type_qualifier() {
        assert_eq!(strip_type_qualifier("Ns.Type, Asm"), "Ns.Type");
        assert_eq!(strip_type_qualifier("Ns.Type"), "Ns.Type");
        assert_eq!(strip_type_qualifier(""), "");
    }

    #[test]
    fn test_strip_assembly_qualifier() {
        assert_eq!(strip_assembly_qualifier("Ns.Type, Asm"), "Asm");
        assert_eq!(strip_assembly_qualifier("Ns.Type,"), "");
        assert_eq!(strip_assembly_qualifier("Ns.Type"), "Ns.Type");
        assert_eq!(strip_assembly_qualifier("T,éAsm"), "Asm");
    }

    #[test]
    fn test_format_date_time_naive_is_local() {
        assert_eq!(
            format_date_time("2024-03-05T14:07:09.1234567").unwrap(),
            "2024-03-05 14:07:09"
        );
        assert_eq!(
            format_date_time("2024-03-05 14:07").unwrap(),
            "2024-03-05 14:07:00"
        );
        assert_eq!(format_date_time("2024-03-05").unwrap(), "2024-03-05 00:00:00");
        assert_eq!(format_date_time("").unwrap(), "");
    }

    #[test]
    fn test_format_date_time_with_offset_matches_local_conversion() {
        let input = "2024-03-05T14:07:09.5+02:00";
        let expected = DateTime::parse_from_rfc3339(input)
            .unwrap()
            .with_timezone(&Local)
            .format(DISPLAY_FORMAT)
            .to_string();
        assert_eq!(format_date_time(input).unwrap(), expected);
    }

    #[test]
    fn test_format_date_time_rejects_garbage() {
        assert!(matches!(
            format_date_time("yesterday"),
            Err(TrxerError::FormatError { .. })
        ));
    }

    #[test]
    fn test_humanize_duration() {
        assert_eq!(humanize_duration("00:00:00.0500000").unwrap(), "50 ms");
        assert_eq!(humanize_duration("00:00:02.5000000").unwrap(), "2.50 seconds");
        assert_eq!(humanize_duration("PT90S").unwrap(), "1.50 minutes");
        assert_eq!(humanize_duration("").unwrap(), "");
        assert!(humanize_duration("soon").is_err());
    }

    #[test]
    fn test_humanize_interval() {
        assert_eq!(
            humanize_interval("2024-01-01T10:00:00Z", "2024-01-01T10:00:02.5Z").unwrap(),
            "2.50 seconds"
        );
        assert_eq!(
            humanize_interval("2024-01-01T10:00:00+01:00", "2024-01-01T09:30:00Z").unwrap(),
            "30.00 minutes"
        );
        assert_eq!(
            humanize_interval("2024-01-01T10:00:02.5Z", "2024-01-01T10:00:00Z").unwrap(),
            "-2.50 seconds"
        );
        assert!(humanize_interval("", "2024-01-01T10:00:00Z").is_err());
    }

    #[test]
    fn test_current_timestamp_shape() {
        let now = current_timestamp();
        assert!(NaiveDateTime::parse_from_str(&now, DISPLAY_FORMAT).is_ok());
    }

    #[test]
    fn test_extract_image_url() {
        assert_eq!(
            extract_image_url("Screenshot saved to 'C:\\shots\\login.PNG' after failure"),
            "C:\\\\shots\\\\login.PNG"
        );
        assert_eq!(
            extract_image_url("see \"out/a.gif\" and 'b.png'"),
            "out/a.gif"
        );
        assert_eq!(extract_image_url("no pictures here"), "");
        assert_eq!(extract_image_url("'a b.png'"), "");
    }
}
