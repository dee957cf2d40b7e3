//! Extension functions callable from report templates.

use crate::error::{Result, TrxerError};
use crate::helpers;

/// Functions a template may call as `{[ name(arg, ...) ]}`.
///
/// The renderer checks [`arity`](ExtensionFunctions::arity) before calling,
/// so an implementation only sees known names with the right number of
/// arguments.
pub trait ExtensionFunctions {
    /// Number of arguments `name` takes, or `None` if it is not a known function
    fn arity(&self, name: &str) -> Option<usize>;

    fn call(&self, name: &str, args: &[String]) -> Result<String>;
}

/// The helper library under its template-facing names
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportFunctions;

impl ReportFunctions {
    const SIGNATURES: &'static [(&'static str, usize)] = &[
        ("stripTypeQualifier", 1),
        ("stripAssemblyQualifier", 1),
        ("formatDateTime", 1),
        ("humanizeDuration", 1),
        ("humanizeInterval", 2),
        ("currentTimestamp", 0),
        ("extractImageUrl", 1),
    ];
}

impl ExtensionFunctions for ReportFunctions {
    fn arity(&self, name: &str) -> Option<usize> {
        Self::SIGNATURES
            .iter()
            .find(|(known, _)| *known == name)
            .map(|(_, arity)| *arity)
    }

    fn call(&self, name: &str, args: &[String]) -> Result<String> {
        match (name, args) {
            ("stripTypeQualifier", [full_name]) => {
                Ok(helpers::strip_type_qualifier(full_name).to_string())
            }
            ("stripAssemblyQualifier", [full_name]) => {
                Ok(helpers::strip_assembly_qualifier(full_name).to_string())
            }
            ("formatDateTime", [timestamp]) => helpers::format_date_time(timestamp),
            ("humanizeDuration", [duration]) => helpers::humanize_duration(duration),
            ("humanizeInterval", [start, end]) => helpers::humanize_interval(start, end),
            ("currentTimestamp", []) => Ok(helpers::current_timestamp()),
            ("extractImageUrl", [text]) => Ok(helpers::extract_image_url(text)),
            _ => Err(TrxerError::template(format!(
                "Unknown function '{name}' with {} argument(s)",
                args.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[&str]) -> Result<String> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        ReportFunctions.call(name, &args)
    }

    #[test]
    fn test_arity_table_matches_dispatch() {
        for (name, arity) in ReportFunctions::SIGNATURES {
            let args = vec!["00:00:01".to_string(); *arity];
            let result = ReportFunctions.call(name, &args);
            assert!(
                !matches!(result, Err(TrxerError::TemplateCompileError { .. })),
                "{name} is not dispatched"
            );
        }
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(ReportFunctions.arity("toUpper"), None);
        assert!(matches!(
            call("toUpper", &["x"]),
            Err(TrxerError::TemplateCompileError { .. })
        ));
    }

    #[test]
    fn test_dispatch() {
        assert_eq!(call("stripTypeQualifier", &["A.B, C"]).unwrap(), "A.B");
        assert_eq!(call("stripAssemblyQualifier", &["A.B, C"]).unwrap(), "C");
        assert_eq!(call("humanizeDuration", &["00:00:00.0010000"]).unwrap(), "1 ms");
        assert_eq!(call("extractImageUrl", &["'x.jpg'"]).unwrap(), "x.jpg");
    }

    #[test]
    fn test_format_errors_pass_through() {
        assert!(matches!(
            call("formatDateTime", &["not a date"]),
            Err(TrxerError::FormatError { .. })
        ));
    }
}
