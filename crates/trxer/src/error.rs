//! Error types for the Trxer conversion pipeline.

use std::path::PathBuf;
use thiserror::Error;
use trxer_template::{Location, TemplateError};

/// All errors that can occur while converting a TRX file
#[derive(Error, Debug)]
pub enum TrxerError {
    #[error("No trx file given")]
    MissingArgument,

    #[error("Resource not found: {name}")]
    ResourceNotFound { name: String },

    #[error("Malformed input '{}': {message}", path.display())]
    MalformedInput { path: PathBuf, message: String },

    #[error("Template error at line {}, column {}: {message}", location.line, location.column)]
    TemplateCompileError { message: String, location: Location },

    #[error("Format error: {message}")]
    FormatError { message: String },

    #[error("Cannot write output '{}': {source}", path.display())]
    OutputWriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TrxerError {
    /// Process exit code for this failure kind
    pub fn exit_code(&self) -> u8 {
        match self {
            TrxerError::MissingArgument => 2,
            TrxerError::ResourceNotFound { .. } => 3,
            TrxerError::MalformedInput { .. } => 4,
            TrxerError::TemplateCompileError { .. } => 5,
            TrxerError::FormatError { .. } => 6,
            TrxerError::OutputWriteError { .. } => 7,
        }
    }

    pub(crate) fn template(message: impl Into<String>) -> Self {
        TrxerError::TemplateCompileError {
            message: message.into(),
            location: Location::default(),
        }
    }

    pub(crate) fn format(message: impl Into<String>) -> Self {
        TrxerError::FormatError {
            message: message.into(),
        }
    }

    /// Attach a template location to errors raised without one
    pub(crate) fn located(self, at: Location) -> Self {
        match self {
            TrxerError::TemplateCompileError { message, location } if location == Location::default() => {
                TrxerError::TemplateCompileError {
                    message,
                    location: at,
                }
            }
            other => other,
        }
    }
}

impl From<TemplateError> for TrxerError {
    fn from(err: TemplateError) -> Self {
        let location = err.location();
        let message = match err {
            TemplateError::LexerError { message, .. } | TemplateError::ParseError { message, .. } => {
                message
            }
            TemplateError::ReservedWordError { word, .. } => {
                format!("Reserved word '{word}' cannot be used as identifier")
            }
        };
        TrxerError::TemplateCompileError { message, location }
    }
}

/// Result type alias for Trxer operations
pub type Result<T> = std::result::Result<T, TrxerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            TrxerError::MissingArgument,
            TrxerError::ResourceNotFound {
                name: "x".to_string(),
            },
            TrxerError::MalformedInput {
                path: PathBuf::from("a.trx"),
                message: "bad".to_string(),
            },
            TrxerError::template("bad"),
            TrxerError::format("bad"),
            TrxerError::OutputWriteError {
                path: PathBuf::from("a.trx.html"),
                source: std::io::Error::other("denied"),
            },
        ];
        let mut codes: Vec<u8> = errors.iter().map(TrxerError::exit_code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(codes.iter().all(|c| *c != 0));
    }

    #[test]
    fn test_located_only_fills_missing_location() {
        let at = Location::new(3, 7);
        let err = TrxerError::template("Undefined variable 'x'").located(at);
        assert!(matches!(err, TrxerError::TemplateCompileError { location, .. } if location == at));

        let kept = TrxerError::TemplateCompileError {
            message: "m".to_string(),
            location: Location::new(1, 2),
        }
        .located(at);
        assert!(
            matches!(kept, TrxerError::TemplateCompileError { location, .. } if location == Location::new(1, 2))
        );
    }

    #[test]
    fn test_from_template_error_keeps_location() {
        let err: TrxerError = trxer_template::parse("{[ if ]}").unwrap_err().into();
        assert!(matches!(err, TrxerError::TemplateCompileError { location, .. } if location.line == 1));
    }
}
