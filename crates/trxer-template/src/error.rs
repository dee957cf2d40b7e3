use thiserror::Error;

/// Source location for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors raised while compiling a report template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Lexer error at {location}: {message}")]
    LexerError { message: String, location: Location },

    #[error("Parse error at {location}: {message}")]
    ParseError { message: String, location: Location },

    #[error("Reserved word '{word}' cannot be used as identifier at {location}")]
    ReservedWordError { word: String, location: Location },
}

impl TemplateError {
    /// Location of the offending token
    pub fn location(&self) -> Location {
        match self {
            TemplateError::LexerError { location, .. }
            | TemplateError::ParseError { location, .. }
            | TemplateError::ReservedWordError { location, .. } => *location,
        }
    }
}

/// Result type alias for template compilation
pub type Result<T> = std::result::Result<T, TemplateError>;
