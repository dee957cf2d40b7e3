//! Parse-time validation of identifiers and include names

use crate::error::{Location, Result, TemplateError};
use crate::token::is_reserved_word;

/// Validate an identifier (path segment, function name, each binding, include argument key)
///
/// Rules:
/// - Cannot be a reserved word (if, unless, each, as, unsecure, true, false, null, include)
/// - Cannot start with '_' (reserved for internal use)
pub fn validate_identifier(name: &str, location: &Location) -> Result<()> {
    if is_reserved_word(name) {
        return Err(TemplateError::ReservedWordError {
            word: name.to_string(),
            location: *location,
        });
    }
    if name.starts_with('_') {
        return Err(TemplateError::ParseError {
            message: format!("Identifier cannot start with '_': {}", name),
            location: *location,
        });
    }
    Ok(())
}

/// Validate an include name at parse time
///
/// Rules:
/// - Must start with '/'
/// - Must have at least one segment after '/'
/// - Cannot contain '..' or '//', or end with '/'
/// - Cannot contain ':'
pub fn validate_include_name_syntax(name: &str, location: &Location) -> Result<()> {
    let problem = if !name.starts_with('/') {
        Some("Include name must start with '/'")
    } else if name == "/" {
        Some("Include name must have at least one segment")
    } else if name.contains("..") {
        Some("Include name cannot contain '..'")
    } else if name.contains("//") {
        Some("Include name cannot contain '//'")
    } else if name.ends_with('/') {
        Some("Include name cannot end with '/'")
    } else if name.contains(':') {
        Some("Include name cannot contain ':'")
    } else {
        None
    };

    match problem {
        Some(message) => Err(TemplateError::ParseError {
            message: message.to_string(),
            location: *location,
        }),
        None => Ok(()),
    }
}
