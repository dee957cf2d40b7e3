//! Template language for Trxer reports.
//!
//! Templates are markup with `{[ ... ]}` tags:
//! - `{[ run.name ]}` outputs an HTML-escaped value
//! - `{[ humanizeDuration(result.duration) ]}` calls an extension function
//! - `{[#if ...]}`, `{[#unless ...]}`, `{[#each ... as item]}` and
//!   `{[#unsecure]}` blocks
//! - `{[> /partials/name key=path]}` includes a partial
//!
//! This crate only turns source text into a [`Template`]; evaluation lives
//! in the `trxer` crate.
//!
//! # Example
//!
//! ```rust
//! use trxer_template::{ast::Node, parse};
//!
//! let template = parse("<td>{[ stripTypeQualifier(test.className) ]}</td>").unwrap();
//! assert_eq!(template.nodes.len(), 3);
//! assert!(matches!(template.nodes[1], Node::Output(_)));
//! ```

pub mod ast;
pub mod error;

mod lexer;
mod parser;
mod token;
mod validator;

pub use ast::Template;
pub use error::{Location, Result, TemplateError};

use lexer::Lexer;
use parser::Parser;

/// Compile template source into an AST
pub fn parse(source: &str) -> Result<Template> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse()
}
