//! GTML Parser
//!
//! Builds a tree from the refined token stream of `gtml-lexer`.
//!
//! Nesting is resolved by matching open and close tags by name and depth, not
//! by a grammar of known elements: a tag that is never closed is a void
//! element, whatever its name.
//!
//! # Example
//!
//! ```
//! use gtml_parser::{Node, Parser};
//!
//! let root = Parser::parse("<ul><li>%s item%</li></ul>").unwrap();
//! assert_eq!(root.children()[0].tag(), Some("ul"));
//! ```

pub mod ast;
pub mod builder;
pub mod config;
pub mod parser;

use gtml_lexer::{LexerError, LexerErrorKind, Token};

pub use ast::{Attribute, Element, Node, VoidElement};
pub use builder::{is_self_contained, shed_outer_html, TreeBuilder};
pub use config::{ParserConfig, TextPolicy};
pub use parser::Parser;

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    /// Tokenizing failed.
    #[error(transparent)]
    Lexer(LexerError),

    /// The token stream does not nest: a stray close tag, an element closed
    /// outside its parent, or a shed started on something that is not an open
    /// tag.
    #[error("Structural error at line {line}, column {column}: {message}")]
    Structural {
        message: String,
        lexeme: String,
        line: usize,
        column: usize,
    },

    /// Elements nest deeper than `ParserConfig::max_depth`.
    #[error("Nesting exceeds {limit} levels at line {line}, column {column}")]
    DepthLimit {
        limit: usize,
        line: usize,
        column: usize,
    },

    #[error("Invalid parser configuration: {0}")]
    Config(String),
}

impl ParseError {
    pub(crate) fn structural(message: impl Into<String>, token: &Token) -> Self {
        ParseError::Structural {
            message: message.into(),
            lexeme: token.lexeme.clone(),
            line: token.span.line,
            column: token.span.column,
        }
    }

    /// Line and column the error points at, when it has one.
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            ParseError::Lexer(e) => Some((e.line, e.column)),
            ParseError::Structural { line, column, .. }
            | ParseError::DepthLimit { line, column, .. } => Some((*line, *column)),
            ParseError::Config(_) => None,
        }
    }
}

/// Structural lexer errors (closing-tag queries against their contract) are
/// reported as `Structural`, like the tree builder's own.
impl From<LexerError> for ParseError {
    fn from(e: LexerError) -> Self {
        match e.kind {
            LexerErrorKind::Structural => ParseError::Structural {
                message: e.message,
                lexeme: e.lexeme,
                line: e.line,
                column: e.column,
            },
            _ => ParseError::Lexer(e),
        }
    }
}
