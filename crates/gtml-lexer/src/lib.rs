//! GTML Lexer
//!
//! Tokenizes GTML templates: HTML-like markup with `%s name%` style
//! placeholders, `_for`/`_if` directive attributes and the `::?` else-marker.
//!
//! Tokenization runs as a pipeline of pure stages, each producing a new list:
//!
//! ```text
//! source → raw::tokenize → classify::classify → refine::refine
//!          TagOpen/Close    + TagVoid            brackets, names, attributes,
//!          Text/Whitespace                       RawText, placeholders, ElseMarker
//! ```
//!
//! Every stage is lossless: concatenating the lexemes of its output gives back
//! the source text it was cut from.
//!
//! # Example
//!
//! ```
//! use gtml_lexer::TokenKind;
//!
//! let tokens = gtml_lexer::tokenize("<p>Hello, %s name%!</p>").unwrap();
//! assert!(tokens.iter().any(|t| t.kind == TokenKind::StringArg));
//! assert_eq!(gtml_lexer::token::reconstruct(&tokens), "<p>Hello, %s name%!</p>");
//! ```

pub mod classify;
pub mod diagnostics;
pub mod raw;
pub mod refine;
pub mod scanner;
pub mod token;

use std::fmt;

pub use classify::{closing_tag, pair_tags, tag_name};
pub use diagnostics::{DiagnosticSink, NullSink, Stage, StageRecorder, TracingSink};
pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};

/// What went wrong while tokenizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// A `<` is never matched by a `>`.
    UnterminatedTag,
    /// A tag body has no name, or an attribute does not split cleanly on `=`.
    MalformedAttribute,
    /// A `%` span is too short, unterminated, or has an unknown type marker.
    InvalidPlaceholder,
    /// A query was made against its contract, e.g. asking for the closing tag
    /// of a token that is not an open tag.
    Structural,
}

impl fmt::Display for LexerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LexerErrorKind::UnterminatedTag => "Unterminated tag",
            LexerErrorKind::MalformedAttribute => "Malformed attribute",
            LexerErrorKind::InvalidPlaceholder => "Invalid placeholder",
            LexerErrorKind::Structural => "Structural error",
        };
        f.write_str(name)
    }
}

/// Lexer error with the offending lexeme and its position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} at line {line}, column {column}: {message}")]
pub struct LexerError {
    pub kind: LexerErrorKind,
    pub message: String,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl LexerError {
    pub fn new(
        kind: LexerErrorKind,
        message: impl Into<String>,
        lexeme: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            lexeme: lexeme.into(),
            line: span.line,
            column: span.column,
        }
    }

    /// Error located at `token`.
    pub fn at(kind: LexerErrorKind, message: impl Into<String>, token: &Token) -> Self {
        Self::new(kind, message, token.lexeme.clone(), token.span)
    }
}

/// The output of every stage of one tokenizer run.
#[derive(Debug, Clone, PartialEq)]
pub struct Stages {
    pub raw: Vec<Token>,
    pub classified: Vec<Token>,
    pub refined: Vec<Token>,
}

/// Run the full pipeline and return the refined token stream.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
    tokenize_with(source, &mut NullSink)
}

/// Run the full pipeline, reporting each stage to `sink`.
pub fn tokenize_with(
    source: &str,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<Token>, LexerError> {
    Ok(tokenize_stages(source, sink)?.refined)
}

/// Run the full pipeline and keep every stage's output.
pub fn tokenize_stages(
    source: &str,
    sink: &mut dyn DiagnosticSink,
) -> Result<Stages, LexerError> {
    let raw = raw::tokenize(source)?;
    sink.record(Stage::Raw, &raw);

    let classified = classify::classify(&raw);
    sink.record(Stage::Classified, &classified);

    let refined = refine::refine(&classified)?;
    sink.record(Stage::Refined, &refined);

    Ok(Stages {
        raw,
        classified,
        refined,
    })
}
