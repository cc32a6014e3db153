//! First pass: split the source into whole tags and text runs.
//!
//! Every `<…>` run becomes `TagOpen`, or `TagClose` when the char after `<`
//! is `/`. A `>` inside a quoted attribute value does not end the tag.
//! Every other run is `Text`, or `Whitespace` when it squeezes to nothing.

use tracing::{debug, trace};

use crate::scanner::Scanner;
use crate::token::{squeeze, Span, Token, TokenKind};
use crate::{LexerError, LexerErrorKind};

/// Tokenize `source` into raw tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
    let mut scanner = Scanner::new(source);
    let mut tokens = Vec::new();

    while !scanner.is_terminated() {
        let token = if scanner.current() == '<' {
            scan_tag(&mut scanner)?
        } else {
            scan_text(&mut scanner)
        };
        trace!(kind = token.kind.name(), lexeme = ?token.lexeme, "raw token");
        tokens.push(token);
    }

    debug!(count = tokens.len(), "raw tokenization complete");
    Ok(tokens)
}

/// Scan `<…>` starting at the `<` under the cursor. Leaves the cursor on the
/// char after `>`.
fn scan_tag(scanner: &mut Scanner) -> Result<Token, LexerError> {
    scanner.mark();

    if !scanner.walk_until_skipping_quotes('>') {
        let (line, column) = scanner.mark_location();
        let span = Span::new(scanner.mark_position(), scanner.position(), line, column);
        return Err(LexerError::new(
            LexerErrorKind::UnterminatedTag,
            "tag is never closed with '>'",
            scanner.collect_from_mark(),
            span,
        ));
    }

    let lexeme = scanner.collect_from_mark();
    let kind = if scanner.peek_from_mark(1) == '/' {
        TokenKind::TagClose
    } else {
        TokenKind::TagOpen
    };
    let (line, column) = scanner.mark_location();
    let span = Span::new(scanner.mark_position(), scanner.position() + 1, line, column);
    scanner.step();
    Ok(Token::new(kind, lexeme, span))
}

/// Scan up to (not including) the next `<`. The char under the cursor must
/// not be `<`.
fn scan_text(scanner: &mut Scanner) -> Token {
    scanner.mark();
    let start = scanner.mark_position();
    let (line, column) = scanner.mark_location();

    let found = scanner.walk_until('<');
    if found {
        scanner.step_back();
    }
    let lexeme = scanner.collect_from_mark();
    if found {
        scanner.step();
    }

    let kind = if squeeze(&lexeme).is_empty() {
        TokenKind::Whitespace
    } else {
        TokenKind::Text
    };
    let span = Span::new(start, start + lexeme.chars().count(), line, column);
    Token::new(kind, lexeme, span)
}
