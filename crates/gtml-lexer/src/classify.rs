//! Second pass: find open tags that never close and mark them `TagVoid`.
//!
//! Whether an element is void is decided by the structure of the template,
//! not by a list of known element names, so custom elements that are never
//! closed self-close as well. A tag written as `<name/>` is void up front and
//! never takes part in depth matching.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::token::{Token, TokenKind};
use crate::{LexerError, LexerErrorKind};

/// Reclassify unmatched and self-closing open tags as `TagVoid`.
pub fn classify(tokens: &[Token]) -> Vec<Token> {
    let pairs = pair_tags(tokens);
    let out: Vec<Token> = tokens
        .iter()
        .zip(&pairs)
        .map(|(token, close)| match token.kind {
            TokenKind::TagOpen if close.is_none() => {
                trace!(
                    tag = tag_name(token),
                    line = token.span.line,
                    column = token.span.column,
                    "open tag has no close, classified void"
                );
                token.with_kind(TokenKind::TagVoid)
            }
            _ => token.clone(),
        })
        .collect();

    debug!(count = out.len(), "tag classification complete");
    out
}

/// Name of a tag token: the first word after `<` or `</`.
///
/// Empty for non-tag tokens.
pub fn tag_name(token: &Token) -> &str {
    if !token.kind.is_tag() {
        return "";
    }
    let body = token.lexeme.strip_prefix('<').unwrap_or(&token.lexeme);
    let body = body.strip_suffix('>').unwrap_or(body).trim_end();
    let body = body.strip_prefix('/').unwrap_or(body);
    let body = body.strip_suffix('/').unwrap_or(body);
    body.split_whitespace().next().unwrap_or("")
}

/// True for tags written as `<name … />`, whitespace allowed before the `>`.
pub fn is_self_closing_syntax(token: &Token) -> bool {
    token.kind == TokenKind::TagOpen && self_closing_slash(&token.lexeme).is_some()
}

/// Char index of the `/` that ends a tag as in `<br/>` or `<br/ >`.
pub(crate) fn self_closing_slash(lexeme: &str) -> Option<usize> {
    let chars: Vec<char> = lexeme.chars().collect();
    if chars.last() != Some(&'>') {
        return None;
    }
    let mut end = chars.len() - 1;
    while end > 0 && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    (end > 1 && chars[end - 1] == '/').then(|| end - 1)
}

/// True for open tags that take part in depth matching.
fn opens_element(token: &Token) -> bool {
    token.kind == TokenKind::TagOpen && !is_self_closing_syntax(token)
}

/// Index of the close tag matching the open tag at `index`.
///
/// Searches forward keeping a depth counter that starts at 1: every later open
/// tag with the same name adds one, every close tag with the same name takes
/// one away, and the close that brings it to zero is the match. `None` when
/// the token is void or nothing matches before the end.
///
/// Runs in O(n) per call; see [`pair_tags`] for matching a whole stream.
pub fn closing_tag(tokens: &[Token], index: usize) -> Result<Option<usize>, LexerError> {
    let Some(open) = tokens.get(index) else {
        return Err(LexerError::new(
            LexerErrorKind::Structural,
            format!("closing tag requested for index {index} of {} tokens", tokens.len()),
            "",
            Default::default(),
        ));
    };
    match open.kind {
        TokenKind::TagVoid => return Ok(None),
        TokenKind::TagOpen if is_self_closing_syntax(open) => return Ok(None),
        TokenKind::TagOpen => {}
        _ => {
            return Err(LexerError::at(
                LexerErrorKind::Structural,
                "closing tag requested for a token that is not an open tag",
                open,
            ));
        }
    }

    let name = tag_name(open);
    let mut depth = 1usize;
    for (offset, token) in tokens[index + 1..].iter().enumerate() {
        if tag_name(token) != name {
            continue;
        }
        if opens_element(token) {
            depth += 1;
        } else if token.kind == TokenKind::TagClose {
            depth -= 1;
            if depth == 0 {
                return Ok(Some(index + 1 + offset));
            }
        }
    }
    Ok(None)
}

/// Matching close index for every token, in one pass.
///
/// `result[i]` is what [`closing_tag`] returns for an open tag at `i`, and
/// `None` for every other token. Keeps one stack of pending opens per tag name;
/// a close pops its name's stack and a close with nothing pending is ignored.
pub fn pair_tags(tokens: &[Token]) -> Vec<Option<usize>> {
    let mut pairs = vec![None; tokens.len()];
    let mut pending: HashMap<&str, Vec<usize>> = HashMap::new();

    for (i, token) in tokens.iter().enumerate() {
        if opens_element(token) {
            pending.entry(tag_name(token)).or_default().push(i);
        } else if token.kind == TokenKind::TagClose {
            if let Some(open) = pending.get_mut(tag_name(token)).and_then(Vec::pop) {
                pairs[open] = Some(i);
            }
        }
    }
    pairs
}
