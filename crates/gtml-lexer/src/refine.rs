//! Third pass: decompose whole tags and text runs into fine-grained tokens.
//!
//! Runs in three stages, each producing a new list:
//!
//! 1. [`decompose_tags`]: brackets, tag name, whitespace and attributes
//! 2. [`extract_placeholders`]: `%s …%`, `%d …%` and `%t …%` spans inside
//!    text and attribute values
//! 3. [`mark_else`]: a text run that is exactly `::?` becomes `ElseMarker`

use tracing::debug;

use crate::classify::self_closing_slash;
use crate::scanner::Scanner;
use crate::token::{squeeze, Span, Token, TokenKind};
use crate::{LexerError, LexerErrorKind};

/// The literal that separates the two branches of conditional content.
pub const ELSE_MARKER: &str = "::?";

/// Run all three refinement stages.
pub fn refine(tokens: &[Token]) -> Result<Vec<Token>, LexerError> {
    let decomposed = decompose_tags(tokens)?;
    let extracted = extract_placeholders(&decomposed)?;
    let out = mark_else(&extracted);
    debug!(count = out.len(), "token refinement complete");
    Ok(out)
}

// =========================================================================
// Stage 1: tags
// =========================================================================

/// Replace every whole-tag token with its parts.
pub fn decompose_tags(tokens: &[Token]) -> Result<Vec<Token>, LexerError> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        if token.kind.is_tag() {
            out.extend(decompose_tag(token)?);
        } else {
            out.push(token.clone());
        }
    }
    Ok(out)
}

/// Split one tag token into bracket, name, whitespace and attribute tokens.
///
/// `<input type='a b' checked/>` becomes
/// `OpenBracket TagName TagWhitespace Attribute TagWhitespace BooleanAttribute VoidCloseBracket`.
/// Quoted values are atomic: whitespace inside them does not split.
pub fn decompose_tag(token: &Token) -> Result<Vec<Token>, LexerError> {
    let chars: Vec<char> = token.lexeme.chars().collect();
    let (open_len, open_kind) = match token.kind {
        TokenKind::TagClose => (2, TokenKind::EndOpenBracket),
        _ => (1, TokenKind::OpenBracket),
    };
    let (close_len, close_kind) = match token.kind {
        TokenKind::TagClose => (1, TokenKind::CloseBracket),
        _ => match self_closing_slash(&token.lexeme) {
            Some(slash) => (chars.len() - slash, TokenKind::VoidCloseBracket),
            None if token.kind == TokenKind::TagVoid => (1, TokenKind::VoidCloseBracket),
            None => (1, TokenKind::CloseBracket),
        },
    };

    let well_formed = token.kind.is_tag()
        && chars.len() >= open_len + close_len
        && chars.first() == Some(&'<')
        && chars.last() == Some(&'>')
        && (token.kind != TokenKind::TagClose || chars.get(1) == Some(&'/'));
    if !well_formed {
        return Err(LexerError::at(
            LexerErrorKind::Structural,
            "token is not a well-formed tag",
            token,
        ));
    }

    let body_start = open_len;
    let body_end = chars.len() - close_len;
    let piece_token = |kind: TokenKind, from: usize, to: usize| {
        let text: String = chars[from..to].iter().collect();
        Token::new(kind, text, token.span.sub_span(&token.lexeme, from, to))
    };

    let mut out = vec![piece_token(open_kind, 0, open_len)];
    let mut named = false;
    for piece in split_tag_body(&chars[body_start..body_end]) {
        let (from, to) = (body_start + piece.start, body_start + piece.end);
        if piece.whitespace {
            out.push(piece_token(TokenKind::TagWhitespace, from, to));
            continue;
        }
        let part = piece_token(TokenKind::TagName, from, to);
        if named {
            let kind = attribute_kind(&part)?;
            out.push(part.with_kind(kind));
            continue;
        }
        if part.lexeme.contains(&['=', '"', '\''][..]) {
            return Err(LexerError::at(
                LexerErrorKind::MalformedAttribute,
                "expected a tag name before attributes",
                &part,
            ));
        }
        named = true;
        out.push(part);
    }

    if !named {
        return Err(LexerError::at(
            LexerErrorKind::MalformedAttribute,
            "tag has no name",
            token,
        ));
    }

    out.push(piece_token(close_kind, body_end, chars.len()));
    Ok(out)
}

/// A run of a tag body: either whitespace or one name/attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Piece {
    start: usize,
    end: usize,
    whitespace: bool,
}

/// Group a tag body into alternating whitespace and word runs. Chars inside a
/// quoted run always belong to a word.
fn split_tag_body(chars: &[char]) -> Vec<Piece> {
    let mut quote: Option<char> = None;
    let mut classes = Vec::with_capacity(chars.len());
    for (i, &ch) in chars.iter().enumerate() {
        let escaped = i > 0 && chars[i - 1] == '\\';
        let is_space = match quote {
            Some(open) => {
                if ch == open && !escaped {
                    quote = None;
                }
                false
            }
            None => {
                if (ch == '"' || ch == '\'') && !escaped {
                    quote = Some(ch);
                }
                ch.is_whitespace()
            }
        };
        classes.push(is_space);
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for i in 1..=classes.len() {
        if i == classes.len() || classes[i] != classes[start] {
            pieces.push(Piece {
                start,
                end: i,
                whitespace: classes[start],
            });
            start = i;
        }
    }
    pieces
}

/// Classify one attribute word: `name=value` splits on its first unescaped
/// `=`, anything else is a boolean attribute.
fn attribute_kind(part: &Token) -> Result<TokenKind, LexerError> {
    let chars: Vec<char> = part.lexeme.chars().collect();
    let equals = chars
        .iter()
        .enumerate()
        .position(|(i, &c)| c == '=' && (i == 0 || chars[i - 1] != '\\'));
    let Some(equals) = equals else {
        return Ok(TokenKind::BooleanAttribute(part.lexeme.clone()));
    };

    let malformed = |message: &str| LexerError::at(LexerErrorKind::MalformedAttribute, message, part);

    let name: String = chars[..equals].iter().collect();
    if name.is_empty() {
        return Err(malformed("attribute has no name before '='"));
    }

    let raw_value = &chars[equals + 1..];
    let (from, to) = match raw_value.first() {
        None => return Err(malformed("attribute has no value after '='")),
        Some(&quote @ ('"' | '\'')) => {
            let closed = raw_value.len() >= 2
                && raw_value[raw_value.len() - 1] == quote
                && (raw_value.len() == 2 || raw_value[raw_value.len() - 2] != '\\');
            if !closed {
                return Err(malformed("attribute value has unbalanced quotes"));
            }
            (1, raw_value.len() - 1)
        }
        Some(_) => (0, raw_value.len()),
    };

    let (value_start, value_end) = (equals + 1 + from, equals + 1 + to);
    let value: String = chars[value_start..value_end].iter().collect();
    let parts = if value.is_empty() {
        Vec::new()
    } else {
        let span = part.span.sub_span(&part.lexeme, value_start, value_end);
        vec![Token::new(TokenKind::RawText, value.clone(), span)]
    };

    Ok(TokenKind::Attribute { name, value, parts })
}

// =========================================================================
// Stage 2: placeholders
// =========================================================================

/// The type a placeholder's marker letter selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    String,
    Int,
    Bool,
}

impl PlaceholderKind {
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            's' => Some(PlaceholderKind::String),
            'd' => Some(PlaceholderKind::Int),
            't' => Some(PlaceholderKind::Bool),
            _ => None,
        }
    }

    pub fn token_kind(self) -> TokenKind {
        match self {
            PlaceholderKind::String => TokenKind::StringArg,
            PlaceholderKind::Int => TokenKind::IntArg,
            PlaceholderKind::Bool => TokenKind::BoolArg,
        }
    }
}

/// Split `Text` tokens, and the values of `Attribute` tokens, into `RawText`
/// and placeholder argument tokens.
pub fn extract_placeholders(tokens: &[Token]) -> Result<Vec<Token>, LexerError> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match &token.kind {
            TokenKind::Text => out.extend(split_placeholders(&token.lexeme, token.span)?),
            TokenKind::Attribute { name, value, parts } => {
                let mut refined = Vec::with_capacity(parts.len());
                for part in parts {
                    if part.kind == TokenKind::RawText {
                        refined.extend(split_placeholders(&part.lexeme, part.span)?);
                    } else {
                        refined.push(part.clone());
                    }
                }
                let kind = TokenKind::Attribute {
                    name: name.clone(),
                    value: value.clone(),
                    parts: refined,
                };
                out.push(token.with_kind(kind));
            }
            _ => out.push(token.clone()),
        }
    }
    Ok(out)
}

/// Cut `text` (located at `span`) into literal runs and placeholders.
///
/// A placeholder starts at an unescaped `%` followed by a letter and a space,
/// and ends at the next unescaped `%`. Any other `%` is literal text.
pub fn split_placeholders(text: &str, span: Span) -> Result<Vec<Token>, LexerError> {
    let mut scanner = Scanner::new(text);
    let mut out = Vec::new();
    let mut literal_start = 0;

    while scanner.walk_until_unescaped('%') {
        let open = scanner.position();
        let marker = scanner.peek(1);
        if !(marker.is_ascii_alphabetic() && scanner.peek(2) == ' ') {
            scanner.step();
            continue;
        }

        scanner.mark();
        scanner.step();
        if !scanner.walk_until_unescaped('%') {
            if PlaceholderKind::from_marker(marker).is_some() {
                return Err(LexerError::new(
                    LexerErrorKind::InvalidPlaceholder,
                    "placeholder is never closed with '%'",
                    scanner.collect_from_mark(),
                    span.sub_span(text, open, scanner.len()),
                ));
            }
            break;
        }

        let close = scanner.position();
        let lexeme = scanner.collect_from_mark();
        let arg_span = span.sub_span(text, open, close + 1);
        let kind = placeholder_kind(&lexeme).map_err(|message| {
            LexerError::new(LexerErrorKind::InvalidPlaceholder, message, lexeme.clone(), arg_span)
        })?;

        if open > literal_start {
            out.push(Token::new(
                TokenKind::RawText,
                scanner.slice(literal_start, open),
                span.sub_span(text, literal_start, open),
            ));
        }
        out.push(Token::new(kind, lexeme, arg_span));
        literal_start = close + 1;
        scanner.step();
    }

    if literal_start < scanner.len() {
        out.push(Token::new(
            TokenKind::RawText,
            scanner.slice(literal_start, scanner.len()),
            span.sub_span(text, literal_start, scanner.len()),
        ));
    }
    Ok(out)
}

/// Token kind for a `%`-delimited span such as `%s name%`.
pub fn placeholder_kind(lexeme: &str) -> Result<TokenKind, String> {
    let chars: Vec<char> = lexeme.chars().collect();
    if chars.len() < 2 {
        return Err("placeholder is shorter than two characters".to_string());
    }
    let Some(kind) = PlaceholderKind::from_marker(chars[1]) else {
        return Err(format!(
            "unknown placeholder type '{}', expected 's', 'd' or 't'",
            chars[1]
        ));
    };
    let expression: String = chars
        .iter()
        .skip(2)
        .take(chars.len().saturating_sub(3))
        .collect();
    if expression.trim().is_empty() {
        return Err("placeholder has no expression".to_string());
    }
    Ok(kind.token_kind())
}

/// The expression of a placeholder argument token, trimmed: `name` for
/// `%s name%`. `None` for other tokens.
pub fn placeholder_expression(token: &Token) -> Option<&str> {
    if !token.kind.is_arg() {
        return None;
    }
    let inner = token.lexeme.get(2..token.lexeme.len().checked_sub(1)?)?;
    Some(inner.trim())
}

// =========================================================================
// Stage 3: else-marker
// =========================================================================

/// True when `text` is the else-marker once whitespace is squeezed out.
pub fn is_else_marker(text: &str) -> bool {
    squeeze(text) == ELSE_MARKER
}

/// Reclassify `RawText` tokens that are exactly the else-marker.
pub fn mark_else(tokens: &[Token]) -> Vec<Token> {
    tokens
        .iter()
        .map(|token| match token.kind {
            TokenKind::RawText if is_else_marker(&token.lexeme) => {
                token.with_kind(TokenKind::ElseMarker)
            }
            _ => token.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classify, raw};
    use pretty_assertions::assert_eq;

    fn refined(source: &str) -> Vec<Token> {
        refine(&classify::classify(&raw::tokenize(source).unwrap())).unwrap()
    }

    fn refine_err(source: &str) -> LexerError {
        refine(&classify::classify(&raw::tokenize(source).unwrap())).unwrap_err()
    }

    fn summary(tokens: &[Token]) -> Vec<(&'static str, &str)> {
        tokens
            .iter()
            .map(|t| (t.kind.name(), t.lexeme.as_str()))
            .collect()
    }

    fn text(lexeme: &str) -> Token {
        Token::new(
            TokenKind::Text,
            lexeme,
            Span::new(0, lexeme.chars().count(), 1, 1),
        )
    }

    // =====================================================================
    // Tag decomposition
    // =====================================================================

    #[test]
    fn test_void_input_with_attributes() {
        let tokens = refined("<input type='text' name='username'>");
        assert_eq!(
            summary(&tokens),
            vec![
                ("OpenBracket", "<"),
                ("TagName", "input"),
                ("TagWhitespace", " "),
                ("Attribute", "type='text'"),
                ("TagWhitespace", " "),
                ("Attribute", "name='username'"),
                ("VoidCloseBracket", ">"),
            ]
        );
        match &tokens[3].kind {
            TokenKind::Attribute { name, value, parts } => {
                assert_eq!(name, "type");
                assert_eq!(value, "text");
                assert_eq!(summary(parts), vec![("RawText", "text")]);
                assert_eq!(parts[0].span.column, 14);
            }
            other => panic!("Expected attribute, got {other:?}"),
        }
    }

    #[test]
    fn test_open_and_close_brackets() {
        let tokens = refined("<div></div >");
        assert_eq!(
            summary(&tokens),
            vec![
                ("OpenBracket", "<"),
                ("TagName", "div"),
                ("CloseBracket", ">"),
                ("EndOpenBracket", "</"),
                ("TagName", "div"),
                ("TagWhitespace", " "),
                ("CloseBracket", ">"),
            ]
        );
    }

    #[test]
    fn test_self_closing_brackets() {
        assert_eq!(
            summary(&refined("<br/>")),
            vec![
                ("OpenBracket", "<"),
                ("TagName", "br"),
                ("VoidCloseBracket", "/>"),
            ]
        );
        assert_eq!(
            summary(&refined("<br />")),
            vec![
                ("OpenBracket", "<"),
                ("TagName", "br"),
                ("TagWhitespace", " "),
                ("VoidCloseBracket", "/>"),
            ]
        );
        assert_eq!(
            summary(&refined("<a/ >")),
            vec![
                ("OpenBracket", "<"),
                ("TagName", "a"),
                ("VoidCloseBracket", "/ >"),
            ]
        );
    }

    #[test]
    fn test_quoted_value_is_atomic() {
        let tokens = refined("<a title=\"x  y\" disabled></a>");
        assert_eq!(tokens[3].lexeme, "title=\"x  y\"");
        assert!(matches!(
            &tokens[3].kind,
            TokenKind::Attribute { name, value, .. } if name == "title" && value == "x  y"
        ));
        assert_eq!(
            tokens[5].kind,
            TokenKind::BooleanAttribute("disabled".to_string())
        );
    }

    #[test]
    fn test_value_splits_on_first_equals() {
        let tokens = refined("<p _if=\"a == b\"></p>");
        assert!(matches!(
            &tokens[3].kind,
            TokenKind::Attribute { name, value, .. } if name == "_if" && value == "a == b"
        ));
    }

    #[test]
    fn test_unquoted_value() {
        let tokens = refined("<td colspan=2></td>");
        assert!(matches!(
            &tokens[3].kind,
            TokenKind::Attribute { name, value, .. } if name == "colspan" && value == "2"
        ));
    }

    #[test]
    fn test_empty_quoted_value_has_no_parts() {
        let tokens = refined("<option value=''></option>");
        assert!(matches!(
            &tokens[3].kind,
            TokenKind::Attribute { value, parts, .. } if value.is_empty() && parts.is_empty()
        ));
    }

    #[test]
    fn test_multiline_tag_locations() {
        let tokens = refined("<div\n  class='x'\n  _for=\"item in items\"></div>");
        let attr = tokens
            .iter()
            .find(|t| t.lexeme.starts_with("_for"))
            .unwrap();
        assert_eq!((attr.span.line, attr.span.column), (3, 3));
    }

    #[test]
    fn test_empty_tag_is_malformed() {
        assert_eq!(refine_err("<>").kind, LexerErrorKind::MalformedAttribute);
        assert_eq!(refine_err("<   >").kind, LexerErrorKind::MalformedAttribute);
        assert_eq!(refine_err("<p></>").kind, LexerErrorKind::MalformedAttribute);
    }

    #[test]
    fn test_attribute_without_name_is_malformed() {
        let err = refine_err("<a b =x></a>");
        assert_eq!(err.kind, LexerErrorKind::MalformedAttribute);
        assert_eq!(err.lexeme, "=x");
        assert_eq!((err.line, err.column), (1, 6));
    }

    #[test]
    fn test_attribute_without_value_is_malformed() {
        assert_eq!(refine_err("<a b=></a>").kind, LexerErrorKind::MalformedAttribute);
    }

    #[test]
    fn test_unbalanced_quotes_are_malformed() {
        assert_eq!(
            refine_err("<a b=\"x\"y></a>").kind,
            LexerErrorKind::MalformedAttribute
        );
    }

    #[test]
    fn test_attribute_before_name_is_malformed() {
        assert_eq!(refine_err("<x=1>").kind, LexerErrorKind::MalformedAttribute);
    }

    #[test]
    fn test_decompose_rejects_non_tag() {
        let err = decompose_tag(&text("hello")).unwrap_err();
        assert_eq!(err.kind, LexerErrorKind::Structural);
    }

    // =====================================================================
    // Placeholders
    // =====================================================================

    #[test]
    fn test_placeholder_in_text() {
        let tokens = split_placeholders("Hello, %s name%!", Span::new(0, 16, 1, 1)).unwrap();
        assert_eq!(
            summary(&tokens),
            vec![
                ("RawText", "Hello, "),
                ("StringArg", "%s name%"),
                ("RawText", "!"),
            ]
        );
        assert_eq!(tokens[1].span, Span::new(7, 15, 1, 8));
    }

    #[test]
    fn test_placeholder_kinds() {
        let tokens = split_placeholders("%d count% %t flag%%s who%", Span::default()).unwrap();
        assert_eq!(
            summary(&tokens),
            vec![
                ("IntArg", "%d count%"),
                ("RawText", " "),
                ("BoolArg", "%t flag%"),
                ("StringArg", "%s who%"),
            ]
        );
    }

    #[test]
    fn test_plain_percent_is_literal() {
        let tokens = split_placeholders("100% sure, 5 %", Span::default()).unwrap();
        assert_eq!(summary(&tokens), vec![("RawText", "100% sure, 5 %")]);
    }

    #[test]
    fn test_escaped_percent_is_literal() {
        let tokens = split_placeholders(r"50\%s off %d n%", Span::default()).unwrap();
        assert_eq!(
            summary(&tokens),
            vec![("RawText", r"50\%s off "), ("IntArg", "%d n%")]
        );
    }

    #[test]
    fn test_escaped_closing_percent_is_skipped() {
        let tokens = split_placeholders(r"%s a\%b%", Span::default()).unwrap();
        assert_eq!(summary(&tokens), vec![("StringArg", r"%s a\%b%")]);
    }

    #[test]
    fn test_unknown_marker_is_invalid() {
        let err = split_placeholders("x %q name% y", Span::new(0, 12, 3, 4)).unwrap_err();
        assert_eq!(err.kind, LexerErrorKind::InvalidPlaceholder);
        assert_eq!(err.lexeme, "%q name%");
        assert_eq!((err.line, err.column), (3, 6));
    }

    #[test]
    fn test_unterminated_placeholder_is_invalid() {
        let err = split_placeholders("Hi %s name", Span::default()).unwrap_err();
        assert_eq!(err.kind, LexerErrorKind::InvalidPlaceholder);
        assert_eq!(err.lexeme, "%s name");
    }

    #[test]
    fn test_empty_expression_is_invalid() {
        let err = split_placeholders("a %s  % b", Span::default()).unwrap_err();
        assert_eq!(err.kind, LexerErrorKind::InvalidPlaceholder);
    }

    #[test]
    fn test_placeholder_kind_checks_length_and_marker() {
        assert!(placeholder_kind("%").is_err());
        assert!(placeholder_kind("%x y%").is_err());
        assert_eq!(placeholder_kind("%t ok%"), Ok(TokenKind::BoolArg));
    }

    #[test]
    fn test_placeholders_in_attribute_value() {
        let tokens = refined("<a class=\"btn %s kind%\" href='/u/%d id%'></a>");
        let parts: Vec<Vec<(&str, &str)>> = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Attribute { parts, .. } => Some(summary(parts)),
                _ => None,
            })
            .collect();
        assert_eq!(
            parts,
            vec![
                vec![("RawText", "btn "), ("StringArg", "%s kind%")],
                vec![("RawText", "/u/"), ("IntArg", "%d id%")],
            ]
        );
    }

    #[test]
    fn test_invalid_placeholder_in_attribute_value() {
        let err = refine_err("<a href='%z x%'></a>");
        assert_eq!(err.kind, LexerErrorKind::InvalidPlaceholder);
        assert_eq!((err.line, err.column), (1, 10));
    }

    #[test]
    fn test_placeholder_location_in_document() {
        let tokens = refined("<p>\n  Hi %s name%</p>");
        let arg = tokens.iter().find(|t| t.kind == TokenKind::StringArg).unwrap();
        assert_eq!((arg.span.line, arg.span.column), (2, 6));
        assert_eq!(placeholder_expression(arg), Some("name"));
    }

    #[test]
    fn test_placeholder_expression_only_for_args() {
        assert_eq!(placeholder_expression(&text("%s name%")), None);
    }

    // =====================================================================
    // Else-marker
    // =====================================================================

    #[test]
    fn test_else_marker_between_elements() {
        let tokens = refined("<p>a</p> ::? <p>b</p>");
        let marker = tokens.iter().find(|t| t.kind == TokenKind::ElseMarker).unwrap();
        assert_eq!(marker.lexeme, " ::? ");
    }

    #[test]
    fn test_else_marker_must_stand_alone() {
        let tokens = refined("<p>a ::? b</p>");
        assert!(tokens.iter().all(|t| t.kind != TokenKind::ElseMarker));
    }

    #[test]
    fn test_whitespace_passes_through() {
        let tokens = refined("<ul>\n  <li>x</li>\n</ul>");
        assert_eq!(tokens[3].kind, TokenKind::Whitespace);
        assert_eq!(tokens[3].lexeme, "\n  ");
    }
}
