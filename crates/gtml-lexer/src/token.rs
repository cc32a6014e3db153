use serde::Serialize;

/// A position in template source, tracking line and column for error reporting.
///
/// `start` and `end` count chars (not bytes) from the start of the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span of the chars `from..to` of `lexeme`, where `lexeme` is the text
    /// this span covers.
    pub fn sub_span(&self, lexeme: &str, from: usize, to: usize) -> Span {
        let mut line = self.line;
        let mut column = self.column;
        for ch in lexeme.chars().take(from) {
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Span::new(self.start + from, self.start + to, line, column)
    }
}

/// Token classification, shared by every pipeline stage.
///
/// Each stage only produces a subset of the variants:
/// - raw: `TagOpen`, `TagClose`, `Text`, `Whitespace`
/// - classified: adds `TagVoid`
/// - refined: brackets, names, attributes, `RawText`, `ElseMarker` and the
///   placeholder arguments. `Whitespace` passes through every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    TagOpen,
    TagClose,
    Text,
    Whitespace,

    /// Self-closing tag, or an open tag with no reachable close.
    TagVoid,

    OpenBracket,
    /// `</` of a closing tag.
    EndOpenBracket,
    CloseBracket,
    VoidCloseBracket,
    TagName,
    TagWhitespace,
    /// `name=value`. `value` has its quotes removed; `parts` is its
    /// placeholder decomposition.
    Attribute {
        name: String,
        value: String,
        parts: Vec<Token>,
    },
    BooleanAttribute(String),
    RawText,
    ElseMarker,

    StringArg,
    IntArg,
    BoolArg,
}

impl TokenKind {
    /// Short display name, used by diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::TagOpen => "TagOpen",
            TokenKind::TagClose => "TagClose",
            TokenKind::Text => "Text",
            TokenKind::Whitespace => "Whitespace",
            TokenKind::TagVoid => "TagVoid",
            TokenKind::OpenBracket => "OpenBracket",
            TokenKind::EndOpenBracket => "EndOpenBracket",
            TokenKind::CloseBracket => "CloseBracket",
            TokenKind::VoidCloseBracket => "VoidCloseBracket",
            TokenKind::TagName => "TagName",
            TokenKind::TagWhitespace => "TagWhitespace",
            TokenKind::Attribute { .. } => "Attribute",
            TokenKind::BooleanAttribute(_) => "BooleanAttribute",
            TokenKind::RawText => "RawText",
            TokenKind::ElseMarker => "ElseMarker",
            TokenKind::StringArg => "StringArg",
            TokenKind::IntArg => "IntArg",
            TokenKind::BoolArg => "BoolArg",
        }
    }

    /// Whole-tag kinds produced by the raw and classified stages.
    pub fn is_tag(&self) -> bool {
        matches!(
            self,
            TokenKind::TagOpen | TokenKind::TagClose | TokenKind::TagVoid
        )
    }

    /// Placeholder argument kinds.
    pub fn is_arg(&self) -> bool {
        matches!(
            self,
            TokenKind::StringArg | TokenKind::IntArg | TokenKind::BoolArg
        )
    }
}

/// A token produced by the GTML lexer.
///
/// The lexeme is the verbatim source text the token was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }

    /// Same lexeme and span, different kind.
    pub fn with_kind(&self, kind: TokenKind) -> Self {
        Self {
            kind,
            lexeme: self.lexeme.clone(),
            span: self.span,
        }
    }
}

/// Concatenate the lexemes of `tokens` in order.
pub fn reconstruct(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.lexeme.as_str()).collect()
}

/// Remove every whitespace char from `s`.
pub fn squeeze(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
