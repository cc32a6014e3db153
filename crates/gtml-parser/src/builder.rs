//! Tree construction from a refined token stream.
//!
//! The refined stream is regrouped first: the bracket run of every tag becomes
//! one whole-tag token again (`TagOpen`, `TagClose` or `TagVoid`) that keeps its
//! refined parts, and content tokens pass through unchanged. Nesting is then
//! resolved like bracket matching. [`shed_outer_html`] strips the outer
//! open/close pair of a sequence that is exactly one element, and the builder
//! recurses into every element's matched sub-range. Each recursive call gets a
//! strictly shorter range, so construction always terminates;
//! `ParserConfig::max_depth` bounds how deep it goes.

use gtml_lexer::token::reconstruct;
use gtml_lexer::{classify, Span, Token, TokenKind};
use tracing::{debug, trace};

use crate::ast::{Attribute, Element, Node, VoidElement};
use crate::config::{ParserConfig, TextPolicy};
use crate::ParseError;

/// True when `tokens` is exactly one element and its descendants, with
/// nothing outside it.
///
/// Sequences that start with text, a void tag, or nothing at all are never
/// self-contained. A sequence starting with a close tag is an error.
pub fn is_self_contained(tokens: &[Token]) -> Result<bool, ParseError> {
    match tokens.first().map(|t| &t.kind) {
        Some(TokenKind::TagOpen | TokenKind::TagClose) => {}
        _ => return Ok(false),
    }
    Ok(shed_outer_html(tokens)?.len() < tokens.len())
}

/// Strip the first and last tokens when the first is an open tag whose match
/// is the last token. Otherwise return `tokens` unchanged: the sequence holds
/// several top-level siblings and cannot be unwrapped.
///
/// The first token must be an open (or void) tag.
pub fn shed_outer_html(tokens: &[Token]) -> Result<&[Token], ParseError> {
    let Some(first) = tokens.first() else {
        return Ok(tokens);
    };
    match first.kind {
        TokenKind::TagOpen => {}
        TokenKind::TagVoid => return Ok(tokens),
        _ => {
            return Err(ParseError::structural(
                "cannot shed the outer html of a sequence that does not start with an open tag",
                first,
            ));
        }
    }
    match classify::closing_tag(tokens, 0)? {
        Some(close) if close == tokens.len() - 1 => Ok(&tokens[1..close]),
        _ => Ok(tokens),
    }
}

/// Builds a [`Node::Root`] tree.
pub struct TreeBuilder<'a> {
    config: &'a ParserConfig,
}

/// A regrouped stream. `tokens[i]` is a whole-tag or content token and
/// `parts[i]` holds the refined pieces of tag `i` (empty for content).
#[derive(Debug, Clone, Copy)]
struct Units<'t> {
    tokens: &'t [Token],
    parts: &'t [Vec<Token>],
}

impl<'t> Units<'t> {
    fn len(&self) -> usize {
        self.tokens.len()
    }

    fn range(&self, from: usize, to: usize) -> Units<'t> {
        Units {
            tokens: &self.tokens[from..to],
            parts: &self.parts[from..to],
        }
    }
}

impl<'a> TreeBuilder<'a> {
    pub fn new(config: &'a ParserConfig) -> Self {
        Self { config }
    }

    /// Build the tree for a whole template from its refined tokens.
    ///
    /// `Whitespace` tokens are dropped. When what remains is not a single
    /// element, it is wrapped in a synthesized `wrapper_tag` element so the
    /// root has one child.
    pub fn build(&self, refined: &[Token]) -> Result<Node, ParseError> {
        let (tokens, parts) = regroup(refined)?;
        let units = Units {
            tokens: &tokens,
            parts: &parts,
        };

        if tokens.is_empty() {
            return Ok(Node::Root {
                children: Vec::new(),
            });
        }

        let child = if tokens.len() == 1 && tokens[0].kind == TokenKind::TagVoid {
            void_element(&tokens[0], &parts[0])?
        } else if is_self_contained(&tokens)? {
            self.element(units, 1)?
        } else {
            debug!(
                tag = %self.config.wrapper_tag,
                "template has several top-level nodes, wrapping"
            );
            Node::Element(Element {
                tag: self.config.wrapper_tag.clone(),
                attributes: Vec::new(),
                children: self.children(units, 1)?,
            })
        };

        Ok(Node::Root {
            children: vec![child],
        })
    }

    /// Build one element from its full range, open and close included.
    fn element(&self, units: Units<'_>, depth: usize) -> Result<Node, ParseError> {
        let open = &units.tokens[0];
        if depth > self.config.max_depth {
            return Err(ParseError::DepthLimit {
                limit: self.config.max_depth,
                line: open.span.line,
                column: open.span.column,
            });
        }

        let inner = shed_outer_html(units.tokens)?;
        if inner.len() == units.len() {
            return Err(ParseError::structural(
                "element is not closed at the end of its range",
                open,
            ));
        }

        let (tag, attributes) = tag_parts(open, &units.parts[0])?;
        let children = self.children(units.range(1, units.len() - 1), depth)?;
        Ok(Node::Element(Element {
            tag,
            attributes,
            children,
        }))
    }

    /// Build the content of a node at `depth`, left to right.
    fn children(&self, units: Units<'_>, depth: usize) -> Result<Vec<Node>, ParseError> {
        let mut children = Vec::new();
        let mut text = TextRun::new(self.config.text_policy);
        let mut i = 0;

        while i < units.len() {
            let token = &units.tokens[i];
            match &token.kind {
                TokenKind::ElseMarker => {
                    text.reset();
                    children.push(Node::ElseMarker);
                }
                TokenKind::RawText
                | TokenKind::StringArg
                | TokenKind::IntArg
                | TokenKind::BoolArg => text.append(&mut children, &token.lexeme),
                TokenKind::TagVoid => {
                    text.interrupt();
                    children.push(void_element(token, &units.parts[i])?);
                }
                TokenKind::TagOpen => {
                    let Some(close) = classify::closing_tag(units.tokens, i)? else {
                        return Err(ParseError::structural(
                            "element is not closed before the end of its parent",
                            token,
                        ));
                    };
                    text.interrupt();
                    children.push(self.element(units.range(i, close + 1), depth + 1)?);
                    i = close + 1;
                    continue;
                }
                TokenKind::TagClose => {
                    return Err(ParseError::structural(
                        "closing tag has no matching open tag",
                        token,
                    ));
                }
                other => {
                    return Err(ParseError::structural(
                        format!("unexpected {} token in tree input", other.name()),
                        token,
                    ));
                }
            }
            i += 1;
        }

        Ok(children)
    }
}

/// Turn every bracket run of a refined stream back into one whole-tag token,
/// keeping the run as that tag's parts. `Whitespace` is dropped.
fn regroup(refined: &[Token]) -> Result<(Vec<Token>, Vec<Vec<Token>>), ParseError> {
    let mut tokens = Vec::new();
    let mut parts = Vec::new();
    let mut i = 0;

    while i < refined.len() {
        let token = &refined[i];
        match &token.kind {
            TokenKind::OpenBracket | TokenKind::EndOpenBracket => {
                let Some(last) = refined[i..].iter().position(closes_tag) else {
                    return Err(ParseError::structural("tag has no closing bracket", token));
                };
                let run = &refined[i..=i + last];
                tokens.push(whole_tag(run));
                parts.push(run.to_vec());
                i += last + 1;
                continue;
            }
            TokenKind::Whitespace => {}
            kind if kind.is_tag() || *kind == TokenKind::Text => {
                return Err(ParseError::structural(
                    format!("expected refined tokens, found {}", kind.name()),
                    token,
                ));
            }
            _ => {
                tokens.push(token.clone());
                parts.push(Vec::new());
            }
        }
        i += 1;
    }

    Ok((tokens, parts))
}

fn closes_tag(token: &Token) -> bool {
    matches!(
        token.kind,
        TokenKind::CloseBracket | TokenKind::VoidCloseBracket
    )
}

/// The whole-tag token a bracket run was cut from.
fn whole_tag(run: &[Token]) -> Token {
    let (first, last) = (&run[0], &run[run.len() - 1]);
    let kind = if first.kind == TokenKind::EndOpenBracket {
        TokenKind::TagClose
    } else if last.kind == TokenKind::VoidCloseBracket {
        TokenKind::TagVoid
    } else {
        TokenKind::TagOpen
    };
    let span = Span::new(
        first.span.start,
        last.span.end,
        first.span.line,
        first.span.column,
    );
    Token::new(kind, reconstruct(run), span)
}

fn void_element(token: &Token, parts: &[Token]) -> Result<Node, ParseError> {
    let (tag, attributes) = tag_parts(token, parts)?;
    Ok(Node::VoidElement(VoidElement { tag, attributes }))
}

/// Tag name and attributes from the refined parts of `token`. A repeated
/// attribute keeps the position of its first occurrence and the value of its
/// last.
fn tag_parts(token: &Token, parts: &[Token]) -> Result<(String, Vec<Attribute>), ParseError> {
    let mut tag = String::new();
    let mut attributes: Vec<Attribute> = Vec::new();

    for piece in parts {
        let attribute = match &piece.kind {
            TokenKind::TagName => {
                tag = piece.lexeme.clone();
                continue;
            }
            TokenKind::Attribute { name, value, .. } => {
                Attribute::new(name.clone(), Some(value.clone()))
            }
            TokenKind::BooleanAttribute(name) => Attribute::new(name.clone(), None),
            _ => continue,
        };
        match attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => {
                trace!(tag = %tag, name = %attribute.name, "duplicate attribute, last one wins");
                *existing = attribute;
            }
            None => attributes.push(attribute),
        }
    }

    if tag.is_empty() {
        return Err(ParseError::structural("tag has no name", token));
    }
    Ok((tag, attributes))
}

/// Where the next text run of a parent goes.
struct TextRun {
    policy: TextPolicy,
    slot: Option<usize>,
}

impl TextRun {
    fn new(policy: TextPolicy) -> Self {
        Self { policy, slot: None }
    }

    fn append(&mut self, children: &mut Vec<Node>, text: &str) {
        if let Some(Node::Text(content)) = self.slot.and_then(|i| children.get_mut(i)) {
            content.push_str(text);
            return;
        }
        self.slot = Some(children.len());
        children.push(Node::Text(text.to_string()));
    }

    /// A non-text node was appended.
    fn interrupt(&mut self) {
        if self.policy == TextPolicy::Siblings {
            self.slot = None;
        }
    }

    fn reset(&mut self) {
        self.slot = None;
    }
}
