//! GTML Parser
//!
//! Runs the tokenizer pipeline and builds the template tree from its refined
//! stage.

use gtml_lexer::{DiagnosticSink, NullSink};
use tracing::debug;

use crate::ast::Node;
use crate::builder::TreeBuilder;
use crate::config::ParserConfig;
use crate::ParseError;

/// GTML parser
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse `source` with the default configuration.
    pub fn parse(source: &str) -> Result<Node, ParseError> {
        Parser::default().parse_source(source)
    }

    pub fn parse_source(&self, source: &str) -> Result<Node, ParseError> {
        self.parse_with(source, &mut NullSink)
    }

    /// Parse `source`, reporting every tokenizer stage to `sink`.
    pub fn parse_with(
        &self,
        source: &str,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Node, ParseError> {
        self.config.validate()?;
        let stages = gtml_lexer::tokenize_stages(source, sink)?;
        let root = TreeBuilder::new(&self.config).build(&stages.refined)?;
        debug!(nodes = root.count(), "built template tree");
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Attribute, Element, VoidElement};
    use crate::config::TextPolicy;
    use gtml_lexer::{LexerErrorKind, Stage, StageRecorder};
    use pretty_assertions::assert_eq;

    fn element(tag: &str, attributes: Vec<Attribute>, children: Vec<Node>) -> Node {
        Node::Element(Element {
            tag: tag.to_string(),
            attributes,
            children,
        })
    }

    fn text(s: &str) -> Node {
        Node::Text(s.to_string())
    }

    fn attr(name: &str, value: &str) -> Attribute {
        Attribute::new(name, Some(value.to_string()))
    }

    fn root(child: Node) -> Node {
        Node::Root {
            children: vec![child],
        }
    }

    fn only_child(source: &str) -> Node {
        let tree = Parser::parse(source).unwrap();
        assert_eq!(tree.children().len(), 1);
        tree.children()[0].clone()
    }

    #[test]
    fn test_login_form() {
        let tree = Parser::parse(
            "<form><h1>Login Form</h1><ul><li><input type='text' name='username'></li></ul></form>",
        )
        .unwrap();
        let input = Node::VoidElement(VoidElement {
            tag: "input".to_string(),
            attributes: vec![attr("type", "text"), attr("name", "username")],
        });
        assert_eq!(
            tree,
            root(element(
                "form",
                vec![],
                vec![
                    element("h1", vec![], vec![text("Login Form")]),
                    element("ul", vec![], vec![element("li", vec![], vec![input])]),
                ]
            ))
        );
    }

    #[test]
    fn test_formatting_whitespace_is_dropped() {
        let source = "<form>\n  <h1>Login Form</h1>\n  <br>\n</form>\n";
        let form = only_child(source);
        assert_eq!(form.tag(), Some("form"));
        assert_eq!(form.children().len(), 2);
        assert_eq!(form.children()[0].children(), &[text("Login Form")]);
        assert_eq!(form.children()[1].tag(), Some("br"));
    }

    #[test]
    fn test_siblings_are_wrapped() {
        assert_eq!(
            Parser::parse("<p>A</p><p>B</p>").unwrap(),
            root(element(
                "span",
                vec![],
                vec![
                    element("p", vec![], vec![text("A")]),
                    element("p", vec![], vec![text("B")]),
                ]
            ))
        );
    }

    #[test]
    fn test_custom_wrapper_tag() {
        let parser = Parser::new(ParserConfig::default().with_wrapper_tag("div"));
        let tree = parser.parse_source("<p>A</p> tail").unwrap();
        assert_eq!(tree.children()[0].tag(), Some("div"));
        assert_eq!(tree.children()[0].children()[1], text(" tail"));
    }

    #[test]
    fn test_top_level_text_is_wrapped() {
        assert_eq!(
            Parser::parse("Hello, %s name%!").unwrap(),
            root(element("span", vec![], vec![text("Hello, %s name%!")]))
        );
    }

    #[test]
    fn test_empty_input() {
        let empty = Node::Root { children: vec![] };
        assert_eq!(Parser::parse("").unwrap(), empty);
        assert_eq!(Parser::parse(" \n\t ").unwrap(), empty);
    }

    #[test]
    fn test_single_void_at_root() {
        assert_eq!(
            Parser::parse("<img src='a.png'/>").unwrap(),
            root(Node::VoidElement(VoidElement {
                tag: "img".to_string(),
                attributes: vec![attr("src", "a.png")],
            }))
        );
    }

    #[test]
    fn test_self_closing_does_not_consume_close() {
        let div = only_child("<div><div/></div>");
        assert_eq!(div.tag(), Some("div"));
        assert!(matches!(div.children(), [Node::VoidElement(_)]));
    }

    #[test]
    fn test_directives_are_plain_attributes() {
        let ul = only_child("<ul _for='item in items'><li _if='%t item.ok%' hidden>%s item.name%</li></ul>");
        let Node::Element(li) = &ul.children()[0] else {
            panic!("Expected element");
        };
        assert_eq!(
            li.attributes,
            vec![attr("_if", "%t item.ok%"), Attribute::new("hidden", None)]
        );
        assert_eq!(li.children, vec![text("%s item.name%")]);
        assert_eq!(ul.attributes(), &[attr("_for", "item in items")]);
    }

    #[test]
    fn test_text_concatenates_by_default() {
        let p = only_child("<p>Hello <b>big</b> world</p>");
        assert_eq!(
            p.children(),
            &[
                text("Hello  world"),
                element("b", vec![], vec![text("big")]),
            ]
        );
    }

    #[test]
    fn test_text_siblings_policy() {
        let parser = Parser::new(ParserConfig::default().with_text_policy(TextPolicy::Siblings));
        let tree = parser.parse_source("<p>Hello <b>big</b> world</p>").unwrap();
        assert_eq!(
            tree.children()[0].children(),
            &[
                text("Hello "),
                element("b", vec![], vec![text("big")]),
                text(" world"),
            ]
        );
    }

    #[test]
    fn test_else_marker_node() {
        let div = only_child("<div _if='%t ok%'><p>yes</p> ::? <p>no</p></div>");
        assert_eq!(
            div.children(),
            &[
                element("p", vec![], vec![text("yes")]),
                Node::ElseMarker,
                element("p", vec![], vec![text("no")]),
            ]
        );
    }

    #[test]
    fn test_else_marker_separates_text() {
        let p = only_child("<p>on<i></i>::?<i></i>off</p>");
        let i = element("i", vec![], vec![]);
        assert_eq!(
            p.children(),
            &[text("on"), i.clone(), Node::ElseMarker, i, text("off")]
        );
    }

    #[test]
    fn test_else_marker_between_placeholders() {
        let p = only_child("<p>%s a% ::? %s b%</p>");
        assert_eq!(p.children(), &[text("%s a%"), Node::ElseMarker, text("%s b%")]);
    }

    #[test]
    fn test_tree_agrees_with_refined_else_markers() {
        let source = "<div>%t on% ::? off<i></i>::?%d n%</div>";
        let refined = gtml_lexer::tokenize(source).unwrap();
        let in_stream = refined
            .iter()
            .filter(|t| t.kind == gtml_lexer::TokenKind::ElseMarker)
            .count();
        let mut in_tree = 0;
        Parser::parse(source)
            .unwrap()
            .walk(&mut |node, _, _| in_tree += usize::from(*node == Node::ElseMarker));
        assert_eq!(in_tree, in_stream);
    }

    #[test]
    fn test_self_closing_with_space_before_gt() {
        assert_eq!(
            only_child("<a/ >"),
            Node::VoidElement(VoidElement {
                tag: "a".to_string(),
                attributes: vec![],
            })
        );
    }

    #[test]
    fn test_duplicate_attribute_last_wins() {
        let input = only_child("<input name='a' id='x' name='b'>");
        assert_eq!(input.attributes(), &[attr("name", "b"), attr("id", "x")]);
    }

    #[test]
    fn test_depth_limit() {
        let parser = Parser::new(ParserConfig::default().with_max_depth(2));
        let err = parser.parse_source("<a><b><c></c></b></a>").unwrap_err();
        assert_eq!(
            err,
            ParseError::DepthLimit {
                limit: 2,
                line: 1,
                column: 7
            }
        );
        assert!(parser.parse_source("<a><b></b></a>").is_ok());
    }

    #[test]
    fn test_deep_nesting_within_default_limit() {
        let source = format!("{}{}", "<div>".repeat(200), "</div>".repeat(200));
        let tree = Parser::parse(&source).unwrap();
        assert_eq!(tree.count(), 201);
    }

    #[test]
    fn test_stray_close_tag() {
        match Parser::parse("<div></span></div>").unwrap_err() {
            ParseError::Structural { lexeme, line, column, .. } => {
                assert_eq!(lexeme, "</span>");
                assert_eq!((line, column), (1, 6));
            }
            other => panic!("Expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn test_overlapping_tags() {
        match Parser::parse("<a><b></a></b>").unwrap_err() {
            ParseError::Structural { lexeme, .. } => assert_eq!(lexeme, "<b>"),
            other => panic!("Expected structural error, got {other:?}"),
        }
    }

    #[test]
    fn test_leading_close_tag() {
        let err = Parser::parse("</p><p></p>").unwrap_err();
        assert!(matches!(err, ParseError::Structural { .. }));
        assert_eq!(err.location(), Some((1, 1)));
    }

    #[test]
    fn test_lexer_errors_propagate() {
        match Parser::parse("<p>%q x%</p>").unwrap_err() {
            ParseError::Lexer(e) => assert_eq!(e.kind, LexerErrorKind::InvalidPlaceholder),
            other => panic!("Expected lexer error, got {other:?}"),
        }
        match Parser::parse("<p>text</p").unwrap_err() {
            ParseError::Lexer(e) => assert_eq!(e.kind, LexerErrorKind::UnterminatedTag),
            other => panic!("Expected lexer error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_is_rejected_before_tokenizing() {
        let parser = Parser::new(ParserConfig::default().with_max_depth(0));
        let err = parser.parse_source("<p>%q x%</p>").unwrap_err();
        assert!(matches!(err, ParseError::Config(_)));
        assert_eq!(err.location(), None);
    }

    #[test]
    fn test_parse_with_records_stages() {
        let mut recorder = StageRecorder::default();
        Parser::default()
            .parse_with("<p>%s name%</p>", &mut recorder)
            .unwrap();
        let stages: Vec<Stage> = recorder.stages().iter().map(|(s, _)| *s).collect();
        assert_eq!(stages, vec![Stage::Raw, Stage::Classified, Stage::Refined]);
        assert_eq!(recorder.get(Stage::Raw).map(<[_]>::len), Some(3));
    }
}
