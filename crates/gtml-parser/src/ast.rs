//! Tree produced from a GTML template.
//!
//! Ownership is strictly tree-shaped: every node owns its children and no node
//! points back at its parent. Traversals that need the parent get it passed in
//! by [`Node::walk`].

use serde::Serialize;

/// A node of the template tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Node {
    /// The single root of a tree.
    Root { children: Vec<Node> },

    /// An element with an explicit closing tag.
    Element(Element),

    /// An element that is never closed in the template. Has no children.
    VoidElement(VoidElement),

    /// Text content, placeholders included verbatim.
    Text(String),

    /// The `::?` separating the two branches of conditional content.
    ElseMarker,
}

/// An element and its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoidElement {
    pub tag: String,
    pub attributes: Vec<Attribute>,
}

/// An attribute on an element. `value` is `None` for boolean attributes and
/// has its quotes removed otherwise. Directives such as `_if` and `_for` are
/// ordinary attributes here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Look up an attribute by name.
fn find<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|a| a.name == name)
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find(&self.attributes, name)
    }
}

impl VoidElement {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find(&self.attributes, name)
    }
}

impl Node {
    /// Child nodes. Always empty for leaves.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Root { children } => children,
            Node::Element(el) => &el.children,
            Node::VoidElement(_) | Node::Text(_) | Node::ElseMarker => &[],
        }
    }

    /// Tag name of an element or void element.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Element(el) => Some(&el.tag),
            Node::VoidElement(el) => Some(&el.tag),
            Node::Root { .. } | Node::Text(_) | Node::ElseMarker => None,
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        match self {
            Node::Element(el) => &el.attributes,
            Node::VoidElement(el) => &el.attributes,
            Node::Root { .. } | Node::Text(_) | Node::ElseMarker => &[],
        }
    }

    /// Visit this node and every descendant, depth first, parents before
    /// children. The visitor gets the node, its parent and its depth (0 for
    /// the node `walk` was called on).
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&Node, Option<&Node>, usize),
    {
        self.walk_from(None, 0, visit);
    }

    fn walk_from<F>(&self, parent: Option<&Node>, depth: usize, visit: &mut F)
    where
        F: FnMut(&Node, Option<&Node>, usize),
    {
        visit(self, parent, depth);
        for child in self.children() {
            child.walk_from(Some(self), depth + 1, visit);
        }
    }

    /// Number of nodes in this subtree, this node included.
    pub fn count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_, _, _| count += 1);
        count
    }
}
