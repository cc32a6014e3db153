//! Tree builder configuration.

use crate::ParseError;

/// How text runs inside one parent become `Text` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextPolicy {
    /// All text of a parent accumulates into one `Text` child, placed where
    /// the first run appeared. An else-marker starts a new accumulation so each
    /// branch keeps its own text.
    #[default]
    Concatenate,
    /// Every contiguous text run is its own `Text` child.
    Siblings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Deepest element nesting accepted before failing with `DepthLimit`.
    pub max_depth: usize,
    /// Tag of the element synthesized around templates with several
    /// top-level nodes.
    pub wrapper_tag: String,
    pub text_policy: TextPolicy,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            wrapper_tag: "span".to_string(),
            text_policy: TextPolicy::default(),
        }
    }
}

impl ParserConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_wrapper_tag(mut self, tag: impl Into<String>) -> Self {
        self.wrapper_tag = tag.into();
        self
    }

    pub fn with_text_policy(mut self, policy: TextPolicy) -> Self {
        self.text_policy = policy;
        self
    }

    /// Reject settings the builder cannot honour.
    pub fn validate(&self) -> Result<(), ParseError> {
        if self.max_depth == 0 {
            return Err(ParseError::Config("max_depth must be at least 1".to_string()));
        }
        if self.wrapper_tag.is_empty() || self.wrapper_tag.contains(char::is_whitespace) {
            return Err(ParseError::Config(format!(
                "wrapper tag {:?} must be a non-empty name without whitespace",
                self.wrapper_tag
            )));
        }
        Ok(())
    }
}
