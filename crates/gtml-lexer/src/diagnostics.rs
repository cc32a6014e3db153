//! Injectable diagnostics for the tokenizer pipeline.
//!
//! The pipeline never logs to files or holds global state. Callers that want
//! to look at intermediate token lists pass a [`DiagnosticSink`].

use tracing::trace;

use crate::token::Token;

/// A pipeline stage whose output can be inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Raw,
    Classified,
    Refined,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Raw => "raw",
            Stage::Classified => "classified",
            Stage::Refined => "refined",
        }
    }
}

/// Receives every stage's token list as soon as the stage succeeds.
pub trait DiagnosticSink {
    fn record(&mut self, stage: Stage, tokens: &[Token]);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&mut self, _stage: Stage, _tokens: &[Token]) {}
}

/// Forwards each token as a `trace` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&mut self, stage: Stage, tokens: &[Token]) {
        for token in tokens {
            trace!(
                stage = stage.name(),
                kind = token.kind.name(),
                line = token.span.line,
                column = token.span.column,
                lexeme = ?token.lexeme,
                "token"
            );
        }
    }
}

/// Keeps a copy of every recorded stage.
#[derive(Debug, Clone, Default)]
pub struct StageRecorder {
    stages: Vec<(Stage, Vec<Token>)>,
}

impl StageRecorder {
    pub fn stages(&self) -> &[(Stage, Vec<Token>)] {
        &self.stages
    }

    /// The most recent list recorded for `stage`.
    pub fn get(&self, stage: Stage) -> Option<&[Token]> {
        self.stages
            .iter()
            .rev()
            .find(|(s, _)| *s == stage)
            .map(|(_, tokens)| tokens.as_slice())
    }
}

impl DiagnosticSink for StageRecorder {
    fn record(&mut self, stage: Stage, tokens: &[Token]) {
        self.stages.push((stage, tokens.to_vec()));
    }
}
