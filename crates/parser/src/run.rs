use common::{log, LineMap};

use crate::context::{Input, Parse, Value};
use crate::error::{ActionError, Diagnostic};
use crate::unit::Rule;

/// Options for a single parse invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep the stack of active units at the furthest failure.
    pub track_call_stack: bool,
    /// Log every unit entered and exited, regardless of `DEBUG`.
    pub trace: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { track_call_stack: true, trace: false }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track_call_stack(mut self, enabled: bool) -> Self {
        self.track_call_stack = enabled;
        self
    }

    pub fn trace(mut self, enabled: bool) -> Self {
        self.trace = enabled;
        self
    }
}

/// Outcome of running a grammar on an input.
#[derive(Debug, Clone)]
pub struct ParseResult<V> {
    pub success: bool,
    /// Whether the match covered the whole input.
    pub full_match: bool,
    /// End of the match, or 0 on failure.
    pub match_size: usize,
    pub input_size: usize,
    pub value_stack: Vec<V>,
    /// Furthest position where a unit failed, if any did.
    pub error_position: Option<usize>,
    /// What was expected at the error position.
    pub expected: Vec<String>,
    /// Units that were running at the furthest failure, outermost first.
    pub error_trace: Vec<String>,
    /// Error raised by a stack action, which aborted the parse.
    pub thrown: Option<ActionError>,
    thrown_at: Option<usize>,
}

impl<V> ParseResult<V> {
    /// Where reporting should point: the action error, the furthest
    /// failure, or the end of a partial match.
    pub fn report_position(&self) -> Option<usize> {
        if self.full_match {
            return None;
        }
        self.thrown_at.or(self.error_position).or(Some(self.match_size))
    }

    /// Describe why the input was not fully matched, for text input.
    pub fn diagnostic(&self, text: &str) -> Option<Diagnostic> {
        let pos = self.report_position()?;
        let map = LineMap::new(text);
        let loc = map.loc(pos);
        let source_line = map.line_text(loc.line).to_string();

        let msg = match &self.thrown {
            Some(err) => format!("action failed: {}", err),
            None => {
                let expected = if self.expected.is_empty() {
                    "end of input".to_string()
                } else {
                    self.expected.join(" or ")
                };
                let found = match text.get(pos..).and_then(|rest| rest.chars().next()) {
                    None => "end of input".to_string(),
                    Some(c) if c.is_whitespace() => "whitespace".to_string(),
                    Some(c) => format!("'{}'", c),
                };
                format!("expected {}, found {}", expected, found)
            }
        };
        Some(Diagnostic { msg, loc, source_line })
    }
}

/// Run `root` on `input` with default options.
pub fn run<'g, V: Value>(root: Rule<'g, V>, input: Input<'_, V>, context: Option<V>) -> ParseResult<V> {
    run_with(root, input, context, &ParseOptions::default())
}

pub fn run_with<'g, V: Value>(
    root: Rule<'g, V>,
    input: Input<'_, V>,
    context: Option<V>,
    options: &ParseOptions,
) -> ParseResult<V> {
    let mut parse = Parse::new(input, context, options);
    log!(parse.loggers.parse, "run {} on {} input units", root, input.len());
    let success = root.parse(&mut parse);
    if success {
        log!(parse.loggers.parse, "matched {} of {}", parse.pos(), input.len());
    } else {
        log!(parse.loggers.parse, "no match, furthest failure {:?}", parse.furthest_failure());
    }

    let outcome = parse.finish();
    let (thrown_at, thrown) = outcome.thrown.unzip();
    let match_size = if success { outcome.pos } else { 0 };
    ParseResult {
        success,
        full_match: success && match_size == input.len(),
        match_size,
        input_size: input.len(),
        value_stack: outcome.stack,
        error_position: outcome.furthest,
        expected: outcome.expected,
        error_trace: outcome.trace,
        thrown,
        thrown_at,
    }
}
