use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::debug::{create_logger, Logger};
use common::{log_detail, log_trace};
use hashbrown::HashMap;

use crate::error::ActionError;
use crate::log::{self, Delta, Log, SideEffect, State};
use crate::memo::{MemoContext, MemoSlot, Memoizer};
use crate::run::ParseOptions;
use crate::unit::Rule;

/// Values carried on the parse stack.
pub trait Value: Clone + fmt::Debug + 'static {}

impl<T: Clone + fmt::Debug + 'static> Value for T {}

/// What a parse runs over: text (byte offsets) or a slice of items.
#[derive(Debug)]
pub enum Input<'i, V> {
    Text(&'i str),
    Items(&'i [V]),
}

impl<'i, V> Clone for Input<'i, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'i, V> Copy for Input<'i, V> {}

impl<'i, V> Input<'i, V> {
    pub fn len(&self) -> usize {
        match self {
            Input::Text(text) => text.len(),
            Input::Items(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'i, V> From<&'i str> for Input<'i, V> {
    fn from(text: &'i str) -> Self {
        Input::Text(text)
    }
}

impl<'i, V> From<&'i [V]> for Input<'i, V> {
    fn from(items: &'i [V]) -> Self {
        Input::Items(items)
    }
}

/// Identity of a stateful unit inside the per-parse context store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(usize);

impl Key {
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        Key(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Loggers used while parsing.
pub(crate) struct Loggers {
    pub parse: Logger,
    pub memo: Logger,
    pub leftrec: Logger,
    pub tokens: Logger,
}

impl Loggers {
    fn new(options: &ParseOptions) -> Self {
        let parse = if options.trace { Logger::forced("parse", 3) } else { create_logger("parse") };
        Self {
            parse,
            memo: create_logger("memo"),
            leftrec: create_logger("leftrec"),
            tokens: create_logger("tokens"),
        }
    }
}

/// State of a single parse invocation.
///
/// Units move the cursor directly but change the value stack and variables
/// only through the side-effect log, so that a failing unit can restore
/// everything it touched.
pub struct Parse<'g, 'i, V> {
    input: Input<'i, V>,
    pos: usize,
    state: State<V>,
    log: Log<V>,
    context: Option<V>,

    // Furthest failure tracking for error reporting.
    furthest: Option<usize>,
    expected: Vec<String>,
    failure_trace: Vec<Rule<'g, V>>,
    trace: Vec<Rule<'g, V>>,
    suppress: usize,

    /// Invocation-scoped state of memo tables and left-recursive units.
    store: HashMap<Key, Box<dyn Any>>,
    thrown: Option<(usize, ActionError)>,

    track_call_stack: bool,
    pub(crate) loggers: Loggers,
}

impl<'g, 'i, V: Value> Parse<'g, 'i, V> {
    pub fn new(input: Input<'i, V>, context: Option<V>, options: &ParseOptions) -> Self {
        Self {
            input,
            pos: 0,
            state: State::default(),
            log: Log::default(),
            context,
            furthest: None,
            expected: Vec::new(),
            failure_trace: Vec::new(),
            trace: Vec::new(),
            suppress: 0,
            store: HashMap::new(),
            thrown: None,
            track_call_stack: options.track_call_stack,
            loggers: Loggers::new(options),
        }
    }

    // =========================================================================
    // Input and cursor
    // =========================================================================

    pub fn input(&self) -> Input<'i, V> {
        self.input
    }

    pub fn text(&self) -> Option<&'i str> {
        match self.input {
            Input::Text(text) => Some(text),
            Input::Items(_) => None,
        }
    }

    pub fn items(&self) -> Option<&'i [V]> {
        match self.input {
            Input::Items(items) => Some(items),
            Input::Text(_) => None,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Character under the cursor, for text input.
    pub fn current_char(&self) -> Option<char> {
        self.text().and_then(|text| text.get(self.pos..)).and_then(|rest| rest.chars().next())
    }

    /// Item under the cursor, for item input.
    pub fn current_item(&self) -> Option<&'i V> {
        self.items().and_then(|items| items.get(self.pos))
    }

    /// Text between `start` and the cursor.
    pub fn matched_text(&self, start: usize) -> Option<&'i str> {
        self.text().and_then(|text| text.get(start..self.pos))
    }

    /// Items between `start` and the cursor.
    pub fn matched_items(&self, start: usize) -> Option<&'i [V]> {
        self.items().and_then(|items| items.get(start..self.pos))
    }

    /// The value passed to the run entry point, if any.
    pub fn context(&self) -> Option<&V> {
        self.context.as_ref()
    }

    // =========================================================================
    // State and side effects
    // =========================================================================

    pub fn stack(&self) -> &[V] {
        &self.state.stack
    }

    pub fn var(&self, name: &str) -> Option<&V> {
        self.state.vars.get(name)
    }

    pub fn apply(&mut self, effect: SideEffect<V>) {
        self.log.apply(&mut self.state, effect);
    }

    pub fn push(&mut self, value: V) {
        self.apply(log::push(value));
    }

    /// Pop every item above `size`, returning them bottom first.
    pub fn pop_from(&mut self, size: usize) -> Vec<V> {
        let size = size.min(self.state.stack.len());
        let items = self.state.stack[size..].to_vec();
        if !items.is_empty() {
            self.apply(log::pop_top(items.len()));
        }
        items
    }

    pub fn pop(&mut self) -> Option<V> {
        let size = self.state.stack.len().checked_sub(1)?;
        self.pop_from(size).pop()
    }

    pub fn set_var(&mut self, name: &'static str, value: V) {
        self.apply(log::set_var(name, value));
    }

    pub fn log_size(&self) -> usize {
        self.log.size()
    }

    pub fn rollback(&mut self, size: usize) {
        self.log.rollback(&mut self.state, size);
    }

    pub fn delta(&self, start: usize) -> Delta<V> {
        self.log.delta(start)
    }

    pub fn apply_delta(&mut self, delta: &Delta<V>) {
        self.log.apply_all(&mut self.state, delta);
    }

    /// Abort the invocation. Every unit fails from here on.
    pub fn throw(&mut self, error: ActionError) {
        if self.thrown.is_none() {
            self.thrown = Some((self.pos, error));
        }
    }

    pub fn aborted(&self) -> bool {
        self.thrown.is_some()
    }

    // =========================================================================
    // Context store
    // =========================================================================

    /// Invocation-scoped state owned by the unit or table with `key`,
    /// created on first use.
    pub fn state_for<T: Any>(&mut self, key: Key, init: impl FnOnce() -> T) -> &mut T {
        self.store
            .entry(key)
            .or_insert_with(|| Box::new(init()))
            .downcast_mut::<T>()
            .expect("context store entry accessed with two different types")
    }

    pub(crate) fn memo_table<C: MemoContext>(
        &mut self,
        slot: MemoSlot,
    ) -> &mut (dyn Memoizer<V, C> + 'static) {
        self.state_for(slot.key(), || slot.build::<V, C>()).as_mut()
    }

    // =========================================================================
    // Failure tracking
    // =========================================================================

    pub fn furthest_failure(&self) -> Option<usize> {
        self.furthest
    }

    pub fn expected(&self) -> &[String] {
        &self.expected
    }

    /// Run `f` with failure recording turned off.
    pub fn suppressed<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.suppress += 1;
        let result = f(self);
        self.suppress -= 1;
        result
    }

    pub(crate) fn enter(&mut self, unit: Rule<'g, V>, quiet: bool) {
        if quiet {
            self.suppress += 1;
        }
        if self.track_call_stack {
            self.trace.push(unit);
        }
        if self.loggers.parse.enabled() {
            log_trace!(self.loggers.parse, "{} @{}", unit, self.pos);
            self.loggers.parse.push_indent();
        }
    }

    pub(crate) fn exit(&mut self, unit: Rule<'g, V>, quiet: bool, success: bool) {
        if self.loggers.parse.enabled() {
            self.loggers.parse.pop_indent();
            log_trace!(self.loggers.parse, "{} {} @{}", if success { "+" } else { "-" }, unit, self.pos);
        }
        if self.track_call_stack {
            self.trace.pop();
        }
        if quiet {
            self.suppress -= 1;
        }
    }

    /// Record that `unit` failed when started at `pos`.
    pub(crate) fn record_failure(&mut self, unit: Rule<'g, V>, pos: usize) {
        if self.suppress > 0 {
            return;
        }
        match self.furthest {
            Some(furthest) if pos < furthest => {}
            Some(furthest) if pos == furthest => {
                if let Some(expected) = unit.expected() {
                    if !self.expected.contains(&expected) {
                        self.expected.push(expected);
                    }
                }
            }
            _ => {
                log_detail!(self.loggers.parse, "furthest failure now {} ({})", pos, unit);
                self.furthest = Some(pos);
                self.expected.clear();
                self.expected.extend(unit.expected());
                if self.track_call_stack {
                    self.failure_trace.clone_from(&self.trace);
                }
            }
        }
    }

    // =========================================================================
    // Teardown
    // =========================================================================

    pub(crate) fn finish(self) -> Outcome<V> {
        Outcome {
            pos: self.pos,
            stack: self.state.stack,
            furthest: self.furthest,
            expected: self.expected,
            trace: self.failure_trace.iter().map(|unit| unit.to_string()).collect(),
            thrown: self.thrown,
        }
    }
}

/// What is left of a parse once it has finished.
pub(crate) struct Outcome<V> {
    pub pos: usize,
    pub stack: Vec<V>,
    pub furthest: Option<usize>,
    pub expected: Vec<String>,
    pub trace: Vec<String>,
    pub thrown: Option<(usize, ActionError)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Parse<'static, '_, i32> {
        Parse::new(Input::Text(text), None, &ParseOptions::default())
    }

    #[test]
    fn test_keys_are_unique() {
        let a = Key::fresh();
        let b = Key::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn test_current_char_and_matched_text() {
        let mut p = parse("héllo");
        assert_eq!(p.current_char(), Some('h'));
        p.set_pos(1);
        assert_eq!(p.current_char(), Some('é'));
        p.set_pos(3);
        assert_eq!(p.matched_text(0), Some("hé"));
        p.set_pos(6);
        assert!(p.at_end());
        assert_eq!(p.current_char(), None);
    }

    #[test]
    fn test_item_input() {
        let items = [1, 2, 3];
        let mut p: Parse<'static, '_, i32> =
            Parse::new(Input::Items(&items), None, &ParseOptions::default());
        assert_eq!(p.current_item(), Some(&1));
        p.set_pos(2);
        assert_eq!(p.matched_items(0), Some(&items[..2]));
        assert_eq!(p.text(), None);
        assert_eq!(p.current_char(), None);
    }

    #[test]
    fn test_pop_from_is_undoable() {
        let mut p = parse("");
        p.push(1);
        p.push(2);
        p.push(3);
        let mark = p.log_size();
        assert_eq!(p.pop_from(1), vec![2, 3]);
        assert_eq!(p.stack(), &[1]);
        assert_eq!(p.pop(), Some(1));
        assert_eq!(p.pop(), None);
        p.rollback(mark);
        assert_eq!(p.stack(), &[1, 2, 3]);
    }

    #[test]
    fn test_pop_from_above_top_is_noop() {
        let mut p = parse("");
        p.push(1);
        let size = p.log_size();
        assert!(p.pop_from(4).is_empty());
        assert_eq!(p.log_size(), size);
    }

    #[test]
    fn test_state_for_is_lazy_and_persistent() {
        let mut p = parse("");
        let key = Key::fresh();
        *p.state_for(key, || 1usize) += 1;
        assert_eq!(*p.state_for(key, || 100usize), 2);
    }

    #[test]
    fn test_throw_keeps_first_error() {
        let mut p = parse("abc");
        p.set_pos(1);
        p.throw(ActionError::new("first"));
        p.set_pos(2);
        p.throw(ActionError::new("second"));
        assert!(p.aborted());
        let outcome = p.finish();
        assert_eq!(outcome.thrown, Some((1, ActionError::new("first"))));
    }
}
