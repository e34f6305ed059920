//! Stack actions and the unit that runs them.
//!
//! An action receives the items a unit pushed on the value stack (and
//! optionally the text or items it matched) and turns them into new state,
//! typically by pushing a single combined value.

use std::fmt;

use crate::context::{Parse, Value};
use crate::error::ActionError;
use crate::unit::{Rule, Unit};

pub type PlainFn<'g, V> =
    dyn for<'p, 'i, 'v> Fn(&'p mut Parse<'g, 'i, V>, &'v [V]) -> Result<(), ActionError> + Sync + 'g;
pub type StringFn<'g, V> = dyn for<'p, 'i, 's, 'v> Fn(&'p mut Parse<'g, 'i, V>, &'s str, &'v [V]) -> Result<(), ActionError>
    + Sync
    + 'g;
pub type ListFn<'g, V> = dyn for<'p, 'i, 'm, 'v> Fn(&'p mut Parse<'g, 'i, V>, &'m [V], &'v [V]) -> Result<(), ActionError>
    + Sync
    + 'g;
pub type PushFn<'g, V> =
    dyn for<'p, 'i, 'v> Fn(&'p mut Parse<'g, 'i, V>, &'v [V]) -> Result<V, ActionError> + Sync + 'g;

/// The four shapes of stack action.
pub enum StackAction<'g, V> {
    /// Receives the collected items.
    Plain(&'g PlainFn<'g, V>),
    /// Also receives the matched text.
    WithString(&'g StringFn<'g, V>),
    /// Also receives the matched items.
    WithList(&'g ListFn<'g, V>),
    /// Returns a value, which is pushed.
    Push(&'g PushFn<'g, V>),
}

impl<V> Clone for StackAction<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for StackAction<'_, V> {}

impl<'g, V: Value> StackAction<'g, V> {
    /// Run the action for a match that started at `pos0`.
    pub fn apply(self, parse: &mut Parse<'g, '_, V>, pos0: usize, items: &[V]) -> Result<(), ActionError> {
        match self {
            StackAction::Plain(f) => f(parse, items),
            StackAction::WithString(f) => {
                let text = parse
                    .matched_text(pos0)
                    .ok_or(ActionError::WrongInput { action: self.kind(), needed: "text" })?;
                f(parse, text, items)
            }
            StackAction::WithList(f) => {
                let list = parse
                    .matched_items(pos0)
                    .ok_or(ActionError::WrongInput { action: self.kind(), needed: "item" })?;
                f(parse, list, items)
            }
            StackAction::Push(f) => {
                let value = f(parse, items)?;
                parse.push(value);
                Ok(())
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StackAction::Plain(_) => "collect",
            StackAction::WithString(_) => "collect_with_string",
            StackAction::WithList(_) => "collect_with_list",
            StackAction::Push(_) => "push",
        }
    }
}

/// Runs its child, then hands the items the child pushed to an action.
///
/// `lookback` extends the collected items with that many items that were
/// already on the stack. Unless `peek_only`, collected items are popped
/// before the action runs.
pub struct Collect<'g, V> {
    pub(crate) child: Rule<'g, V>,
    pub(crate) action: StackAction<'g, V>,
    pub(crate) lookback: usize,
    pub(crate) peek_only: bool,
}

impl<'g, V: Value> Unit<'g, V> for Collect<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let pos0 = parse.pos();
        let size0 = parse.stack().len();
        if !self.child.parse(parse) {
            return false;
        }

        let Some(from) = size0.checked_sub(self.lookback) else {
            parse.throw(ActionError::Lookback { lookback: self.lookback, size: size0 });
            return false;
        };
        let items = if self.peek_only {
            parse.stack().get(from..).map(<[V]>::to_vec).unwrap_or_default()
        } else {
            parse.pop_from(from)
        };

        match self.action.apply(parse, pos0, &items) {
            Ok(()) => true,
            Err(err) => {
                parse.throw(err);
                false
            }
        }
    }
}

impl<V> fmt::Display for Collect<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.child)
    }
}
