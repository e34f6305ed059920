//! Tokens: mutually exclusive alternatives decided once per position.
//!
//! All token kinds are tried at a position and the longest match wins (the
//! kind declared first on ties). The outcome is stored in a unit-insensitive
//! memo table, so there is at most one token per position no matter which
//! kind the grammar asks for, and asking again costs a lookup.

use std::fmt;

use common::log_detail;

use super::{MemoEntry, MemoSlot};
use crate::context::{Key, Parse, Value};
use crate::log::{empty_delta, Delta};
use crate::unit::{Rule, Unit};

pub struct Tokens<'g, V> {
    pub(crate) key: Key,
    pub(crate) slot: MemoSlot,
    /// Each kind with the key recorded in memo entries it wins.
    pub(crate) kinds: &'g [(Key, Rule<'g, V>)],
}

impl<'g, V: Value> Tokens<'g, V> {
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn kind(&self, index: usize) -> (Key, Rule<'g, V>) {
        match self.kinds.get(index) {
            Some(&kind) => kind,
            None => panic!("token kind {} out of range ({} kinds)", index, self.kinds.len()),
        }
    }

    /// The token at the cursor. A failed entry means no kind matches here.
    pub fn token_at(&self, parse: &mut Parse<'g, '_, V>) -> MemoEntry<V, ()> {
        let pos0 = parse.pos();
        if let Some(entry) = parse.memo_table::<()>(self.slot).get(self.key, pos0, &()) {
            return entry;
        }

        let log0 = parse.log_size();
        let mut best: Option<(Key, usize, Delta<V>)> = None;
        parse.suppressed(|parse| {
            for &(kind, rule) in self.kinds {
                if !rule.parse(parse) {
                    continue;
                }
                if best.as_ref().map_or(true, |(_, end, _)| parse.pos() > *end) {
                    best = Some((kind, parse.pos(), parse.delta(log0)));
                }
                parse.set_pos(pos0);
                parse.rollback(log0);
            }
        });

        let entry = match best {
            Some((kind, end, delta)) => {
                MemoEntry { unit: kind, start: pos0, ctx: (), success: true, end, delta }
            }
            None => MemoEntry {
                unit: self.key,
                start: pos0,
                ctx: (),
                success: false,
                end: pos0,
                delta: empty_delta(),
            },
        };
        log_detail!(parse.loggers.tokens, "token @{}: {:?}", pos0, entry.success.then_some(entry.end));
        parse.memo_table::<()>(self.slot).memoize(entry.clone());
        entry
    }

    fn accept(&self, parse: &mut Parse<'g, '_, V>, allowed: impl Fn(Key) -> bool) -> bool {
        let entry = self.token_at(parse);
        if !entry.success || !allowed(entry.unit) {
            return false;
        }
        parse.apply_delta(&entry.delta);
        parse.set_pos(entry.end);
        true
    }
}

/// Matches when the token at the cursor is of one kind.
pub struct TokenParser<'g, V> {
    pub(crate) tokens: &'g Tokens<'g, V>,
    pub(crate) index: usize,
}

impl<'g, V: Value> Unit<'g, V> for TokenParser<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let (kind, _) = self.tokens.kind(self.index);
        self.tokens.accept(parse, |unit| unit == kind)
    }

    fn expected(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<V: Value> fmt::Display for TokenParser<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.kind(self.index).1)
    }
}

/// Matches when the token at the cursor is of any of several kinds.
pub struct TokenChoice<'g, V> {
    pub(crate) tokens: &'g Tokens<'g, V>,
    pub(crate) indices: &'g [usize],
}

impl<'g, V: Value> Unit<'g, V> for TokenChoice<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let kinds: Vec<Key> = self.indices.iter().map(|&i| self.tokens.kind(i).0).collect();
        self.tokens.accept(parse, |unit| kinds.contains(&unit))
    }

    fn expected(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<V: Value> fmt::Display for TokenChoice<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &index) in self.indices.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", self.tokens.kind(index).1)?;
        }
        Ok(())
    }
}
