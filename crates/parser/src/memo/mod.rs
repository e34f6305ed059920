//! Memoization of unit results.
//!
//! A memo entry maps (unit, position, context) to the outcome of running
//! that unit there: success, end position, and the log delta it produced.
//! Replaying an entry applies the delta and moves the cursor, without
//! running the unit again.
//!
//! Tables live in the parse's context store, so they exist only for the
//! duration of one invocation. A table is either unit-sensitive (general
//! memoization, entries of different units never match) or unit-insensitive
//! (one entry per position and context, used by [`Tokens`]).

mod cache;
mod table;
mod tokens;

use std::fmt;
use std::hash::Hash;

use common::log_detail;

pub use cache::MemoCache;
pub use table::MemoTable;
pub use tokens::{TokenChoice, TokenParser, Tokens};

use crate::context::{Key, Parse, Value};
use crate::log::{empty_delta, Delta};
use crate::unit::{Rule, Unit};

/// Values a context extractor may produce.
pub trait MemoContext: Hash + Eq + Clone + fmt::Debug + 'static {}

impl<T: Hash + Eq + Clone + fmt::Debug + 'static> MemoContext for T {}

pub struct MemoEntry<V, C> {
    /// The unit that produced the entry.
    pub unit: Key,
    pub start: usize,
    pub ctx: C,
    pub success: bool,
    pub end: usize,
    /// Effects of a successful match, empty for failures.
    pub delta: Delta<V>,
}

impl<V, C: Clone> Clone for MemoEntry<V, C> {
    fn clone(&self) -> Self {
        Self {
            unit: self.unit,
            start: self.start,
            ctx: self.ctx.clone(),
            success: self.success,
            end: self.end,
            delta: self.delta.clone(),
        }
    }
}

impl<V, C: fmt::Debug> fmt::Debug for MemoEntry<V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoEntry")
            .field("unit", &self.unit)
            .field("start", &self.start)
            .field("ctx", &self.ctx)
            .field("success", &self.success)
            .field("end", &self.end)
            .field("delta_len", &self.delta.len())
            .finish()
    }
}

/// Storage for memo entries.
pub trait Memoizer<V, C> {
    fn memoize(&mut self, entry: MemoEntry<V, C>);

    /// The entry for `unit` at `pos` under `ctx`. Unit-insensitive storage
    /// ignores `unit`.
    fn get(&mut self, unit: Key, pos: usize, ctx: &C) -> Option<MemoEntry<V, C>>;
}

/// Which storage backs a memo table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Memoization {
    /// Unbounded Robin-Hood hash table.
    Table,
    /// Bounded cache keeping the most recently used entries.
    Cache(usize),
}

/// A memo table shared by the units constructed with it.
///
/// Each slot is a distinct table within a parse. Units sharing a
/// unit-insensitive slot must not overlap in what they match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoSlot {
    key: Key,
    memoization: Memoization,
    unit_sensitive: bool,
}

impl MemoSlot {
    pub fn new(memoization: Memoization, unit_sensitive: bool) -> Self {
        if let Memoization::Cache(capacity) = memoization {
            assert!(capacity > 0, "memo cache capacity must be positive");
        }
        Self { key: Key::fresh(), memoization, unit_sensitive }
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn memoization(&self) -> Memoization {
        self.memoization
    }

    pub fn unit_sensitive(&self) -> bool {
        self.unit_sensitive
    }

    pub(crate) fn build<V: 'static, C: MemoContext>(&self) -> Box<dyn Memoizer<V, C>> {
        match self.memoization {
            Memoization::Table => Box::new(MemoTable::new(self.unit_sensitive)),
            Memoization::Cache(capacity) => Box::new(MemoCache::new(capacity, self.unit_sensitive)),
        }
    }
}

pub type ExtractorFn<'g, V, C> = dyn for<'p, 'i> Fn(&'p Parse<'g, 'i, V>) -> C + Sync + 'g;

/// Memoizes its child.
///
/// With an extractor, entries are also keyed by the value it computes from
/// the parse state, so the same position can hold results for different
/// contexts.
///
/// A hit on a failed entry records a failure at the memo's start position
/// only. Failures deeper inside the child are reported on the first run
/// alone, so when that run was inside `Not` or `Silent` they are never
/// reported at all.
pub struct Memo<'g, V, C> {
    pub(crate) key: Key,
    pub(crate) slot: MemoSlot,
    pub(crate) child: Rule<'g, V>,
    pub(crate) extractor: Option<&'g ExtractorFn<'g, V, C>>,
}

impl<'g, V: Value, C: MemoContext> Unit<'g, V> for Memo<'g, V, C> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let ctx = self.extractor.map(|extract| extract(&*parse));
        let pos0 = parse.pos();

        if let Some(entry) = parse.memo_table::<Option<C>>(self.slot).get(self.key, pos0, &ctx) {
            let end = entry.success.then_some(entry.end);
            log_detail!(parse.loggers.memo, "hit {} @{} -> {:?}", self.child, pos0, end);
            if entry.success {
                parse.apply_delta(&entry.delta);
                parse.set_pos(entry.end);
            }
            return entry.success;
        }

        log_detail!(parse.loggers.memo, "miss {} @{}", self.child, pos0);
        let log0 = parse.log_size();
        let success = self.child.parse(parse);
        let delta = if success { parse.delta(log0) } else { empty_delta() };
        let entry = MemoEntry { unit: self.key, start: pos0, ctx, success, end: parse.pos(), delta };
        parse.memo_table::<Option<C>>(self.slot).memoize(entry);
        success
    }
}

impl<V, C> fmt::Display for Memo<'_, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "memo({})", self.child)
    }
}
