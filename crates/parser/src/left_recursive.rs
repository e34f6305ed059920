//! Left recursion by seed growing.
//!
//! A left-recursive unit that is re-entered at the position where it is
//! already running does not recurse. The first time, the inner call fails,
//! so the child falls back to a non-recursive alternative: that match is
//! the seed. The child is then run again from the start with inner calls
//! replaying the seed, which lets it match further. This repeats until a
//! run no longer gets further than the previous one, and the best run wins.
//!
//! Left-associative mode stops a recursive call at a *different* position
//! (a right recursion such as the second `A` in `A -> A A`) from growing
//! its own seed, so that `a a a` groups as `((a a) a)`.

use std::fmt;

use common::{log, log_detail, log_fail, log_success};

use crate::context::{Key, Parse, Value};
use crate::log::Delta;
use crate::unit::{Rule, Unit};

struct Invocation<V> {
    start: usize,
    /// End position and effects of the best match so far.
    seed: Option<(usize, Delta<V>)>,
}

/// Per-parse state of one left-recursive unit.
struct Frames<V> {
    stack: Vec<Invocation<V>>,
    /// 0 when idle, 1 while growing a seed, 2 inside a right recursion.
    recursions: u8,
}

impl<V> Default for Frames<V> {
    fn default() -> Self {
        Self { stack: Vec::new(), recursions: 0 }
    }
}

pub struct LeftRecursive<'g, V> {
    pub(crate) key: Key,
    pub(crate) child: Rule<'g, V>,
    pub(crate) left_associative: bool,
}

impl<'g, V: Value> LeftRecursive<'g, V> {
    fn frames<'p>(&self, parse: &'p mut Parse<'g, '_, V>) -> &'p mut Frames<V> {
        parse.state_for(self.key, Frames::<V>::default)
    }
}

impl<'g, V: Value> Unit<'g, V> for LeftRecursive<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let pos0 = parse.pos();
        let frames = self.frames(parse);

        if self.left_associative && frames.recursions == 2 {
            return false;
        }

        // Re-entered where we are already growing: replay the seed.
        if let Some(top) = frames.stack.last().filter(|top| top.start == pos0) {
            let Some((end, delta)) = top.seed.clone() else {
                return false;
            };
            parse.apply_delta(&delta);
            parse.set_pos(end);
            return true;
        }

        if self.left_associative && frames.recursions == 1 {
            frames.recursions = 2;
            return self.child.parse(parse);
        }

        frames.stack.push(Invocation { start: pos0, seed: None });
        frames.recursions = 1;
        let log0 = parse.log_size();
        log!(parse.loggers.leftrec, "{} @{}: growing", self.child, pos0);
        parse.loggers.leftrec.push_indent();

        while self.child.parse(parse) {
            let end = parse.pos();
            let delta = parse.delta(log0);
            let frames = self.frames(parse);
            let top = frames.stack.last_mut().expect("invocation frame pushed above");
            if top.seed.as_ref().is_some_and(|(best, _)| end <= *best) {
                break;
            }
            frames.recursions = 1;
            top.seed = Some((end, delta));
            log_detail!(parse.loggers.leftrec, "seed grown to {}", end);
            parse.set_pos(pos0);
            parse.rollback(log0);
        }

        parse.loggers.leftrec.pop_indent();
        parse.set_pos(pos0);
        parse.rollback(log0);
        let frames = self.frames(parse);
        frames.recursions = 0;
        let seed = frames.stack.pop().and_then(|invocation| invocation.seed);

        match seed {
            Some((end, delta)) => {
                log_success!(parse.loggers.leftrec, "{} @{}: matched to {}", self.child, pos0, end);
                parse.apply_delta(&delta);
                parse.set_pos(end);
                true
            }
            None => {
                log_fail!(parse.loggers.leftrec, "{} @{}: no seed", self.child, pos0);
                false
            }
        }
    }
}

impl<V> fmt::Display for LeftRecursive<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "left_recursive({})", self.child)
    }
}
