use std::fmt;

use crate::context::{Parse, Value};

/// A parsing unit.
///
/// Units are allocated in an arena and refer to each other by reference, so
/// a grammar is an immutable graph that can be shared between threads. All
/// per-parse state lives in [`Parse`].
///
/// Implementations only write [`Unit::doparse`]. Callers go through
/// `parse`, which restores the cursor and the side-effect log when
/// `doparse` fails and records the failure for diagnostics.
pub trait Unit<'g, V>: fmt::Display + Sync {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool;

    /// Whether failures inside this unit are left out of error reporting.
    fn excludes_errors(&self) -> bool {
        false
    }

    /// What to call this unit in an "expected ..." message, for units worth
    /// naming there.
    fn expected(&self) -> Option<String> {
        None
    }
}

/// A reference to a unit in the grammar arena.
pub type Rule<'g, V> = &'g dyn Unit<'g, V>;

impl<'g, V: Value> dyn Unit<'g, V> + 'g {
    /// Run this unit at the cursor.
    ///
    /// On success the cursor is past the match and the log holds exactly the
    /// match's effects. On failure both are as they were before the call.
    pub fn parse(&'g self, parse: &mut Parse<'g, '_, V>) -> bool {
        if parse.aborted() {
            return false;
        }
        let pos0 = parse.pos();
        let log0 = parse.log_size();
        let quiet = self.excludes_errors();

        parse.enter(self, quiet);
        let success = self.doparse(parse) && !parse.aborted();
        if !success {
            parse.set_pos(pos0);
            parse.rollback(log0);
            if !parse.aborted() {
                parse.record_failure(self, pos0);
            }
        }
        parse.exit(self, quiet, success);
        success
    }
}

/// Comma-separated display of a list of rules.
pub(crate) struct Listed<'a, 'g, V>(pub &'a [Rule<'g, V>]);

impl<V> fmt::Display for Listed<'_, '_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rule) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", rule)?;
        }
        Ok(())
    }
}
