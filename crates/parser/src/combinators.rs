//! Units built from other units: sequencing, choice, repetition, lookahead.
//!
//! None of these restore the cursor or the log on their own failure; the
//! `parse` wrapper does it for every unit. They only roll back explicitly
//! when they succeed after trying something that must not be kept.

use std::fmt;
use std::sync::OnceLock;

use crate::context::{Parse, Value};
use crate::log::Delta;
use crate::unit::{Listed, Rule, Unit};

/// Matches all children in order.
pub struct Sequence<'g, V> {
    pub(crate) children: &'g [Rule<'g, V>],
}

impl<'g, V: Value> Unit<'g, V> for Sequence<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        for &child in self.children {
            if !child.parse(parse) {
                return false;
            }
        }
        true
    }
}

impl<V> fmt::Display for Sequence<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seq({})", Listed(self.children))
    }
}

/// Ordered choice: the first child that matches wins.
pub struct Choice<'g, V> {
    pub(crate) children: &'g [Rule<'g, V>],
}

impl<'g, V: Value> Unit<'g, V> for Choice<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        for &child in self.children {
            if child.parse(parse) {
                return true;
            }
        }
        false
    }
}

impl<V> fmt::Display for Choice<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "choice({})", Listed(self.children))
    }
}

/// Tries every child and keeps the one that reaches furthest. Ties go to
/// the child declared first.
pub struct Longest<'g, V> {
    pub(crate) children: &'g [Rule<'g, V>],
}

impl<'g, V: Value> Unit<'g, V> for Longest<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let pos0 = parse.pos();
        let log0 = parse.log_size();
        let mut best: Option<(usize, Delta<V>)> = None;

        for &child in self.children {
            if !child.parse(parse) {
                continue;
            }
            if best.as_ref().map_or(true, |(end, _)| parse.pos() > *end) {
                best = Some((parse.pos(), parse.delta(log0)));
            }
            parse.set_pos(pos0);
            parse.rollback(log0);
        }

        match best {
            Some((end, delta)) => {
                parse.apply_delta(&delta);
                parse.set_pos(end);
                true
            }
            None => false,
        }
    }
}

impl<V> fmt::Display for Longest<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "longest({})", Listed(self.children))
    }
}

/// Greedy repetition with a lower bound, or an exact count.
///
/// A repetition that succeeds without consuming input ends the loop, since
/// it would match the same way forever.
pub struct Repeat<'g, V> {
    pub(crate) child: Rule<'g, V>,
    pub(crate) min: usize,
    pub(crate) exact: bool,
}

impl<'g, V: Value> Unit<'g, V> for Repeat<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let mut count = 0;
        while !(self.exact && count == self.min) {
            let pos = parse.pos();
            if !self.child.parse(parse) {
                break;
            }
            count += 1;
            if parse.pos() == pos {
                break;
            }
        }
        if self.exact { count == self.min } else { count >= self.min }
    }
}

impl<V> fmt::Display for Repeat<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exact {
            write!(f, "repeat({}, {})", self.child, self.min)
        } else {
            write!(f, "at_least({}, {})", self.child, self.min)
        }
    }
}

/// Count and trailing-separator policy for [`Around`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Separated {
    pub min: usize,
    pub exact: bool,
    pub trailing: bool,
}

impl Separated {
    pub fn at_least(min: usize) -> Self {
        Self { min, exact: false, trailing: false }
    }

    pub fn exactly(count: usize) -> Self {
        Self { min: count, exact: true, trailing: false }
    }

    /// Also consume a separator after the last item when one is present.
    pub fn trailing(self) -> Self {
        Self { trailing: true, ..self }
    }
}

/// Items separated by a separator: `item (sep item)*`, with a count bound
/// and an optional trailing separator.
pub struct Around<'g, V> {
    pub(crate) item: Rule<'g, V>,
    pub(crate) sep: Rule<'g, V>,
    pub(crate) policy: Separated,
}

impl<'g, V: Value> Unit<'g, V> for Around<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let Separated { min, exact, trailing } = self.policy;
        if exact && min == 0 {
            return true;
        }
        if !self.item.parse(parse) {
            return min == 0;
        }

        let mut count = 1;
        while !(exact && count == min) {
            let pos = parse.pos();
            let log = parse.log_size();
            if !self.sep.parse(parse) {
                break;
            }
            if !self.item.parse(parse) {
                if !trailing {
                    parse.set_pos(pos);
                    parse.rollback(log);
                }
                break;
            }
            count += 1;
            if parse.pos() == pos {
                break;
            }
        }

        if exact && count == min && trailing {
            self.sep.parse(parse);
        }
        if exact { count == min } else { count >= min }
    }
}

impl<V> fmt::Display for Around<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "around({}, {}, {})", self.item, self.sep, self.policy.min)
    }
}

/// Matches its child or nothing.
pub struct Optional<'g, V> {
    pub(crate) child: Rule<'g, V>,
}

impl<'g, V: Value> Unit<'g, V> for Optional<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        self.child.parse(parse);
        true
    }
}

impl<V> fmt::Display for Optional<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "opt({})", self.child)
    }
}

// =============================================================================
// Lookahead
// =============================================================================

/// Succeeds when the child fails. Never consumes input, and failures inside
/// the child do not count towards error reporting.
pub struct Not<'g, V> {
    pub(crate) child: Rule<'g, V>,
}

impl<'g, V: Value> Unit<'g, V> for Not<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let child = self.child;
        !parse.suppressed(|parse| child.parse(parse))
    }
}

impl<V> fmt::Display for Not<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not({})", self.child)
    }
}

/// Succeeds when the child matches, without consuming anything.
pub struct Ahead<'g, V> {
    pub(crate) child: Rule<'g, V>,
}

impl<'g, V: Value> Unit<'g, V> for Ahead<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let pos0 = parse.pos();
        let log0 = parse.log_size();
        if !self.child.parse(parse) {
            return false;
        }
        parse.set_pos(pos0);
        parse.rollback(log0);
        true
    }
}

impl<V> fmt::Display for Ahead<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ahead({})", self.child)
    }
}

// =============================================================================
// References and naming
// =============================================================================

pub type Supplier<'g, V> = dyn Fn() -> Rule<'g, V> + Sync + 'g;

/// A reference to a unit that is resolved on first use.
///
/// Either built with a supplier, called at most once, or left empty and
/// filled in later with [`Lazy::define`] to close a recursive knot.
pub struct Lazy<'g, V> {
    pub(crate) target: OnceLock<Rule<'g, V>>,
    pub(crate) supplier: Option<&'g Supplier<'g, V>>,
}

impl<'g, V> Lazy<'g, V> {
    pub fn define(&self, rule: Rule<'g, V>) {
        if self.target.set(rule).is_err() {
            panic!("lazy reference defined twice");
        }
    }

    pub fn target(&self) -> Rule<'g, V> {
        *self.target.get_or_init(|| match self.supplier {
            Some(supplier) => supplier(),
            None => panic!("lazy reference used before its target was defined"),
        })
    }
}

impl<'g, V: Value> Unit<'g, V> for Lazy<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        self.target().parse(parse)
    }
}

impl<V> fmt::Display for Lazy<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The target may refer back to this reference.
        write!(f, "lazy")
    }
}

/// Gives its child a name for display and error messages.
pub struct Named<'g, V> {
    pub(crate) name: &'g str,
    pub(crate) child: Rule<'g, V>,
}

impl<'g, V: Value> Unit<'g, V> for Named<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        self.child.parse(parse)
    }

    fn expected(&self) -> Option<String> {
        Some(self.name.to_string())
    }
}

impl<V> fmt::Display for Named<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A region left out of error reporting, such as a whitespace skipper.
pub struct Silent<'g, V> {
    pub(crate) child: Rule<'g, V>,
}

impl<'g, V: Value> Unit<'g, V> for Silent<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        self.child.parse(parse)
    }

    fn excludes_errors(&self) -> bool {
        true
    }
}

impl<V> fmt::Display for Silent<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.child)
    }
}
