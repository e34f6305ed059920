//! Operator chains without recursion.
//!
//! [`LeftFold`] matches `left (op right)*` and combines after every pair,
//! giving left-associative results. [`RightFold`] matches `(left op)* right`
//! and combines from the innermost pair outwards once the final operand is
//! in, giving right-associative results. Either way the step action
//! receives every item pushed since the start of the combined span.

use std::fmt;

use crate::context::{Parse, Value};
use crate::stack::StackAction;
use crate::unit::{Rule, Unit};

pub struct LeftFold<'g, V> {
    pub(crate) left: Rule<'g, V>,
    pub(crate) operator: Rule<'g, V>,
    pub(crate) right: Rule<'g, V>,
    pub(crate) operator_required: bool,
    pub(crate) step: StackAction<'g, V>,
}

impl<'g, V: Value> Unit<'g, V> for LeftFold<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let pos0 = parse.pos();
        let size0 = parse.stack().len();
        if !self.left.parse(parse) {
            return false;
        }

        let mut pairs = 0;
        loop {
            let pos1 = parse.pos();
            let log1 = parse.log_size();
            if !self.operator.parse(parse) {
                break;
            }
            // Undo the operator's effects too when the operand is missing.
            if !self.right.parse(parse) || parse.pos() == pos1 {
                parse.set_pos(pos1);
                parse.rollback(log1);
                break;
            }
            pairs += 1;
            let items = parse.pop_from(size0);
            if let Err(err) = self.step.apply(parse, pos0, &items) {
                parse.throw(err);
                return false;
            }
        }

        pairs > 0 || !self.operator_required
    }
}

impl<V> fmt::Display for LeftFold<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "left_fold({}, {}, {})", self.left, self.operator, self.right)
    }
}

pub struct RightFold<'g, V> {
    pub(crate) left: Rule<'g, V>,
    pub(crate) operator: Rule<'g, V>,
    pub(crate) right: Rule<'g, V>,
    pub(crate) operator_required: bool,
    pub(crate) step: StackAction<'g, V>,
}

impl<'g, V: Value> Unit<'g, V> for RightFold<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        // Position and stack size before each left operand of a complete
        // (left, operator) pair.
        let mut pairs: Vec<(usize, usize)> = Vec::new();

        loop {
            let pos = parse.pos();
            let size = parse.stack().len();
            let log = parse.log_size();
            if !self.left.parse(parse) {
                break;
            }
            if !self.operator.parse(parse) || parse.pos() == pos {
                parse.set_pos(pos);
                parse.rollback(log);
                break;
            }
            pairs.push((pos, size));
        }

        if self.operator_required && pairs.is_empty() {
            return false;
        }
        if !self.right.parse(parse) {
            return false;
        }

        while let Some((pos0, size0)) = pairs.pop() {
            let items = parse.pop_from(size0);
            if let Err(err) = self.step.apply(parse, pos0, &items) {
                parse.throw(err);
                return false;
            }
        }
        true
    }
}

impl<V> fmt::Display for RightFold<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "right_fold({}, {}, {})", self.left, self.operator, self.right)
    }
}
