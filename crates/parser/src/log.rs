//! Undoable side effects and the log that records them.
//!
//! Every mutation of parse state (value stack, variables) goes through
//! [`Log::apply`], which runs the effect and keeps the undo closure it
//! returns. Rolling back to an earlier size undoes effects newest first.
//! A [`Delta`] is the effects recorded between two sizes; applying it again
//! reproduces the same state change without re-running the parser that
//! caused it.

use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

/// Mutable state reachable from a parse, changed only through side effects.
#[derive(Debug, Clone)]
pub struct State<V> {
    pub stack: Vec<V>,
    pub vars: HashMap<&'static str, V>,
}

impl<V> Default for State<V> {
    fn default() -> Self {
        Self { stack: Vec::new(), vars: HashMap::new() }
    }
}

pub type Undo<V> = Box<dyn FnOnce(&mut State<V>)>;

/// An action on [`State`] that returns its own undo.
///
/// The action may run several times (once live, again whenever a delta
/// containing it is replayed), so it must not consume what it captures.
pub struct SideEffect<V>(Rc<dyn Fn(&mut State<V>) -> Undo<V>>);

impl<V> SideEffect<V> {
    pub fn new(effect: impl Fn(&mut State<V>) -> Undo<V> + 'static) -> Self {
        Self(Rc::new(effect))
    }

    fn run(&self, state: &mut State<V>) -> Undo<V> {
        (self.0)(state)
    }
}

impl<V> Clone for SideEffect<V> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<V> fmt::Debug for SideEffect<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SideEffect({:p})", Rc::as_ptr(&self.0))
    }
}

/// A re-appliable slice of the log.
pub type Delta<V> = Rc<[SideEffect<V>]>;

pub fn empty_delta<V>() -> Delta<V> {
    Rc::from(Vec::new())
}

struct Applied<V> {
    effect: SideEffect<V>,
    undo: Undo<V>,
}

/// Ordered record of applied side effects.
pub struct Log<V> {
    applied: Vec<Applied<V>>,
}

impl<V> Default for Log<V> {
    fn default() -> Self {
        Self { applied: Vec::new() }
    }
}

impl<V> Log<V> {
    pub fn size(&self) -> usize {
        self.applied.len()
    }

    pub fn apply(&mut self, state: &mut State<V>, effect: SideEffect<V>) {
        let undo = effect.run(state);
        self.applied.push(Applied { effect, undo });
    }

    pub fn apply_all(&mut self, state: &mut State<V>, delta: &[SideEffect<V>]) {
        for effect in delta {
            self.apply(state, effect.clone());
        }
    }

    /// Undo effects until the log holds `target` entries.
    pub fn rollback(&mut self, state: &mut State<V>, target: usize) {
        while self.applied.len() > target {
            if let Some(applied) = self.applied.pop() {
                (applied.undo)(state);
            }
        }
    }

    /// Effects applied since the log had `start` entries.
    pub fn delta(&self, start: usize) -> Delta<V> {
        let start = start.min(self.applied.len());
        self.applied[start..].iter().map(|a| a.effect.clone()).collect()
    }
}

// =============================================================================
// Stock effects
// =============================================================================

pub fn push<V: Clone + 'static>(value: V) -> SideEffect<V> {
    SideEffect::new(move |state| {
        state.stack.push(value.clone());
        Box::new(|state: &mut State<V>| {
            state.stack.pop();
        })
    })
}

/// Remove the top `count` items.
///
/// The count is relative so a replayed delta behaves the same on a stack
/// that has a different base size.
pub fn pop_top<V: 'static>(count: usize) -> SideEffect<V> {
    SideEffect::new(move |state| {
        let at = state.stack.len().saturating_sub(count);
        let tail = state.stack.split_off(at);
        Box::new(move |state: &mut State<V>| state.stack.extend(tail))
    })
}

pub fn set_var<V: Clone + 'static>(name: &'static str, value: V) -> SideEffect<V> {
    SideEffect::new(move |state| {
        let old = state.vars.insert(name, value.clone());
        Box::new(move |state: &mut State<V>| match old {
            Some(old) => {
                state.vars.insert(name, old);
            }
            None => {
                state.vars.remove(name);
            }
        })
    })
}
