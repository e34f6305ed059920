//! Seedling Parser
//!
//! A backtracking (PEG) parsing engine. Grammars are graphs of parsing
//! units allocated in an arena; running one over text or a slice of items
//! produces a value stack as a side product of a successful match.
//!
//! # Overview
//!
//! Every unit either matches, advancing the cursor, or fails and leaves the
//! parse exactly as it found it. State other than the cursor (the value
//! stack and named variables) changes only through an undoable side-effect
//! log, which makes backtracking exact and lets results be replayed:
//!
//! - [`memo`] stores the effects of a match so that re-running a unit at the
//!   same position only replays them
//! - [`LeftRecursive`] resolves left recursion by growing a seed match
//! - [`LeftFold`] and [`RightFold`] parse operator chains without recursion
//!
//! # Example
//!
//! ```ignore
//! use bumpalo::Bump;
//! use seedling_parser::{run, Grammar, Input};
//!
//! let arena = Bump::new();
//! let g = Grammar::<i64>::new(&arena);
//! let num = g.collect(g.repeat(g.digit(), 1), g.string_action(|p, text, _| {
//!     p.push(text.parse().map_err(|_| ActionError::new("bad number"))?);
//!     Ok(())
//! }));
//! let sum = g.left_fold(num, g.string("+"), num, false, g.push_action(|_, xs| Ok(xs[0] + xs[1])));
//! let result = run(sum, Input::Text("1+2+3"), None);
//! assert_eq!(result.value_stack, vec![6]);
//! ```
//!
//! # Diagnostics
//!
//! The parse remembers the furthest position where a unit failed, outside
//! of regions marked with [`Grammar::silent`] or under [`Grammar::not`].
//! [`ParseResult::diagnostic`] turns it into a message with a line and
//! column, and [`format_diagnostics`] renders it with the source line.
//!
//! Logging is controlled by the `DEBUG` environment variable with the
//! loggers `parse`, `memo`, `leftrec` and `tokens` (see [`debug`]).

mod combinators;
mod context;
mod error;
pub mod fold;
pub mod format;
mod grammar;
mod left_recursive;
pub mod log;
pub mod memo;
mod primitives;
mod run;
mod stack;
mod unit;

// Re-export from seedling-common
pub use common::debug;
pub use common::{create_logger, LineMap, Logger, SourceLoc};

pub use combinators::{
    Ahead, Around, Choice, Lazy, Longest, Named, Not, Optional, Repeat, Separated, Sequence, Silent,
};
pub use context::{Input, Key, Parse, Value};
pub use error::{ActionError, Diagnostic};
pub use fold::{LeftFold, RightFold};
pub use format::{format_diagnostics, format_trace};
pub use grammar::{Grammar, TOKEN_CACHE_SIZE};
pub use left_recursive::LeftRecursive;
pub use log::{Delta, SideEffect, State};
pub use memo::{Memo, MemoSlot, Memoization, Tokens};
pub use primitives::{CharClass, CharPredicate, ContextPredicate, Empty, Fail, ObjectPredicate, StringMatch};
pub use run::{run, run_with, ParseOptions, ParseResult};
pub use stack::{Collect, StackAction};
pub use unit::{Rule, Unit};
