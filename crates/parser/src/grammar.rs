use std::marker::PhantomData;
use std::sync::OnceLock;

use bumpalo::Bump;

use crate::combinators::{
    Ahead, Around, Choice, Lazy, Longest, Named, Not, Optional, Repeat, Separated, Sequence, Silent,
    Supplier,
};
use crate::context::{Key, Parse, Value};
use crate::error::ActionError;
use crate::fold::{LeftFold, RightFold};
use crate::left_recursive::LeftRecursive;
use crate::memo::{
    ExtractorFn, Memo, MemoContext, MemoSlot, Memoization, TokenChoice, TokenParser, Tokens,
};
use crate::primitives::{
    CharClass, CharFn, CharPredicate, ContextFn, ContextPredicate, Empty, Fail, ObjectFn,
    ObjectPredicate, StringMatch,
};
use crate::stack::{Collect, StackAction};
use crate::unit::{Rule, Unit};

/// Capacity of the cache used for token memoization.
pub const TOKEN_CACHE_SIZE: usize = 8;

/// Allocates units in an arena and links them into a grammar.
///
/// Every constructor returns a [`Rule`], a plain reference that lives as
/// long as the arena. Recursive grammars close their cycles with
/// [`Grammar::recursive`], [`Grammar::left_recursive`] or
/// [`Grammar::forward`].
///
/// ```ignore
/// let arena = Bump::new();
/// let g = Grammar::<String>::new(&arena);
/// let expr = g.left_recursive(|expr| {
///     g.choice(&[g.seq(&[expr, g.string("+"), g.digit()]), g.digit()])
/// });
/// let result = run(expr, Input::Text("1+2+3"), None);
/// ```
pub struct Grammar<'g, V> {
    arena: &'g Bump,
    _values: PhantomData<fn() -> V>,
}

impl<'g, V: Value> Grammar<'g, V> {
    pub fn new(arena: &'g Bump) -> Self {
        Self { arena, _values: PhantomData }
    }

    fn alloc<U: Unit<'g, V> + 'g>(&self, unit: U) -> Rule<'g, V> {
        self.arena.alloc(unit)
    }

    fn rules(&self, rules: &[Rule<'g, V>]) -> &'g [Rule<'g, V>] {
        self.arena.alloc_slice_copy(rules)
    }

    // =========================================================================
    // Leaves
    // =========================================================================

    pub fn empty(&self) -> Rule<'g, V> {
        self.alloc(Empty)
    }

    pub fn fail(&self) -> Rule<'g, V> {
        self.alloc(Fail)
    }

    pub fn string(&self, text: &str) -> Rule<'g, V> {
        let text = self.arena.alloc_str(text);
        self.alloc(StringMatch { text })
    }

    pub fn char_class(&self, class: CharClass<'g>) -> Rule<'g, V> {
        self.alloc(CharPredicate { class })
    }

    pub fn any(&self) -> Rule<'g, V> {
        self.char_class(CharClass::Any)
    }

    pub fn single(&self, c: char) -> Rule<'g, V> {
        self.char_class(CharClass::Single(c))
    }

    pub fn range(&self, lo: char, hi: char) -> Rule<'g, V> {
        self.char_class(CharClass::Range(lo, hi))
    }

    pub fn set(&self, chars: &str) -> Rule<'g, V> {
        let chars = self.arena.alloc_str(chars);
        self.char_class(CharClass::Set(chars))
    }

    pub fn alpha(&self) -> Rule<'g, V> {
        self.char_class(CharClass::Alpha)
    }

    pub fn alphanum(&self) -> Rule<'g, V> {
        self.char_class(CharClass::Alphanum)
    }

    pub fn digit(&self) -> Rule<'g, V> {
        self.char_class(CharClass::Digit)
    }

    pub fn hex_digit(&self) -> Rule<'g, V> {
        self.char_class(CharClass::HexDigit)
    }

    pub fn octal_digit(&self) -> Rule<'g, V> {
        self.char_class(CharClass::OctalDigit)
    }

    pub fn whitespace(&self) -> Rule<'g, V> {
        self.char_class(CharClass::Whitespace)
    }

    pub fn char_pred<F>(&self, name: &str, pred: F) -> Rule<'g, V>
    where
        F: Fn(char) -> bool + Sync + 'g,
    {
        let name = self.arena.alloc_str(name);
        let pred: &'g CharFn<'g> = self.arena.alloc(pred);
        self.char_class(CharClass::Custom(name, pred))
    }

    pub fn object<F>(&self, name: &str, pred: F) -> Rule<'g, V>
    where
        F: Fn(&V) -> bool + Sync + 'g,
    {
        let name = self.arena.alloc_str(name);
        let pred: &'g ObjectFn<'g, V> = self.arena.alloc(pred);
        self.alloc(ObjectPredicate { name, pred })
    }

    pub fn context_pred<F>(&self, name: &str, pred: F) -> Rule<'g, V>
    where
        F: for<'p, 'i> Fn(&'p Parse<'g, 'i, V>) -> bool + Sync + 'g,
    {
        let name = self.arena.alloc_str(name);
        let pred: &'g ContextFn<'g, V> = self.arena.alloc(pred);
        self.alloc(ContextPredicate { name, pred })
    }

    // =========================================================================
    // Combinators
    // =========================================================================

    pub fn seq(&self, children: &[Rule<'g, V>]) -> Rule<'g, V> {
        self.alloc(Sequence { children: self.rules(children) })
    }

    pub fn choice(&self, children: &[Rule<'g, V>]) -> Rule<'g, V> {
        self.alloc(Choice { children: self.rules(children) })
    }

    pub fn longest(&self, children: &[Rule<'g, V>]) -> Rule<'g, V> {
        self.alloc(Longest { children: self.rules(children) })
    }

    /// `child` at least `min` times.
    pub fn repeat(&self, child: Rule<'g, V>, min: usize) -> Rule<'g, V> {
        self.alloc(Repeat { child, min, exact: false })
    }

    /// `child` exactly `count` times.
    pub fn repeat_exact(&self, child: Rule<'g, V>, count: usize) -> Rule<'g, V> {
        self.alloc(Repeat { child, min: count, exact: true })
    }

    pub fn around(&self, item: Rule<'g, V>, sep: Rule<'g, V>, policy: Separated) -> Rule<'g, V> {
        self.alloc(Around { item, sep, policy })
    }

    pub fn opt(&self, child: Rule<'g, V>) -> Rule<'g, V> {
        self.alloc(Optional { child })
    }

    pub fn not(&self, child: Rule<'g, V>) -> Rule<'g, V> {
        self.alloc(Not { child })
    }

    pub fn ahead(&self, child: Rule<'g, V>) -> Rule<'g, V> {
        self.alloc(Ahead { child })
    }

    pub fn named(&self, name: &str, child: Rule<'g, V>) -> Rule<'g, V> {
        let name = self.arena.alloc_str(name);
        self.alloc(Named { name, child })
    }

    pub fn silent(&self, child: Rule<'g, V>) -> Rule<'g, V> {
        self.alloc(Silent { child })
    }

    // =========================================================================
    // References and recursion
    // =========================================================================

    /// An undefined reference, to be filled in with [`Lazy::define`].
    pub fn forward(&self) -> &'g Lazy<'g, V> {
        self.arena.alloc(Lazy { target: OnceLock::new(), supplier: None })
    }

    /// A reference whose target is built on first use.
    pub fn lazy<F>(&self, supplier: F) -> Rule<'g, V>
    where
        F: Fn() -> Rule<'g, V> + Sync + 'g,
    {
        let supplier: &'g Supplier<'g, V> = self.arena.alloc(supplier);
        self.alloc(Lazy { target: OnceLock::new(), supplier: Some(supplier) })
    }

    /// A rule that may refer to itself through the reference passed to `f`.
    pub fn recursive(&self, f: impl FnOnce(Rule<'g, V>) -> Rule<'g, V>) -> Rule<'g, V> {
        let slot = self.forward();
        let rule = f(slot);
        slot.define(rule);
        rule
    }

    /// A left-recursive rule, right-associative when it also recurses on the
    /// right. Self references must go through the reference passed to `f`.
    pub fn left_recursive(&self, f: impl FnOnce(Rule<'g, V>) -> Rule<'g, V>) -> Rule<'g, V> {
        self.left_recursive_with(false, f)
    }

    /// Like [`Grammar::left_recursive`], grouping to the left instead.
    pub fn left_recursive_left_assoc(
        &self,
        f: impl FnOnce(Rule<'g, V>) -> Rule<'g, V>,
    ) -> Rule<'g, V> {
        self.left_recursive_with(true, f)
    }

    fn left_recursive_with(
        &self,
        left_associative: bool,
        f: impl FnOnce(Rule<'g, V>) -> Rule<'g, V>,
    ) -> Rule<'g, V> {
        let slot = self.forward();
        let child = f(slot);
        let rule = self.alloc(LeftRecursive { key: Key::fresh(), child, left_associative });
        slot.define(rule);
        rule
    }

    // =========================================================================
    // Memoization
    // =========================================================================

    /// Memoize in a table of its own.
    pub fn memo(&self, child: Rule<'g, V>) -> Rule<'g, V> {
        self.memo_in(child, MemoSlot::new(Memoization::Table, true))
    }

    /// Memoize in a cache of its own that keeps the `capacity` most
    /// recently used entries.
    pub fn memo_cache(&self, child: Rule<'g, V>, capacity: usize) -> Rule<'g, V> {
        self.memo_in(child, MemoSlot::new(Memoization::Cache(capacity), true))
    }

    /// Memoize in a table that may be shared with other units.
    pub fn memo_in(&self, child: Rule<'g, V>, slot: MemoSlot) -> Rule<'g, V> {
        self.alloc(Memo::<'g, V, ()> { key: Key::fresh(), slot, child, extractor: None })
    }

    /// Memoize keyed by the value `extractor` computes from the parse.
    pub fn memo_with<C, F>(&self, child: Rule<'g, V>, slot: MemoSlot, extractor: F) -> Rule<'g, V>
    where
        C: MemoContext,
        F: for<'p, 'i> Fn(&'p Parse<'g, 'i, V>) -> C + Sync + 'g,
    {
        let extractor: &'g ExtractorFn<'g, V, C> = self.arena.alloc(extractor);
        self.alloc(Memo::<'g, V, C> { key: Key::fresh(), slot, child, extractor: Some(extractor) })
    }

    /// Token kinds, decided once per position by longest match.
    pub fn tokens(&self, kinds: &[Rule<'g, V>]) -> &'g Tokens<'g, V> {
        let kinds = self.arena.alloc_slice_fill_iter(kinds.iter().map(|&rule| (Key::fresh(), rule)));
        let slot = MemoSlot::new(Memoization::Cache(TOKEN_CACHE_SIZE), false);
        self.arena.alloc(Tokens { key: Key::fresh(), slot, kinds })
    }

    /// Matches the token at the cursor if it is kind `index`.
    pub fn token(&self, tokens: &'g Tokens<'g, V>, index: usize) -> Rule<'g, V> {
        assert!(index < tokens.len(), "token kind {} out of range", index);
        self.alloc(TokenParser { tokens, index })
    }

    /// Matches the token at the cursor if it is any of the listed kinds.
    pub fn token_choice(&self, tokens: &'g Tokens<'g, V>, indices: &[usize]) -> Rule<'g, V> {
        if let Some(&index) = indices.iter().find(|&&i| i >= tokens.len()) {
            panic!("token kind {} out of range", index);
        }
        let indices = self.arena.alloc_slice_copy(indices);
        self.alloc(TokenChoice { tokens, indices })
    }

    // =========================================================================
    // Stack actions
    // =========================================================================

    pub fn action<F>(&self, f: F) -> StackAction<'g, V>
    where
        F: for<'p, 'i, 'v> Fn(&'p mut Parse<'g, 'i, V>, &'v [V]) -> Result<(), ActionError> + Sync + 'g,
    {
        StackAction::Plain(self.arena.alloc(f))
    }

    pub fn string_action<F>(&self, f: F) -> StackAction<'g, V>
    where
        F: for<'p, 'i, 's, 'v> Fn(&'p mut Parse<'g, 'i, V>, &'s str, &'v [V]) -> Result<(), ActionError>
            + Sync
            + 'g,
    {
        StackAction::WithString(self.arena.alloc(f))
    }

    pub fn list_action<F>(&self, f: F) -> StackAction<'g, V>
    where
        F: for<'p, 'i, 'm, 'v> Fn(&'p mut Parse<'g, 'i, V>, &'m [V], &'v [V]) -> Result<(), ActionError>
            + Sync
            + 'g,
    {
        StackAction::WithList(self.arena.alloc(f))
    }

    pub fn push_action<F>(&self, f: F) -> StackAction<'g, V>
    where
        F: for<'p, 'i, 'v> Fn(&'p mut Parse<'g, 'i, V>, &'v [V]) -> Result<V, ActionError> + Sync + 'g,
    {
        StackAction::Push(self.arena.alloc(f))
    }

    /// Run `action` on the items `child` pushes, popping them first.
    pub fn collect(&self, child: Rule<'g, V>, action: StackAction<'g, V>) -> Rule<'g, V> {
        self.collect_with(child, 0, false, action)
    }

    /// Run `action` on the items `child` pushes plus `lookback` items below
    /// them. With `peek_only` the items stay on the stack.
    pub fn collect_with(
        &self,
        child: Rule<'g, V>,
        lookback: usize,
        peek_only: bool,
        action: StackAction<'g, V>,
    ) -> Rule<'g, V> {
        self.alloc(Collect { child, action, lookback, peek_only })
    }

    /// Push the value `f` computes from the items `child` pushes.
    pub fn push<F>(&self, child: Rule<'g, V>, f: F) -> Rule<'g, V>
    where
        F: for<'p, 'i, 'v> Fn(&'p mut Parse<'g, 'i, V>, &'v [V]) -> Result<V, ActionError> + Sync + 'g,
    {
        self.collect(child, self.push_action(f))
    }

    // =========================================================================
    // Folds
    // =========================================================================

    /// `left (operator right)*`, combining left to right. Succeeds on a bare
    /// `left` unless `operator_required`.
    pub fn left_fold(
        &self,
        left: Rule<'g, V>,
        operator: Rule<'g, V>,
        right: Rule<'g, V>,
        operator_required: bool,
        step: StackAction<'g, V>,
    ) -> Rule<'g, V> {
        self.alloc(LeftFold { left, operator, right, operator_required, step })
    }

    /// `(left operator)* right`, combining right to left. Succeeds on a bare
    /// `right` unless `operator_required`.
    pub fn right_fold(
        &self,
        left: Rule<'g, V>,
        operator: Rule<'g, V>,
        right: Rule<'g, V>,
        operator_required: bool,
        step: StackAction<'g, V>,
    ) -> Rule<'g, V> {
        self.alloc(RightFold { left, operator, right, operator_required, step })
    }

    /// `operand operator*`, applying `step` after each operator.
    pub fn postfix(
        &self,
        operand: Rule<'g, V>,
        operator: Rule<'g, V>,
        operator_required: bool,
        step: StackAction<'g, V>,
    ) -> Rule<'g, V> {
        self.left_fold(operand, operator, self.empty(), operator_required, step)
    }

    /// `operator* operand`, applying `step` from the innermost operator out.
    pub fn prefix(
        &self,
        operator: Rule<'g, V>,
        operand: Rule<'g, V>,
        operator_required: bool,
        step: StackAction<'g, V>,
    ) -> Rule<'g, V> {
        self.right_fold(operator, self.empty(), operand, operator_required, step)
    }
}
