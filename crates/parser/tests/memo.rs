//! Memoized units and tokens.

use std::sync::atomic::{AtomicUsize, Ordering};

use bumpalo::Bump;
use seedling_parser::{run, Grammar, Input, MemoSlot, Memoization, ParseResult, Rule, Separated};

fn parse(rule: Rule<'_, String>, text: &str) -> ParseResult<String> {
    run(rule, Input::Text(text), None)
}

fn leaf<'g>(g: &Grammar<'g, String>, text: &str) -> Rule<'g, String> {
    g.collect(
        g.string(text),
        g.string_action(|p, matched, _| {
            p.push(matched.to_string());
            Ok(())
        }),
    )
}

#[test]
fn test_memo_replays_instead_of_rerunning() {
    static RUNS: AtomicUsize = AtomicUsize::new(0);

    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let word = g.push(g.string("ab"), |_, _| {
        RUNS.fetch_add(1, Ordering::Relaxed);
        Ok("word".to_string())
    });
    let memo = g.memo(word);
    let root = g.choice(&[g.seq(&[memo, g.string("!")]), g.seq(&[memo, g.string("?")])]);

    let result = parse(root, "ab?");
    assert!(result.full_match);
    assert_eq!(result.value_stack, ["word"]);
    assert_eq!(RUNS.load(Ordering::Relaxed), 1);

    // A new parse starts with empty tables.
    parse(root, "ab?");
    assert_eq!(RUNS.load(Ordering::Relaxed), 2);
}

#[test]
fn test_memo_matches_unmemoized_results() {
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let build = |item| {
        let list = g.push(g.around(item, g.string(","), Separated::at_least(0)), |_, items| {
            Ok(format!("[{}]", items.join(" ")))
        });
        g.choice(&[g.seq(&[list, g.string(";")]), g.seq(&[list, g.string(".")]), list])
    };
    let item = g.choice(&[leaf(&g, "x"), leaf(&g, "y")]);
    let plain = build(item);
    let memoized = build(g.memo(item));
    let cached = build(g.memo_cache(item, 1));

    for text in ["x,y,x.", "x,y;", "y,x", "x,,", ""] {
        let expected = parse(plain, text);
        for rule in [memoized, cached] {
            let actual = parse(rule, text);
            assert_eq!(actual.success, expected.success, "{:?}", text);
            assert_eq!(actual.match_size, expected.match_size, "{:?}", text);
            assert_eq!(actual.value_stack, expected.value_stack, "{:?}", text);
            assert_eq!(actual.error_position, expected.error_position, "{:?}", text);
        }
    }
}

#[test]
fn test_memo_remembers_failures() {
    static TRIES: AtomicUsize = AtomicUsize::new(0);

    let arena = Bump::new();
    let g = Grammar::<String>::new(&arena);
    let counted = g.context_pred("counted", |_| {
        TRIES.fetch_add(1, Ordering::Relaxed);
        true
    });
    let memo = g.memo(g.seq(&[counted, g.string("z")]));
    let root = g.choice(&[g.seq(&[memo, g.string("!")]), g.seq(&[memo, g.string("?")]), g.string("a")]);

    let result = parse(root, "a");
    assert!(result.full_match);
    assert_eq!(TRIES.load(Ordering::Relaxed), 1);
}

#[test]
fn test_memo_keyed_by_context() {
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let upper = g.context_pred("upper mode", |p| p.var("mode").is_some_and(|m| m == "upper"));
    let letter = g.choice(&[
        g.seq(&[upper, g.range('A', 'Z')]),
        g.seq(&[g.not(upper), g.range('a', 'z')]),
    ]);
    let set_mode = |mode: &'static str| {
        g.collect(
            g.empty(),
            g.action(move |p, _| {
                p.set_var("mode", mode.to_string());
                Ok(())
            }),
        )
    };
    // The first alternative fails on "a" in upper mode; the second tries
    // the same unit at the same position in lower mode.
    let root = |memo| {
        g.choice(&[g.seq(&[set_mode("upper"), memo, g.string("!")]), g.seq(&[set_mode("lower"), memo])])
    };

    let slot = MemoSlot::new(Memoization::Table, true);
    let keyed = g.memo_with(letter, slot, |p| p.var("mode").cloned());
    assert!(parse(root(keyed), "a").full_match);
    assert!(parse(root(keyed), "A!").full_match);

    // Without the context the failed entry from upper mode is reused.
    let unkeyed = g.memo(letter);
    assert!(!parse(root(unkeyed), "a").success);
}

#[test]
fn test_memoized_failure_reports_its_start_only() {
    let arena = Bump::new();
    let g = Grammar::<String>::new(&arena);
    let ab = g.seq(&[g.string("a"), g.string("b")]);
    let root = |inner| g.choice(&[g.seq(&[g.not(inner), g.string("x")]), inner]);

    // The child first fails at 1 under `not`, which is not reported; the
    // replayed failure only covers the memo's own start.
    let result = parse(root(g.memo(ab)), "ac");
    assert!(!result.success);
    assert_eq!(result.error_position, Some(0));

    let result = parse(root(ab), "ac");
    assert!(!result.success);
    assert_eq!(result.error_position, Some(1));
}

#[test]
fn test_shared_slot() {
    let arena = Bump::new();
    let g = Grammar::<String>::new(&arena);

    let slot = MemoSlot::new(Memoization::Table, true);
    let short = g.memo_in(g.string("a"), slot);
    let long = g.memo_in(g.string("ab"), slot);
    let root = g.choice(&[g.seq(&[short, g.string("!")]), long]);
    assert_eq!(parse(root, "ab").match_size, 2);

    // Without unit sensitivity the second unit reads the first one's entry.
    let slot = MemoSlot::new(Memoization::Table, false);
    let short = g.memo_in(g.string("a"), slot);
    let long = g.memo_in(g.string("ab"), slot);
    let root = g.choice(&[g.seq(&[short, g.string("!")]), long]);
    assert_eq!(parse(root, "ab").match_size, 1);
}

#[test]
#[should_panic(expected = "memo cache capacity must be positive")]
fn test_zero_capacity_cache_panics() {
    let arena = Bump::new();
    let g = Grammar::<String>::new(&arena);
    g.memo_cache(g.string("a"), 0);
}

#[test]
fn test_memoized_left_recursion() {
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = g.memo(leaf(&g, "a"));
    let rule = g.left_recursive(|rec| {
        g.choice(&[g.push(g.seq(&[rec, a]), |_, items| Ok(format!("({})", items.join(",")))), a])
    });

    let result = parse(rule, "aaa");
    assert!(result.full_match);
    assert_eq!(result.value_stack, ["((a,a),a)"]);
}

// =============================================================================
// Tokens
// =============================================================================

#[test]
fn test_tokens_take_longest_match() {
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let tokens = g.tokens(&[leaf(&g, "a"), leaf(&g, "aa"), leaf(&g, "b")]);
    let a = g.token(tokens, 0);
    let aa = g.token(tokens, 1);
    let b = g.token(tokens, 2);

    // "aa" is one token, so it cannot be read as two "a".
    let result = parse(g.seq(&[a, a]), "aa");
    assert!(!result.success);
    assert_eq!(result.error_position, Some(0));
    assert_eq!(result.expected, ["\"a\""]);

    let result = parse(aa, "aa");
    assert!(result.full_match);
    assert_eq!(result.value_stack, ["aa"]);

    let result = parse(g.seq(&[a, b]), "ab");
    assert!(result.full_match);
    assert_eq!(result.value_stack, ["a", "b"]);
}

#[test]
fn test_token_choice() {
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let tokens = g.tokens(&[leaf(&g, "a"), leaf(&g, "aa"), leaf(&g, "b")]);
    let any_a = g.token_choice(tokens, &[0, 1]);

    let result = parse(g.repeat(any_a, 1), "aaab");
    assert_eq!(result.match_size, 3);
    assert_eq!(result.value_stack, ["aa", "a"]);

    let result = parse(any_a, "b");
    assert!(!result.success);
    assert_eq!(result.expected, ["\"a\" | \"aa\""]);
}

#[test]
fn test_token_ties_go_to_first_kind() {
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let keyword = g.push(g.string("if"), |_, _| Ok("keyword".to_string()));
    let ident = g.push(g.repeat(g.alpha(), 1), |_, _| Ok("ident".to_string()));
    let tokens = g.tokens(&[keyword, ident]);
    let keyword = g.token(tokens, 0);
    let ident = g.token(tokens, 1);

    assert_eq!(parse(keyword, "if").value_stack, ["keyword"]);
    assert!(!parse(ident, "if").success);
    assert_eq!(parse(ident, "iffy").value_stack, ["ident"]);
}

#[test]
fn test_token_failures_inside_kinds_are_not_reported() {
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let abc = g.seq(&[g.string("a"), g.string("b"), g.string("c")]);
    let tokens = g.tokens(&[g.push(abc, |_, _| Ok("abc".to_string())), leaf(&g, "x")]);
    let root = g.seq(&[leaf(&g, "("), g.token_choice(tokens, &[0, 1])]);

    // "ab" gets two characters into the first kind, which does not count.
    let result = parse(root, "(abd");
    assert!(!result.success);
    assert_eq!(result.error_position, Some(1));
}
