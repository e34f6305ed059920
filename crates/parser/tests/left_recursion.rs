//! Left-recursive rules, in both associativity modes.

use bumpalo::Bump;
use seedling_parser::{run, Grammar, Input, ParseResult, Rule};

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

/// `(x,y)` from the items `child` pushed.
fn pair<'g>(g: &Grammar<'g, String>, children: &[Rule<'g, String>]) -> Rule<'g, String> {
    g.push(g.seq(children), |_, items| Ok(format!("({})", items.join(","))))
}

/// `[x,y]` from the items `child` pushed.
fn bracket<'g>(g: &Grammar<'g, String>, children: &[Rule<'g, String>]) -> Rule<'g, String> {
    g.push(g.seq(children), |_, items| Ok(format!("[{}]", items.join(","))))
}

fn value(result: &ParseResult<String>) -> &str {
    assert!(result.success, "parse failed at {:?}", result.error_position);
    assert_eq!(result.value_stack.len(), 1, "stack: {:?}", result.value_stack);
    &result.value_stack[0]
}

#[test]
fn test_simple_left_recursion() {
    // A -> A a | a
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let rule = g.left_recursive(|rec| g.choice(&[pair(&g, &[rec, a]), a]));

    assert_eq!(value(&parse(rule, "a")), "a");
    assert_eq!(value(&parse(rule, "aa")), "(a,a)");
    let result = parse(rule, "aaa");
    assert!(result.full_match);
    assert_eq!(value(&result), "((a,a),a)");
}

#[test]
fn test_left_recursion_without_base_case_fails() {
    // A -> A a
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let rule = g.left_recursive(|rec| pair(&g, &[rec, a]));

    let result = parse(rule, "aaa");
    assert!(!result.success);
    assert_eq!(result.error_position, Some(0));
}

#[test]
fn test_both_sides_recursive_groups_right() {
    // A -> A A | a
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let rule = g.left_recursive(|rec| g.choice(&[pair(&g, &[rec, rec]), a]));

    assert_eq!(value(&parse(rule, "aa")), "(a,a)");
    assert_eq!(value(&parse(rule, "aaa")), "(a,(a,a))");
}

#[test]
fn test_both_sides_recursive_left_assoc() {
    // A -> A A | a
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let rule = g.left_recursive_left_assoc(|rec| g.choice(&[pair(&g, &[rec, rec]), a]));

    assert_eq!(value(&parse(rule, "aa")), "(a,a)");
    assert_eq!(value(&parse(rule, "aaa")), "((a,a),a)");
    assert_eq!(value(&parse(rule, "aaaa")), "(((a,a),a),a)");
}

#[test]
fn test_left_assoc_blocks_nested_growth() {
    // A -> A A | b A | a
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let b = leaf(&g, "b");
    let rule = g.left_recursive_left_assoc(|rec| {
        g.choice(&[pair(&g, &[rec, rec]), pair(&g, &[b, rec]), a])
    });

    let result = parse(rule, "bba");
    assert!(!result.success);
    assert_eq!(result.error_position, Some(2));

    assert_eq!(value(&parse(rule, "baa")), "((b,a),a)");
}

#[test]
fn test_left_assoc_prefix_stops_early() {
    // A -> a A | A a | a
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let rule = g.left_recursive_left_assoc(|rec| g.choice(&[pair(&g, &[a, rec]), pair(&g, &[rec, a]), a]));

    let result = parse(rule, "aaa");
    assert!(result.success);
    assert_eq!(result.match_size, 2);
    assert_eq!(value(&result), "(a,a)");
}

#[test]
fn test_left_assoc_mixed_alternatives() {
    // A -> A a | a A | a
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let rule =
        g.left_recursive_left_assoc(|rec| g.choice(&[bracket(&g, &[rec, a]), pair(&g, &[a, rec]), a]));

    assert_eq!(value(&parse(rule, "aaa")), "[(a,a),a]");
}

#[test]
fn test_nested_invocations() {
    // A -> A ( A ) | a
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let rule = g.left_recursive(|rec| {
        g.choice(&[pair(&g, &[rec, g.string("("), rec, g.string(")")]), a])
    });

    assert_eq!(value(&parse(rule, "a(a)")), "(a,a)");
    let result = parse(rule, "a(a(a))(a(a))");
    assert!(result.full_match);
    assert_eq!(value(&result), "((a,(a,a)),(a,a))");
}

#[test]
fn test_indirect_reference() {
    // E -> E + T | T, T -> digit, with E referenced through a named wrapper
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let digit = g.collect(
        g.digit(),
        g.string_action(|p, text, _| {
            p.push(text.to_string());
            Ok(())
        }),
    );
    let sum = g.left_recursive(|sum| {
        let expr = g.named("expression", sum);
        g.choice(&[pair(&g, &[expr, g.string("+"), digit]), digit])
    });

    assert_eq!(value(&parse(sum, "1+2+3")), "((1,2),3)");

    let result = parse(sum, "1+2+");
    assert!(!result.full_match);
    assert_eq!(result.match_size, 3);
    assert_eq!(result.error_position, Some(4));
    assert_eq!(result.expected, ["digit"]);
}

#[test]
fn test_nested_left_recursive_units() {
    // B -> B B | A | b, A -> A A | a
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let b = leaf(&g, "b");

    let inner = g.left_recursive(|rec| g.choice(&[pair(&g, &[rec, rec]), a]));
    let outer = g.left_recursive(|rec| g.choice(&[pair(&g, &[rec, rec]), inner, b]));
    let result = parse(outer, "baaabbb");
    assert!(result.full_match);
    assert_eq!(value(&result), "(b,((a,(a,a)),(b,(b,b))))");

    let inner = g.left_recursive_left_assoc(|rec| g.choice(&[pair(&g, &[rec, rec]), a]));
    let outer = g.left_recursive_left_assoc(|rec| g.choice(&[pair(&g, &[rec, rec]), inner, b]));
    let result = parse(outer, "baaabb");
    assert!(result.full_match);
    assert_eq!(value(&result), "(((b,((a,a),a)),b),b)");
}

#[test]
fn test_seed_is_replayed_with_effects() {
    // The seed's pushes and pops must be replayed exactly at every level.
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let list = g.left_recursive(|rec| {
        g.choice(&[
            g.push(g.seq(&[rec, g.string(","), a]), |_, items| Ok(items.concat())),
            a,
        ])
    });
    let root = g.seq(&[leaf(&g, "<"), list, leaf(&g, ">")]);

    let result = parse(root, "<a,a,a>");
    assert!(result.full_match);
    assert_eq!(result.value_stack, ["<", "aaa", ">"]);
}

#[test]
fn test_grammar_shared_between_threads() {
    // A -> A A | a, left-associative
    let arena = Bump::new();
    let g = Grammar::new(&arena);
    let a = leaf(&g, "a");
    let rule = g.left_recursive_left_assoc(|rec| g.choice(&[pair(&g, &[rec, rec]), a]));

    let inputs = ["a", "aa", "aaa", "aaaa"];
    let results: Vec<String> = std::thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|&text| s.spawn(move || value(&parse(rule, text)).to_string()))
            .collect();
        handles.into_iter().map(|h| h.join().expect("parser thread panicked")).collect()
    });

    assert_eq!(results, ["a", "(a,a)", "((a,a),a)", "(((a,a),a),a)"]);
}
