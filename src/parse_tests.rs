use crate::parsers::{action, any, choice, literal, lookahead, not, recursive, seq};
use crate::stack::downcast;
use crate::{diag, run, Input, Parse, ParseOptions, SideEffect, TestFixture};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn failure_restores_cursor_stack_and_journal() {
    let pushing = action(literal("a"), |scope| scope.push_node(1i64));
    let grammar = seq(vec![pushing, literal("b")]);
    let input = Input::from("ac");
    let mut parse = Parse::new(&input, ParseOptions::default());
    assert!(!parse.apply(&grammar));
    assert_eq!(parse.pos, 0);
    assert!(parse.stack().is_empty());
    assert_eq!(parse.log_len(), 0);
}

#[test]
fn success_commits_the_journal() {
    let pushing = action(literal("a"), |scope| scope.push_node(1i64));
    let input = Input::from("a");
    let mut parse = Parse::new(&input, ParseOptions::default());
    assert!(parse.apply(&pushing));
    assert_eq!(parse.pos, 1);
    assert_eq!(parse.stack().len(), 1);
    assert_eq!(parse.log_len(), 1);
}

#[test]
fn rejected_choice_alternatives_leave_no_trace() {
    let long = action(seq(vec![literal("a"), literal("b")]), |scope| {
        scope.push_node("ab".to_string());
    });
    let short = action(literal("a"), |scope| scope.push_node("a".to_string()));
    let fix = TestFixture::new(choice(vec![long, short]));
    let result = fix.success_expect("a", &"a".to_string());
    assert_eq!(result.value_stack.len(), 1);
}

#[test]
fn custom_effects_roll_back_with_their_transaction() {
    let counter = Arc::new(AtomicUsize::new(0));
    let effectful = {
        let counter = Arc::clone(&counter);
        action(literal("a"), move |scope| {
            let counter = Arc::clone(&counter);
            scope.apply_effect(SideEffect::new(move |_stack| {
                counter.fetch_add(1, Ordering::SeqCst);
                let counter = Arc::clone(&counter);
                Box::new(move |_stack| {
                    counter.fetch_sub(1, Ordering::SeqCst);
                })
            }));
        })
    };
    let grammar = choice(vec![seq(vec![effectful, literal("b")]), literal("a")]);
    let fix = TestFixture::new(grammar);
    fix.success("a");
    // The increments from the rejected alternative were all undone.
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[test]
fn furthest_error_collects_all_leaves_at_that_position() {
    let grammar = choice(vec![
        seq(vec![literal("a"), literal("b")]),
        seq(vec![literal("a"), literal("c")]),
    ]);
    let result = TestFixture::new(grammar).failure_at("ad", 1);
    assert!(result.expected.contains(&"\"b\"".to_owned()));
    assert!(result.expected.contains(&"\"c\"".to_owned()));
}

#[test]
fn later_failures_supersede_earlier_ones() {
    let grammar = choice(vec![literal("zz"), seq(vec![literal("a"), literal("b")])]);
    let result = TestFixture::new(grammar).failure_at("ax", 1);
    assert_eq!(result.expected, vec!["\"b\"".to_owned()]);
}

#[test]
fn lookahead_and_not_have_no_net_effect() {
    let pushing = action(literal("a"), |scope| scope.push_node(1i64));
    let input = Input::from("abc");
    for parser in [lookahead(pushing), not(literal("z"))] {
        let mut parse = Parse::new(&input, ParseOptions::default());
        assert!(parse.apply(&parser));
        assert_eq!(parse.pos, 0);
        assert_eq!(parse.log_len(), 0);
        assert!(parse.stack().is_empty());
    }
}

#[test]
fn call_stack_snapshot_names_the_active_parsers() {
    let grammar = seq(vec![literal("a"), literal("b")]);
    let options = ParseOptions { record_call_stack: true, ..ParseOptions::default() };
    let result = run(&grammar, &Input::from("ac"), options).unwrap();
    let frames = result.call_stack.expect("recording was enabled");
    assert!(frames.iter().any(|frame| frame.parser.starts_with("seq(")));
    assert_eq!(frames.last().map(|frame| frame.position), Some(0));
}

#[test]
fn call_stack_is_not_recorded_by_default() {
    let grammar = seq(vec![literal("a"), literal("b")]);
    let result = run(&grammar, &Input::from("ac"), ParseOptions::default()).unwrap();
    assert!(result.call_stack.is_none());
}

#[test]
fn trace_records_each_invocation() {
    let options = ParseOptions { trace: true, ..ParseOptions::default() };
    let result = run(&seq(vec![literal("a")]), &Input::from("a"), options).unwrap();
    let trace = result.trace.expect("tracing was enabled");
    assert!(trace.contains("\"a\" at 0"));
    assert!(trace.contains("match"));
}

#[test]
fn unguarded_left_recursion_trips_the_depth_guard() {
    let grammar =
        recursive("expr", |expr| choice(vec![seq(vec![expr, literal("+")]), literal("1")]));
    let result = run(&grammar, &Input::from("1"), ParseOptions::default()).unwrap();
    assert!(!result.success);
    assert!(result.thrown.expect("the guard should have fired").contains("nesting"));
}

#[test]
fn exceptions_leave_the_value_stack_for_post_mortem() {
    let pushing = action(literal("a"), |scope| scope.push_node("kept".to_string()));
    let bomb = action(literal("b"), |_scope| panic!("action exploded"));
    let grammar = seq(vec![pushing, bomb]);
    let result = run(&grammar, &Input::from("ab"), ParseOptions::default()).unwrap();
    assert!(!result.success);
    assert_eq!(result.thrown.as_deref(), Some("action exploded"));
    // No rollback on exceptional failure: the partial stack is observable.
    assert_eq!(result.value_stack.len(), 1);
    assert_eq!(downcast::<String>(&result.value_stack[0]).map(String::as_str), Some("kept"));
}

#[test]
fn identical_runs_produce_identical_results() {
    let word = action(seq(vec![literal("a"), literal("b")]), |scope| {
        let text = scope.text();
        scope.push_node(text);
    });
    let grammar = choice(vec![word, any()]);
    let input = Input::from("ab");
    let first = run(&grammar, &input, ParseOptions::default()).unwrap();
    let second = run(&grammar, &input, ParseOptions::default()).unwrap();
    assert_eq!(first.success, second.success);
    assert_eq!(first.match_size, second.match_size);
    assert_eq!(first.error_position, second.error_position);
    assert_eq!(first.expected, second.expected);
    assert_eq!(first.value_stack.len(), second.value_stack.len());
}

#[test]
fn report_sections_are_stable() {
    let grammar = seq(vec![literal("a"), literal("b")]);

    let result = run(&grammar, &Input::from("ab"), ParseOptions::default()).unwrap();
    let report = result.report();
    assert!(report.contains("Success (full match)"));
    assert!(report.contains("Value stack is empty"));

    let result = run(&grammar, &Input::from("ac"), ParseOptions::default()).unwrap();
    let report = result.report();
    assert!(report.contains("Failure"));
    assert!(report.contains("Furthest error at line 1, column 2"));
    assert!(report.contains("Expected one of: \"b\""));
}

#[test]
fn report_deduplicates_expected_entries() {
    let grammar = choice(vec![literal("b"), literal("b")]);
    let result = run(&grammar, &Input::from("x"), ParseOptions::default()).unwrap();
    assert_eq!(result.expected.len(), 2);
    let report = result.report();
    assert!(report.contains("Expected one of: \"b\"\n"));
}

#[test]
fn annotated_rendering_points_at_the_failure() {
    let grammar = seq(vec![literal("a"), literal("b")]);
    let result = run(&grammar, &Input::from("ac"), ParseOptions::default()).unwrap();
    let rendered = diag::annotate(&result, "ac", false).expect("failed parses render");
    assert!(rendered.contains("expected one of: \"b\""));
    diag::annotate(&result, "", false).expect("empty input still renders a title");

    let result = run(&grammar, &Input::from("ab"), ParseOptions::default()).unwrap();
    assert!(diag::annotate(&result, "ab", false).is_none());
}
