use crate::parsers::{
    action, any, around, char_pred, choice, empty, end, left_recursive, literal, lookahead, not,
    opt, recursive, repeat, seq, token_pred,
};
use crate::stack::downcast;
use crate::{run, Input, ParseOptions, ParserRef, TestFixture, Value};
use std::sync::Arc;

fn fixture(parser: ParserRef) -> TestFixture {
    TestFixture::new(parser)
}

#[test]
fn sequence_of_literals() {
    let fix = fixture(seq(vec![literal("a"), literal("b")]));
    let result = fix.success("ab");
    assert_eq!(result.match_size, 2);
    assert!(result.full_match);
}

#[test]
fn sequence_failure_reports_the_missing_literal() {
    let fix = fixture(seq(vec![literal("a"), literal("b")]));
    let result = fix.failure_at("ac", 1);
    assert!(result.expected.contains(&"\"b\"".to_owned()));
}

#[test]
fn ordered_choice_prefers_the_first_alternative() {
    let fix = fixture(choice(vec![literal("a"), literal("ab")]));
    fix.prefix_expect("ab", 1);
    fix.failure("c");
}

#[test]
fn optional_succeeds_either_way() {
    let fix = fixture(seq(vec![opt(literal("-")), literal("1")]));
    fix.success("-1");
    fix.success("1");
}

#[test]
fn empty_matches_nothing() {
    let fix = fixture(empty());
    fix.success("");
    fix.prefix_expect("a", 0);
}

#[test]
fn repeat_bounds() {
    let fix = fixture(repeat(literal("a"), 2, Some(3)));
    fix.failure_at("a", 1);
    fix.success("aa");
    fix.success("aaa");
    fix.prefix_expect("aaaa", 3);
}

#[test]
fn repetition_over_an_empty_match_terminates() {
    let fix = fixture(repeat(opt(literal("a")), 0, None));
    fix.prefix_expect("b", 0);
    fix.success("aa");
}

#[test]
fn separated_repetitions() {
    let fix = fixture(around(2, false, false, literal("x"), literal(",")));
    fix.prefix_expect("x,x,x", 5);
    fix.failure_at("x", 1);
}

#[test]
fn empty_separated_repetition_with_trailing() {
    let fix = fixture(around(0, false, true, literal("x"), literal(",")));
    let result = fix.prefix_expect("", 0);
    assert!(result.full_match);
}

#[test]
fn trailing_separator_is_consumed_when_present() {
    let fix = fixture(around(1, false, true, literal("x"), literal(",")));
    fix.success("x");
    fix.success("x,");
    fix.success("x,x,");
}

#[test]
fn dangling_separator_is_not_part_of_the_match() {
    let fix = fixture(around(1, false, false, literal("x"), literal(",")));
    fix.prefix_expect("x,x,", 3);
}

#[test]
fn exact_separation_stops_at_the_bound() {
    let fix = fixture(around(2, true, false, literal("x"), literal(",")));
    fix.prefix_expect("x,x,x", 3);
}

#[test]
fn lookahead_consumes_nothing() {
    let fix = fixture(lookahead(literal("a")));
    let result = fix.prefix_expect("abc", 0);
    assert!(result.success && !result.full_match);
    fix.failure_at("b", 0);
}

#[test]
fn negative_lookahead() {
    let fix = fixture(seq(vec![not(literal("a")), any()]));
    fix.success("b");
    let result = fix.failure("a");
    // The inner match is the parser's purpose, not a diagnostic.
    assert_eq!(result.error_position, None);
}

#[test]
fn character_classes() {
    let digit = char_pred("digit", |c| c.is_ascii_digit());
    let fix = fixture(repeat(digit, 1, None));
    fix.success("2024");
    let result = fix.failure_at("x", 0);
    assert_eq!(result.expected, vec!["digit".to_owned()]);
}

#[test]
fn end_of_input_is_a_leaf() {
    let fix = fixture(seq(vec![literal("a"), end()]));
    fix.success("a");
    let result = fix.failure_at("ab", 1);
    assert!(result.expected.contains(&"end of input".to_owned()));
}

#[test]
fn left_recursion_left_associates() {
    let grammar = recursive("expr", |expr| {
        let one = action(literal("1"), |scope| {
            let text = scope.text();
            scope.push_node(text);
        });
        let add = action(seq(vec![expr, literal("+"), literal("1")]), |scope| {
            let left = scope.pop();
            let left = downcast::<String>(&left).unwrap().clone();
            scope.push_node(format!("({}+1)", left));
        });
        left_recursive(choice(vec![add, one]))
    });

    let fix = fixture(grammar);
    let result = fix.success_expect("1+1+1", &"((1+1)+1)".to_string());
    assert_eq!(result.match_size, 5);
    fix.success_expect("1", &"1".to_string());
    fix.prefix_expect("1+1+", 3);
}

#[test]
fn left_recursion_at_nested_positions() {
    // Each parenthesized group restarts seed growing at its own position.
    let grammar = recursive("sum", |sum| {
        let atom = choice(vec![
            literal("1"),
            seq(vec![literal("("), sum.clone(), literal(")")]),
        ]);
        left_recursive(choice(vec![seq(vec![sum, literal("+"), atom.clone()]), atom]))
    });

    let fix = fixture(grammar);
    fix.success("1+1");
    fix.success("(1+1)+1");
    fix.success("1+(1+(1+1))+1");
}

#[test]
fn token_input() {
    #[derive(Debug, PartialEq)]
    enum Tok {
        Ident,
        Num,
    }
    let ident = token_pred("identifier", |token| downcast::<Tok>(token) == Some(&Tok::Ident));
    let num = token_pred("number", |token| downcast::<Tok>(token) == Some(&Tok::Num));
    let fix = fixture(seq(vec![ident, num]));

    let tokens: Vec<Value> = vec![Arc::new(Tok::Ident), Arc::new(Tok::Num)];
    fix.success(Input::tokens(tokens));

    let tokens: Vec<Value> = vec![Arc::new(Tok::Num)];
    let result = fix.failure_at(Input::tokens(tokens), 0);
    assert_eq!(result.expected, vec!["identifier".to_owned()]);
}

#[test]
fn any_consumes_one_position_of_either_kind() {
    let fix = fixture(repeat(any(), 1, None));
    fix.success("xyz");
    let tokens: Vec<Value> = vec![Arc::new(1i64), Arc::new(2i64)];
    fix.success(Input::tokens(tokens));
}

#[test]
fn character_parser_on_token_input_is_an_engine_exception() {
    let tokens: Vec<Value> = vec![Arc::new(0i64)];
    let input = Input::tokens(tokens);
    let result = run(&literal("a"), &input, ParseOptions::default()).unwrap();
    assert!(!result.success);
    assert!(result.thrown.as_deref().unwrap().contains("token input"));
}
