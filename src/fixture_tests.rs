use crate::parsers::{action, literal, lookahead, seq};
use crate::visitor::ParserVisitor;
use crate::{FixtureError, Parse, Parser, ParserRef, TestFixture};
use assert_matches::assert_matches;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A parser that keeps unjournaled state: it matches one `a` only on its
/// first invocation ever.  The double run exists to catch exactly this.
struct FirstTimeOnly {
    calls: AtomicUsize,
}

impl Parser for FirstTimeOnly {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        let first = self.calls.fetch_add(1, Ordering::SeqCst) == 0;
        if first && parse.input().char_at(parse.pos) == Some('a') {
            parse.pos += 1;
            true
        } else {
            false
        }
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_other(self);
    }

    fn label(&self) -> String {
        "first-time-only".to_owned()
    }
}

/// Consumes two positions on the first invocation, one afterwards.
struct Shrinking {
    calls: AtomicUsize,
}

impl Parser for Shrinking {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        let take = if self.calls.fetch_add(1, Ordering::SeqCst) == 0 { 2 } else { 1 };
        if parse.input().len() - parse.pos >= take {
            parse.pos += take;
            true
        } else {
            false
        }
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_other(self);
    }

    fn label(&self) -> String {
        "shrinking".to_owned()
    }
}

/// Fails cleanly once, then panics.
struct LateBomb {
    calls: AtomicUsize,
}

impl Parser for LateBomb {
    fn doparse(&self, _parse: &mut Parse<'_>) -> bool {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            false
        } else {
            panic!("second run exploded")
        }
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_other(self);
    }

    fn label(&self) -> String {
        "late-bomb".to_owned()
    }
}

#[test]
fn double_run_detects_unjournaled_state() {
    let cheat: ParserRef = Arc::new(FirstTimeOnly { calls: AtomicUsize::new(0) });
    let fix = TestFixture::new(cheat);
    let error = fix.try_success("a").unwrap_err();
    assert_matches!(error, FixtureError::Divergence { field: "success", .. });
    assert!(error.to_string().contains("disagree on success"));
}

#[test]
fn double_run_detects_match_size_divergence() {
    let cheat: ParserRef = Arc::new(Shrinking { calls: AtomicUsize::new(0) });
    let fix = TestFixture::new(cheat);
    let error = fix.try_prefix("ab").unwrap_err();
    assert_matches!(error, FixtureError::Divergence { field: "match_size", .. });
}

#[test]
fn double_run_detects_thrown_divergence() {
    let cheat: ParserRef = Arc::new(LateBomb { calls: AtomicUsize::new(0) });
    let fix = TestFixture::new(cheat);
    let error = fix.try_failure("x").unwrap_err();
    assert_matches!(error, FixtureError::Divergence { field: "thrown", .. });
}

#[test]
fn divergence_messages_embed_both_reports() {
    let cheat: ParserRef = Arc::new(FirstTimeOnly { calls: AtomicUsize::new(0) });
    let mut fix = TestFixture::new(cheat);
    fix.trace_separator = "\n=====".to_owned();
    let error = fix.try_success("a").unwrap_err();
    let message = error.to_string();
    assert!(message.contains("\n====="));
    assert!(message.contains("Success (full match)"));
    assert!(message.contains("Failure"));
}

#[test]
fn honest_parsers_pass_the_double_run() {
    let fix = TestFixture::new(seq(vec![literal("a"), literal("b")]));
    fix.success("ab");
    fix.failure_at("ac", 1);
}

#[test]
fn assertion_failures_carry_the_report() {
    let fix = TestFixture::new(seq(vec![literal("a"), literal("b")]));

    let error = fix.try_success("ax").unwrap_err();
    assert_matches!(error, FixtureError::UnexpectedFailure { ref report } if report.contains("Failure"));

    let error = fix.try_failure("ab").unwrap_err();
    assert_matches!(error, FixtureError::UnexpectedSuccess { .. });

    let error = fix.try_failure_at("ax", 0).unwrap_err();
    assert_matches!(
        error,
        FixtureError::WrongErrorPosition { expected: 0, actual: Some(1), .. }
    );
}

#[test]
fn success_requires_the_whole_input() {
    let fix = TestFixture::new(lookahead(literal("a")));
    let error = fix.try_success("a").unwrap_err();
    assert_matches!(error, FixtureError::IncompleteMatch { matched: 0, length: 1, .. });
}

#[test]
fn success_expect_compares_the_top_of_the_stack() {
    let tagged = action(literal("a"), |scope| scope.push_node("tag".to_string()));
    let fix = TestFixture::new(tagged);
    fix.success_expect("a", &"tag".to_string());

    let error = fix.try_success_expect("a", &"other".to_string()).unwrap_err();
    assert_matches!(error, FixtureError::ValueMismatch { .. });

    let bare = TestFixture::new(literal("a"));
    let error = bare.try_success_expect("a", &"tag".to_string()).unwrap_err();
    assert_matches!(error, FixtureError::EmptyValueStack { .. });
}

#[test]
fn reports_honor_the_fixture_tunables() {
    let mut fix = TestFixture::new(seq(vec![literal("\t"), literal("b")]));
    fix.tab_width = 8;
    fix.column_start = 0;
    let error = fix.try_success("\tx").unwrap_err();
    // The tab spans columns 0..8, so the failure lands in column 8.
    assert_matches!(error, FixtureError::UnexpectedFailure { ref report } if report.contains("line 1, column 8"));
}
