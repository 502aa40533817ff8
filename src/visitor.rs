//! Double-dispatch over parser kinds.
//!
//! Analyses and pretty-printers need per-kind logic without teaching the
//! parser nodes about every analysis.  Each node's
//! [`accept`](crate::Parser::accept) calls the visitor method for its own
//! concrete kind; every method defaults to [`visit_other`]
//! (itself a no-op), so a visitor overrides only the kinds it cares about.
//!
//! Custom parser kinds defined outside this crate implement `accept` by
//! calling `visit_other` directly.
//!
//! [`visit_other`]: ParserVisitor::visit_other

use crate::parser::Parser;
use crate::parsers::{
    Action, Any, Around, CharPredicate, Choice, Empty, End, Lazy, LeftRecursive, Literal,
    LookAhead, Not, Optional, Repeat, Sequence, TokenPredicate,
};

/// Visitor with one hook per concrete parser kind.
#[allow(unused_variables)]
pub trait ParserVisitor {
    /// Fallback for kinds the visitor does not override.
    fn visit_other(&mut self, parser: &dyn Parser) {}

    fn visit_empty(&mut self, parser: &Empty) {
        self.visit_other(parser);
    }

    fn visit_literal(&mut self, parser: &Literal) {
        self.visit_other(parser);
    }

    fn visit_char_predicate(&mut self, parser: &CharPredicate) {
        self.visit_other(parser);
    }

    fn visit_token_predicate(&mut self, parser: &TokenPredicate) {
        self.visit_other(parser);
    }

    fn visit_any(&mut self, parser: &Any) {
        self.visit_other(parser);
    }

    fn visit_end(&mut self, parser: &End) {
        self.visit_other(parser);
    }

    fn visit_sequence(&mut self, parser: &Sequence) {
        self.visit_other(parser);
    }

    fn visit_choice(&mut self, parser: &Choice) {
        self.visit_other(parser);
    }

    fn visit_optional(&mut self, parser: &Optional) {
        self.visit_other(parser);
    }

    fn visit_repeat(&mut self, parser: &Repeat) {
        self.visit_other(parser);
    }

    fn visit_lookahead(&mut self, parser: &LookAhead) {
        self.visit_other(parser);
    }

    fn visit_not(&mut self, parser: &Not) {
        self.visit_other(parser);
    }

    fn visit_around(&mut self, parser: &Around) {
        self.visit_other(parser);
    }

    fn visit_left_recursive(&mut self, parser: &LeftRecursive) {
        self.visit_other(parser);
    }

    fn visit_action(&mut self, parser: &Action) {
        self.visit_other(parser);
    }

    fn visit_lazy(&mut self, parser: &Lazy) {
        self.visit_other(parser);
    }
}
