//! The primitive combinators.
//!
//! These are the nodes the grammar-building surface lowers to.  Each one
//! implements [`Parser`] and nothing else: checkpointing and rollback are
//! supplied by [`Parse::apply`], so the code below reads as the bare
//! recognition rules.
//!
//! Construction goes through the free functions at the bottom of the
//! module (`literal`, `seq`, `choice`, ...), which wrap the nodes in
//! [`ParserRef`]s ready to be shared.  Recursive grammars tie their knots
//! with [`Lazy`] nodes resolved after construction, usually through the
//! [`recursive`] convenience.

use crate::parse::{Parse, Scope, Seed};
use crate::parser::{Parser, ParserRef};
use crate::stack::Value;
use crate::visitor::ParserVisitor;
use itertools::Itertools;
use std::sync::Arc;
use std::sync::OnceLock;

/// Matches nothing, always succeeds.
pub struct Empty;

impl Parser for Empty {
    fn doparse(&self, _parse: &mut Parse<'_>) -> bool {
        true
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_empty(self);
    }

    fn label(&self) -> String {
        "empty".to_owned()
    }
}

/// Matches an exact string of characters.
pub struct Literal {
    text: String,
    len: usize,
}

impl Literal {
    /// The string this parser recognizes.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Parser for Literal {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        if parse.input().starts_with(parse.pos, &self.text) {
            parse.pos += self.len;
            true
        } else {
            false
        }
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_literal(self);
    }

    fn label(&self) -> String {
        format!("{:?}", self.text)
    }

    fn is_error_leaf(&self) -> bool {
        true
    }
}

/// Matches one character satisfying a predicate.
pub struct CharPredicate {
    name: String,
    predicate: Box<dyn Fn(char) -> bool + Send + Sync>,
}

impl CharPredicate {
    /// The class name shown in diagnostics ("letter", "digit", ...).
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Parser for CharPredicate {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        match parse.input().char_at(parse.pos) {
            Some(c) if (self.predicate)(c) => {
                parse.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_char_predicate(self);
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn is_error_leaf(&self) -> bool {
        true
    }
}

/// Matches one token satisfying a predicate; the token-input counterpart of
/// [`CharPredicate`].
pub struct TokenPredicate {
    name: String,
    predicate: Box<dyn Fn(&Value) -> bool + Send + Sync>,
}

impl TokenPredicate {
    /// The token-class name shown in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Parser for TokenPredicate {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        match parse.input().token_at(parse.pos) {
            Some(token) if (self.predicate)(token) => {
                parse.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_token_predicate(self);
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn is_error_leaf(&self) -> bool {
        true
    }
}

/// Consumes one position of either input kind.
pub struct Any;

impl Parser for Any {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        if parse.pos < parse.input().len() {
            parse.pos += 1;
            true
        } else {
            false
        }
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_any(self);
    }

    fn label(&self) -> String {
        "any".to_owned()
    }

    fn is_error_leaf(&self) -> bool {
        true
    }
}

/// Succeeds only at the end of the input, without consuming.
pub struct End;

impl Parser for End {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        parse.pos == parse.input().len()
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_end(self);
    }

    fn label(&self) -> String {
        "end of input".to_owned()
    }

    fn is_error_leaf(&self) -> bool {
        true
    }
}

/// Matches its children in order; all must succeed.
pub struct Sequence {
    items: Vec<ParserRef>,
}

impl Sequence {
    /// The sequenced parsers, in order.
    pub fn items(&self) -> &[ParserRef] {
        &self.items
    }
}

impl Parser for Sequence {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        self.items.iter().all(|item| parse.apply(item))
    }

    fn children(&self) -> Vec<ParserRef> {
        self.items.clone()
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_sequence(self);
    }

    fn label(&self) -> String {
        format!("seq({})", self.items.iter().map(|item| item.label()).join(", "))
    }
}

/// Ordered choice: tries alternatives in order, first success wins.
pub struct Choice {
    alternatives: Vec<ParserRef>,
}

impl Choice {
    /// The alternatives, in priority order.
    pub fn alternatives(&self) -> &[ParserRef] {
        &self.alternatives
    }
}

impl Parser for Choice {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        self.alternatives.iter().any(|alternative| parse.apply(alternative))
    }

    fn children(&self) -> Vec<ParserRef> {
        self.alternatives.clone()
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_choice(self);
    }

    fn label(&self) -> String {
        format!("choice({})", self.alternatives.iter().map(|a| a.label()).join(" | "))
    }
}

/// Tries its child and succeeds either way.
pub struct Optional {
    item: ParserRef,
}

impl Optional {
    /// The optional parser.
    pub fn item(&self) -> &ParserRef {
        &self.item
    }
}

impl Parser for Optional {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        parse.apply(&self.item);
        true
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.item.clone()]
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_optional(self);
    }

    fn label(&self) -> String {
        format!("opt({})", self.item.label())
    }
}

/// Greedy repetition with a minimum and an optional maximum.
pub struct Repeat {
    item: ParserRef,
    min: usize,
    max: Option<usize>,
}

impl Repeat {
    /// The repeated parser.
    pub fn item(&self) -> &ParserRef {
        &self.item
    }

    /// Fewest matches required.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Most matches consumed, unbounded if `None`.
    pub fn max(&self) -> Option<usize> {
        self.max
    }
}

impl Parser for Repeat {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        let mut count = 0;
        loop {
            if self.max == Some(count) {
                break;
            }
            let before = parse.pos;
            if !parse.apply(&self.item) {
                break;
            }
            count += 1;
            // An iteration that consumed nothing would repeat forever.
            if parse.pos == before {
                break;
            }
        }
        count >= self.min
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.item.clone()]
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_repeat(self);
    }

    fn label(&self) -> String {
        match self.max {
            Some(max) => format!("repeat({}, {}..={})", self.item.label(), self.min, max),
            None => format!("repeat({}, {}..)", self.item.label(), self.min),
        }
    }
}

/// Succeeds iff its child succeeds, consuming nothing either way.
pub struct LookAhead {
    item: ParserRef,
}

impl LookAhead {
    /// The probed parser.
    pub fn item(&self) -> &ParserRef {
        &self.item
    }
}

impl Parser for LookAhead {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        let pos0 = parse.pos;
        let log0 = parse.log_len();
        let ok = parse.apply(&self.item);
        if ok {
            parse.rollback_to(pos0, log0);
        }
        ok
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.item.clone()]
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_lookahead(self);
    }

    fn label(&self) -> String {
        format!("ahead({})", self.item.label())
    }
}

/// Succeeds iff its child fails, consuming nothing either way.
///
/// The child runs with the error tracker masked: its failure is the point,
/// not a diagnostic.
pub struct Not {
    item: ParserRef,
}

impl Not {
    /// The negated parser.
    pub fn item(&self) -> &ParserRef {
        &self.item
    }
}

impl Parser for Not {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        let pos0 = parse.pos;
        let log0 = parse.log_len();
        let item = &self.item;
        let ok = parse.with_errors_masked(|parse| parse.apply(item));
        if ok {
            parse.rollback_to(pos0, log0);
        }
        !ok
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.item.clone()]
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_not(self);
    }

    fn label(&self) -> String {
        format!("not({})", self.item.label())
    }
}

/// Repetitions of an item interleaved with a separator.
pub struct Around {
    min: usize,
    exact: bool,
    trailing: bool,
    item: ParserRef,
    separator: ParserRef,
}

impl Around {
    /// Fewest item matches required.
    pub fn min(&self) -> usize {
        self.min
    }

    /// If true, exactly `min` items are matched; no greedy continuation.
    pub fn exact(&self) -> bool {
        self.exact
    }

    /// If true, one trailing separator is accepted after the last item.
    pub fn trailing(&self) -> bool {
        self.trailing
    }

    /// The separated parser.
    pub fn item(&self) -> &ParserRef {
        &self.item
    }

    /// The separator parser.
    pub fn separator(&self) -> &ParserRef {
        &self.separator
    }
}

impl Parser for Around {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        if !parse.apply(&self.item) {
            if self.min > 0 {
                return false;
            }
            if self.trailing {
                let separator = &self.separator;
                parse.with_errors_masked(|parse| parse.apply(separator));
            }
            return true;
        }
        let mut count = 1;
        while count < self.min {
            if !(parse.apply(&self.separator) && parse.apply(&self.item)) {
                return false;
            }
            count += 1;
        }
        if !self.exact {
            loop {
                let pos0 = parse.pos;
                let log0 = parse.log_len();
                if !parse.apply(&self.separator) {
                    break;
                }
                if !parse.apply(&self.item) {
                    // The dangling separator is not part of the match.
                    parse.rollback_to(pos0, log0);
                    break;
                }
                // A pair that consumed nothing would repeat forever.
                if parse.pos == pos0 {
                    break;
                }
            }
        }
        if self.trailing {
            let separator = &self.separator;
            parse.with_errors_masked(|parse| parse.apply(separator));
        }
        true
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.item.clone(), self.separator.clone()]
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_around(self);
    }

    fn label(&self) -> String {
        format!(
            "around({}, {}, {}{}{})",
            self.item.label(),
            self.separator.label(),
            self.min,
            if self.exact { ", exact" } else { "" },
            if self.trailing { ", trailing" } else { "" },
        )
    }
}

/// Enables direct and indirect left recursion through seed growing.
///
/// The first invocation at a position plants a failing seed, then runs the
/// body repeatedly: recursive re-entries at that position return the
/// current seed instead of recursing, each successful iteration that
/// extends the match becomes the new seed (its journal delta captured for
/// replay), and growth stops when an iteration no longer extends.  The
/// winning match's effects are replayed once at the end, so left-nested
/// results come out left-associated.
pub struct LeftRecursive {
    body: ParserRef,
}

impl LeftRecursive {
    /// The recursive body.
    pub fn body(&self) -> &ParserRef {
        &self.body
    }
}

impl Parser for LeftRecursive {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        let key = (self as *const LeftRecursive as usize, parse.pos);
        if let Some(seed) = parse.seed(key).cloned() {
            return match seed {
                None => false,
                Some((end, delta)) => {
                    parse.replay(&delta);
                    parse.pos = end;
                    true
                }
            };
        }
        let pos0 = parse.pos;
        let log0 = parse.log_len();
        parse.set_seed(key, None);
        let mut best: Seed = None;
        loop {
            if !parse.apply(&self.body) {
                break;
            }
            let end = parse.pos;
            let grown = match &best {
                None => true,
                Some((best_end, _)) => end > *best_end,
            };
            if !grown {
                parse.rollback_to(pos0, log0);
                break;
            }
            best = Some((end, parse.delta(log0)));
            parse.set_seed(key, best.clone());
            parse.rollback_to(pos0, log0);
        }
        parse.remove_seed(key);
        match best {
            Some((end, delta)) => {
                parse.replay(&delta);
                parse.pos = end;
                true
            }
            None => false,
        }
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.body.clone()]
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_left_recursive(self);
    }

    fn label(&self) -> String {
        format!("left_recursive({})", self.body.label())
    }
}

/// Runs a child, then a user function over the matched slice and the value
/// stack.  Stack mutations made by the function are journaled, so a later
/// failure of an enclosing parser rolls them back.
pub struct Action {
    item: ParserRef,
    action: Box<dyn Fn(&mut Scope<'_, '_>) + Send + Sync>,
}

impl Action {
    /// The wrapped parser.
    pub fn item(&self) -> &ParserRef {
        &self.item
    }
}

impl Parser for Action {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        let start = parse.pos;
        if !parse.apply(&self.item) {
            return false;
        }
        let mut scope = Scope::new(parse, start);
        (self.action)(&mut scope);
        true
    }

    fn children(&self) -> Vec<ParserRef> {
        vec![self.item.clone()]
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_action(self);
    }

    fn label(&self) -> String {
        format!("action({})", self.item.label())
    }
}

/// A named reference resolved after construction; how grammars tie cycles.
///
/// Build the node first, wire it into the graph wherever the rule is used,
/// then [`resolve`](Lazy::resolve) it to its target once the target exists.
/// Its label is the rule name, which is also what keeps label rendering
/// finite over cyclic graphs.
pub struct Lazy {
    name: String,
    target: OnceLock<ParserRef>,
}

impl Lazy {
    /// Creates an unresolved reference named `name`.
    pub fn new(name: impl Into<String>) -> Arc<Lazy> {
        Arc::new(Lazy { name: name.into(), target: OnceLock::new() })
    }

    /// The rule name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Points the reference at its target.  A reference resolves once.
    pub fn resolve(&self, target: &ParserRef) {
        self.target
            .set(target.clone())
            .unwrap_or_else(|_| panic!("reference '{}' resolved twice", self.name));
    }

    /// The resolved target, if any.
    pub fn target(&self) -> Option<&ParserRef> {
        self.target.get()
    }
}

impl Parser for Lazy {
    fn doparse(&self, parse: &mut Parse<'_>) -> bool {
        match self.target.get() {
            Some(target) => parse.apply(target),
            None => panic!("reference '{}' used before resolution", self.name),
        }
    }

    fn children(&self) -> Vec<ParserRef> {
        self.target.get().cloned().into_iter().collect()
    }

    fn accept(&self, visitor: &mut dyn ParserVisitor) {
        visitor.visit_lazy(self);
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}

/// Always-succeeding parser matching nothing.
pub fn empty() -> ParserRef {
    Arc::new(Empty)
}

/// Parser for an exact string.
pub fn literal(text: impl Into<String>) -> ParserRef {
    let text = text.into();
    let len = text.chars().count();
    Arc::new(Literal { text, len })
}

/// Parser for one character satisfying `predicate`, labeled `name`.
pub fn char_pred(
    name: impl Into<String>,
    predicate: impl Fn(char) -> bool + Send + Sync + 'static,
) -> ParserRef {
    Arc::new(CharPredicate { name: name.into(), predicate: Box::new(predicate) })
}

/// Parser for one token satisfying `predicate`, labeled `name`.
pub fn token_pred(
    name: impl Into<String>,
    predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
) -> ParserRef {
    Arc::new(TokenPredicate { name: name.into(), predicate: Box::new(predicate) })
}

/// Parser consuming any single position.
pub fn any() -> ParserRef {
    Arc::new(Any)
}

/// Parser succeeding only at end of input.
pub fn end() -> ParserRef {
    Arc::new(End)
}

/// Sequences `items` in order.
pub fn seq(items: Vec<ParserRef>) -> ParserRef {
    Arc::new(Sequence { items })
}

/// Ordered choice over `alternatives`.
pub fn choice(alternatives: Vec<ParserRef>) -> ParserRef {
    Arc::new(Choice { alternatives })
}

/// Optionally matches `item`.
pub fn opt(item: ParserRef) -> ParserRef {
    Arc::new(Optional { item })
}

/// Greedily repeats `item` between `min` and `max` times.
pub fn repeat(item: ParserRef, min: usize, max: Option<usize>) -> ParserRef {
    Arc::new(Repeat { item, min, max })
}

/// Positive lookahead over `item`.
pub fn lookahead(item: ParserRef) -> ParserRef {
    Arc::new(LookAhead { item })
}

/// Negative lookahead over `item`.
pub fn not(item: ParserRef) -> ParserRef {
    Arc::new(Not { item })
}

/// `item` repetitions separated by `separator`; see [`Around`].
pub fn around(
    min: usize,
    exact: bool,
    trailing: bool,
    item: ParserRef,
    separator: ParserRef,
) -> ParserRef {
    Arc::new(Around { min, exact, trailing, item, separator })
}

/// Left-recursion wrapper over `body`; see [`LeftRecursive`].
pub fn left_recursive(body: ParserRef) -> ParserRef {
    Arc::new(LeftRecursive { body })
}

/// Runs `item`, then `action` over the match; see [`Action`].
pub fn action(
    item: ParserRef,
    action: impl Fn(&mut Scope<'_, '_>) + Send + Sync + 'static,
) -> ParserRef {
    Arc::new(Action { item, action: Box::new(action) })
}

/// Builds a self-referential rule.
///
/// `build` receives a reference to the rule being defined (a [`Lazy`] node
/// named `name`) and returns the rule body; the reference is resolved to
/// that body before it is returned.
///
/// ```
/// use pegcore::parsers::{choice, literal, recursive, seq};
///
/// let parens = recursive("parens", |parens| {
///     choice(vec![seq(vec![literal("("), parens, literal(")")]), literal("x")])
/// });
/// ```
pub fn recursive(name: &str, build: impl FnOnce(ParserRef) -> ParserRef) -> ParserRef {
    let lazy = Lazy::new(name);
    let reference: ParserRef = lazy.clone();
    let body = build(reference);
    lazy.resolve(&body);
    body
}
