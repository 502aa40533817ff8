//! The mutable parse context and its transactional invocation protocol.
//!
//! A `Parse` is the single shared state machine one run of the engine
//! mutates: the input cursor, the value stack, the side-effect journal, the
//! furthest-failure tracker and (optionally) a record of the active parser
//! invocations.  Parser nodes themselves stay immutable; everything that
//! changes lives here, and everything that changes observably is reversible.
//!
//! The one contract everything else leans on is [`Parse::apply`]: every
//! parser invocation goes through it, and on failure it rewinds the cursor
//! and the journal to the state captured on entry.  Combinators therefore
//! never clean up after rejected children — they only decide what to try
//! next.
//!
//! A `Parse` is strictly single-threaded.  The parser graph it runs may be
//! shared between threads, each driving its own `Parse`.

use crate::journal::{SideEffect, SideEffectLog};
use crate::parser::{Parser, ParserRef};
use crate::stack::{AstNode, Value, ValueStack};
use crate::Input;
use fnv::FnvHashMap;
use log::trace;
use std::sync::Arc;

/// Hard cap on parser nesting depth.
///
/// Exceeding it raises an engine exception, converting runaway recursion
/// (typically left recursion not wrapped in
/// [`LeftRecursive`](crate::parsers::LeftRecursive)) into a reportable
/// `thrown` instead of a stack overflow.
pub const DEPTH_LIMIT: usize = 512;

/// Options that affect one engine run, constant for the lifetime of the
/// `Parse`.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// If true, the stack of active parser invocations is maintained and a
    /// snapshot of it is stored whenever the furthest-error position
    /// advances.  Costs a label allocation per invocation; off by default.
    pub record_call_stack: bool,
    /// If true, a per-invocation log is accumulated for debugging and
    /// attached to the result (also mirrored to the `log` facade at trace
    /// level).
    pub trace: bool,
    /// If true, the grammar is checked for structural problems (unguarded
    /// left recursion, repetition over nullable parsers, unresolved
    /// references) before parsing starts, and the run fails eagerly if any
    /// are found.
    pub well_formedness_check: bool,
}

/// One active (or snapshotted) parser invocation: which parser, started
/// where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Label of the invoked parser.
    pub parser: String,
    /// Input position the invocation started at.
    pub position: usize,
}

/// Furthest-failure tracker state.
#[derive(Clone, Default)]
pub(crate) struct ErrorState {
    pub(crate) pos: Option<usize>,
    pub(crate) expected: Vec<String>,
    pub(crate) frames: Option<Vec<Frame>>,
}

pub(crate) type SeedKey = (usize, usize);
pub(crate) type Seed = Option<(usize, Vec<SideEffect>)>;

/// The mutable context threaded through one parser run.
pub struct Parse<'i> {
    /// Current input position, in `[0, input.len()]`.  Primitive parsers
    /// advance it directly; [`Parse::apply`] restores it on failure.
    pub pos: usize,
    input: &'i Input,
    stack: ValueStack,
    log: SideEffectLog,
    options: ParseOptions,
    error: ErrorState,
    call_stack: Vec<Frame>,
    seeds: FnvHashMap<SeedKey, Seed>,
    trace: String,
    depth: usize,
}

impl<'i> Parse<'i> {
    /// Builds a fresh context over `input`.
    pub fn new(input: &'i Input, options: ParseOptions) -> Parse<'i> {
        Parse {
            pos: 0,
            input,
            stack: ValueStack::default(),
            log: SideEffectLog::default(),
            options,
            error: ErrorState::default(),
            call_stack: Vec::new(),
            seeds: FnvHashMap::default(),
            trace: String::new(),
            depth: 0,
        }
    }

    /// The input this parse runs over.
    pub fn input(&self) -> &'i Input {
        self.input
    }

    /// The options this parse was started with.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The value stack.
    pub fn stack(&self) -> &ValueStack {
        &self.stack
    }

    /// Journal length, used as a checkpoint token.
    pub fn log_len(&self) -> usize {
        self.log.len()
    }

    /// Applies and journals an effect.
    pub fn apply_effect(&mut self, effect: SideEffect) {
        self.log.apply(&mut self.stack, effect);
    }

    /// Pushes an AST fragment, journaled.
    pub fn push(&mut self, value: Value) {
        self.apply_effect(SideEffect::push(value));
    }

    /// Pops the top AST fragment, journaled.
    ///
    /// Raises an engine exception if the stack is empty; a semantic action
    /// popping more than its sub-parsers pushed is a grammar bug.
    pub fn pop(&mut self) -> Value {
        let value = self
            .stack
            .peek()
            .cloned()
            .expect("semantic action popped an empty value stack");
        self.apply_effect(SideEffect::pop());
        value
    }

    /// Rewinds cursor and journal to a previously captured checkpoint.
    ///
    /// Used by combinators that manage sub-transactions of their own (e.g.
    /// the greedy pair loop of [`Around`](crate::parsers::Around)).
    pub fn rollback_to(&mut self, pos: usize, log: usize) {
        self.log.rollback(&mut self.stack, log);
        self.pos = pos;
    }

    /// Clones the journal entries appended since checkpoint `from`.
    pub fn delta(&self, from: usize) -> Vec<SideEffect> {
        self.log.delta(from)
    }

    /// Re-applies a previously extracted journal delta.
    pub(crate) fn replay(&mut self, delta: &[SideEffect]) {
        for effect in delta {
            self.log.apply(&mut self.stack, effect.clone());
        }
    }

    /// Invokes `parser` under the transactional protocol.
    ///
    /// On failure the cursor, value stack and journal are exactly as they
    /// were on entry, and if `parser` is an error leaf the furthest-failure
    /// tracker has been updated.  On success the cursor has not moved
    /// backwards and all journaled effects remain committed.
    pub fn apply(&mut self, parser: &ParserRef) -> bool {
        let pos0 = self.pos;
        let log0 = self.log.len();
        self.depth += 1;
        if self.depth > DEPTH_LIMIT {
            panic!(
                "parser nesting exceeded {} levels; left recursion not wrapped in left_recursive?",
                DEPTH_LIMIT
            );
        }
        if self.options.record_call_stack {
            self.call_stack.push(Frame { parser: parser.label(), position: pos0 });
        }
        if self.options.trace {
            let indent = "  ".repeat(self.depth - 1);
            self.trace_line(format!("{}> {} at {}", indent, parser.label(), pos0));
        }
        let ok = parser.doparse(self);
        if self.options.record_call_stack {
            self.call_stack.pop();
        }
        if ok {
            debug_assert!(self.pos >= pos0, "successful parser moved the cursor backwards");
        } else {
            self.log.rollback(&mut self.stack, log0);
            self.pos = pos0;
            if parser.is_error_leaf() {
                self.register_failure(pos0, parser.as_ref());
            }
        }
        if self.options.trace {
            let indent = "  ".repeat(self.depth - 1);
            let verdict = if ok { "match" } else { "fail" };
            self.trace_line(format!("{}< {} at {}", indent, verdict, self.pos));
        }
        self.depth -= 1;
        ok
    }

    /// Runs `f` with the furthest-failure tracker saved and restored, so
    /// failures inside it leave no diagnostic trace.
    ///
    /// This is how [`Not`](crate::parsers::Not) keeps expected inner
    /// failures out of `expected`, and how the silent trailing-separator
    /// attempt of [`Around`](crate::parsers::Around) stays benign.
    pub fn with_errors_masked(&mut self, f: impl FnOnce(&mut Parse<'i>) -> bool) -> bool {
        let saved = self.error.clone();
        let ok = f(self);
        self.error = saved;
        ok
    }

    fn register_failure(&mut self, at: usize, parser: &dyn Parser) {
        match self.error.pos {
            Some(pos) if at < pos => {}
            Some(pos) if at == pos => self.error.expected.push(parser.label()),
            _ => {
                self.error.pos = Some(at);
                self.error.expected.clear();
                self.error.expected.push(parser.label());
                self.error.frames =
                    if self.options.record_call_stack { Some(self.call_stack.clone()) } else { None };
            }
        }
    }

    /// The highest position any leaf parser has failed at so far.
    pub fn error_position(&self) -> Option<usize> {
        self.error.pos
    }

    /// Labels of the leaf parsers that failed at
    /// [`error_position`](Parse::error_position), in registration order and
    /// possibly with duplicates (reports de-duplicate).
    pub fn expected(&self) -> &[String] {
        &self.error.expected
    }

    /// Call-stack snapshot captured at the last furthest-error update, when
    /// recording is enabled.
    pub fn error_call_stack(&self) -> Option<&[Frame]> {
        self.error.frames.as_deref()
    }

    pub(crate) fn seed(&self, key: SeedKey) -> Option<&Seed> {
        self.seeds.get(&key)
    }

    pub(crate) fn set_seed(&mut self, key: SeedKey, seed: Seed) {
        self.seeds.insert(key, seed);
    }

    pub(crate) fn remove_seed(&mut self, key: SeedKey) {
        self.seeds.remove(&key);
    }

    pub(crate) fn take_trace(&mut self) -> Option<String> {
        if self.options.trace {
            Some(std::mem::take(&mut self.trace))
        } else {
            None
        }
    }

    fn trace_line(&mut self, line: String) {
        trace!("{}", line);
        self.trace.push_str(&line);
        self.trace.push('\n');
    }
}

/// What a semantic action sees: the matched slice and journaled access to
/// the value stack.
pub struct Scope<'a, 'i> {
    parse: &'a mut Parse<'i>,
    start: usize,
}

impl<'a, 'i> Scope<'a, 'i> {
    pub(crate) fn new(parse: &'a mut Parse<'i>, start: usize) -> Scope<'a, 'i> {
        Scope { parse, start }
    }

    /// Position the matched slice starts at.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Position just past the matched slice.
    pub fn end(&self) -> usize {
        self.parse.pos
    }

    /// The matched characters (character input only).
    pub fn text(&self) -> String {
        self.parse.input.text_range(self.start..self.parse.pos)
    }

    /// The matched tokens (token input only).
    pub fn tokens(&self) -> &'i [Value] {
        self.parse.input.token_range(self.start..self.parse.pos)
    }

    /// Read access to the value stack.
    pub fn stack(&self) -> &ValueStack {
        self.parse.stack()
    }

    /// Pushes an AST fragment, journaled.
    pub fn push(&mut self, value: Value) {
        self.parse.push(value);
    }

    /// Wraps `node` and pushes it, journaled.
    pub fn push_node<T: AstNode>(&mut self, node: T) {
        self.push(Arc::new(node));
    }

    /// Pops the top AST fragment, journaled.
    pub fn pop(&mut self) -> Value {
        self.parse.pop()
    }

    /// Applies and journals a custom effect, e.g. over external user state.
    pub fn apply_effect(&mut self, effect: SideEffect) {
        self.parse.apply_effect(effect);
    }
}
