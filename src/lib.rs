//! Core engine of a PEG-style parser-combinator library with backtracking,
//! side-effect journaling and structured error reporting.
//!
//! A grammar is a directed (possibly cyclic) graph of immutable
//! [`Parser`] nodes, assembled from the primitives in [`parsers`] and
//! shared as [`ParserRef`]s.  Driving the graph is the job of [`run`],
//! which builds a [`Parse`] — the single mutable context holding the input
//! cursor, the value stack of AST fragments, the side-effect journal and
//! the furthest-failure tracker — invokes the root parser and captures the
//! outcome in an immutable [`ParseResult`].
//!
//! ## On backtracking
//!
//! PEG semantics mean any parser may fail after arbitrary speculative work,
//! and ordered choice then tries the next alternative as if nothing
//! happened.  Rather than snapshotting the whole state on entry to every
//! parser, the engine journals each observable mutation together with its
//! inverse ([`SideEffect`]); the transactional wrapper [`Parse::apply`]
//! records an integer checkpoint per invocation and, on failure, replays
//! inverses back to it and restores the cursor.  Everything observable goes
//! through the journal — value-stack traffic from semantic actions and
//! arbitrary user state captured in effect closures alike — which is what
//! makes rollback complete.  It is also the contract most easily broken
//! from outside, which is why [`TestFixture`] exists: it runs every
//! assertion twice and flags runs that do not agree, the reliable signature
//! of an unjournaled mutation.
//!
//! ## Left recursion
//!
//! Plain PEG diverges on left-recursive rules.  The
//! [`LeftRecursive`](parsers::LeftRecursive) wrapper supports them by seed
//! growing: re-entries at the same position return the best match found so
//! far (replaying its journaled effects), and the body is re-run until the
//! match stops growing.  The optional well-formedness check
//! ([`wellformed::check`]) finds left recursion *not* wrapped this way, by
//! computing nullability over the graph and searching left-edge cycles.
//!
//! ## Introspection
//!
//! Grammar analyses never match on node types directly: every node offers
//! its children for traversal ([`ParserWalker`] handles cycles) and
//! double-dispatches to a [`ParserVisitor`] for per-kind logic.  The
//! well-formedness check is itself a client of this machinery.
//!
//! A `Parse` is strictly single-threaded; parser graphs are immutable after
//! construction and may be shared freely, including across threads.

pub mod diag;
mod driver;
mod fixture;
mod input;
mod journal;
mod linemap;
mod parse;
mod parser;
pub mod parsers;
mod result;
mod stack;
mod visitor;
mod walker;
pub mod wellformed;

#[cfg(test)]
mod combinator_tests;
#[cfg(test)]
mod fixture_tests;
#[cfg(test)]
mod parse_tests;

pub use crate::driver::run;
pub use crate::fixture::{FixtureError, TestFixture};
pub use crate::input::Input;
pub use crate::journal::{SideEffect, SideEffectLog, Undo};
pub use crate::linemap::{LineMap, Position, DEFAULT_COLUMN_START, DEFAULT_TAB_WIDTH};
pub use crate::parse::{Frame, Parse, ParseOptions, Scope, DEPTH_LIMIT};
pub use crate::parser::{parser_id, Parser, ParserRef};
pub use crate::result::ParseResult;
pub use crate::stack::{downcast, AstNode, Value, ValueStack};
pub use crate::visitor::ParserVisitor;
pub use crate::walker::{collect_nodes, ParserWalker, WalkState};
pub use crate::wellformed::{GrammarError, GrammarFault};
