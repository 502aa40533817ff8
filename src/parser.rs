//! The parser graph node abstraction.
//!
//! A grammar is a directed, possibly cyclic graph of immutable parser
//! nodes, shared as [`ParserRef`]s.  Nodes are built once, then driven by
//! any number of [`Parse`](crate::Parse)s; nothing about a node changes
//! during parsing.  Cycles are tied with [`Lazy`](crate::parsers::Lazy)
//! nodes whose target is resolved after construction.

use crate::parse::Parse;
use crate::visitor::ParserVisitor;
use std::sync::Arc;

/// Shared handle to a parser node.
pub type ParserRef = Arc<dyn Parser>;

/// A combinator node.
///
/// Implementations provide the recognition rule (`doparse`) and the graph
/// plumbing (`children`, `accept`, `label`).  The transactional protocol —
/// checkpointing, rollback, error registration — lives in
/// [`Parse::apply`], which is the only place `doparse` is ever called from;
/// `doparse` itself only advances the cursor, journals effects and invokes
/// children through `parse.apply(..)`.
pub trait Parser: Send + Sync {
    /// The parser-specific recognition rule.  Returns whether the parser
    /// matched; may assume entry state will be restored by the caller on
    /// failure.
    fn doparse(&self, parse: &mut Parse<'_>) -> bool;

    /// Child nodes, in invocation order.  Back-edges (through
    /// [`Lazy`](crate::parsers::Lazy)) make the graph cyclic; traversals
    /// must go through [`ParserWalker`](crate::ParserWalker).
    fn children(&self) -> Vec<ParserRef> {
        Vec::new()
    }

    /// Double-dispatch hook: calls the [`ParserVisitor`] method for this
    /// node's concrete kind.
    fn accept(&self, visitor: &mut dyn ParserVisitor);

    /// Human-readable description used in diagnostics, call stacks and
    /// traces.  Composite labels recurse into children;
    /// [`Lazy`](crate::parsers::Lazy) labels are their rule name, which is
    /// what keeps label rendering finite over cyclic graphs.
    fn label(&self) -> String;

    /// Whether this parser registers itself with the furthest-failure
    /// tracker when it fails.  True only for primitive recognizers;
    /// composites report nothing and let their leaves speak.
    fn is_error_leaf(&self) -> bool {
        false
    }
}

/// Stable identity of a node, for walker bookkeeping and analysis tables.
///
/// Two handles to the same allocation compare equal; distinct nodes never
/// do.  Valid as long as any `ParserRef` to the node is alive.
pub fn parser_id(parser: &ParserRef) -> usize {
    Arc::as_ptr(parser) as *const () as usize
}
