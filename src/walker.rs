//! Parser graph traversal with cycle detection.
//!
//! Grammars are cyclic, so a plain recursive descent over
//! [`children`](crate::Parser::children) would never terminate.  The walker
//! keeps the set of nodes ever entered and the stack of nodes currently on
//! the traversal path; every node gets exactly one `Before`/`After` pair,
//! and every additional encounter is reported as a `Recurse` (back-edge to
//! a node still on the path) or `Visited` (cross-edge to a finished node).

use crate::parser::{parser_id, ParserRef};
use fnv::FnvHashSet;

/// Why the walker is handing a node to the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    /// First encounter, before the node's children are traversed.
    Before,
    /// Same encounter, after the node's children are traversed.
    After,
    /// The node is an ancestor on the current traversal path (cycle edge).
    Recurse,
    /// The node was fully traversed earlier (shared subgraph).
    Visited,
}

/// Pre/post-order DFS over a parser graph.
///
/// A walker instance accumulates its visited set across calls, so walking
/// two roots with one walker reports nodes shared between them as
/// `Visited` the second time.
#[derive(Default)]
pub struct ParserWalker {
    visited: FnvHashSet<usize>,
    stack: Vec<usize>,
}

impl ParserWalker {
    /// Fresh walker with empty visited state.
    pub fn new() -> ParserWalker {
        ParserWalker::default()
    }

    /// Walks the graph reachable from `root`, feeding every event to
    /// `work`.
    pub fn walk(&mut self, root: &ParserRef, work: &mut dyn FnMut(&ParserRef, WalkState)) {
        let id = parser_id(root);
        if self.stack.contains(&id) {
            work(root, WalkState::Recurse);
            return;
        }
        if self.visited.contains(&id) {
            work(root, WalkState::Visited);
            return;
        }
        self.visited.insert(id);
        self.stack.push(id);
        work(root, WalkState::Before);
        for child in root.children() {
            self.walk(&child, work);
        }
        work(root, WalkState::After);
        self.stack.pop();
    }
}

/// Collects every node reachable from `root`, in `Before` order.
pub fn collect_nodes(root: &ParserRef) -> Vec<ParserRef> {
    let mut nodes = Vec::new();
    ParserWalker::new().walk(root, &mut |parser, state| {
        if state == WalkState::Before {
            nodes.push(parser.clone());
        }
    });
    nodes
}

/// DOT rendering of the parser graph, for `dot(1)` and friends.
#[cfg(feature = "dot")]
pub mod dot {
    use super::{collect_nodes, WalkState};
    use crate::parser::{parser_id, ParserRef};
    use crate::ParserWalker;
    use dot_writer::{Attributes, DotWriter};
    use fnv::FnvHashMap;

    /// Writes the graph reachable from `root` as a DOT digraph.
    ///
    /// Every parser becomes one node labeled with a shallow description;
    /// edges follow `children()`, including back-edges.
    pub fn export(root: &ParserRef) -> String {
        let nodes = collect_nodes(root);
        let ids: FnvHashMap<usize, usize> =
            nodes.iter().enumerate().map(|(index, node)| (parser_id(node), index)).collect();
        let mut output = Vec::new();
        {
            let mut writer = DotWriter::from(&mut output);
            let mut digraph = writer.digraph();
            for (index, node) in nodes.iter().enumerate() {
                digraph
                    .node_named(format!("p{}", index))
                    .set_label(&node.label().replace('"', "'"));
            }
            let mut stack: Vec<usize> = Vec::new();
            ParserWalker::new().walk(root, &mut |parser, state| {
                let id = ids[&parser_id(parser)];
                match state {
                    WalkState::Before => {
                        if let Some(parent) = stack.last() {
                            digraph.edge(format!("p{}", parent), format!("p{}", id));
                        }
                        stack.push(id);
                    }
                    WalkState::After => {
                        stack.pop();
                    }
                    WalkState::Recurse | WalkState::Visited => {
                        if let Some(parent) = stack.last() {
                            digraph.edge(format!("p{}", parent), format!("p{}", id));
                        }
                    }
                }
            });
        }
        String::from_utf8(output).expect("dot writer produced invalid utf-8")
    }
}
