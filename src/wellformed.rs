//! Structural well-formedness analysis of parser graphs.
//!
//! Plain PEG execution diverges on left-recursive rules that are not
//! wrapped in [`LeftRecursive`](crate::parsers::LeftRecursive), and greedy
//! repetition over a parser that can match without consuming makes no
//! progress.  Both are properties of the grammar, not the input, so they
//! are detected up front: nullability is computed to a fixed point over the
//! (cyclic) graph, a left-edge graph is derived from it (which children a
//! node can invoke at its own entry position), and a DFS flags every
//! left-edge cycle that does not pass through a `LeftRecursive` node.
//!
//! The check runs from [`run`](crate::run) when
//! [`ParseOptions::well_formedness_check`](crate::ParseOptions) is set, and
//! its findings surface as an eager error, never as a `ParseResult`.

use crate::parser::{parser_id, Parser, ParserRef};
use crate::parsers::{
    Around, Choice, Empty, End, Lazy, LeftRecursive, Literal, LookAhead, Not, Optional, Repeat,
    Sequence,
};
use crate::visitor::ParserVisitor;
use crate::walker::collect_nodes;
use fnv::FnvHashSet;
use itertools::Itertools;
use std::error::Error;
use std::fmt;

/// One structural problem found in a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarFault {
    /// A left-edge cycle with no `LeftRecursive` node on it; running it
    /// would recurse until the depth guard trips.
    UnguardedLeftRecursion {
        /// Label of a parser on the cycle.
        parser: String,
    },
    /// Unbounded repetition (or non-exact separation) over parsers that can
    /// match without consuming input.
    NullableRepetition {
        /// Label of the repetition parser.
        parser: String,
    },
    /// A [`Lazy`](crate::parsers::Lazy) reference that was never resolved.
    UnresolvedReference {
        /// The reference's rule name.
        name: String,
    },
}

impl fmt::Display for GrammarFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarFault::UnguardedLeftRecursion { parser } => {
                write!(f, "left recursion not wrapped in left_recursive: {}", parser)
            }
            GrammarFault::NullableRepetition { parser } => {
                write!(f, "repetition over a parser that can match without consuming: {}", parser)
            }
            GrammarFault::UnresolvedReference { name } => {
                write!(f, "reference '{}' was never resolved", name)
            }
        }
    }
}

/// Aggregate of every fault found in one grammar; the configuration-error
/// side of [`run`](crate::run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarError {
    /// The faults, in discovery order.
    pub faults: Vec<GrammarFault>,
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed grammar: {}", self.faults.iter().join("; "))
    }
}

impl Error for GrammarError {}

/// Checks the grammar reachable from `root`, reporting every fault found.
pub fn check(root: &ParserRef) -> Result<(), GrammarError> {
    let nodes = collect_nodes(root);
    let nullable = nullable_set(&nodes);

    let mut faults = Vec::new();
    for node in &nodes {
        let mut scan = FaultScan { nullable: &nullable, faults: &mut faults };
        node.accept(&mut scan);
    }
    find_unguarded_cycles(root, &nullable, &mut faults);

    if faults.is_empty() {
        Ok(())
    } else {
        Err(GrammarError { faults })
    }
}

/// Fixed-point nullability: the set of nodes that can succeed without
/// consuming input.  Starts empty (pessimistic) and grows monotonically, so
/// cycles converge.
fn nullable_set(nodes: &[ParserRef]) -> FnvHashSet<usize> {
    let mut nullable = FnvHashSet::default();
    loop {
        let mut changed = false;
        for node in nodes {
            let id = parser_id(node);
            if nullable.contains(&id) {
                continue;
            }
            let mut visitor = NullableVisitor { nullable: &nullable, result: false };
            node.accept(&mut visitor);
            if visitor.result {
                nullable.insert(id);
                changed = true;
            }
        }
        if !changed {
            return nullable;
        }
    }
}

fn is_nullable(set: &FnvHashSet<usize>, parser: &ParserRef) -> bool {
    set.contains(&parser_id(parser))
}

struct NullableVisitor<'a> {
    nullable: &'a FnvHashSet<usize>,
    result: bool,
}

impl ParserVisitor for NullableVisitor<'_> {
    // Unknown custom kinds are assumed to consume; analyses stay sound for
    // the faults they do report.
    fn visit_other(&mut self, _parser: &dyn Parser) {
        self.result = false;
    }

    fn visit_empty(&mut self, _parser: &Empty) {
        self.result = true;
    }

    fn visit_literal(&mut self, parser: &Literal) {
        self.result = parser.text().is_empty();
    }

    fn visit_end(&mut self, _parser: &End) {
        self.result = true;
    }

    fn visit_sequence(&mut self, parser: &Sequence) {
        self.result = parser.items().iter().all(|item| is_nullable(self.nullable, item));
    }

    fn visit_choice(&mut self, parser: &Choice) {
        self.result = parser.alternatives().iter().any(|a| is_nullable(self.nullable, a));
    }

    fn visit_optional(&mut self, _parser: &Optional) {
        self.result = true;
    }

    fn visit_repeat(&mut self, parser: &Repeat) {
        self.result = parser.min() == 0 || is_nullable(self.nullable, parser.item());
    }

    fn visit_lookahead(&mut self, _parser: &LookAhead) {
        self.result = true;
    }

    fn visit_not(&mut self, _parser: &Not) {
        self.result = true;
    }

    fn visit_around(&mut self, parser: &Around) {
        self.result = parser.min() == 0
            || (is_nullable(self.nullable, parser.item())
                && (parser.min() == 1 || is_nullable(self.nullable, parser.separator())));
    }

    fn visit_left_recursive(&mut self, parser: &LeftRecursive) {
        self.result = is_nullable(self.nullable, parser.body());
    }

    fn visit_action(&mut self, parser: &crate::parsers::Action) {
        self.result = is_nullable(self.nullable, parser.item());
    }

    fn visit_lazy(&mut self, parser: &Lazy) {
        self.result = parser.target().map_or(false, |target| is_nullable(self.nullable, target));
    }
}

/// Children a node can invoke at its own entry position.
struct LeftEdgeVisitor<'a> {
    nullable: &'a FnvHashSet<usize>,
    edges: Vec<ParserRef>,
}

impl ParserVisitor for LeftEdgeVisitor<'_> {
    fn visit_sequence(&mut self, parser: &Sequence) {
        for item in parser.items() {
            self.edges.push(item.clone());
            if !is_nullable(self.nullable, item) {
                break;
            }
        }
    }

    fn visit_choice(&mut self, parser: &Choice) {
        self.edges.extend(parser.alternatives().iter().cloned());
    }

    fn visit_optional(&mut self, parser: &Optional) {
        self.edges.push(parser.item().clone());
    }

    fn visit_repeat(&mut self, parser: &Repeat) {
        self.edges.push(parser.item().clone());
    }

    fn visit_lookahead(&mut self, parser: &LookAhead) {
        self.edges.push(parser.item().clone());
    }

    fn visit_not(&mut self, parser: &Not) {
        self.edges.push(parser.item().clone());
    }

    fn visit_around(&mut self, parser: &Around) {
        self.edges.push(parser.item().clone());
        if is_nullable(self.nullable, parser.item())
            || (parser.min() == 0 && parser.trailing())
        {
            self.edges.push(parser.separator().clone());
        }
    }

    fn visit_left_recursive(&mut self, parser: &LeftRecursive) {
        self.edges.push(parser.body().clone());
    }

    fn visit_action(&mut self, parser: &crate::parsers::Action) {
        self.edges.push(parser.item().clone());
    }

    fn visit_lazy(&mut self, parser: &Lazy) {
        if let Some(target) = parser.target() {
            self.edges.push(target.clone());
        }
    }
}

struct LeftRecProbe {
    found: bool,
}

impl ParserVisitor for LeftRecProbe {
    fn visit_left_recursive(&mut self, _parser: &LeftRecursive) {
        self.found = true;
    }
}

fn is_left_recursive_node(parser: &ParserRef) -> bool {
    let mut probe = LeftRecProbe { found: false };
    parser.accept(&mut probe);
    probe.found
}

struct FaultScan<'a> {
    nullable: &'a FnvHashSet<usize>,
    faults: &'a mut Vec<GrammarFault>,
}

impl ParserVisitor for FaultScan<'_> {
    fn visit_repeat(&mut self, parser: &Repeat) {
        if parser.max().is_none() && is_nullable(self.nullable, parser.item()) {
            self.faults.push(GrammarFault::NullableRepetition { parser: parser.label() });
        }
    }

    fn visit_around(&mut self, parser: &Around) {
        if !parser.exact()
            && is_nullable(self.nullable, parser.item())
            && is_nullable(self.nullable, parser.separator())
        {
            self.faults.push(GrammarFault::NullableRepetition { parser: parser.label() });
        }
    }

    fn visit_lazy(&mut self, parser: &Lazy) {
        if parser.target().is_none() {
            self.faults.push(GrammarFault::UnresolvedReference { name: parser.name().to_owned() });
        }
    }
}

/// DFS over the left-edge graph; a back-edge whose cycle contains no
/// `LeftRecursive` node is an unguarded left recursion.
fn find_unguarded_cycles(
    root: &ParserRef,
    nullable: &FnvHashSet<usize>,
    faults: &mut Vec<GrammarFault>,
) {
    struct Dfs<'a> {
        nullable: &'a FnvHashSet<usize>,
        done: FnvHashSet<usize>,
        path: Vec<(usize, bool)>,
        reported: FnvHashSet<usize>,
        faults: &'a mut Vec<GrammarFault>,
    }

    impl Dfs<'_> {
        fn visit(&mut self, parser: &ParserRef) {
            let id = parser_id(parser);
            if let Some(at) = self.path.iter().position(|&(path_id, _)| path_id == id) {
                let guarded = self.path[at..].iter().any(|&(_, lr)| lr);
                if !guarded && self.reported.insert(id) {
                    self.faults
                        .push(GrammarFault::UnguardedLeftRecursion { parser: parser.label() });
                }
                return;
            }
            if !self.done.insert(id) {
                return;
            }
            self.path.push((id, is_left_recursive_node(parser)));
            let mut edges = LeftEdgeVisitor { nullable: self.nullable, edges: Vec::new() };
            parser.accept(&mut edges);
            for edge in edges.edges {
                self.visit(&edge);
            }
            self.path.pop();
        }
    }

    let mut dfs = Dfs {
        nullable,
        done: FnvHashSet::default(),
        path: Vec::new(),
        reported: FnvHashSet::default(),
        faults,
    };
    dfs.visit(root);
}
