//! The value stack: AST fragments accumulated by semantic actions.
//!
//! Semantic actions push and pop fragments while their enclosing parsers
//! run; a combinator that later fails must leave the stack exactly as it
//! found it.  Rather than snapshotting the stack on entry to every parser,
//! all mutation is routed through the side-effect journal
//! ([`SideEffectLog`](crate::SideEffectLog)), which restores the stack by
//! replaying inverses.  The stack itself is therefore a plain vector.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Trait object bound for AST fragments.
///
/// Anything `Any + Debug + Send + Sync` qualifies through the blanket impl;
/// `Debug` is required so result reports can list the stack, and the `Send +
/// Sync` bounds let finished [`ParseResult`](crate::ParseResult)s cross
/// threads the same way the rest of the engine's shared data does.
pub trait AstNode: Any + fmt::Debug + Send + Sync {
    /// Upcast used by [`downcast`].
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> AstNode for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A shared AST fragment.
pub type Value = Arc<dyn AstNode>;

/// Recovers the concrete type of a stack value.
pub fn downcast<T: 'static>(value: &Value) -> Option<&T> {
    value.as_any().downcast_ref::<T>()
}

/// Stack of AST fragments built during the parse.
///
/// Mutating methods are public so that [`SideEffect`](crate::SideEffect)
/// closures can run against the stack; parser and action code must go
/// through [`Parse::push`](crate::Parse::push) and
/// [`Parse::pop`](crate::Parse::pop), which journal the mutation.
#[derive(Default)]
pub struct ValueStack {
    values: Vec<Value>,
}

impl ValueStack {
    /// Current depth.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no fragment is on the stack.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The topmost fragment, if any.
    pub fn peek(&self) -> Option<&Value> {
        self.values.last()
    }

    /// The fragment at depth `index` (0 is the bottom).
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Iterates from the bottom of the stack to the top.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// Unjournaled push, for use inside effect closures only.
    pub fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Unjournaled pop, for use inside effect closures only.
    pub fn pop(&mut self) -> Option<Value> {
        self.values.pop()
    }

    /// Clones the stack contents, bottom first, for a result snapshot.
    pub fn snapshot(&self) -> Vec<Value> {
        self.values.clone()
    }
}

impl fmt::Debug for ValueStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.values.iter()).finish()
    }
}
