//! The side-effect journal backing transactional backtracking.
//!
//! Every observable mutation performed during a parse (value-stack traffic,
//! user state updates) is routed through this log as a [`SideEffect`]: a
//! closure that performs the mutation and returns its inverse.  Committing
//! is a no-op; rolling back to a checkpoint pops entries and runs the
//! inverses in reverse order.  The cursor is deliberately *not* journaled —
//! restoring it is a single integer store handled by
//! [`Parse::apply`](crate::Parse::apply).
//!
//! Applied entries also retain their forward closure, so a slice of the log
//! can be extracted ([`SideEffectLog::delta`]) and replayed later.  Seed
//! growing in [`LeftRecursive`](crate::parsers::LeftRecursive) depends on
//! this to reinstate the effects of the best match without re-running the
//! parsers that produced them.

use crate::stack::{Value, ValueStack};
use std::rc::Rc;

/// Inverse of an applied effect.  Runs at most once, during rollback.
pub type Undo = Box<dyn FnOnce(&mut ValueStack)>;

/// A reversible mutation of the journaled parse state.
///
/// The wrapped closure receives the value stack, performs the mutation, and
/// returns the closure undoing it.  Inverses are built at application time,
/// so an effect that pops the stack can capture the popped value for its
/// undo.  State living outside the engine is journaled the same way: capture
/// it (e.g. an `Rc<Cell<_>>`) in both closures and ignore the stack
/// argument.
#[derive(Clone)]
pub struct SideEffect(Rc<dyn Fn(&mut ValueStack) -> Undo>);

impl SideEffect {
    /// Wraps a custom apply-and-return-undo closure.
    pub fn new(apply: impl Fn(&mut ValueStack) -> Undo + 'static) -> SideEffect {
        SideEffect(Rc::new(apply))
    }

    /// Effect pushing `value` onto the value stack.
    pub fn push(value: Value) -> SideEffect {
        SideEffect::new(move |stack| {
            stack.push(value.clone());
            Box::new(|stack| {
                stack.pop();
            })
        })
    }

    /// Effect popping the top of the value stack.
    ///
    /// The popped value is captured by the inverse, which restores it.
    pub fn pop() -> SideEffect {
        SideEffect::new(|stack| {
            let value = stack.pop().expect("pop effect applied to an empty value stack");
            Box::new(move |stack| stack.push(value))
        })
    }

    pub(crate) fn run(&self, stack: &mut ValueStack) -> Undo {
        (self.0)(stack)
    }
}

struct Applied {
    effect: SideEffect,
    undo: Option<Undo>,
}

/// Ordered journal of applied effects with checkpoint/rollback.
#[derive(Default)]
pub struct SideEffectLog {
    entries: Vec<Applied>,
}

impl SideEffectLog {
    /// Current length, used as a checkpoint token.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been journaled since construction.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies `effect` to `stack` and records it.
    pub fn apply(&mut self, stack: &mut ValueStack, effect: SideEffect) {
        let undo = effect.run(stack);
        self.entries.push(Applied { effect, undo: Some(undo) });
    }

    /// Rolls the journal back to length `to`, undoing entries in LIFO order.
    pub fn rollback(&mut self, stack: &mut ValueStack, to: usize) {
        debug_assert!(to <= self.entries.len(), "rollback past the end of the log");
        while self.entries.len() > to {
            let mut entry = self.entries.pop().expect("log shrank during rollback");
            let undo = entry.undo.take().expect("applied effect missing its undo");
            undo(stack);
        }
    }

    /// Clones the forward closures of every entry appended since `from`.
    ///
    /// Re-applying the returned effects through [`SideEffectLog::apply`]
    /// reproduces the journaled mutations in order.
    pub fn delta(&self, from: usize) -> Vec<SideEffect> {
        self.entries[from..].iter().map(|entry| entry.effect.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::downcast;
    use std::sync::Arc;

    #[test]
    fn rollback_undoes_in_reverse_order() {
        let mut stack = ValueStack::default();
        let mut log = SideEffectLog::default();
        log.apply(&mut stack, SideEffect::push(Arc::new(1i64)));
        log.apply(&mut stack, SideEffect::push(Arc::new(2i64)));
        let checkpoint = log.len();
        log.apply(&mut stack, SideEffect::pop());
        log.apply(&mut stack, SideEffect::push(Arc::new(3i64)));
        assert_eq!(stack.len(), 2);
        log.rollback(&mut stack, checkpoint);
        assert_eq!(stack.len(), 2);
        assert_eq!(downcast::<i64>(stack.peek().unwrap()), Some(&2));
        log.rollback(&mut stack, 0);
        assert!(stack.is_empty());
    }

    #[test]
    fn delta_replays_the_journal() {
        let mut stack = ValueStack::default();
        let mut log = SideEffectLog::default();
        log.apply(&mut stack, SideEffect::push(Arc::new("a".to_string())));
        log.apply(&mut stack, SideEffect::push(Arc::new("b".to_string())));
        let delta = log.delta(0);
        log.rollback(&mut stack, 0);
        for effect in delta {
            log.apply(&mut stack, effect);
        }
        assert_eq!(stack.len(), 2);
        assert_eq!(downcast::<String>(stack.peek().unwrap()).map(String::as_str), Some("b"));
    }

    #[test]
    fn custom_effects_capture_their_own_state() {
        use std::cell::Cell;
        use std::rc::Rc;

        let flag = Rc::new(Cell::new(0));
        let mut stack = ValueStack::default();
        let mut log = SideEffectLog::default();
        let effect = {
            let flag = Rc::clone(&flag);
            SideEffect::new(move |_stack| {
                let previous = flag.get();
                flag.set(previous + 10);
                let flag = Rc::clone(&flag);
                Box::new(move |_stack: &mut ValueStack| flag.set(previous))
            })
        };
        log.apply(&mut stack, effect);
        assert_eq!(flag.get(), 10);
        log.rollback(&mut stack, 0);
        assert_eq!(flag.get(), 0);
    }
}
