//! # Reactive Core
//!
//! Synchronous push-based signals and effects for in-process derived state.
//!
//! An [`ObserverStack`] is the tracking context: effects push themselves onto it
//! while their body runs, and signal reads subscribe whichever effect is on top.
//! Independent stacks never see each other's effects. Writes re-run every
//! subscriber immediately, once per write.
//!
//! There is no batching, memoization, or cycle detection. An effect that writes a
//! signal it also reads recurses without bound.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Default)]
struct StackState {
    frames: Vec<Effect>,
    next_id: u64,
}

/// Tracking context shared by the signals and effects created against it.
#[derive(Clone, Default)]
pub struct ObserverStack {
    state: Rc<RefCell<StackState>>,
}

impl ObserverStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of effects currently running on this stack.
    pub fn depth(&self) -> usize {
        self.state.borrow().frames.len()
    }

    pub fn is_tracking(&self) -> bool {
        self.depth() > 0
    }

    fn current(&self) -> Option<Effect> {
        self.state.borrow().frames.last().cloned()
    }

    fn next_id(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.next_id
    }

    fn push(&self, effect: Effect) -> Frame<'_> {
        self.state.borrow_mut().frames.push(effect);
        Frame { stack: self }
    }
}

impl fmt::Debug for ObserverStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverStack").field("depth", &self.depth()).finish()
    }
}

/// Pops the stack when dropped, so a panicking body still leaves it balanced.
struct Frame<'a> {
    stack: &'a ObserverStack,
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.stack.state.borrow_mut().frames.pop();
    }
}

/// A registered effect. Cloning shares the same body and identity.
#[derive(Clone)]
pub struct Effect {
    id: u64,
    body: Rc<dyn Fn()>,
    stack: ObserverStack,
}

impl Effect {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Runs the body with this effect on top of the stack.
    pub fn run(&self) {
        let _frame = self.stack.push(self.clone());
        (self.body)();
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Registers `body` as an effect on `stack` and runs it once immediately.
pub fn create_effect(stack: &ObserverStack, body: impl Fn() + 'static) -> Effect {
    let effect = Effect {
        id: stack.next_id(),
        body: Rc::new(body),
        stack: stack.clone(),
    };
    effect.run();
    effect
}

struct SignalState<T> {
    value: RefCell<T>,
    subscribers: RefCell<BTreeMap<u64, Effect>>,
    disposed: Cell<bool>,
    stack: ObserverStack,
}

impl<T> SignalState<T> {
    fn track(&self) {
        if self.disposed.get() {
            return;
        }
        if let Some(effect) = self.stack.current() {
            self.subscribers.borrow_mut().entry(effect.id).or_insert(effect);
        }
    }

    fn notify(&self) {
        let subscribers: Vec<Effect> = self.subscribers.borrow().values().cloned().collect();
        for effect in subscribers {
            effect.run();
        }
    }
}

/// Read half of a signal.
pub struct ReadSignal<T> {
    state: Rc<SignalState<T>>,
}

/// Write half of a signal.
pub struct WriteSignal<T> {
    state: Rc<SignalState<T>>,
}

/// Tears a signal down: drops its subscribers and turns writes into no-ops.
pub struct DisposeSignal<T> {
    state: Rc<SignalState<T>>,
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Clone> ReadSignal<T> {
    /// Current value; subscribes the running effect, if any.
    pub fn get(&self) -> T {
        self.state.track();
        self.state.value.borrow().clone()
    }
}

impl<T> ReadSignal<T> {
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.state.track();
        f(&self.state.value.borrow())
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.borrow().len()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.disposed.get()
    }
}

impl<T> WriteSignal<T> {
    /// Replaces the value and re-runs every subscriber.
    pub fn set(&self, value: T) {
        if self.state.disposed.get() {
            return;
        }
        *self.state.value.borrow_mut() = value;
        self.state.notify();
    }

    /// Computes the next value from the current one, then notifies like `set`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        if self.state.disposed.get() {
            return;
        }
        let next = f(&self.state.value.borrow());
        self.set(next);
    }
}

impl<T> DisposeSignal<T> {
    pub fn dispose(&self) {
        self.state.disposed.set(true);
        self.state.subscribers.borrow_mut().clear();
    }
}

/// Creates a signal tracked by `stack`.
pub fn create_signal<T>(stack: &ObserverStack, initial: T) -> (ReadSignal<T>, WriteSignal<T>, DisposeSignal<T>) {
    let state = Rc::new(SignalState {
        value: RefCell::new(initial),
        subscribers: RefCell::new(BTreeMap::new()),
        disposed: Cell::new(false),
        stack: stack.clone(),
    });
    (
        ReadSignal { state: state.clone() },
        WriteSignal { state: state.clone() },
        DisposeSignal { state },
    )
}
