#![forbid(unsafe_code)]

//! Two-way bindings derived from state.
//!
//! A [`Binding<T>`] is a getter/setter pair. It carries no value of its own:
//! `get()` reads through to the source on every call and `set()` writes
//! through, so a binding derived from a [`State`](super::State) observes the
//! same slot the state does and triggers the same invalidation.
//!
//! # Usage
//!
//! ```ignore
//! let count = State::bound(&node, "count", 0);
//! let binding = count.binding();
//! binding.set(5);
//! assert_eq!(count.get(), 5);
//!
//! // Lens onto part of a larger value.
//! let pair = State::bound(&node, "pair", (1, 2));
//! let first = pair.binding().map(|p| p.0, |p, v| p.0 = v);
//! first.set(9);
//! assert_eq!(pair.get(), (9, 2));
//! ```
//!
//! # Invariants
//!
//! 1. `Binding::get()` always returns the current (not stale) value.
//! 2. Projections are applied on every call (no caching).
//! 3. Bindings are `Clone`; clones share the getter and setter.
//!
//! # Failure Modes
//!
//! - Source state detached: `get()`/`set()` panic with the state error.
//! - Projection panic: propagates to the caller.

use std::rc::Rc;

/// A read/write view onto a value owned elsewhere.
pub struct Binding<T> {
    get: Rc<dyn Fn() -> T>,
    set: Rc<dyn Fn(T)>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            get: Rc::clone(&self.get),
            set: Rc::clone(&self.set),
        }
    }
}

impl<T: std::fmt::Debug + 'static> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("value", &self.get())
            .finish()
    }
}

impl<T: 'static> Binding<T> {
    /// Create a binding from a getter and a setter.
    pub fn new(get: impl Fn() -> T + 'static, set: impl Fn(T) + 'static) -> Self {
        Self {
            get: Rc::new(get),
            set: Rc::new(set),
        }
    }

    /// A binding whose writes are discarded.
    pub fn read_only(get: impl Fn() -> T + 'static) -> Self {
        Self::new(get, |_| {})
    }

    /// Get the current bound value.
    #[must_use]
    pub fn get(&self) -> T {
        (self.get)()
    }

    /// Write through to the source.
    pub fn set(&self, value: T) {
        (self.set)(value);
    }

    /// Derive a binding onto part of the value.
    ///
    /// Writing the projection reads the whole value, patches it with `set`,
    /// and writes it back through this binding.
    pub fn map<U: 'static>(
        &self,
        get: impl Fn(&T) -> U + 'static,
        set: impl Fn(&mut T, U) + 'static,
    ) -> Binding<U> {
        let outer_get = Rc::clone(&self.get);
        let outer_read = Rc::clone(&self.get);
        let outer_set = Rc::clone(&self.set);
        Binding {
            get: Rc::new(move || get(&outer_get())),
            set: Rc::new(move |value| {
                let mut whole = outer_read();
                set(&mut whole, value);
                outer_set(whole);
            }),
        }
    }
}

impl<T: Clone + 'static> Binding<T> {
    /// A read-only binding that always yields `value`.
    pub fn constant(value: T) -> Self {
        Self::read_only(move || value.clone())
    }

    /// Read, modify, and write back in one call.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn cell_binding(cell: &Rc<RefCell<i32>>) -> Binding<i32> {
        let read = Rc::clone(cell);
        let write = Rc::clone(cell);
        Binding::new(move || *read.borrow(), move |v| *write.borrow_mut() = v)
    }

    #[test]
    fn reads_and_writes_through() {
        let cell = Rc::new(RefCell::new(1));
        let binding = cell_binding(&cell);
        assert_eq!(binding.get(), 1);
        binding.set(7);
        assert_eq!(*cell.borrow(), 7);
        *cell.borrow_mut() = 9;
        assert_eq!(binding.get(), 9);
    }

    #[test]
    fn clones_share_source() {
        let cell = Rc::new(RefCell::new(0));
        let a = cell_binding(&cell);
        let b = a.clone();
        a.set(3);
        assert_eq!(b.get(), 3);
    }

    #[test]
    fn update_applies_closure() {
        let cell = Rc::new(RefCell::new(10));
        let binding = cell_binding(&cell);
        binding.update(|v| *v += 5);
        assert_eq!(binding.get(), 15);
    }

    #[test]
    fn map_acts_as_lens() {
        let pair = Rc::new(RefCell::new((1, "a")));
        let read = Rc::clone(&pair);
        let write = Rc::clone(&pair);
        let whole = Binding::new(move || *read.borrow(), move |v| *write.borrow_mut() = v);
        let first = whole.map(|p| p.0, |p, v| p.0 = v);

        assert_eq!(first.get(), 1);
        first.set(4);
        assert_eq!(*pair.borrow(), (4, "a"));
    }

    #[test]
    fn constant_ignores_writes() {
        let binding = Binding::constant(String::from("fixed"));
        binding.set(String::from("other"));
        assert_eq!(binding.get(), "fixed");
    }

    #[test]
    fn getter_runs_per_call() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let binding = Binding::read_only(move || {
            counter.set(counter.get() + 1);
            counter.get()
        });
        binding.get();
        binding.get();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn debug_shows_value() {
        let binding = Binding::constant(42);
        assert_eq!(format!("{binding:?}"), "Binding { value: 42 }");
    }
}
