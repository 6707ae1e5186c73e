#![forbid(unsafe_code)]

//! Node-owned state handles.
//!
//! A [`State<T>`] lives inside a view descriptor, but its value lives in the
//! identity [`Node`](crate::Node) the descriptor was instantiated into, under
//! a label. Descriptors are rebuilt on every update; the node is not, so the
//! value survives.
//!
//! Every handle carries an initial value. Reading a slot that was never
//! written yields the initial value; the first write creates the slot.
//!
//! Writes invalidate the owning node through its application. Writes are not
//! compared against the current value, so writing an equal value still
//! schedules a pass.

use std::any::type_name;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::StateError;
use crate::node::{Node, WeakNode};
use crate::reactive::Binding;

/// Type-erased attachment point used by node instantiation.
pub trait AnyState {
    /// Point this handle at `node`'s slot named `label`.
    fn attach_to(&self, node: &Node, label: &str);
}

#[derive(Default)]
struct StateReference {
    node: RefCell<WeakNode>,
    label: RefCell<Option<String>>,
}

/// A labelled state slot on an identity node.
///
/// Clones share the same node reference, so re-attaching one clone re-targets
/// all of them.
pub struct State<T> {
    initial: T,
    reference: Rc<StateReference>,
}

impl<T: Clone> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            initial: self.initial.clone(),
            reference: Rc::clone(&self.reference),
        }
    }
}

impl<T> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("type", &type_name::<T>())
            .field("label", &*self.reference.label.borrow())
            .field("node", &*self.reference.node.borrow())
            .finish()
    }
}

impl<T: Clone + 'static> State<T> {
    /// An unattached handle. Accessing it fails until it is attached.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            initial,
            reference: Rc::new(StateReference::default()),
        }
    }

    /// A handle attached to `node` under `label`.
    #[must_use]
    pub fn bound(node: &Node, label: impl Into<String>, initial: T) -> Self {
        let state = Self::new(initial);
        state.attach(node, label);
        state
    }

    /// Point this handle (and its clones) at `node`'s slot named `label`.
    pub fn attach(&self, node: &Node, label: impl Into<String>) {
        *self.reference.node.borrow_mut() = node.downgrade();
        *self.reference.label.borrow_mut() = Some(label.into());
    }

    /// Whether the handle resolves to a live node.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.reference.label.borrow().is_some() && self.reference.node.borrow().upgrade().is_some()
    }

    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.reference.label.borrow().clone()
    }

    /// The value reported before the first write.
    #[must_use]
    pub fn initial(&self) -> &T {
        &self.initial
    }

    fn resolve(&self) -> Result<(Node, String), StateError> {
        let label = self
            .reference
            .label
            .borrow()
            .clone()
            .ok_or(StateError::Unattached)?;
        let node = self
            .reference
            .node
            .borrow()
            .upgrade()
            .ok_or_else(|| StateError::NodeDropped {
                label: label.clone(),
            })?;
        Ok((node, label))
    }

    /// Read the current value.
    ///
    /// # Errors
    ///
    /// Detached handle, destroyed node, or a slot of another type.
    pub fn try_get(&self) -> Result<T, StateError> {
        let (node, label) = self.resolve()?;
        let stored = node.with_state(|slots| slots.read::<T>(&label))?;
        Ok(stored.unwrap_or_else(|| self.initial.clone()))
    }

    /// Store `value` and invalidate the owning node.
    ///
    /// # Errors
    ///
    /// Detached handle, destroyed node, or a slot of another type.
    pub fn try_set(&self, value: T) -> Result<(), StateError> {
        let (node, label) = self.resolve()?;
        node.with_state_mut(|slots| slots.write(&label, value))?;
        if !node.invalidate() {
            tracing::trace!(
                message = "state.write.unscheduled",
                node = node.id().get(),
                label = %label
            );
        }
        Ok(())
    }

    /// Read the current value.
    ///
    /// # Panics
    ///
    /// If the handle is detached or the slot holds another type.
    #[track_caller]
    #[must_use]
    pub fn get(&self) -> T {
        match self.try_get() {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    /// Store `value` and invalidate the owning node.
    ///
    /// # Panics
    ///
    /// If the handle is detached or the slot holds another type.
    #[track_caller]
    pub fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            panic!("{err}");
        }
    }

    /// Read, modify, and write back.
    #[track_caller]
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    /// A two-way binding reading and writing this slot.
    #[must_use]
    pub fn binding(&self) -> Binding<T> {
        let reader = self.clone();
        let writer = self.clone();
        Binding::new(move || reader.get(), move |value| writer.set(value))
    }
}

impl<T: Clone + 'static> AnyState for State<T> {
    fn attach_to(&self, node: &Node, label: &str) {
        self.attach(node, label);
    }
}
