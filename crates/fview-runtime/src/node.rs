#![forbid(unsafe_code)]

//! The identity tree.
//!
//! A [`Node`] is the persistent counterpart of a view descriptor. Descriptors
//! are rebuilt freely; nodes survive reconciliation and own everything that
//! must outlive a rebuild:
//!
//! - the per-label [`StateSlots`],
//! - the environment the node was instantiated with,
//! - the backing [`Control`] built for it during layout.
//!
//! # Ownership
//!
//! Parents own children (`Rc`). Children point back to their parent weakly,
//! and the root points weakly at its application through [`Invalidator`].
//! Anything outside the tree that wants to refer to a node (state handles,
//! diagnostics) holds a [`WeakNode`], which resolves to `None` once the node
//! is destroyed.
//!
//! # Reconciliation
//!
//! [`Node::update`] is positional: a child is reused when the new descriptor
//! at the same index has the same type name, otherwise a fresh subtree is
//! instantiated. This is the minimal contract the state layer needs, not a
//! diffing algorithm.

use std::any::{Any, type_name};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

use crate::control::{Control, ControlContext};
use crate::coordinator::Coordinator;
use crate::environment::EnvironmentValues;
use crate::error::StateError;
use crate::view::View;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a node. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receiver of invalidation requests; implemented by the application.
///
/// Must be idempotent for a node that is already pending.
pub trait Invalidator {
    fn invalidate(&self, node: NodeId);
}

// ---------------------------------------------------------------------------
// StateSlots
// ---------------------------------------------------------------------------

struct Slot {
    value: Box<dyn Any>,
    type_name: &'static str,
}

/// Type-erased per-label storage owned by one node.
///
/// A label keeps the type it was first written with; reading or writing it as
/// another type is a [`StateError::TypeMismatch`].
#[derive(Default)]
pub struct StateSlots {
    slots: AHashMap<String, Slot>,
}

impl StateSlots {
    /// Current value under `label`, or `None` if never written.
    ///
    /// # Errors
    ///
    /// [`StateError::TypeMismatch`] if the slot holds another type.
    pub fn read<T: Clone + 'static>(&self, label: &str) -> Result<Option<T>, StateError> {
        let Some(slot) = self.slots.get(label) else {
            return Ok(None);
        };
        slot.value
            .downcast_ref::<T>()
            .cloned()
            .map(Some)
            .ok_or_else(|| StateError::TypeMismatch {
                label: label.to_string(),
                expected: type_name::<T>(),
                found: slot.type_name,
            })
    }

    /// Store `value` under `label`, creating the slot on first write.
    ///
    /// # Errors
    ///
    /// [`StateError::TypeMismatch`] if the slot already holds another type.
    pub fn write<T: 'static>(&mut self, label: &str, value: T) -> Result<(), StateError> {
        if let Some(slot) = self.slots.get_mut(label) {
            return match slot.value.downcast_mut::<T>() {
                Some(current) => {
                    *current = value;
                    Ok(())
                }
                None => Err(StateError::TypeMismatch {
                    label: label.to_string(),
                    expected: type_name::<T>(),
                    found: slot.type_name,
                }),
            };
        }
        self.slots.insert(
            label.to_string(),
            Slot {
                value: Box::new(value),
                type_name: type_name::<T>(),
            },
        );
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.slots.contains_key(label)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Labels in arbitrary order.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.keys().map(String::as_str)
    }
}

impl fmt::Debug for StateSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(label, slot)| (label, slot.type_name)))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

struct NodeInner {
    id: NodeId,
    view: RefCell<Rc<dyn View>>,
    state: RefCell<StateSlots>,
    children: RefCell<Vec<Node>>,
    parent: RefCell<Weak<NodeInner>>,
    environment: RefCell<EnvironmentValues>,
    control: RefCell<Option<Arc<dyn Control>>>,
    application: RefCell<Option<Weak<dyn Invalidator>>>,
}

/// Shared handle to an identity node. Cloning shares the node.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

/// Non-owning node reference; upgrades to `None` after destruction.
#[derive(Clone, Default)]
pub struct WeakNode {
    inner: Weak<NodeInner>,
}

impl WeakNode {
    #[must_use]
    pub fn upgrade(&self) -> Option<Node> {
        self.inner.upgrade().map(|inner| Node { inner })
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => f.debug_tuple("WeakNode").field(&node.id()).finish(),
            None => f.write_str("WeakNode(<dropped>)"),
        }
    }
}

impl Node {
    /// A detached node with no children and unbound state.
    #[must_use]
    pub fn new(view: Rc<dyn View>, environment: EnvironmentValues) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                id: NodeId::next(),
                view: RefCell::new(view),
                state: RefCell::new(StateSlots::default()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(Weak::new()),
                environment: RefCell::new(environment),
                control: RefCell::new(None),
                application: RefCell::new(None),
            }),
        }
    }

    /// Build the subtree for `view`, binding declared state to the new nodes.
    #[must_use]
    pub fn instantiate(view: Rc<dyn View>, environment: EnvironmentValues) -> Self {
        let node = Self::new(Rc::clone(&view), environment.clone());
        node.bind_declared_state(view.as_ref());
        let child_environment = view.child_environment(&environment);
        for child in view.children() {
            node.push_child(Self::instantiate(child, child_environment.clone()));
        }
        node
    }

    /// Reconcile this node against a rebuilt descriptor.
    ///
    /// State slots, the node id, and the backing control survive; the new
    /// descriptor's declared state is re-bound to the same slots by label.
    pub fn update(&self, view: Rc<dyn View>) {
        let environment = self.environment();
        self.reconcile(view, environment);
    }

    fn reconcile(&self, view: Rc<dyn View>, environment: EnvironmentValues) {
        tracing::trace!(
            message = "node.reconcile",
            node = self.id().get(),
            view = view.type_name()
        );
        *self.inner.view.borrow_mut() = Rc::clone(&view);
        *self.inner.environment.borrow_mut() = environment.clone();
        self.bind_declared_state(view.as_ref());

        let child_environment = view.child_environment(&environment);
        let current = self.children();
        let mut next = Vec::new();
        for (index, child_view) in view.children().into_iter().enumerate() {
            match current.get(index) {
                Some(existing) if existing.type_name() == child_view.type_name() => {
                    existing.reconcile(child_view, child_environment.clone());
                    next.push(existing.clone());
                }
                _ => {
                    let fresh = Self::instantiate(child_view, child_environment.clone());
                    *fresh.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
                    next.push(fresh);
                }
            }
        }
        for (index, old) in current.iter().enumerate() {
            let reused = next.get(index).is_some_and(|n| Self::ptr_eq(n, old));
            if !reused {
                *old.inner.parent.borrow_mut() = Weak::new();
            }
        }
        *self.inner.children.borrow_mut() = next;
    }

    fn bind_declared_state(&self, view: &dyn View) {
        for (label, state) in view.declared_state() {
            state.attach_to(self, label);
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// The descriptor this node currently holds.
    #[must_use]
    pub fn view(&self) -> Rc<dyn View> {
        Rc::clone(&self.inner.view.borrow())
    }

    /// Runtime type name of the held descriptor.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.inner.view.borrow().type_name()
    }

    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        self.inner.children.borrow().clone()
    }

    #[must_use]
    pub fn child(&self, index: usize) -> Option<Self> {
        self.inner.children.borrow().get(index).cloned()
    }

    #[must_use]
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.inner.parent.borrow().upgrade().map(|inner| Self { inner })
    }

    /// Topmost ancestor (self when detached).
    #[must_use]
    pub fn root(&self) -> Self {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Append `child`, making this node its parent.
    pub fn push_child(&self, child: Self) {
        *child.inner.parent.borrow_mut() = Rc::downgrade(&self.inner);
        self.inner.children.borrow_mut().push(child);
    }

    /// Remove and detach the child at `index`.
    pub fn remove_child(&self, index: usize) -> Option<Self> {
        let mut children = self.inner.children.borrow_mut();
        if index >= children.len() {
            return None;
        }
        let child = children.remove(index);
        *child.inner.parent.borrow_mut() = Weak::new();
        Some(child)
    }

    #[must_use]
    pub fn environment(&self) -> EnvironmentValues {
        self.inner.environment.borrow().clone()
    }

    /// The backing control built for this node by the last layout.
    #[must_use]
    pub fn control(&self) -> Option<Arc<dyn Control>> {
        self.inner.control.borrow().clone()
    }

    /// Build (or reuse) backing controls for this subtree, bottom-up.
    pub fn build_control(&self, coordinator: &Coordinator) -> Arc<dyn Control> {
        let children: Vec<_> = self
            .children()
            .iter()
            .map(|child| child.build_control(coordinator))
            .collect();
        let view = self.view();
        let control = view.make_control(
            ControlContext {
                node: self,
                coordinator,
            },
            children,
        );
        *self.inner.control.borrow_mut() = Some(Arc::clone(&control));
        control
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The application owning this node's tree, if attached and alive.
    #[must_use]
    pub fn application(&self) -> Option<Rc<dyn Invalidator>> {
        self.root()
            .inner
            .application
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
    }

    /// Attach this node (as a root) to an application.
    pub fn set_application(&self, application: Weak<dyn Invalidator>) {
        *self.inner.application.borrow_mut() = Some(application);
    }

    /// Ask the owning application to include this node in the next pass.
    ///
    /// Returns `false` when no application is attached.
    pub fn invalidate(&self) -> bool {
        match self.application() {
            Some(application) => {
                application.invalidate(self.id());
                true
            }
            None => false,
        }
    }

    /// Read access to the state slots.
    pub fn with_state<R>(&self, f: impl FnOnce(&StateSlots) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Write access to the state slots.
    ///
    /// Does not invalidate; callers that change observable state must call
    /// [`invalidate`](Self::invalidate).
    pub fn with_state_mut<R>(&self, f: impl FnOnce(&mut StateSlots) -> R) -> R {
        f(&mut self.inner.state.borrow_mut())
    }

    /// Whether two handles refer to the same node.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Depth-first pre-order search of this subtree.
    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<Self> {
        if self.id() == id {
            return Some(self.clone());
        }
        self.children().iter().find_map(|child| child.find(id))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("view", &self.type_name())
            .field("state", &*self.inner.state.borrow())
            .field("children", &self.child_count())
            .finish()
    }
}
