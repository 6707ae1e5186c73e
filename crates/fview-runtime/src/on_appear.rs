#![forbid(unsafe_code)]

//! One-shot "first layout" actions.
//!
//! [`OnAppear`] wraps a view and runs an action the first time its backing
//! control is laid out. Layout may happen on any thread and more than once,
//! possibly concurrently; the action still runs exactly once, on the main
//! thread, when the application next drains its coordinator.
//!
//! The guard is an `AtomicBool` swapped on every layout: only the call that
//! flips it from `false` dispatches. The action itself stays on the main
//! thread in the [`Coordinator`](crate::Coordinator) table; the control holds
//! just its [`ActionToken`].
//!
//! Reconciliation keeps the guard. When an `OnAppear` view backs a node that
//! already owns an [`OnAppearControl`], that control is reused with the new
//! child swapped in, so a rebuilt descriptor does not fire again.

use std::any::Any;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use fview_core::Size;

use crate::control::{Control, ControlContext, LeafControl};
use crate::coordinator::{ActionToken, CoordinatorHandle};
use crate::view::View;

/// Runs `action` once, when `content` is first laid out.
pub struct OnAppear<V> {
    content: Rc<V>,
    action: Rc<dyn Fn()>,
}

impl<V: View> OnAppear<V> {
    pub fn new(content: V, action: impl Fn() + 'static) -> Self {
        Self {
            content: Rc::new(content),
            action: Rc::new(action),
        }
    }
}

impl<V: View> View for OnAppear<V> {
    fn children(&self) -> Vec<Rc<dyn View>> {
        vec![Rc::clone(&self.content) as Rc<dyn View>]
    }

    fn make_control(
        &self,
        cx: ControlContext<'_>,
        mut children: Vec<Arc<dyn Control>>,
    ) -> Arc<dyn Control> {
        let child = children
            .pop()
            .unwrap_or_else(|| Arc::new(LeafControl::new(Size::ZERO)) as Arc<dyn Control>);
        self.pass_control(child, cx)
    }
}

impl<V: View> OnAppear<V> {
    /// Wrap `child` for the node in `cx`.
    ///
    /// Reuses the node's existing [`OnAppearControl`] (and its fired flag)
    /// when there is one; otherwise registers the action and builds a new
    /// control.
    pub fn pass_control(&self, child: Arc<dyn Control>, cx: ControlContext<'_>) -> Arc<dyn Control> {
        if let Some(existing) = cx.node.control()
            && let Some(control) = existing.as_any().downcast_ref::<OnAppearControl>()
        {
            control.replace_child(child);
            return existing;
        }

        let action = Rc::clone(&self.action);
        let token = cx.coordinator.register(move || action());
        tracing::trace!(
            message = "on_appear.register",
            node = cx.node.id().get(),
            token = token.get()
        );
        Arc::new(OnAppearControl::new(child, token, cx.coordinator.handle()))
    }
}

struct ChildControl(Arc<dyn Control>);

/// Backing control for [`OnAppear`].
pub struct OnAppearControl {
    child: ArcSwap<ChildControl>,
    appeared: AtomicBool,
    token: ActionToken,
    coordinator: CoordinatorHandle,
    frame: Mutex<Size>,
}

impl OnAppearControl {
    #[must_use]
    pub fn new(child: Arc<dyn Control>, token: ActionToken, coordinator: CoordinatorHandle) -> Self {
        Self {
            child: ArcSwap::from_pointee(ChildControl(child)),
            appeared: AtomicBool::new(false),
            token,
            coordinator,
            frame: Mutex::new(Size::ZERO),
        }
    }

    /// Whether a layout has already claimed the action.
    #[must_use]
    pub fn has_appeared(&self) -> bool {
        self.appeared.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn token(&self) -> ActionToken {
        self.token
    }

    #[must_use]
    pub fn child(&self) -> Arc<dyn Control> {
        Arc::clone(&self.child.load().0)
    }

    /// Swap in a rebuilt child, keeping the one-shot guard.
    pub fn replace_child(&self, child: Arc<dyn Control>) {
        if !Arc::ptr_eq(&self.child.load().0, &child) {
            self.child.store(Arc::new(ChildControl(child)));
        }
    }
}

impl Control for OnAppearControl {
    fn size(&self, proposed: Size) -> Size {
        self.child.load().0.size(proposed)
    }

    fn layout(&self, size: Size) {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = size;
        self.child.load().0.layout(size);

        if self.appeared.swap(true, Ordering::AcqRel) {
            return;
        }
        if !self.coordinator.dispatch(self.token) {
            tracing::debug!(message = "on_appear.orphaned", token = self.token.get());
        }
    }

    fn frame(&self) -> Size {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for OnAppearControl {
    fn drop(&mut self) {
        if !*self.appeared.get_mut() {
            self.coordinator.release(self.token);
        }
    }
}

impl fmt::Debug for OnAppearControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnAppearControl")
            .field("token", &self.token)
            .field("appeared", &self.has_appeared())
            .field("frame", &self.frame())
            .finish()
    }
}
