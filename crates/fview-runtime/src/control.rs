#![forbid(unsafe_code)]

//! Backing controls: the layout-facing counterpart of identity nodes.
//!
//! Controls are built on the main thread by [`Node::build_control`] but may be
//! sized and laid out from any thread, so the trait requires `Send + Sync` and
//! implementations keep their mutable layout state behind atomics or locks.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fview_core::Size;

use crate::coordinator::Coordinator;
use crate::node::Node;

/// A laid-out element.
pub trait Control: Send + Sync {
    /// Preferred size within `proposed`.
    fn size(&self, proposed: Size) -> Size;

    /// Commit a final size. May be called concurrently.
    fn layout(&self, size: Size);

    /// Size from the most recent [`layout`](Self::layout).
    fn frame(&self) -> Size;

    fn as_any(&self) -> &dyn Any;
}

/// What a view sees while building its control.
#[derive(Debug, Clone, Copy)]
pub struct ControlContext<'a> {
    /// The node being backed. Its [`control`](Node::control) is the one built
    /// by the previous layout, if any.
    pub node: &'a Node,
    pub coordinator: &'a Coordinator,
}

fn lock_frame(frame: &Mutex<Size>) -> std::sync::MutexGuard<'_, Size> {
    frame.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A control with a fixed intrinsic size and no children.
pub struct LeafControl {
    intrinsic: Size,
    frame: Mutex<Size>,
    layouts: AtomicUsize,
}

impl LeafControl {
    #[must_use]
    pub fn new(intrinsic: Size) -> Self {
        Self {
            intrinsic,
            frame: Mutex::new(Size::ZERO),
            layouts: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn intrinsic(&self) -> Size {
        self.intrinsic
    }

    /// Number of completed layout calls.
    #[must_use]
    pub fn layout_count(&self) -> usize {
        self.layouts.load(Ordering::Acquire)
    }
}

impl Control for LeafControl {
    fn size(&self, proposed: Size) -> Size {
        self.intrinsic.min(proposed)
    }

    fn layout(&self, size: Size) {
        *lock_frame(&self.frame) = size;
        self.layouts.fetch_add(1, Ordering::AcqRel);
    }

    fn frame(&self) -> Size {
        *lock_frame(&self.frame)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for LeafControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafControl")
            .field("intrinsic", &self.intrinsic)
            .field("frame", &self.frame())
            .finish()
    }
}

/// Stacks children vertically, each getting the full width.
pub struct StackControl {
    children: Vec<Arc<dyn Control>>,
    frame: Mutex<Size>,
}

impl StackControl {
    #[must_use]
    pub fn new(children: Vec<Arc<dyn Control>>) -> Self {
        Self {
            children,
            frame: Mutex::new(Size::ZERO),
        }
    }

    #[must_use]
    pub fn children(&self) -> &[Arc<dyn Control>] {
        &self.children
    }
}

impl Control for StackControl {
    fn size(&self, proposed: Size) -> Size {
        let mut total = Size::ZERO;
        let mut remaining = proposed.height;
        for child in &self.children {
            let child_size = child.size(Size::new(proposed.width, remaining));
            total.width = total.width.max(child_size.width);
            total.height = total.height.saturating_add(child_size.height);
            remaining = remaining.saturating_sub(child_size.height);
        }
        total
    }

    fn layout(&self, size: Size) {
        *lock_frame(&self.frame) = size;
        let mut remaining = size.height;
        for child in &self.children {
            let child_size = child.size(Size::new(size.width, remaining));
            child.layout(Size::new(size.width, child_size.height));
            remaining = remaining.saturating_sub(child_size.height);
        }
    }

    fn frame(&self) -> Size {
        *lock_frame(&self.frame)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for StackControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackControl")
            .field("children", &self.children.len())
            .field("frame", &self.frame())
            .finish()
    }
}

/// Controls for views with no control of their own: a single child passes
/// through, several are stacked, none yields an empty leaf.
#[must_use]
pub fn default_control(mut children: Vec<Arc<dyn Control>>) -> Arc<dyn Control> {
    if children.len() > 1 {
        return Arc::new(StackControl::new(children));
    }
    children
        .pop()
        .unwrap_or_else(|| Arc::new(LeafControl::new(Size::ZERO)) as Arc<dyn Control>)
}
