#![forbid(unsafe_code)]

//! Invalidation scheduling.
//!
//! The [`Application`] owns the root of the identity tree and collects
//! invalidation requests into a dirty set. Nothing happens at request time:
//! each [`tick`](Application::tick) first drains the coordinator (so
//! `on_appear` actions and other main-thread jobs get to write state), then
//! runs at most one render pass covering every node invalidated since the
//! previous pass.
//!
//! # Invariants
//!
//! 1. A node invalidated several times before a pass appears in it once.
//! 2. The dirty set is taken before the pass is assembled; requests made while
//!    a pass is being consumed land in the next one.
//! 3. Requests for nodes no longer in the tree are dropped and counted.
//! 4. Every request increments [`invalidation_requests`](Application::invalidation_requests),
//!    coalesced or not.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use ahash::AHashSet;
use fview_core::{DebugLog, Size};

use crate::config::RuntimeConfig;
use crate::control::Control;
use crate::coordinator::Coordinator;
use crate::environment::EnvironmentValues;
use crate::node::{Invalidator, Node, NodeId};
use crate::view::View;

/// Nodes selected for one render pass, in tree pre-order.
#[derive(Debug)]
pub struct RenderPass {
    sequence: u64,
    nodes: Vec<Node>,
    dropped: usize,
}

impl RenderPass {
    /// 1-based pass number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Requests whose node was no longer in the tree.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    #[must_use]
    pub fn contains(&self, node: &Node) -> bool {
        self.nodes.iter().any(|n| Node::ptr_eq(n, node))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

struct AppInner {
    root: Node,
    coordinator: Coordinator,
    config: RuntimeConfig,
    dirty: RefCell<AHashSet<NodeId>>,
    requests: Cell<u64>,
    passes: Cell<u64>,
}

impl Invalidator for AppInner {
    fn invalidate(&self, node: NodeId) {
        self.requests.set(self.requests.get() + 1);
        let inserted = self.dirty.borrow_mut().insert(node);
        tracing::trace!(
            message = "scheduler.invalidate",
            node = node.get(),
            coalesced = !inserted
        );
    }
}

/// Owner of an identity tree and its invalidation state.
///
/// Single-threaded: lives on the thread that drives `tick`. Clones share the
/// application.
#[derive(Clone)]
pub struct Application {
    inner: Rc<AppInner>,
}

impl Application {
    /// Instantiate `root` with configuration read from the process
    /// environment (see [`RuntimeConfig::from_env`]).
    pub fn new(root: impl View) -> Self {
        Self::with_config(root, RuntimeConfig::from_env())
    }

    /// Instantiate `root`, applying `config`.
    pub fn with_config(root: impl View, config: RuntimeConfig) -> Self {
        if let Some(path) = &config.debug_log_path
            && let Err(active) = DebugLog::init(path.clone())
            && active.path() != path.as_path()
        {
            tracing::warn!(
                message = "debug_log.already_initialized",
                requested = %path.display(),
                active = %active.path().display()
            );
        }

        let root = Node::instantiate(Rc::new(root), EnvironmentValues::default());
        let inner = Rc::new(AppInner {
            root,
            coordinator: Coordinator::new(),
            config,
            dirty: RefCell::new(AHashSet::new()),
            requests: Cell::new(0),
            passes: Cell::new(0),
        });
        let invalidator: Weak<dyn Invalidator> = Rc::downgrade(&inner) as Weak<dyn Invalidator>;
        inner.root.set_application(invalidator);
        tracing::debug!(
            message = "application.start",
            root = inner.root.type_name(),
            max_actions_per_tick = inner.config.max_actions_per_tick
        );
        Self { inner }
    }

    #[must_use]
    pub fn root(&self) -> Node {
        self.inner.root.clone()
    }

    #[must_use]
    pub fn coordinator(&self) -> &Coordinator {
        &self.inner.coordinator
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Schedule `node` for the next pass.
    pub fn invalidate(&self, node: &Node) {
        self.inner.invalidate(node.id());
    }

    #[must_use]
    pub fn is_dirty(&self, node: &Node) -> bool {
        self.inner.dirty.borrow().contains(&node.id())
    }

    /// Distinct nodes waiting for the next pass.
    #[must_use]
    pub fn pending_invalidations(&self) -> usize {
        self.inner.dirty.borrow().len()
    }

    /// Total invalidation requests received, including coalesced ones.
    #[must_use]
    pub fn invalidation_requests(&self) -> u64 {
        self.inner.requests.get()
    }

    /// Render passes run so far.
    #[must_use]
    pub fn passes(&self) -> u64 {
        self.inner.passes.get()
    }

    /// Reconcile the tree against a rebuilt root descriptor.
    pub fn update(&self, root: impl View) {
        self.inner.root.update(Rc::new(root));
    }

    /// Build backing controls and lay the root out at `size`.
    pub fn layout(&self, size: Size) -> Arc<dyn Control> {
        let control = self.inner.root.build_control(&self.inner.coordinator);
        control.layout(size);
        control
    }

    /// One scheduling opportunity: drain coordinator jobs, then run at most
    /// one render pass. Returns `None` when nothing was invalidated.
    pub fn tick(&self) -> Option<RenderPass> {
        let ran = self
            .inner
            .coordinator
            .run_pending(self.inner.config.max_actions_per_tick);
        if ran > 0 {
            tracing::trace!(message = "scheduler.actions", ran);
        }
        self.render_pass()
    }

    fn render_pass(&self) -> Option<RenderPass> {
        let dirty = std::mem::take(&mut *self.inner.dirty.borrow_mut());
        if dirty.is_empty() {
            return None;
        }

        let mut nodes = Vec::with_capacity(dirty.len());
        collect_dirty(&self.inner.root, &dirty, &mut nodes);
        let dropped = dirty.len() - nodes.len();
        if dropped > 0 {
            tracing::trace!(message = "scheduler.dropped", dropped);
        }

        let sequence = self.inner.passes.get() + 1;
        self.inner.passes.set(sequence);
        tracing::debug!(
            message = "scheduler.pass",
            sequence,
            nodes = nodes.len(),
            dropped
        );
        Some(RenderPass {
            sequence,
            nodes,
            dropped,
        })
    }
}

fn collect_dirty(node: &Node, dirty: &AHashSet<NodeId>, out: &mut Vec<Node>) {
    if dirty.contains(&node.id()) {
        out.push(node.clone());
    }
    for child in node.children() {
        collect_dirty(&child, dirty, out);
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("root", &self.inner.root.id())
            .field("pending", &self.pending_invalidations())
            .field("requests", &self.invalidation_requests())
            .field("passes", &self.passes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{AnyState, State};
    use crate::view::{Text, VStack, ViewExt};
    use tracing_test::traced_test;

    struct Counter {
        count: State<i32>,
    }

    impl Counter {
        fn new() -> Self {
            Self {
                count: State::new(0),
            }
        }
    }

    impl View for Counter {
        fn declared_state(&self) -> Vec<(&'static str, &dyn AnyState)> {
            vec![("count", &self.count)]
        }
    }

    #[test]
    fn nothing_pending_means_no_pass() {
        let app = Application::new(Text::new("idle"));
        assert!(app.tick().is_none());
        assert_eq!(app.passes(), 0);
    }

    #[test]
    fn repeated_writes_coalesce_into_one_pass() {
        let counter = Counter::new();
        let count = counter.count.clone();
        let app = Application::new(counter);

        count.set(1);
        count.set(2);
        count.set(2);
        assert_eq!(app.invalidation_requests(), 3);
        assert_eq!(app.pending_invalidations(), 1);
        assert!(app.is_dirty(&app.root()));

        let pass = app.tick().unwrap();
        assert_eq!(pass.sequence(), 1);
        assert_eq!(pass.len(), 1);
        assert!(pass.contains(&app.root()));
        assert_eq!(count.get(), 2);
        assert!(app.tick().is_none());
    }

    #[test]
    fn pass_covers_union_in_tree_order() {
        let app = Application::new(VStack::new().child(Text::new("a")).child(Text::new("b")));
        let root = app.root();
        let a = root.child(0).unwrap();
        let b = root.child(1).unwrap();
        app.invalidate(&b);
        app.invalidate(&root);
        app.invalidate(&a);

        let pass = app.tick().unwrap();
        let ids: Vec<_> = pass.nodes().iter().map(Node::id).collect();
        assert_eq!(ids, vec![root.id(), a.id(), b.id()]);
    }

    #[test]
    fn removed_node_is_dropped_silently() {
        let app = Application::new(VStack::new().child(Text::new("gone")));
        let removed = app.root().remove_child(0).unwrap();
        app.invalidate(&removed);
        let pass = app.tick().unwrap();
        assert!(pass.is_empty());
        assert_eq!(pass.dropped(), 1);
    }

    #[test]
    fn writes_after_take_land_in_next_pass() {
        let counter = Counter::new();
        let count = counter.count.clone();
        let app = Application::new(counter);

        count.set(1);
        let first = app.tick().unwrap();
        for _ in first.nodes() {
            count.set(5);
        }
        assert_eq!(app.pending_invalidations(), 1);
        let second = app.tick().unwrap();
        assert_eq!(second.sequence(), 2);
        assert!(second.contains(&app.root()));
    }

    #[test]
    fn actions_run_before_the_pass() {
        let counter = Counter::new();
        let count = counter.count.clone();
        let app = Application::new(counter);

        let writer = count.clone();
        let token = app.coordinator().register(move || writer.set(9));
        app.coordinator().handle().dispatch(token);

        let pass = app.tick().unwrap();
        assert!(pass.contains(&app.root()));
        assert_eq!(count.get(), 9);
    }

    #[test]
    fn action_budget_spreads_over_ticks() {
        let app = Application::with_config(
            Text::new("x"),
            RuntimeConfig::default().with_max_actions_per_tick(2),
        );
        let handle = app.coordinator().handle();
        for _ in 0..3 {
            handle.submit(|| {});
        }
        app.tick();
        assert_eq!(app.coordinator().executed(), 2);
        app.tick();
        assert_eq!(app.coordinator().executed(), 3);
    }

    #[test]
    fn on_appear_fires_after_layout_and_tick() {
        let counter = Counter::new();
        let count = counter.count.clone();
        let writer = count.clone();
        let app = Application::new(counter.on_appear(move || writer.update(|c| *c += 1)));

        assert!(app.tick().is_none(), "nothing fires before layout");
        app.layout(Size::new(10, 1));
        app.layout(Size::new(10, 1));
        let pass = app.tick().unwrap();
        assert_eq!(count.get(), 1);
        assert_eq!(pass.len(), 1);
        app.layout(Size::new(10, 1));
        assert!(app.tick().is_none());
    }

    #[test]
    fn update_preserves_state_and_guard() {
        let counter = Counter::new();
        let count = counter.count.clone();
        let hits = Rc::new(Cell::new(0));
        let hit = Rc::clone(&hits);
        let app = Application::new(counter.on_appear(move || hit.set(hit.get() + 1)));
        count.set(3);
        app.layout(Size::new(4, 1));
        app.tick();

        let rebuilt = Counter::new();
        let rebuilt_count = rebuilt.count.clone();
        let hit = Rc::clone(&hits);
        app.update(rebuilt.on_appear(move || hit.set(hit.get() + 1)));
        app.layout(Size::new(4, 1));
        app.tick();

        assert_eq!(rebuilt_count.get(), 3);
        assert_eq!(hits.get(), 1);
    }

    #[traced_test]
    #[test]
    fn pass_is_traced() {
        let app = Application::new(Text::new("x"));
        app.invalidate(&app.root());
        app.tick();
        assert!(logs_contain("scheduler.pass"));
    }
}
