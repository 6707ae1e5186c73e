#![forbid(unsafe_code)]

//! Main-thread action queue fed from any thread.
//!
//! Layout may run off the main thread, but user actions capture
//! main-thread-only state (state handles, `Rc`s). The [`Coordinator`] keeps
//! such actions in a table on the main thread, keyed by [`ActionToken`].
//! Other threads hold only a [`CoordinatorHandle`], which is `Send` and can
//! ask for a registered action to run, release one that never will, or submit
//! a `Send` task of its own.
//!
//! Requests are buffered in an mpsc channel and drained by
//! [`Coordinator::run_pending`], which the application calls from `tick`.
//! Each action runs at most once: running removes it from the table.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::sync::mpsc;

use ahash::AHashMap;

/// Identifies an action registered with a [`Coordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionToken(u64);

impl ActionToken {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

enum Dispatch {
    Run(ActionToken),
    Release(ActionToken),
    Task(Box<dyn FnOnce() + Send>),
}

enum Job {
    Action(ActionToken),
    Task(Box<dyn FnOnce() + Send>),
}

struct CoordinatorInner {
    tx: mpsc::Sender<Dispatch>,
    rx: mpsc::Receiver<Dispatch>,
    actions: RefCell<AHashMap<ActionToken, Box<dyn FnOnce()>>>,
    ready: RefCell<VecDeque<Job>>,
    next_token: Cell<u64>,
    executed: Cell<u64>,
}

/// Owner of the main-thread action table. Cloning shares the table.
#[derive(Clone)]
pub struct Coordinator {
    inner: Rc<CoordinatorInner>,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            inner: Rc::new(CoordinatorInner {
                tx,
                rx,
                actions: RefCell::new(AHashMap::new()),
                ready: RefCell::new(VecDeque::new()),
                next_token: Cell::new(1),
                executed: Cell::new(0),
            }),
        }
    }

    /// A sendable handle for dispatching onto this coordinator.
    #[must_use]
    pub fn handle(&self) -> CoordinatorHandle {
        CoordinatorHandle {
            tx: self.inner.tx.clone(),
        }
    }

    /// Park `action` until a handle dispatches the returned token.
    pub fn register(&self, action: impl FnOnce() + 'static) -> ActionToken {
        let token = ActionToken(self.inner.next_token.get());
        self.inner.next_token.set(token.0 + 1);
        self.inner.actions.borrow_mut().insert(token, Box::new(action));
        token
    }

    /// Whether `token` still has an action waiting in the table.
    #[must_use]
    pub fn is_registered(&self, token: ActionToken) -> bool {
        self.pull();
        self.inner.actions.borrow().contains_key(&token)
    }

    /// Number of actions waiting in the table.
    #[must_use]
    pub fn registered(&self) -> usize {
        self.pull();
        self.inner.actions.borrow().len()
    }

    /// Number of dispatched jobs waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pull();
        self.inner.ready.borrow().len()
    }

    /// Total jobs run since creation.
    #[must_use]
    pub fn executed(&self) -> u64 {
        self.inner.executed.get()
    }

    fn pull(&self) {
        let mut ready = self.inner.ready.borrow_mut();
        while let Ok(message) = self.inner.rx.try_recv() {
            match message {
                Dispatch::Run(token) => ready.push_back(Job::Action(token)),
                Dispatch::Release(token) => {
                    self.inner.actions.borrow_mut().remove(&token);
                }
                Dispatch::Task(task) => ready.push_back(Job::Task(task)),
            }
        }
    }

    /// Run up to `limit` dispatched jobs in arrival order.
    ///
    /// Dispatches of a token whose action already ran (or was released) are
    /// skipped and not counted. Jobs may register or dispatch further work;
    /// only jobs queued when the call starts are eligible, so dispatches
    /// arriving during this call wait for the next one even if a job pulls
    /// them into the queue.
    pub fn run_pending(&self, limit: usize) -> usize {
        self.pull();
        let mut batch = self.inner.ready.borrow().len();
        let mut ran = 0;
        while ran < limit && batch > 0 {
            batch -= 1;
            let next = self.inner.ready.borrow_mut().pop_front();
            let Some(job) = next else {
                break;
            };
            match job {
                Job::Action(token) => {
                    let action = self.inner.actions.borrow_mut().remove(&token);
                    let Some(action) = action else {
                        tracing::trace!(message = "coordinator.skip", token = token.0);
                        continue;
                    };
                    tracing::trace!(message = "coordinator.run", token = token.0);
                    action();
                }
                Job::Task(task) => task(),
            }
            ran += 1;
            self.inner.executed.set(self.inner.executed.get() + 1);
        }
        ran
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("registered", &self.inner.actions.borrow().len())
            .field("ready", &self.inner.ready.borrow().len())
            .field("executed", &self.inner.executed.get())
            .finish()
    }
}

/// Thread-safe sender onto a [`Coordinator`].
///
/// All methods return `false` once the coordinator is gone.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Dispatch>,
}

impl CoordinatorHandle {
    /// Request that the action behind `token` run on the main thread.
    pub fn dispatch(&self, token: ActionToken) -> bool {
        self.tx.send(Dispatch::Run(token)).is_ok()
    }

    /// Drop the action behind `token` without running it.
    pub fn release(&self, token: ActionToken) -> bool {
        self.tx.send(Dispatch::Release(token)).is_ok()
    }

    /// Run `task` on the main thread.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Dispatch::Task(Box::new(task))).is_ok()
    }
}

impl fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CoordinatorHandle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn registered_action_runs_once_per_token() {
        let coordinator = Coordinator::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let token = coordinator.register(move || counter.set(counter.get() + 1));

        let handle = coordinator.handle();
        assert!(handle.dispatch(token));
        assert!(handle.dispatch(token));
        assert_eq!(coordinator.run_pending(usize::MAX), 1);
        assert_eq!(hits.get(), 1);
        assert!(!coordinator.is_registered(token));
    }

    #[test]
    fn nothing_runs_without_dispatch() {
        let coordinator = Coordinator::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        coordinator.register(move || counter.set(1));
        assert_eq!(coordinator.run_pending(usize::MAX), 0);
        assert_eq!(hits.get(), 0);
        assert_eq!(coordinator.registered(), 1);
    }

    #[test]
    fn release_discards_action() {
        let coordinator = Coordinator::new();
        let token = coordinator.register(|| panic!("released action must not run"));
        coordinator.handle().release(token);
        assert_eq!(coordinator.registered(), 0);
        coordinator.handle().dispatch(token);
        assert_eq!(coordinator.run_pending(usize::MAX), 0);
    }

    #[test]
    fn limit_bounds_each_drain() {
        let coordinator = Coordinator::new();
        let handle = coordinator.handle();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let hits = Arc::clone(&hits);
            handle.submit(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(coordinator.run_pending(2), 2);
        assert_eq!(coordinator.pending(), 3);
        assert_eq!(coordinator.run_pending(usize::MAX), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 5);
        assert_eq!(coordinator.executed(), 5);
    }

    #[test]
    fn handle_dispatches_from_other_threads() {
        let coordinator = Coordinator::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let token = coordinator.register(move || counter.set(counter.get() + 1));

        let handle = coordinator.handle();
        thread::spawn(move || handle.dispatch(token))
            .join()
            .unwrap();
        coordinator.run_pending(usize::MAX);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn actions_may_register_more_work() {
        let coordinator = Coordinator::new();
        let inner = coordinator.clone();
        let handle = coordinator.handle();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let token = coordinator.register(move || {
            let counter = Rc::clone(&counter);
            let follow_up = inner.register(move || counter.set(counter.get() + 1));
            inner.handle().dispatch(follow_up);
        });
        handle.dispatch(token);
        assert_eq!(coordinator.run_pending(usize::MAX), 1);
        assert_eq!(hits.get(), 0);
        assert_eq!(coordinator.run_pending(usize::MAX), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn queue_queries_inside_a_job_do_not_extend_the_drain() {
        let coordinator = Coordinator::new();
        let inner = coordinator.clone();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let token = coordinator.register(move || {
            let counter = Rc::clone(&counter);
            let follow_up = inner.register(move || counter.set(counter.get() + 1));
            inner.handle().dispatch(follow_up);
            assert_eq!(inner.pending(), 1);
            assert!(inner.is_registered(follow_up));
        });
        coordinator.handle().dispatch(token);

        assert_eq!(coordinator.run_pending(usize::MAX), 1);
        assert_eq!(hits.get(), 0);
        assert_eq!(coordinator.pending(), 1);
        assert_eq!(coordinator.run_pending(usize::MAX), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn handle_reports_closed_coordinator() {
        let coordinator = Coordinator::new();
        let handle = coordinator.handle();
        drop(coordinator);
        assert!(!handle.submit(|| {}));
    }
}
