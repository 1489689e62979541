//! Cooperative cancellation of in-flight work.
//!
//! Executions hang off a tree of [`CancellationNode`]s. Pending asynchronous
//! values register an abort callback on the node of their execution and
//! deregister it once they settle.

use std::{
    collections::BTreeMap,
    fmt, mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

type Callback = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    cancelled: bool,
    next_key: u64,
    // Keys grow with registration, so iteration follows registration order.
    callbacks: BTreeMap<u64, Callback>,
}

/// Node of a cancellation tree.
///
/// Cancelling a node runs its callbacks once, in registration order, and
/// cancels every child node. Callbacks registered after cancellation run
/// immediately.
///
/// ```rust
/// # use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// # use graphql_execution::CancellationNode;
/// let root = CancellationNode::new_root();
/// let child = CancellationNode::new_child(&root);
///
/// let calls = Arc::new(AtomicUsize::new(0));
/// let c = calls.clone();
/// child.add_cancellation_callback(move || {
///     c.fetch_add(1, Ordering::SeqCst);
/// });
///
/// root.dispatch();
/// root.dispatch();
///
/// assert!(child.is_cancelled());
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
pub struct CancellationNode {
    state: Mutex<State>,
    // Unregisters this node from its parent once dropped.
    _parent: Option<CancellationGuard>,
}

impl fmt::Debug for CancellationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("CancellationNode")
            .field("cancelled", &state.cancelled)
            .field("pending_callbacks", &state.callbacks.len())
            .finish()
    }
}

impl CancellationNode {
    /// Node without a parent.
    pub fn new_root() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State::default()),
            _parent: None,
        })
    }

    /// Node cancelled whenever `parent` is.
    ///
    /// The parent only keeps a weak reference to the child, and forgets it
    /// once the child is dropped.
    pub fn new_child(parent: &Arc<Self>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let registered = parent.register(Box::new(move || {
                if let Some(child) = weak.upgrade() {
                    child.dispatch();
                }
            }));
            let (cancelled, guard) = match registered {
                Ok(key) => (false, Some(CancellationGuard::new(parent, key))),
                Err(_) => (true, None),
            };
            Self {
                state: Mutex::new(State {
                    cancelled,
                    ..State::default()
                }),
                _parent: guard,
            }
        })
    }

    /// Registers `callback` to run on cancellation.
    ///
    /// Runs it right away if this node is already cancelled.
    pub fn add_cancellation_callback(&self, callback: impl FnOnce() + Send + 'static) {
        if let Err(callback) = self.register(Box::new(callback)) {
            callback();
        }
    }

    /// Registers `callback` like [`add_cancellation_callback`] does, but only
    /// for as long as the returned guard lives.
    ///
    /// [`add_cancellation_callback`]: CancellationNode::add_cancellation_callback
    #[must_use = "dropping the guard unregisters the callback"]
    pub fn scoped_cancellation_callback(
        self: &Arc<Self>,
        callback: impl FnOnce() + Send + 'static,
    ) -> CancellationGuard {
        match self.register(Box::new(callback)) {
            Ok(key) => CancellationGuard::new(self, key),
            Err(callback) => {
                callback();
                CancellationGuard {
                    node: Weak::new(),
                    key: 0,
                }
            }
        }
    }

    /// Cancels this node.
    ///
    /// Only the first call has any effect. Callbacks run outside the internal
    /// lock, so they may register further callbacks or dispatch other nodes.
    pub fn dispatch(&self) {
        let callbacks = {
            let mut state = self.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            mem::take(&mut state.callbacks)
        };
        tracing::debug!(callbacks = callbacks.len(), "dispatching cancellation");
        for callback in callbacks.into_values() {
            callback();
        }
    }

    /// Whether [`dispatch`] has been called.
    ///
    /// [`dispatch`]: CancellationNode::dispatch
    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    /// Number of callbacks waiting for cancellation.
    pub fn pending_callbacks(&self) -> usize {
        self.lock().callbacks.len()
    }

    /// Stores `callback`, or hands it back if this node is already cancelled.
    fn register(&self, callback: Callback) -> Result<u64, Callback> {
        let mut state = self.lock();
        if state.cancelled {
            return Err(callback);
        }
        let key = state.next_key;
        state.next_key += 1;
        state.callbacks.insert(key, callback);
        Ok(key)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Registration of a callback on a [`CancellationNode`], undone on drop.
#[derive(Debug)]
pub struct CancellationGuard {
    node: Weak<CancellationNode>,
    key: u64,
}

impl CancellationGuard {
    fn new(node: &Arc<CancellationNode>, key: u64) -> Self {
        Self {
            node: Arc::downgrade(node),
            key,
        }
    }
}

impl Drop for CancellationGuard {
    fn drop(&mut self) {
        if let Some(node) = self.node.upgrade() {
            // Dropped after the lock is released.
            let _callback = node.lock().callbacks.remove(&self.key);
        }
    }
}
