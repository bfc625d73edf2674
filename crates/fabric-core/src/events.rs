//! Change notifications
//!
//! Managers announce that a tracked property changed; the signal carries only
//! which property it was. Subscribers pull the new value from the manager.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Properties whose changes are announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackedProperty {
    CurrentWorkspace,
    ConnectionState,
    Workspaces,
}

impl TrackedProperty {
    pub fn name(&self) -> &'static str {
        match self {
            TrackedProperty::CurrentWorkspace => "currentWorkspace",
            TrackedProperty::ConnectionState => "connectionState",
            TrackedProperty::Workspaces => "workspaces",
        }
    }
}

impl fmt::Display for TrackedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Listener = Arc<dyn Fn(TrackedProperty) + Send + Sync>;
type ListenerList = RwLock<Vec<(u64, Listener)>>;

/// Observer list
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Arc<ListenerList>,
    next_id: AtomicU64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it stays registered while the returned handle lives
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(TrackedProperty) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Notify every listener. Listeners run without the list locked, so they
    /// may query the emitting manager.
    pub fn emit(&self, property: TrackedProperty) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracing::trace!(%property, listeners = listeners.len(), "Property changed");
        for listener in listeners {
            listener(property);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Handle that unsubscribes its listener when dropped
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Subscription {
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.write().retain(|(id, _)| *id != self.id);
        }
    }
}
