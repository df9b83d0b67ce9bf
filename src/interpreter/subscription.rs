//! Snapshot subscribers.

use crate::core::Snapshot;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Weak};

pub(crate) type Listener<S, C> = Arc<dyn Fn(&Snapshot<S, C>) + Send + Sync>;

/// Removes a listener by id on behalf of a [`Subscription`].
pub(crate) trait Unsubscribe: Send + Sync {
    fn unsubscribe(&self, id: u64);
}

/// Handle returned by [`Interpreter::subscribe`].
///
/// The callback stays registered until [`unsubscribe`](Self::unsubscribe)
/// is called; dropping the handle does not remove it.
///
/// [`Interpreter::subscribe`]: crate::interpreter::Interpreter::subscribe
#[must_use]
pub struct Subscription {
    id: u64,
    owner: Weak<dyn Unsubscribe>,
}

impl Subscription {
    pub(crate) fn new(id: u64, owner: Weak<dyn Unsubscribe>) -> Self {
        Self { id, owner }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop receiving snapshots. Safe to call from inside a callback.
    pub fn unsubscribe(self) {
        if let Some(owner) = self.owner.upgrade() {
            owner.unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Registered listeners in subscription order.
pub(crate) struct Subscribers<S, C> {
    next_id: u64,
    listeners: Vec<(u64, Listener<S, C>)>,
}

impl<S, C> Default for Subscribers<S, C> {
    fn default() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }
}

impl<S, C> Subscribers<S, C> {
    pub(crate) fn add(&mut self, listener: Listener<S, C>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Copies of the current listeners, so callbacks run without the list
    /// locked.
    pub(crate) fn listeners(&self) -> Vec<Listener<S, C>> {
        self.listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

/// Committed snapshots waiting for delivery, in commit order.
///
/// Only one caller delivers at a time. A commit made while another caller
/// is delivering (a subscriber's own `send`, or another thread) is queued
/// and handed out by that caller after the snapshots before it.
pub(crate) struct Outbox<S, C> {
    pending: VecDeque<Snapshot<S, C>>,
    delivering: bool,
}

impl<S, C> Default for Outbox<S, C> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            delivering: false,
        }
    }
}

impl<S, C> Outbox<S, C> {
    /// Queue a snapshot. Returns true when the caller must deliver.
    pub(crate) fn push(&mut self, snapshot: Snapshot<S, C>) -> bool {
        self.pending.push_back(snapshot);
        !std::mem::replace(&mut self.delivering, true)
    }

    /// Next snapshot to deliver. Returns `None` and hands off delivery once
    /// the queue is empty.
    pub(crate) fn next(&mut self) -> Option<Snapshot<S, C>> {
        let next = self.pending.pop_front();
        if next.is_none() {
            self.delivering = false;
        }
        next
    }

    /// Give up delivery after a callback panicked.
    pub(crate) fn abandon(&mut self) {
        self.pending.clear();
        self.delivering = false;
    }
}
