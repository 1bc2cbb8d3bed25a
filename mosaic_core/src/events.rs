//! Single-threaded observer bus.
//!
//! `subscribe` returns a [`SubscriptionToken`]; `unsubscribe(token)` detaches exactly that
//! callback. Emission snapshots the matching callbacks first, so callbacks may subscribe or
//! unsubscribe while an event is being delivered. A callback unsubscribed mid-delivery is
//! not called afterwards.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use log::warn;
use mosaic_ids::NodeId;

use crate::NodeKind;

/// Anything that can travel on an [`EventBus`].
pub trait Event {
    type Kind: Copy + Eq + fmt::Debug;

    fn kind(&self) -> Self::Kind;

    /// Node the event is about, for per-node subscriptions.
    fn node_id(&self) -> Option<&NodeId> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneEventKind {
    NodeAdded,
    NodeAboutToBeRemoved,
    NodeRemoved,
    NodeModified,
    SceneImportStarted,
    SceneImportEnded,
    SceneCleared,
}

/// Structural change notifications fired by [`crate::Scene`].
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    NodeAdded { id: NodeId, kind: NodeKind },
    NodeAboutToBeRemoved { id: NodeId, kind: NodeKind },
    NodeRemoved { id: NodeId, kind: NodeKind },
    NodeModified { id: NodeId, kind: NodeKind },
    SceneImportStarted,
    SceneImportEnded,
    SceneCleared,
}

impl SceneEvent {
    pub fn node_kind(&self) -> Option<NodeKind> {
        match self {
            SceneEvent::NodeAdded { kind, .. }
            | SceneEvent::NodeAboutToBeRemoved { kind, .. }
            | SceneEvent::NodeRemoved { kind, .. }
            | SceneEvent::NodeModified { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl Event for SceneEvent {
    type Kind = SceneEventKind;

    fn kind(&self) -> SceneEventKind {
        match self {
            SceneEvent::NodeAdded { .. } => SceneEventKind::NodeAdded,
            SceneEvent::NodeAboutToBeRemoved { .. } => SceneEventKind::NodeAboutToBeRemoved,
            SceneEvent::NodeRemoved { .. } => SceneEventKind::NodeRemoved,
            SceneEvent::NodeModified { .. } => SceneEventKind::NodeModified,
            SceneEvent::SceneImportStarted => SceneEventKind::SceneImportStarted,
            SceneEvent::SceneImportEnded => SceneEventKind::SceneImportEnded,
            SceneEvent::SceneCleared => SceneEventKind::SceneCleared,
        }
    }

    fn node_id(&self) -> Option<&NodeId> {
        match self {
            SceneEvent::NodeAdded { id, .. }
            | SceneEvent::NodeAboutToBeRemoved { id, .. }
            | SceneEvent::NodeRemoved { id, .. }
            | SceneEvent::NodeModified { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Handle returned by `subscribe`; pass it to `unsubscribe` to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

type Callback<E> = Rc<RefCell<dyn FnMut(&E)>>;

struct Subscriber<E: Event> {
    token: SubscriptionToken,
    kind: Option<E::Kind>,
    node: Option<NodeId>,
    callback: Callback<E>,
}

impl<E: Event> Subscriber<E> {
    fn wants(&self, event: &E) -> bool {
        if let Some(kind) = self.kind {
            if kind != event.kind() {
                return false;
            }
        }
        match &self.node {
            Some(node) => event.node_id() == Some(node),
            None => true,
        }
    }
}

struct BusShared<E: Event> {
    subscribers: RefCell<Vec<Subscriber<E>>>,
    next_token: Cell<u64>,
}

impl<E: Event> BusShared<E> {
    fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| s.token != token);
        subscribers.len() != before
    }
}

pub struct EventBus<E: Event> {
    shared: Rc<BusShared<E>>,
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(BusShared {
                subscribers: RefCell::new(Vec::new()),
                next_token: Cell::new(1),
            }),
        }
    }

    fn insert(
        &self,
        kind: Option<E::Kind>,
        node: Option<NodeId>,
        callback: impl FnMut(&E) + 'static,
    ) -> SubscriptionToken {
        let token = SubscriptionToken(self.shared.next_token.get());
        self.shared.next_token.set(token.0 + 1);
        let callback: Callback<E> = Rc::new(RefCell::new(callback));
        self.shared.subscribers.borrow_mut().push(Subscriber {
            token,
            kind,
            node,
            callback,
        });
        token
    }

    /// Calls `callback` for every event of `kind`.
    pub fn subscribe(
        &self,
        kind: E::Kind,
        callback: impl FnMut(&E) + 'static,
    ) -> SubscriptionToken {
        self.insert(Some(kind), None, callback)
    }

    /// Calls `callback` for every event.
    pub fn subscribe_all(&self, callback: impl FnMut(&E) + 'static) -> SubscriptionToken {
        self.insert(None, None, callback)
    }

    /// Calls `callback` for events about `node` only, optionally restricted to `kind`.
    pub fn subscribe_node(
        &self,
        node: NodeId,
        kind: Option<E::Kind>,
        callback: impl FnMut(&E) + 'static,
    ) -> SubscriptionToken {
        self.insert(kind, Some(node), callback)
    }

    /// Returns false if the token was unknown or already removed.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.shared.unsubscribe(token)
    }

    pub fn is_subscribed(&self, token: SubscriptionToken) -> bool {
        self.shared
            .subscribers
            .borrow()
            .iter()
            .any(|s| s.token == token)
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.borrow().len()
    }

    /// Weak handle for detaching later without holding on to the bus owner.
    pub fn handle(&self) -> BusHandle<E> {
        BusHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    pub fn emit(&self, event: &E) {
        let targets: Vec<(SubscriptionToken, Callback<E>)> = self
            .shared
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.wants(event))
            .map(|s| (s.token, Rc::clone(&s.callback)))
            .collect();

        for (token, callback) in targets {
            if !self.is_subscribed(token) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut callback) => (&mut *callback)(event),
                Err(_) => warn!(
                    "skipping re-entrant delivery of {:?} to subscriber {token:?}",
                    event.kind()
                ),
            }
        }
    }
}

/// Weak reference to an [`EventBus`], used to detach from a bus the caller does not own.
pub struct BusHandle<E: Event> {
    shared: Weak<BusShared<E>>,
}

impl<E: Event> Clone for BusHandle<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<E: Event> fmt::Debug for BusHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl<E: Event> BusHandle<E> {
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.unsubscribe(token),
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}
