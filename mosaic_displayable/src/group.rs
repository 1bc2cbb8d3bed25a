// group.rs - One manager per registered kind, per render surface
//
// A group listens to its factory: a kind registered after the group was built still gets an
// instance here, bound to the group's surface, view node and the scene nodes seen so far.
// Unregistering a kind drops exactly that instance. The group also forwards scene events to
// every manager it holds while it observes a scene.
//
// Factory changes and scene events can arrive while the group's state is borrowed, e.g. from
// inside `with_manager` or a manager's own event handler. They are queued and applied as soon
// as that borrow ends, so the group is back in step with the factory before control returns
// to the caller.

use std::cell::{Cell, Ref, RefCell};
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use log::debug;
use mosaic_core::{BusHandle, NodeKind, Scene, SceneEvent, SubscriptionToken};
use mosaic_ids::NodeId;

use crate::{DisplayableManager, DisplayableManagerFactory, RenderSurface};

struct GroupState {
    surface: RenderSurface,
    view_node: Option<NodeId>,
    managers: IndexMap<String, Box<dyn DisplayableManager>>,
    /// Scene nodes as last reported by the observed scene.
    nodes: IndexMap<NodeId, NodeKind>,
}

impl GroupState {
    fn bind(&self, manager: &mut dyn DisplayableManager) {
        manager.bind(&self.surface, self.view_node.as_ref(), &self.nodes);
    }

    fn apply_scene_event(&mut self, event: &SceneEvent) {
        match event {
            SceneEvent::NodeAdded { id, kind } => {
                self.nodes.insert(id.clone(), *kind);
            }
            SceneEvent::NodeRemoved { id, .. } => {
                self.nodes.shift_remove(id.as_str());
            }
            SceneEvent::SceneCleared => self.nodes.clear(),
            _ => {}
        }
        for manager in self.managers.values_mut() {
            manager.on_scene_event(event);
        }
    }

    /// Drops managers whose kind is gone and adds one for every kind the group lacks.
    /// Returns whether anything changed.
    fn sync_kinds(&mut self, factory: &DisplayableManagerFactory) -> bool {
        let registered = factory.registered_kinds();
        let before = self.managers.len();
        let surface = &self.surface;
        self.managers.retain(|kind, _| {
            let keep = registered.contains(kind);
            if !keep {
                debug!("group on {surface} dropped manager {kind}");
            }
            keep
        });
        let mut changed = self.managers.len() != before;

        for kind in registered {
            if self.managers.contains_key(&kind) {
                continue;
            }
            let Some(mut manager) = factory.instantiate(&kind) else {
                continue;
            };
            self.bind(manager.as_mut());
            debug!("group on {} gained manager {kind}", self.surface);
            self.managers.insert(kind, manager);
            changed = true;
        }
        changed
    }
}

struct GroupShared {
    state: RefCell<GroupState>,
    /// Scene events delivered while `state` was borrowed, oldest first.
    queued_events: RefCell<VecDeque<SceneEvent>>,
    /// Set when the managers may no longer match the factory's kinds.
    kinds_stale: Cell<bool>,
}

impl GroupShared {
    /// Applies queued work. Does nothing while `state` is still borrowed; the holder of
    /// that borrow settles once it lets go.
    fn settle(&self, factory: &DisplayableManagerFactory) {
        loop {
            let Ok(mut state) = self.state.try_borrow_mut() else {
                return;
            };
            let mut worked = self.kinds_stale.replace(false) && state.sync_kinds(factory);
            let queued = self.queued_events.borrow_mut().pop_front();
            if let Some(event) = queued {
                state.apply_scene_event(&event);
                worked = true;
            }
            drop(state);

            if !worked {
                return;
            }
            // managers may have changed the factory while we held the state
            self.kinds_stale.set(true);
        }
    }
}

/// Manager instances for one render surface, kept in step with a shared factory.
pub struct DisplayableManagerGroup {
    factory: Rc<DisplayableManagerFactory>,
    factory_token: SubscriptionToken,
    shared: Rc<GroupShared>,
    scene_subscription: Option<(BusHandle<SceneEvent>, SubscriptionToken)>,
}

impl DisplayableManagerGroup {
    /// Instantiates one manager per kind currently registered with `factory` and keeps
    /// following the factory's registrations.
    pub fn new(factory: &Rc<DisplayableManagerFactory>, surface: RenderSurface) -> Self {
        let shared = Rc::new(GroupShared {
            state: RefCell::new(GroupState {
                surface,
                view_node: None,
                managers: IndexMap::new(),
                nodes: IndexMap::new(),
            }),
            queued_events: RefCell::new(VecDeque::new()),
            kinds_stale: Cell::new(true),
        });

        let weak_shared: Weak<GroupShared> = Rc::downgrade(&shared);
        let weak_factory: Weak<DisplayableManagerFactory> = Rc::downgrade(factory);
        let factory_token = factory.events().subscribe_all(move |event| {
            let (Some(shared), Some(factory)) = (weak_shared.upgrade(), weak_factory.upgrade())
            else {
                return;
            };
            debug!("manager kind {} changed", event.manager_kind());
            shared.kinds_stale.set(true);
            shared.settle(&factory);
        });

        shared.settle(factory);

        Self {
            factory: Rc::clone(factory),
            factory_token,
            shared,
            scene_subscription: None,
        }
    }

    pub fn factory(&self) -> &Rc<DisplayableManagerFactory> {
        &self.factory
    }

    fn settle(&self) {
        self.shared.settle(&self.factory);
    }

    pub fn manager_count(&self) -> usize {
        self.settle();
        self.shared.state.borrow().managers.len()
    }

    pub fn manager_kinds(&self) -> Vec<String> {
        self.settle();
        self.shared.state.borrow().managers.keys().cloned().collect()
    }

    pub fn manager_of_kind(&self, kind: &str) -> Option<Ref<'_, dyn DisplayableManager>> {
        self.settle();
        Ref::filter_map(self.shared.state.borrow(), |state| {
            state.managers.get(kind).map(|manager| &**manager)
        })
        .ok()
    }

    /// Runs `f` on the manager of `kind`. Factory changes and scene events that `f` causes
    /// are applied after it returns.
    pub fn with_manager<R>(
        &self,
        kind: &str,
        f: impl FnOnce(&mut dyn DisplayableManager) -> R,
    ) -> Option<R> {
        self.settle();
        let result = {
            let mut state = self.shared.state.borrow_mut();
            state.managers.get_mut(kind).map(|manager| f(manager.as_mut()))
        };
        self.settle();
        result
    }

    pub fn surface(&self) -> RenderSurface {
        self.shared.state.borrow().surface.clone()
    }

    pub fn view_node(&self) -> Option<NodeId> {
        self.shared.state.borrow().view_node.clone()
    }

    pub fn set_view_node(&self, view_node: Option<NodeId>) {
        {
            let mut state = self.shared.state.borrow_mut();
            for manager in state.managers.values_mut() {
                manager.set_view_node(view_node.as_ref());
            }
            state.view_node = view_node;
        }
        self.settle();
    }

    pub fn is_observing_scene(&self) -> bool {
        self.scene_subscription.is_some()
    }

    /// Rebinds every manager to the current node set of `scene` and forwards its events
    /// from now on. Any previously observed scene is released first.
    pub fn observe_scene(&mut self, scene: &Scene) {
        self.stop_observing_scene();

        self.shared.queued_events.borrow_mut().clear();
        {
            let mut state = self.shared.state.borrow_mut();
            state.nodes = scene
                .nodes()
                .map(|node| (node.id().clone(), node.kind()))
                .collect();
            let GroupState {
                surface,
                view_node,
                managers,
                nodes,
            } = &mut *state;
            for manager in managers.values_mut() {
                manager.bind(surface, view_node.as_ref(), nodes);
            }
        }
        self.settle();

        let weak_shared = Rc::downgrade(&self.shared);
        let weak_factory = Rc::downgrade(&self.factory);
        let token = scene.events().subscribe_all(move |event| {
            let (Some(shared), Some(factory)) = (weak_shared.upgrade(), weak_factory.upgrade())
            else {
                return;
            };
            shared.queued_events.borrow_mut().push_back(event.clone());
            shared.settle(&factory);
        });
        self.scene_subscription = Some((scene.events().handle(), token));
    }

    /// Returns false if no scene was being observed.
    pub fn stop_observing_scene(&mut self) -> bool {
        match self.scene_subscription.take() {
            Some((handle, token)) => handle.unsubscribe(token),
            None => false,
        }
    }
}

impl Drop for DisplayableManagerGroup {
    fn drop(&mut self) {
        self.stop_observing_scene();
        self.factory.events().unsubscribe(self.factory_token);
    }
}
