use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, info};
use mosaic_core::{Event, EventBus};

use crate::{DisplayableManager, NodeSetDisplayableManager};

/// Builds a manager for the given kind name.
pub type ManagerConstructor = Rc<dyn Fn(&str) -> Box<dyn DisplayableManager>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryEvent {
    ManagerKindRegistered(String),
    ManagerKindUnregistered(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryEventKind {
    ManagerKindRegistered,
    ManagerKindUnregistered,
}

impl FactoryEvent {
    pub fn manager_kind(&self) -> &str {
        match self {
            FactoryEvent::ManagerKindRegistered(name)
            | FactoryEvent::ManagerKindUnregistered(name) => name,
        }
    }
}

impl Event for FactoryEvent {
    type Kind = FactoryEventKind;

    fn kind(&self) -> FactoryEventKind {
        match self {
            FactoryEvent::ManagerKindRegistered(_) => FactoryEventKind::ManagerKindRegistered,
            FactoryEvent::ManagerKindUnregistered(_) => FactoryEventKind::ManagerKindUnregistered,
        }
    }
}

/// Registry of manager kinds shared by every group built from it.
///
/// Groups subscribe to the factory's bus and add or drop their own manager instance when a
/// kind is registered or unregistered.
#[derive(Default)]
pub struct DisplayableManagerFactory {
    kinds: RefCell<IndexMap<String, ManagerConstructor>>,
    events: EventBus<FactoryEvent>,
}

impl fmt::Debug for DisplayableManagerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayableManagerFactory")
            .field("kinds", &self.registered_kinds())
            .field("events", &self.events)
            .finish()
    }
}

impl DisplayableManagerFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &EventBus<FactoryEvent> {
        &self.events
    }

    /// Registers `name` with the default node-set manager. Returns false if already registered.
    pub fn register_manager_kind(&self, name: &str) -> bool {
        self.register_manager_kind_with(name, |kind| -> Box<dyn DisplayableManager> {
            Box::new(NodeSetDisplayableManager::new(kind))
        })
    }

    pub fn register_manager_kind_with<F>(&self, name: &str, constructor: F) -> bool
    where
        F: Fn(&str) -> Box<dyn DisplayableManager> + 'static,
    {
        {
            let mut kinds = self.kinds.borrow_mut();
            if kinds.contains_key(name) {
                debug!("manager kind {name} already registered");
                return false;
            }
            kinds.insert(name.to_string(), Rc::new(constructor));
        }
        info!("registered manager kind {name}");
        self.events
            .emit(&FactoryEvent::ManagerKindRegistered(name.to_string()));
        true
    }

    /// Returns false if `name` was not registered.
    pub fn unregister_manager_kind(&self, name: &str) -> bool {
        if self.kinds.borrow_mut().shift_remove(name).is_none() {
            debug!("manager kind {name} is not registered");
            return false;
        }
        info!("unregistered manager kind {name}");
        self.events
            .emit(&FactoryEvent::ManagerKindUnregistered(name.to_string()));
        true
    }

    pub fn is_manager_kind_registered(&self, name: &str) -> bool {
        self.kinds.borrow().contains_key(name)
    }

    pub fn registered_kind_count(&self) -> usize {
        self.kinds.borrow().len()
    }

    /// Registered kinds in registration order.
    pub fn registered_kinds(&self) -> Vec<String> {
        self.kinds.borrow().keys().cloned().collect()
    }

    /// New unbound manager of kind `name`, or `None` if the kind is not registered.
    pub fn instantiate(&self, name: &str) -> Option<Box<dyn DisplayableManager>> {
        let constructor = self.kinds.borrow().get(name).cloned()?;
        Some(constructor(name))
    }
}
