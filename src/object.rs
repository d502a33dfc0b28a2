//! Heap objects.
//!
//! An [`Object`] is an instance of a [`ClassType`]: one value per flattened
//! field plus a body for the built-in kinds that carry native state (lists,
//! enumerators and events). All state sits behind `parking_lot` mutexes so
//! objects can be shared across threads; no lock is held while a callback
//! runs.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::class::{ClassType, InstanceLayout};
use crate::value::{Delegate, Value};

/// Shared handle to a heap object.
pub type ObjectRef = Arc<Object>;

/// Host callback for property-changed notifications.
pub type PropertyChangedHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Identifies a property-changed subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Listeners {
    next: u64,
    handlers: Vec<(SubscriptionId, PropertyChangedHandler)>,
}

/// Native state of built-in object kinds.
pub(crate) enum ObjectBody {
    Plain,
    List(Mutex<ListState>),
    Enumerator(Mutex<EnumeratorState>),
    Event(Mutex<Vec<Delegate>>),
}

#[derive(Default)]
pub(crate) struct ListState {
    pub items: Vec<Value>,
    /// Collection-changed subscribers; only observable lists fire them.
    pub handlers: Vec<Delegate>,
}

/// Snapshot enumerator. `position` is `None` before the first `MoveNext`.
pub(crate) struct EnumeratorState {
    pub items: Vec<Value>,
    pub position: Option<usize>,
    pub disposed: bool,
}

impl EnumeratorState {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items,
            position: None,
            disposed: false,
        }
    }
}

/// An instance of a class.
pub struct Object {
    class: Arc<ClassType>,
    fields: Mutex<Vec<Value>>,
    body: ObjectBody,
    listeners: Mutex<Listeners>,
}

impl Object {
    /// Allocate an instance with every field at its default. No constructor
    /// runs.
    pub(crate) fn allocate(class: &Arc<ClassType>) -> ObjectRef {
        let fields = class
            .fields()
            .iter()
            .map(|f| Value::default_for(&f.data_type))
            .collect();
        let body = match class.layout() {
            InstanceLayout::Plain => ObjectBody::Plain,
            InstanceLayout::List { .. } => ObjectBody::List(Mutex::new(ListState::default())),
            InstanceLayout::Enumerator => {
                ObjectBody::Enumerator(Mutex::new(EnumeratorState::new(Vec::new())))
            }
            InstanceLayout::Event => ObjectBody::Event(Mutex::new(Vec::new())),
        };
        Arc::new(Self {
            class: Arc::clone(class),
            fields: Mutex::new(fields),
            body,
            listeners: Mutex::new(Listeners::default()),
        })
    }

    pub fn class(&self) -> &Arc<ClassType> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    // ==========================================================================
    // Fields
    // ==========================================================================

    pub fn field(&self, index: u16) -> Option<Value> {
        self.fields.lock().get(usize::from(index)).cloned()
    }

    /// Store into a field. Returns `false` when the index is out of range.
    pub fn set_field(&self, index: u16, value: Value) -> bool {
        match self.fields.lock().get_mut(usize::from(index)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn field_by_name(&self, name: &str) -> Option<Value> {
        self.class.field_index(name).and_then(|i| self.field(i))
    }

    // ==========================================================================
    // Built-in bodies
    // ==========================================================================

    pub(crate) fn body(&self) -> &ObjectBody {
        &self.body
    }

    pub fn is_list(&self) -> bool {
        matches!(self.body, ObjectBody::List(_))
    }

    /// Snapshot of a list's items.
    pub fn list_items(&self) -> Option<Vec<Value>> {
        match &self.body {
            ObjectBody::List(state) => Some(state.lock().items.clone()),
            _ => None,
        }
    }

    pub fn list_len(&self) -> Option<usize> {
        match &self.body {
            ObjectBody::List(state) => Some(state.lock().items.len()),
            _ => None,
        }
    }

    /// Number of delegates subscribed to an event object.
    pub fn event_handler_count(&self) -> Option<usize> {
        match &self.body {
            ObjectBody::Event(handlers) => Some(handlers.lock().len()),
            _ => None,
        }
    }

    // ==========================================================================
    // Property-changed notification
    // ==========================================================================

    /// Subscribe to property-changed notifications raised on this object.
    pub fn subscribe_property_changed(
        &self,
        handler: impl Fn(&str) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut listeners = self.listeners.lock();
        let id = SubscriptionId(listeners.next);
        listeners.next += 1;
        listeners.handlers.push((id, Arc::new(handler)));
        id
    }

    pub fn unsubscribe_property_changed(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.handlers.len();
        listeners.handlers.retain(|(h, _)| *h != id);
        listeners.handlers.len() != before
    }

    /// Notify subscribers that `property` changed.
    pub fn raise_property_changed(&self, property: &str) {
        // Handlers may read this object back; call them unlocked.
        let handlers: Vec<PropertyChangedHandler> = self
            .listeners
            .lock()
            .handlers
            .iter()
            .map(|(_, h)| Arc::clone(h))
            .collect();
        for handler in handlers {
            handler(property);
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class.name())
            .field("fields", &*self.fields.lock())
            .finish()
    }
}
