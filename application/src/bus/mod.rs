//! Typed publish/subscribe event bus.
//!
//! The bus is the synchronization backbone between the tool-execution core
//! and whatever renders it. Components publish; the UI subscribes.
//!
//! - [`EventBus::define`] pairs an event name with a payload [`Schema`].
//! - [`EventBus::publish`] validates the payload against that schema and calls
//!   every listener synchronously, in subscription order. An invalid payload is
//!   a bug in the publisher and panics.
//! - [`EventBus::emit`] sends a dynamically named event without validation,
//!   for high-cardinality streams such as per-process output lines.
//!
//! A panicking listener is caught and logged; the remaining listeners still
//! run and the publisher never sees the panic.
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use toolhost_application::bus::EventBus;
//! use toolhost_domain::tool::schema::{Field, Schema};
//!
//! let bus = Arc::new(EventBus::new());
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = seen.clone();
//! let sub = bus.subscribe(move |event| sink.lock().unwrap().push(event.name.clone()));
//!
//! let ping = EventBus::define::<serde_json::Value>(
//!     "ping",
//!     Schema::new().field(Field::integer("n", "counter").required()),
//! );
//! bus.publish(&ping, &serde_json::json!({"n": 1}));
//! sub.unsubscribe();
//! bus.publish(&ping, &serde_json::json!({"n": 2}));
//!
//! assert_eq!(*seen.lock().unwrap(), vec!["ping".to_string()]);
//! ```

pub mod topics;

use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use toolhost_domain::tool::schema::Schema;
use tracing::{error, trace};

/// An event as delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct BusEvent {
    pub name: String,
    pub payload: Value,
}

/// Name and payload schema of a statically known event.
#[derive(Debug, Clone)]
pub struct EventDefinition<P> {
    name: String,
    schema: Schema,
    _payload: PhantomData<fn(P)>,
}

impl<P> EventDefinition<P> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

type Listener = Arc<dyn Fn(&BusEvent) + Send + Sync>;

struct Listeners {
    entries: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl Listeners {
    fn lock(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        // A listener panic never happens while this lock is held
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Process-wide typed publish/subscribe hub.
pub struct EventBus {
    listeners: Arc<Listeners>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Listeners {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Declare an event. Definitions are cheap and usually built once at startup.
    pub fn define<P: Serialize>(name: impl Into<String>, schema: Schema) -> EventDefinition<P> {
        EventDefinition {
            name: name.into(),
            schema,
            _payload: PhantomData,
        }
    }

    /// Validate `payload` and deliver it to every listener.
    ///
    /// # Panics
    ///
    /// Panics when the payload cannot be serialized or fails the definition's
    /// schema. Both indicate a bug in the publisher.
    pub fn publish<P: Serialize>(&self, definition: &EventDefinition<P>, payload: &P) {
        let value = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => panic!("event '{}' payload is not serializable: {}", definition.name, e),
        };
        let value = match definition.schema.validate(&value) {
            Ok(value) => value,
            Err(e) => panic!("event '{}' payload violates its schema: {}", definition.name, e),
        };

        self.dispatch(BusEvent {
            name: definition.name.clone(),
            payload: value,
        });
    }

    /// Deliver a dynamically named event without schema validation.
    pub fn emit(&self, name: impl Into<String>, payload: Value) {
        self.dispatch(BusEvent {
            name: name.into(),
            payload,
        });
    }

    /// Register a listener. It stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&BusEvent) + Send + Sync + 'static,
    {
        let id = self.listeners.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            listeners: Arc::downgrade(&self.listeners),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn dispatch(&self, event: BusEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while running
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        trace!(event = %event.name, listeners = snapshot.len(), "Dispatching event");

        for listener in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                error!(
                    event = %event.name,
                    panic = %panic_message(panic.as_ref()),
                    "Event listener panicked"
                );
            }
        }
    }
}

/// Handle returned by [`EventBus::subscribe`]. Dropping it removes the listener.
#[must_use = "dropping the subscription removes the listener"]
pub struct Subscription {
    listeners: Weak<Listeners>,
    id: u64,
}

impl Subscription {
    /// Remove the listener. Safe to call after the bus has been dropped.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
