//! # space_event - Typed Event Channels
//!
//! Synchronous publish/subscribe used for lifecycle notifications:
//! - One channel per payload type
//! - Priority-ordered delivery, subscription order within a priority
//! - A panicking subscriber never stops delivery to the others
//! - No buffering and no replay: late subscribers miss earlier events
//!
//! ```ignore
//! use space_event::prelude::*;
//!
//! let bus = EventBus::new();
//! bus.subscribe(|e: &AssetLoadCompleted| log::info!("loaded {}", e.root_name));
//! bus.publish(AssetLoadCompleted { /* ... */ });
//! ```

pub mod events;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

pub use events::*;

/// Subscriber priority
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Critical = 3,
}

/// Trait for events
pub trait Event: Send + Sync + 'static {}

// Blanket implementation
impl<T: Send + Sync + 'static> Event for T {}

/// Event handler function type
pub type EventHandler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Subscriber ID, unique across every channel in the process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl SubscriberId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Outcome of a single publish
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers that returned normally
    pub delivered: usize,
    /// Subscribers that panicked
    pub failed: usize,
}

impl Delivery {
    /// Total subscribers invoked
    pub fn total(&self) -> usize {
        self.delivered + self.failed
    }
}

struct Subscriber<E> {
    id: SubscriberId,
    priority: Priority,
    handler: EventHandler<E>,
}

/// Channel for single-type events
pub struct EventChannel<E: Event> {
    subscribers: RwLock<Vec<Subscriber<E>>>,
}

impl<E: Event> EventChannel<E> {
    /// Create a new channel
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe with normal priority
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_with_priority(handler, Priority::Normal)
    }

    /// Subscribe with priority
    pub fn subscribe_with_priority<F>(&self, handler: F, priority: Priority) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriberId::next();
        let mut subscribers = self.subscribers.write();

        // Insert after every subscriber of equal or higher priority
        let position = subscribers
            .iter()
            .position(|s| s.priority < priority)
            .unwrap_or(subscribers.len());
        subscribers.insert(
            position,
            Subscriber {
                id,
                priority,
                handler: Arc::new(handler),
            },
        );

        id
    }

    /// Unsubscribe. Returns false if the id was not subscribed here.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Deliver an event to every current subscriber, in order.
    ///
    /// The subscriber list is snapshotted first, so handlers may subscribe
    /// or unsubscribe on this channel without deadlocking; such changes take
    /// effect from the next publish.
    pub fn publish(&self, event: E) -> Delivery {
        let handlers: Vec<(SubscriberId, EventHandler<E>)> = self
            .subscribers
            .read()
            .iter()
            .map(|s| (s.id, Arc::clone(&s.handler)))
            .collect();

        let mut delivery = Delivery::default();
        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
                Ok(()) => delivery.delivered += 1,
                Err(payload) => {
                    delivery.failed += 1;
                    log::error!(
                        "EventChannel<{}>: subscriber {:?} panicked: {}",
                        std::any::type_name::<E>(),
                        id,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        delivery
    }

    /// Number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Check if nobody is listening
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Remove every subscriber
    pub fn clear(&self) {
        self.subscribers.write().clear();
    }
}

impl<E: Event> Default for EventChannel<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

/// Type-erased view of a channel, used by the bus
trait ErasedChannel: Send + Sync {
    fn unsubscribe(&self, id: SubscriberId) -> bool;
    fn clear(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<E: Event> ErasedChannel for EventChannel<E> {
    fn unsubscribe(&self, id: SubscriberId) -> bool {
        EventChannel::unsubscribe(self, id)
    }

    fn clear(&self) {
        EventChannel::clear(self)
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Event bus: one lazily created channel per event type
pub struct EventBus {
    channels: RwLock<HashMap<TypeId, Arc<dyn ErasedChannel>>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide bus for hosts that do not thread one through
    pub fn global() -> &'static Arc<EventBus> {
        static GLOBAL: OnceLock<Arc<EventBus>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(EventBus::new()))
    }

    /// Get (or create) the channel for an event type
    pub fn channel<E: Event>(&self) -> Arc<EventChannel<E>> {
        let type_id = TypeId::of::<E>();

        if let Some(channel) = self.channels.read().get(&type_id) {
            if let Some(typed) = downcast_channel::<E>(channel) {
                return typed;
            }
        }

        let mut channels = self.channels.write();
        let erased = channels
            .entry(type_id)
            .or_insert_with(|| Arc::new(EventChannel::<E>::new()) as Arc<dyn ErasedChannel>);
        match downcast_channel::<E>(erased) {
            Some(typed) => typed,
            None => {
                // A TypeId maps to exactly one channel type, so this only
                // happens if the map was corrupted. Replace the entry.
                let fresh = Arc::new(EventChannel::<E>::new());
                channels.insert(type_id, fresh.clone());
                fresh
            }
        }
    }

    /// Publish an event
    pub fn publish<E: Event>(&self, event: E) -> Delivery {
        let channel = self.existing_channel::<E>();
        match channel {
            Some(channel) => channel.publish(event),
            None => Delivery::default(),
        }
    }

    /// Subscribe to an event type
    pub fn subscribe<E: Event, F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.channel::<E>().subscribe(handler)
    }

    /// Subscribe with priority
    pub fn subscribe_with_priority<E: Event, F>(&self, handler: F, priority: Priority) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.channel::<E>().subscribe_with_priority(handler, priority)
    }

    /// Unsubscribe from whichever channel holds the id
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let channels: Vec<Arc<dyn ErasedChannel>> =
            self.channels.read().values().cloned().collect();
        channels.iter().any(|channel| channel.unsubscribe(id))
    }

    /// Number of subscribers for an event type
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.existing_channel::<E>()
            .map(|c| c.subscriber_count())
            .unwrap_or(0)
    }

    /// Remove every subscriber on every channel
    pub fn clear(&self) {
        for channel in self.channels.read().values() {
            channel.clear();
        }
    }

    fn existing_channel<E: Event>(&self) -> Option<Arc<EventChannel<E>>> {
        let channels = self.channels.read();
        channels
            .get(&TypeId::of::<E>())
            .and_then(downcast_channel::<E>)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.channels.read().len())
            .finish()
    }
}

fn downcast_channel<E: Event>(channel: &Arc<dyn ErasedChannel>) -> Option<Arc<EventChannel<E>>> {
    Arc::clone(channel).into_any().downcast::<EventChannel<E>>().ok()
}

/// Prelude
pub mod prelude {
    pub use crate::events::*;
    pub use crate::{Delivery, Event, EventBus, EventChannel, Priority, SubscriberId};
}
