//! Typed publish/subscribe with immediate and deferred delivery.
//!
//! An [`EventBus<C>`] hands every callback a `&mut C` context alongside the
//! event. The registry owns an `EventBus<Registry>`, so gameplay callbacks get
//! the registry they need to queue follow-up mutations.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::ecs::id::event_id;
use crate::ecs::{Entity, EventId, Priority};
use crate::input::KeyCode;

// ── Built-in engine events ────────────────────────────────────────────────

/// The input source asked the engine to stop.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct QuitEvent;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyDownEvent {
    pub key: KeyCode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KeyUpEvent {
    pub key: KeyCode,
}

/// Two colliders overlap. Emitted once per unordered pair per frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CollisionEvent {
    pub a: Entity,
    pub b: Entity,
}

impl CollisionEvent {
    pub fn involves(&self, entity: Entity) -> bool {
        self.a == entity || self.b == entity
    }
}

// ── Type-erased plumbing ──────────────────────────────────────────────────

type Handler<C> = Rc<RefCell<dyn FnMut(&mut C, &dyn Any)>>;

trait EventQueue {
    fn len(&self) -> usize;
    fn get(&self, index: usize) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedQueue<E> {
    events: Vec<E>,
}

impl<E: 'static> EventQueue for TypedQueue<E> {
    fn len(&self) -> usize {
        self.events.len()
    }

    fn get(&self, index: usize) -> &dyn Any {
        &self.events[index]
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Snapshot of the subscribers of one event type.
///
/// Taking a snapshot ends the borrow of the bus, so the callbacks may be run
/// against a context that owns the bus itself.
pub struct Subscribers<C> {
    handlers: Vec<Handler<C>>,
}

impl<C: 'static> Subscribers<C> {
    /// Calls every handler in subscription order.
    ///
    /// # Panics
    /// If a handler re-enters itself by emitting its own event type immediately.
    pub fn dispatch<E: 'static>(&self, ctx: &mut C, event: &E) {
        let event: &dyn Any = event;
        for handler in &self.handlers {
            let mut handler = handler.borrow_mut();
            (&mut *handler)(ctx, event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Buffered events of one type together with the subscribers that will see them.
pub struct PendingBatch<C> {
    event: EventId,
    handlers: Vec<Handler<C>>,
    events: Box<dyn EventQueue>,
}

impl<C: 'static> PendingBatch<C> {
    pub fn event_id(&self) -> EventId {
        self.event
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.len() == 0
    }

    /// Runs every buffered event through the first subscriber, then through the
    /// second, and so on.
    pub fn dispatch(self, ctx: &mut C) {
        for handler in &self.handlers {
            let mut handler = handler.borrow_mut();
            for index in 0..self.events.len() {
                (&mut *handler)(ctx, self.events.get(index));
            }
        }
    }
}

// ── EventBus ──────────────────────────────────────────────────────────────

pub struct EventBus<C> {
    handlers: HashMap<EventId, Vec<Handler<C>>>,
    pending: BTreeMap<EventId, Box<dyn EventQueue>>,
}

impl<C: 'static> EventBus<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            pending: BTreeMap::new(),
        }
    }

    /// Registers `callback` for events of type `E`. Callbacks run in the order
    /// they were subscribed.
    pub fn subscribe<E: 'static>(&mut self, mut callback: impl FnMut(&mut C, &E) + 'static) {
        let handler: Handler<C> = Rc::new(RefCell::new(move |ctx: &mut C, event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                callback(ctx, event);
            }
        }));
        self.handlers.entry(event_id::<E>()).or_default().push(handler);
    }

    pub fn emit<E: 'static>(&mut self, ctx: &mut C, event: E, priority: Priority) {
        match priority {
            Priority::Immediate => self.subscribers::<E>().dispatch(ctx, &event),
            Priority::Deferred => self.enqueue(event),
        }
    }

    /// Buffers `event` until the next [`update`](Self::update).
    pub fn enqueue<E: 'static>(&mut self, event: E) {
        let queue = self
            .pending
            .entry(event_id::<E>())
            .or_insert_with(|| Box::new(TypedQueue::<E> { events: Vec::new() }))
            .as_any_mut()
            .downcast_mut::<TypedQueue<E>>()
            .expect("type mismatch in event queue");
        queue.events.push(event);
    }

    pub fn subscribers<E: 'static>(&self) -> Subscribers<C> {
        Subscribers {
            handlers: self.handlers.get(&event_id::<E>()).cloned().unwrap_or_default(),
        }
    }

    /// Moves every non-empty buffer out of the bus, in event-id order.
    /// Events emitted while the batches are dispatched land in fresh buffers.
    pub fn take_pending(&mut self) -> Vec<PendingBatch<C>> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .filter(|(_, events)| events.len() > 0)
            .map(|(event, events)| PendingBatch {
                event,
                handlers: self.handlers.get(&event).cloned().unwrap_or_default(),
                events,
            })
            .collect()
    }

    /// Flushes all deferred events.
    pub fn update(&mut self, ctx: &mut C) {
        for batch in self.take_pending() {
            batch.dispatch(ctx);
        }
    }

    pub fn subscriber_count<E: 'static>(&self) -> usize {
        self.handlers.get(&event_id::<E>()).map_or(0, Vec::len)
    }

    pub fn pending_count<E: 'static>(&self) -> usize {
        self.pending.get(&event_id::<E>()).map_or(0, |queue| queue.len())
    }

    pub fn has_pending(&self) -> bool {
        self.pending.values().any(|queue| queue.len() > 0)
    }

    /// Drops every subscription and every buffered event.
    pub fn shutdown(&mut self) {
        tracing::debug!(
            subscriptions = self.handlers.values().map(Vec::len).sum::<usize>(),
            "event bus shut down"
        );
        self.handlers.clear();
        self.pending.clear();
    }
}

impl<C: 'static> Default for EventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    #[derive(Debug, PartialEq)]
    struct Pong;

    type Log = Vec<String>;

    #[test]
    fn immediate_reaches_subscribers_in_order() {
        let mut bus = EventBus::<Log>::new();
        bus.subscribe(|log: &mut Log, p: &Ping| log.push(format!("first {}", p.0)));
        bus.subscribe(|log: &mut Log, p: &Ping| log.push(format!("second {}", p.0)));

        let mut log = Log::new();
        bus.emit(&mut log, Ping(7), Priority::Immediate);
        assert_eq!(log, vec!["first 7", "second 7"]);
    }

    #[test]
    fn immediate_without_subscribers_is_dropped() {
        let mut bus = EventBus::<Log>::new();
        let mut log = Log::new();
        bus.emit(&mut log, Pong, Priority::Immediate);
        assert!(log.is_empty());
        assert!(!bus.has_pending());
    }

    #[test]
    fn deferred_waits_for_update() {
        let mut bus = EventBus::<Log>::new();
        bus.subscribe(|log: &mut Log, p: &Ping| log.push(format!("{}", p.0)));

        let mut log = Log::new();
        bus.emit(&mut log, Ping(1), Priority::Deferred);
        assert!(log.is_empty());
        assert_eq!(bus.pending_count::<Ping>(), 1);

        bus.update(&mut log);
        assert_eq!(log, vec!["1"]);
        assert_eq!(bus.pending_count::<Ping>(), 0);

        // Buffers are cleared after delivery.
        bus.update(&mut log);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn update_runs_subscriber_major_order() {
        let mut bus = EventBus::<Log>::new();
        bus.subscribe(|log: &mut Log, p: &Ping| log.push(format!("S1(E{})", p.0)));
        bus.subscribe(|log: &mut Log, p: &Ping| log.push(format!("S2(E{})", p.0)));

        let mut log = Log::new();
        bus.enqueue(Ping(1));
        bus.enqueue(Ping(2));
        bus.update(&mut log);

        assert_eq!(log, vec!["S1(E1)", "S1(E2)", "S2(E1)", "S2(E2)"]);
    }

    #[test]
    fn events_are_routed_by_type() {
        let mut bus = EventBus::<Log>::new();
        bus.subscribe(|log: &mut Log, _: &Pong| log.push("pong".into()));

        let mut log = Log::new();
        bus.emit(&mut log, Ping(3), Priority::Immediate);
        bus.emit(&mut log, Pong, Priority::Immediate);
        assert_eq!(log, vec!["pong"]);
    }

    #[test]
    fn events_emitted_during_update_wait_for_next_update() {
        let mut bus = EventBus::<Log>::new();
        bus.subscribe(|log: &mut Log, p: &Ping| log.push(format!("{}", p.0)));

        let mut log = Log::new();
        bus.enqueue(Ping(1));
        let batches = bus.take_pending();
        bus.enqueue(Ping(2));
        for batch in batches {
            batch.dispatch(&mut log);
        }
        assert_eq!(log, vec!["1"]);
        assert_eq!(bus.pending_count::<Ping>(), 1);
    }

    #[test]
    fn shutdown_clears_everything() {
        let mut bus = EventBus::<Log>::new();
        bus.subscribe(|log: &mut Log, _: &Ping| log.push("x".into()));
        bus.enqueue(Ping(1));
        bus.shutdown();

        assert_eq!(bus.subscriber_count::<Ping>(), 0);
        assert!(!bus.has_pending());

        // Usable again from empty.
        let mut log = Log::new();
        bus.subscribe(|log: &mut Log, _: &Ping| log.push("y".into()));
        bus.emit(&mut log, Ping(2), Priority::Immediate);
        assert_eq!(log, vec!["y"]);
    }
}
