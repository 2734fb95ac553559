// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovered-thing registry, listeners, and the event pump.
//!
//! Notifications are not delivered from middleware threads: discovery
//! events queue up and the application pumps them through
//! `process_events` in bounded time slices. That keeps listener code on
//! the caller's thread and makes "no events for a while" a normal
//! outcome instead of a stalled callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

/// Snapshot of a thing visible on the river.
#[derive(Debug, Clone)]
pub struct DiscoveredThing {
    pub id: String,
    pub class_id: String,
    pub description: String,
}

/// Callback for newly discovered things.
///
/// Invoked from the thread pumping [`crate::River::process_events`];
/// implementations must be `Send + Sync` and should not block.
pub trait ThingDiscoveredListener: Send + Sync {
    fn notify_thing_discovered(&self, thing: &DiscoveredThing);
}

/// Callback for things that left the river.
pub trait ThingLostListener: Send + Sync {
    fn notify_thing_lost(&self, thing: &DiscoveredThing);
}

enum Event {
    Discovered(DiscoveredThing),
    Lost(DiscoveredThing),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListenerKind {
    Discovered,
    Lost,
}

/// Guard returned by listener registration.
///
/// Dropping the guard unregisters the listener, so cleanup happens even
/// on panic or early return.
pub struct ListenerGuard {
    registry: Weak<Registry>,
    id: u64,
    kind: ListenerKind,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_listener(self.id, self.kind);
        }
    }
}

pub(crate) struct Registry {
    things: Mutex<Vec<DiscoveredThing>>,
    discovered_listeners: Mutex<Vec<(u64, Arc<dyn ThingDiscoveredListener>)>>,
    lost_listeners: Mutex<Vec<(u64, Arc<dyn ThingLostListener>)>>,
    next_listener: AtomicU64,
    events_tx: Sender<Event>,
    // Pump state; one pumper at a time.
    events_rx: Mutex<Receiver<Event>>,
}

impl Registry {
    pub(crate) fn new() -> Arc<Self> {
        let (events_tx, events_rx) = unbounded();
        Arc::new(Self {
            things: Mutex::new(Vec::new()),
            discovered_listeners: Mutex::new(Vec::new()),
            lost_listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
            events_tx,
            events_rx: Mutex::new(events_rx),
        })
    }

    pub(crate) fn insert(&self, thing: DiscoveredThing) {
        log::debug!("[Discovery] thing appeared: {} ({})", thing.id, thing.class_id);
        self.things.lock().push(thing.clone());
        let _ = self.events_tx.send(Event::Discovered(thing));
    }

    pub(crate) fn remove(&self, id: &str) {
        let mut things = self.things.lock();
        if let Some(pos) = things.iter().position(|t| t.id == id) {
            let thing = things.remove(pos);
            drop(things);
            log::debug!("[Discovery] thing lost: {} ({})", thing.id, thing.class_id);
            let _ = self.events_tx.send(Event::Lost(thing));
        }
    }

    /// One-shot lookup; `"*"` matches any id or class.
    pub(crate) fn find(&self, id: &str, class_id: &str) -> Option<DiscoveredThing> {
        self.things
            .lock()
            .iter()
            .find(|t| (id == "*" || t.id == id) && (class_id == "*" || t.class_id == class_id))
            .cloned()
    }

    pub(crate) fn add_discovered_listener(
        self: &Arc<Self>,
        listener: Arc<dyn ThingDiscoveredListener>,
    ) -> ListenerGuard {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.discovered_listeners.lock().push((id, listener));
        ListenerGuard {
            registry: Arc::downgrade(self),
            id,
            kind: ListenerKind::Discovered,
        }
    }

    pub(crate) fn add_lost_listener(
        self: &Arc<Self>,
        listener: Arc<dyn ThingLostListener>,
    ) -> ListenerGuard {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.lost_listeners.lock().push((id, listener));
        ListenerGuard {
            registry: Arc::downgrade(self),
            id,
            kind: ListenerKind::Lost,
        }
    }

    fn remove_listener(&self, id: u64, kind: ListenerKind) {
        match kind {
            ListenerKind::Discovered => {
                self.discovered_listeners.lock().retain(|(lid, _)| *lid != id);
            }
            ListenerKind::Lost => {
                self.lost_listeners.lock().retain(|(lid, _)| *lid != id);
            }
        }
    }

    /// Drain queued discovery events for at most `budget`, invoking the
    /// registered listeners. Returns the number of events dispatched;
    /// zero when the budget passes quietly.
    pub(crate) fn process_events(&self, budget: Duration) -> usize {
        let deadline = Instant::now() + budget;
        let rx = self.events_rx.lock();
        let mut dispatched = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = match rx.recv_timeout(remaining) {
                Ok(event) => event,
                Err(_) => break,
            };
            match event {
                Event::Discovered(thing) => {
                    for (_, listener) in self.discovered_listeners.lock().iter() {
                        listener.notify_thing_discovered(&thing);
                    }
                }
                Event::Lost(thing) => {
                    for (_, listener) in self.lost_listeners.lock().iter() {
                        listener.notify_thing_lost(&thing);
                    }
                }
            }
            dispatched += 1;
        }

        dispatched
    }
}
