// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Things and the in-process river that routes their flows.
//!
//! Routing is by flow name: a writer's output flow delivers to every
//! thing that declared an input flow of the same name. Each subscriber
//! owns a channel receiver; the river holds the matching senders, so a
//! blocking read never observes a disconnect - only data, a timeout, or
//! a `Purged` marker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, Sender};
use dashmap::DashMap;

use super::discovery::{
    DiscoveredThing, ListenerGuard, Registry, ThingDiscoveredListener, ThingLostListener,
};
use super::value::{FlowState, NvpSeq, Sample};
use super::{Error, Result};
use crate::schema::Schema;

struct Subscriber {
    id: u64,
    tx: Sender<Sample>,
}

struct RiverInner {
    topics: DashMap<String, Vec<Subscriber>>,
    discovery: Arc<Registry>,
    next_subscriber: AtomicU64,
}

/// The in-process data river: factory for [`Thing`] handles and entry
/// point for discovery.
///
/// Cheap to clone; all clones share the same flows and registry.
#[derive(Clone)]
pub struct River {
    inner: Arc<RiverInner>,
}

impl Default for River {
    fn default() -> Self {
        Self::new()
    }
}

impl River {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RiverInner {
                topics: DashMap::new(),
                discovery: Registry::new(),
                next_subscriber: AtomicU64::new(1),
            }),
        }
    }

    /// Create a thing and announce it on the river.
    ///
    /// Fails when the id is already taken.
    pub fn create_thing(&self, spec: ThingSpec) -> Result<Thing> {
        if self.inner.discovery.find(&spec.id, "*").is_some() {
            return Err(Error::DuplicateThing(spec.id));
        }

        let mut inputs = HashMap::new();
        for flow in &spec.inputs {
            let (tx, rx) = unbounded();
            let id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
            self.inner
                .topics
                .entry(flow.clone())
                .or_default()
                .push(Subscriber { id, tx });
            inputs.insert(flow.clone(), (id, rx));
        }

        let mut outputs = HashMap::new();
        for (flow, schema) in spec.outputs {
            outputs.insert(
                flow,
                OutputFlow {
                    schema,
                    flow_id: spec.id.clone(),
                },
            );
        }

        log::debug!("[River] thing created: {} ({})", spec.id, spec.class_id);
        self.inner.discovery.insert(DiscoveredThing {
            id: spec.id.clone(),
            class_id: spec.class_id.clone(),
            description: spec.description.clone(),
        });

        Ok(Thing {
            id: spec.id,
            class_id: spec.class_id,
            river: Arc::clone(&self.inner),
            inputs,
            outputs,
        })
    }

    /// One-shot discovery lookup; `"*"` matches any id or class id.
    pub fn find_thing(&self, id: &str, class_id: &str) -> Option<DiscoveredThing> {
        self.inner.discovery.find(id, class_id)
    }

    /// Register a listener for newly discovered things.
    pub fn add_discovered_listener(
        &self,
        listener: Arc<dyn ThingDiscoveredListener>,
    ) -> ListenerGuard {
        self.inner.discovery.add_discovered_listener(listener)
    }

    /// Register a listener for things leaving the river.
    pub fn add_lost_listener(&self, listener: Arc<dyn ThingLostListener>) -> ListenerGuard {
        self.inner.discovery.add_lost_listener(listener)
    }

    /// Pump queued discovery notifications for at most `budget`.
    ///
    /// Returns the number of events dispatched; zero when the budget
    /// elapses with nothing queued.
    pub fn process_events(&self, budget: Duration) -> usize {
        self.inner.discovery.process_events(budget)
    }
}

struct OutputFlow {
    schema: Arc<Schema>,
    flow_id: String,
}

/// Specification for a new thing: identity plus declared flows.
pub struct ThingSpec {
    id: String,
    class_id: String,
    description: String,
    inputs: Vec<String>,
    outputs: Vec<(String, Arc<Schema>)>,
}

impl ThingSpec {
    /// `class_id` uses the `Name:namespace:version` form used by
    /// discovery lookups.
    pub fn new(id: impl Into<String>, class_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class_id: class_id.into(),
            description: String::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare an input flow (subscription).
    pub fn input(mut self, flow: impl Into<String>) -> Self {
        self.inputs.push(flow.into());
        self
    }

    /// Declare an output flow publishing under `schema`.
    pub fn output(mut self, flow: impl Into<String>, schema: Arc<Schema>) -> Self {
        self.outputs.push((flow.into(), schema));
        self
    }
}

/// An addressable pub/sub entity with named input and output flows.
///
/// Dropping a thing purges its output flows (readers see the terminal
/// marker), withdraws its subscriptions, and announces it as lost.
pub struct Thing {
    id: String,
    class_id: String,
    river: Arc<RiverInner>,
    inputs: HashMap<String, (u64, Receiver<Sample>)>,
    outputs: HashMap<String, OutputFlow>,
}

impl Thing {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    /// Fire-and-forget publish on a declared output flow.
    pub fn write(&self, flow: &str, data: NvpSeq) -> Result<()> {
        let output = self
            .outputs
            .get(flow)
            .ok_or_else(|| Error::UnknownFlow(flow.to_string()))?;
        self.deliver(flow, output, FlowState::Alive, data);
        Ok(())
    }

    /// Blocking pull on a declared input flow.
    ///
    /// Blocks until at least one sample arrives, then drains everything
    /// already queued into one batch. `None` waits forever; a timeout
    /// with no data returns an empty batch.
    pub fn read(&self, flow: &str, timeout: Option<Duration>) -> Result<Vec<Sample>> {
        let (_, rx) = self
            .inputs
            .get(flow)
            .ok_or_else(|| Error::UnknownFlow(flow.to_string()))?;

        let first = match timeout {
            None => match rx.recv() {
                Ok(sample) => sample,
                Err(_) => return Ok(Vec::new()),
            },
            Some(limit) => match rx.recv_timeout(limit) {
                Ok(sample) => sample,
                Err(_) => return Ok(Vec::new()),
            },
        };

        let mut samples = vec![first];
        while let Ok(sample) = rx.try_recv() {
            samples.push(sample);
        }
        Ok(samples)
    }

    /// Emit the terminal `Purged` marker on an output flow.
    pub fn purge(&self, flow: &str) -> Result<()> {
        let output = self
            .outputs
            .get(flow)
            .ok_or_else(|| Error::UnknownFlow(flow.to_string()))?;
        log::debug!("[River] purging flow {} of {}", flow, self.id);
        self.deliver(flow, output, FlowState::Purged, Vec::new());
        Ok(())
    }

    fn deliver(&self, flow: &str, output: &OutputFlow, state: FlowState, data: NvpSeq) {
        if let Some(subscribers) = self.river.topics.get(flow) {
            for subscriber in subscribers.iter() {
                let _ = subscriber.tx.send(Sample {
                    flow: flow.to_string(),
                    flow_id: output.flow_id.clone(),
                    state,
                    schema: Arc::clone(&output.schema),
                    data: data.clone(),
                });
            }
        }
    }
}

impl Drop for Thing {
    fn drop(&mut self) {
        for (flow, output) in &self.outputs {
            self.deliver(flow, output, FlowState::Purged, Vec::new());
        }
        for (flow, (id, _)) in &self.inputs {
            if let Some(mut subscribers) = self.river.topics.get_mut(flow) {
                subscribers.retain(|s| s.id != *id);
            }
        }
        self.river.discovery.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::river::{lookup, Nvp, Value};
    use crate::schema;

    fn sensor_spec(id: &str) -> ThingSpec {
        ThingSpec::new(id, "TemperatureSensor:com.naskel.example:v1.0")
            .description("test sensor")
            .output("temperature", schema::temperature_v1())
    }

    #[test]
    fn test_write_routes_to_matching_input() {
        let river = River::new();
        let sensor = river.create_thing(sensor_spec("sensor-1")).unwrap();
        let display = river
            .create_thing(
                ThingSpec::new("display-1", "Display:com.naskel.example:v1.0")
                    .input("temperature"),
            )
            .unwrap();

        sensor
            .write("temperature", vec![Nvp::new("temperature", Value::F32(20.5))])
            .unwrap();

        let samples = display
            .read("temperature", Some(Duration::from_millis(100)))
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert!(samples[0].is_alive());
        assert_eq!(samples[0].flow_id, "sensor-1");
        assert_eq!(
            lookup(&samples[0].data, "temperature"),
            Some(&Value::F32(20.5))
        );
    }

    #[test]
    fn test_read_timeout_returns_empty_batch() {
        let river = River::new();
        let display = river
            .create_thing(
                ThingSpec::new("display-1", "Display:com.naskel.example:v1.0")
                    .input("temperature"),
            )
            .unwrap();

        let samples = display
            .read("temperature", Some(Duration::from_millis(10)))
            .unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_read_drains_queued_samples_into_one_batch() {
        let river = River::new();
        let sensor = river.create_thing(sensor_spec("sensor-1")).unwrap();
        let display = river
            .create_thing(
                ThingSpec::new("display-1", "Display:com.naskel.example:v1.0")
                    .input("temperature"),
            )
            .unwrap();

        for i in 0..3 {
            sensor
                .write(
                    "temperature",
                    vec![Nvp::new("temperature", Value::F32(i as f32))],
                )
                .unwrap();
        }

        let samples = display
            .read("temperature", Some(Duration::from_millis(100)))
            .unwrap();
        assert_eq!(samples.len(), 3);
    }

    #[test]
    fn test_drop_emits_purge_marker_and_lost_thing() {
        let river = River::new();
        let sensor = river.create_thing(sensor_spec("sensor-1")).unwrap();
        let display = river
            .create_thing(
                ThingSpec::new("display-1", "Display:com.naskel.example:v1.0")
                    .input("temperature"),
            )
            .unwrap();

        drop(sensor);

        let samples = display
            .read("temperature", Some(Duration::from_millis(100)))
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].state, FlowState::Purged);
        assert!(river.find_thing("sensor-1", "*").is_none());
    }

    #[test]
    fn test_duplicate_thing_id_rejected() {
        let river = River::new();
        let _sensor = river.create_thing(sensor_spec("sensor-1")).unwrap();
        match river.create_thing(sensor_spec("sensor-1")) {
            Err(Error::DuplicateThing(id)) => assert_eq!(id, "sensor-1"),
            other => panic!("expected DuplicateThing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unknown_flow_rejected() {
        let river = River::new();
        let sensor = river.create_thing(sensor_spec("sensor-1")).unwrap();
        assert!(matches!(
            sensor.write("speed", Vec::new()),
            Err(Error::UnknownFlow(_))
        ));
        assert!(matches!(
            sensor.read("speed", Some(Duration::from_millis(1))),
            Err(Error::UnknownFlow(_))
        ));
    }

    #[test]
    fn test_find_thing_by_class_pattern() {
        let river = River::new();
        let _sensor = river.create_thing(sensor_spec("sensor-1")).unwrap();
        assert!(river
            .find_thing("*", "TemperatureSensor:com.naskel.example:v1.0")
            .is_some());
        assert!(river.find_thing("*", "Display:com.naskel.example:v1.0").is_none());
    }
}
