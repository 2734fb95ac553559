// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Rill - Pub/Sub Measurement Harness
//!
//! Round-trip latency and throughput measurement drivers for data-river
//! style publish/subscribe middleware, together with an in-process river
//! so the drivers can run and be tested without an external broker.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rill::{River, ThingSpec, Value, Nvp};
//! use std::time::Duration;
//!
//! fn main() -> rill::Result<()> {
//!     let river = River::new();
//!
//!     let sensor = river.create_thing(
//!         ThingSpec::new("sensor-1", "TemperatureSensor:com.naskel.example:v1.0")
//!             .output("temperature", rill::schema::temperature_v1()),
//!     )?;
//!     let display = river.create_thing(
//!         ThingSpec::new("display-1", "TemperatureDisplay:com.naskel.example:v1.0")
//!             .input("temperature"),
//!     )?;
//!
//!     sensor.write("temperature", vec![Nvp::new("temperature", Value::F32(21.5))])?;
//!     let samples = display.read("temperature", Some(Duration::from_millis(100)))?;
//!     println!("got {} sample(s)", samples.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                       Driver Layer                            |
//! |   PingDriver / run_pong / ReaderDriver / WriterDriver         |
//! +---------------------------------------------------------------+
//! |                     Measurement Core                          |
//! |   TimeStats | SequenceMonitor | BurstScheduler | reports      |
//! +---------------------------------------------------------------+
//! |                       River Seam                              |
//! |   Thing (write/read/purge) | discovery | listener dispatch    |
//! +---------------------------------------------------------------+
//! |                   In-Process Transport                        |
//! |   topic-routed channels, purge markers, liveness events       |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`River`] | Entry point, factory for [`Thing`] handles |
//! | [`Thing`] | Addressable pub/sub entity with named flows |
//! | [`TimeStats`] | Running latency statistics (count/avg/min/max/median) |
//! | [`PingDriver`] | Round-trip measurement state machine |
//! | [`ReaderDriver`] / [`WriterDriver`] | Throughput measurement pair |

/// Measurement drivers (round-trip ping/pong, throughput reader/writer).
pub mod bench;
/// The pub/sub seam: things, flows, samples, discovery, listener dispatch.
pub mod river;
/// Schema identity, structural compatibility, and generation classification.
pub mod schema;
/// Latency statistics and sequence-gap accounting.
pub mod stats;

pub use bench::{
    run_pong, BurstScheduler, PingConfig, PingDriver, ReaderConfig, ReaderDriver,
    RoundTripReport, RunOutcome, TransferRate, TransferSummary, WriterConfig, WriterDriver,
    WriterSummary,
};
pub use river::{
    lookup, DiscoveredThing, Error, FlowState, ListenerGuard, Nvp, NvpSeq, Result, River, Sample,
    Thing, ThingDiscoveredListener, ThingLostListener, ThingSpec, Value, ValueKind,
};
pub use schema::{Schema, SensorGeneration, TagDef, TemperatureReading};
pub use stats::{SequenceMonitor, StatsSnapshot, TimeStats};

/// Rill version string.
pub const VERSION: &str = "0.3.2";
