// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Round-trip latency measurement: the ping driver and the pong echo
//! loop.
//!
//! The ping side walks through waiting-for-peer, warm-up, and measuring
//! phases, tracking three quantities per iteration: write-access time,
//! read-access time, and the full round trip. Each quantity feeds a
//! windowed accumulator (reset at every report) and an overall
//! accumulator (reset never).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::river::{Error, Nvp, NvpSeq, Result, River, Thing, ThingSpec, Value};
use crate::schema;
use crate::stats::{StatsSnapshot, TimeStats};

use super::RunOutcome;

/// Round-trip driver configuration.
///
/// The zero values of `num_samples` and `running_time` mean unlimited.
#[derive(Debug, Clone)]
pub struct PingConfig {
    /// Bytes of filler in each request payload.
    pub payload_size: usize,
    /// Measurement iterations; 0 = unlimited.
    pub num_samples: u64,
    /// Running-time bound in whole report windows; 0 = unlimited.
    pub running_time: u64,
    /// Identity of the driver's own thing.
    pub thing_id: String,
    pub thing_class: String,
    /// Peer identity polled via discovery before measuring starts.
    pub peer_id: String,
    pub peer_class: String,
    /// Outbound request flow.
    pub request_flow: String,
    /// Inbound reply flow.
    pub reply_flow: String,
    /// Transport stabilization period before measurement.
    pub warmup: Duration,
    /// Bounded timeout for each reply read.
    pub read_timeout: Duration,
    /// Discovery poll interval while waiting for the peer.
    pub poll_interval: Duration,
    /// Window length between reports.
    pub report_window: Duration,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            payload_size: 0,
            num_samples: 0,
            running_time: 0,
            thing_id: "pingThing1".to_string(),
            thing_class: "Ping:com.naskel.example:v1.0".to_string(),
            peer_id: "pongThing1".to_string(),
            peer_class: "Pong:com.naskel.example:v1.0".to_string(),
            request_flow: "Ping".to_string(),
            reply_flow: "Pong".to_string(),
            warmup: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            report_window: Duration::from_secs(1),
        }
    }
}

/// One emitted report line: either a closed window or the final overall
/// aggregates.
#[derive(Debug, Clone, Copy)]
pub struct RoundTripReport {
    /// Report ordinal (window count so far); 0 for the overall report.
    pub elapsed_seconds: u64,
    /// True for the final never-reset aggregates.
    pub overall: bool,
    pub round_trip: StatsSnapshot,
    pub write_access: StatsSnapshot,
    pub read_access: StatsSnapshot,
}

/// The three tracked quantities as one unit, so window and overall
/// variants reset and snapshot together.
#[derive(Default)]
struct QuantitySet {
    round_trip: TimeStats,
    write_access: TimeStats,
    read_access: TimeStats,
}

impl QuantitySet {
    fn record(&mut self, write_access: Duration, read_access: Duration, round_trip: Duration) {
        self.write_access.record_duration(write_access);
        self.read_access.record_duration(read_access);
        self.round_trip.record_duration(round_trip);
    }

    fn reset(&mut self) {
        self.round_trip.reset();
        self.write_access.reset();
        self.read_access.reset();
    }

    fn report(&self, elapsed_seconds: u64, overall: bool) -> RoundTripReport {
        RoundTripReport {
            elapsed_seconds,
            overall,
            round_trip: self.round_trip.snapshot(),
            write_access: self.write_access.snapshot(),
            read_access: self.read_access.snapshot(),
        }
    }
}

/// Round-trip measurement driver (the ping side).
pub struct PingDriver {
    river: River,
    thing: Thing,
    config: PingConfig,
    stop: Arc<AtomicBool>,
    window: QuantitySet,
    overall: QuantitySet,
}

impl PingDriver {
    /// Create the driver and register its thing on the river.
    pub fn new(river: &River, config: PingConfig, stop: Arc<AtomicBool>) -> Result<Self> {
        let thing = river.create_thing(
            ThingSpec::new(&config.thing_id, &config.thing_class)
                .description("round-trip initiator")
                .output(&config.request_flow, schema::ping())
                .input(&config.reply_flow),
        )?;
        Ok(Self {
            river: river.clone(),
            thing,
            config,
            stop,
            window: QuantitySet::default(),
            overall: QuantitySet::default(),
        })
    }

    /// Purge the request flow so a running pong terminates.
    pub fn send_terminate(&self) -> Result<()> {
        log::info!("[RoundTrip] sending termination request");
        self.thing.purge(&self.config.request_flow)?;
        // Give the echo side time to drain the marker before we vanish.
        std::thread::sleep(Duration::from_secs(1));
        Ok(())
    }

    /// Run the full measurement: wait for the peer, warm up, measure,
    /// report.
    ///
    /// Window reports and the final overall report are delivered through
    /// `report` in window-close order. The overall report is emitted even
    /// when the stop flag interrupts the run; a reply-count mismatch is
    /// fatal and returns the error immediately.
    pub fn run(&mut self, report: &mut dyn FnMut(&RoundTripReport)) -> Result<RunOutcome> {
        if !self.wait_for_peer() {
            report(&self.overall.report(0, true));
            return Ok(RunOutcome::Interrupted);
        }

        let payload = vec![Nvp::new(
            "payload",
            Value::Bytes(vec![b'a'; self.config.payload_size]),
        )];

        if !self.warm_up(&payload)? {
            report(&self.overall.report(0, true));
            return Ok(RunOutcome::Interrupted);
        }

        let outcome = self.measure(&payload, report)?;
        report(&self.overall.report(0, true));
        Ok(outcome)
    }

    /// Poll discovery until the pong thing shows up. No timeout: this
    /// blocks indefinitely unless the stop flag trips (returns false).
    fn wait_for_peer(&self) -> bool {
        log::info!(
            "[RoundTrip] waiting for {} ({})",
            self.config.peer_id,
            self.config.peer_class
        );
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return false;
            }
            if self
                .river
                .find_thing(&self.config.peer_id, &self.config.peer_class)
                .is_some()
            {
                return true;
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }

    /// Fixed wall-clock warm-up: write and read, discarding results, to
    /// let the transport stabilize.
    fn warm_up(&self, payload: &NvpSeq) -> Result<bool> {
        let start = Instant::now();
        while start.elapsed() < self.config.warmup {
            if self.stop.load(Ordering::SeqCst) {
                return Ok(false);
            }
            self.thing.write(&self.config.request_flow, payload.clone())?;
            let _ = self
                .thing
                .read(&self.config.reply_flow, Some(self.config.read_timeout))?;
        }
        Ok(true)
    }

    fn measure(
        &mut self,
        payload: &NvpSeq,
        report: &mut dyn FnMut(&RoundTripReport),
    ) -> Result<RunOutcome> {
        let mut window_start = Instant::now();
        let mut elapsed_seconds = 0u64;
        let mut outcome = RunOutcome::Completed;

        let mut i = 0u64;
        while self.config.num_samples == 0 || i < self.config.num_samples {
            if self.stop.load(Ordering::SeqCst) {
                outcome = RunOutcome::Interrupted;
                break;
            }

            let pre_write = Instant::now();
            self.thing.write(&self.config.request_flow, payload.clone())?;
            let post_write = Instant::now();

            let pre_read = Instant::now();
            let replies = self
                .thing
                .read(&self.config.reply_flow, Some(self.config.read_timeout))?;
            let post_read = Instant::now();

            // Exactly one echo per request; anything else ends the run.
            if replies.len() != 1 {
                return Err(Error::ReplyCount(replies.len()));
            }

            let write_access = post_write.duration_since(pre_write);
            let read_access = post_read.duration_since(pre_read);
            let round_trip = post_read.duration_since(pre_write);
            self.window.record(write_access, read_access, round_trip);
            self.overall.record(write_access, read_access, round_trip);

            if window_start.elapsed() > self.config.report_window {
                elapsed_seconds += 1;
                report(&self.window.report(elapsed_seconds, false));
                self.window.reset();
                window_start = Instant::now();

                if self.config.running_time > 0 && elapsed_seconds >= self.config.running_time {
                    break;
                }
            }

            i += 1;
        }

        // Flush a partial window so the last samples are not silent.
        if self.window.round_trip.count() > 0 {
            elapsed_seconds += 1;
            report(&self.window.report(elapsed_seconds, false));
            self.window.reset();
        }

        Ok(outcome)
    }
}

/// The pong side: echo every alive sample back unchanged; a purged flow
/// terminates the loop. Returns the echo count.
///
/// No statistics are kept here. The loop only ends through the terminal
/// marker, which the ping side emits explicitly (`send_terminate`) or
/// implicitly when its thing drops.
pub fn run_pong(thing: &Thing, request_flow: &str, reply_flow: &str) -> Result<u64> {
    let mut echoed = 0u64;
    loop {
        let samples = thing.read(request_flow, None)?;
        for sample in samples {
            if !sample.is_alive() {
                log::info!("[RoundTrip] termination request received");
                return Ok(echoed);
            }
            thing.write(reply_flow, sample.data)?;
            echoed += 1;
        }
    }
}
