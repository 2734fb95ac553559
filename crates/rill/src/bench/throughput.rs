// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Throughput measurement: a batch-reading driver with transfer-rate
//! reporting and a burst-paced writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::river::{lookup, Nvp, Result, River, Thing, ThingSpec, Value};
use crate::schema;
use crate::stats::SequenceMonitor;

use super::{BurstScheduler, RunOutcome};

/// bytes/s divided by this gives Mbit/s.
const BYTES_PER_SEC_TO_MEGABITS_PER_SEC: f64 = 125_000.0;

/// Throughput reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub thing_id: String,
    pub thing_class: String,
    /// Inbound data flow.
    pub input_flow: String,
    /// Optional sleep before each batch read; zero disables it.
    pub polling_delay: Duration,
    /// Bound in completed report cycles; 0 = unlimited.
    pub running_time: u64,
    /// Window length between rate reports.
    pub report_window: Duration,
    /// Per-batch read timeout; `None` blocks until data arrives. A
    /// timed-out read is an empty batch, not an error.
    pub read_timeout: Option<Duration>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            thing_id: "throughputReader1".to_string(),
            thing_class: "ThroughputReader:com.naskel.example:v1.0".to_string(),
            input_flow: "Throughput".to_string(),
            polling_delay: Duration::ZERO,
            running_time: 0,
            report_window: Duration::from_secs(1),
            read_timeout: None,
        }
    }
}

/// One transfer-rate report line (rates are since the previous report).
#[derive(Debug, Clone, Copy)]
pub struct TransferRate {
    /// Payload size of the most recent sample.
    pub payload_size: u64,
    pub total_samples: u64,
    pub total_bytes: u64,
    pub out_of_order: u64,
    pub samples_per_sec: f64,
    pub mbit_per_sec: f64,
}

/// Final reader summary over the whole measured run.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferSummary {
    pub samples: u64,
    pub bytes: u64,
    pub out_of_order: u64,
    pub batches: u64,
    pub samples_per_sec: f64,
    pub mbit_per_sec: f64,
    pub avg_batch: u64,
    pub max_batch: u64,
}

/// Throughput reader driver.
pub struct ReaderDriver {
    thing: Thing,
    config: ReaderConfig,
    stop: Arc<AtomicBool>,
}

impl ReaderDriver {
    pub fn new(river: &River, config: ReaderConfig, stop: Arc<AtomicBool>) -> Result<Self> {
        let thing = river.create_thing(
            ThingSpec::new(&config.thing_id, &config.thing_class)
                .description("throughput reader")
                .input(&config.input_flow),
        )?;
        Ok(Self {
            thing,
            config,
            stop,
        })
    }

    /// Read batches until the writer's flow is purged, the running-time
    /// bound is reached, or the stop flag trips.
    ///
    /// Rate lines are delivered through `rate`; the first report window
    /// only establishes the measurement baseline and emits nothing. The
    /// returned summary covers the span from that baseline onward.
    pub fn run(&mut self, rate: &mut dyn FnMut(&TransferRate)) -> Result<(TransferSummary, RunOutcome)> {
        let mut monitor = SequenceMonitor::new();
        let mut sample_count = 0u64;
        let mut bytes_received = 0u64;
        let mut batch_count = 0u64;
        let mut batch_max = 0u64;
        let mut payload_size = 0u64;

        let run_start = Instant::now();
        let mut current_time = run_start;
        let mut start_time = run_start;
        let mut prev_time = run_start;
        let mut prev_count = 0u64;
        let mut prev_bytes = 0u64;
        let mut first_window = true;

        let mut cycles = 0u64;
        let mut flow_closed = false;
        let mut outcome = RunOutcome::Completed;

        while !flow_closed && (self.config.running_time == 0 || cycles < self.config.running_time)
        {
            if self.stop.load(Ordering::SeqCst) {
                outcome = RunOutcome::Interrupted;
                break;
            }

            if !self.config.polling_delay.is_zero() {
                std::thread::sleep(self.config.polling_delay);
            }

            batch_count += 1;
            let batch_start_count = sample_count;

            let samples = self
                .thing
                .read(&self.config.input_flow, self.config.read_timeout)?;
            for sample in samples {
                if sample.is_alive() {
                    if let Some(bytes) = lookup(&sample.data, "sequencedata").and_then(Value::as_bytes)
                    {
                        payload_size = bytes.len() as u64;
                        bytes_received += payload_size + 8; // sequence number field
                    }
                    match lookup(&sample.data, "sequencenumber").and_then(Value::as_u64) {
                        Some(seq) => {
                            sample_count += 1;
                            monitor.observe(seq);
                        }
                        None => log::warn!(
                            "[Throughput] skipping sample on flow {}: no sequence number",
                            sample.flow_id
                        ),
                    }
                } else {
                    log::info!("[Throughput] writer flow purged, stopping reader");
                    flow_closed = true;
                }
            }

            if !flow_closed {
                current_time = Instant::now();
                if current_time.duration_since(prev_time) > self.config.report_window {
                    if first_window {
                        // First boundary only sets the measurement baseline.
                        first_window = false;
                        start_time = current_time;
                    } else {
                        let delta_secs = (current_time.duration_since(prev_time).as_micros() as u64
                            / 1_000_000)
                            .max(1);
                        let delta_bytes = bytes_received - prev_bytes;
                        rate(&TransferRate {
                            payload_size,
                            total_samples: sample_count,
                            total_bytes: bytes_received,
                            out_of_order: monitor.out_of_order(),
                            samples_per_sec: (sample_count - prev_count) as f64 / delta_secs as f64,
                            mbit_per_sec: (delta_bytes as f64 / BYTES_PER_SEC_TO_MEGABITS_PER_SEC)
                                / delta_secs as f64,
                        });
                        cycles += 1;
                    }
                    prev_bytes = bytes_received;
                    prev_count = sample_count;
                    prev_time = current_time;
                }

                let samples_in_batch = sample_count - batch_start_count;
                if samples_in_batch > batch_max {
                    batch_max = samples_in_batch;
                }
            }
        }

        let mut summary = TransferSummary {
            samples: sample_count,
            bytes: bytes_received,
            out_of_order: monitor.out_of_order(),
            batches: batch_count,
            avg_batch: if batch_count > 0 {
                sample_count / batch_count
            } else {
                0
            },
            max_batch: batch_max,
            ..TransferSummary::default()
        };
        let span = current_time.duration_since(start_time).as_secs_f64();
        if span > 0.0 {
            summary.samples_per_sec = sample_count as f64 / span;
            summary.mbit_per_sec =
                (bytes_received as f64 / BYTES_PER_SEC_TO_MEGABITS_PER_SEC) / span;
        }

        Ok((summary, outcome))
    }
}

/// Throughput writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub thing_id: String,
    pub thing_class: String,
    /// Outbound data flow.
    pub output_flow: String,
    /// Reader class polled via discovery before writing starts.
    pub reader_class: String,
    /// Bytes of filler in each sample.
    pub payload_size: usize,
    /// Samples per burst.
    pub burst_size: u64,
    /// Burst window; zero = unbounded rate.
    pub burst_interval: Duration,
    /// Running-time budget in seconds; 0 = unlimited.
    pub running_time: u64,
    /// Discovery poll interval while waiting for a reader.
    pub poll_interval: Duration,
    /// Purge the flow on exit so the reader stops too.
    pub send_terminate: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            thing_id: "throughputWriter1".to_string(),
            thing_class: "ThroughputWriter:com.naskel.example:v1.0".to_string(),
            output_flow: "Throughput".to_string(),
            reader_class: "ThroughputReader:com.naskel.example:v1.0".to_string(),
            payload_size: 4096,
            burst_size: 1,
            burst_interval: Duration::ZERO,
            running_time: 0,
            poll_interval: Duration::from_millis(100),
            send_terminate: true,
        }
    }
}

/// Final writer summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterSummary {
    pub samples: u64,
}

/// Throughput writer driver.
pub struct WriterDriver {
    river: River,
    thing: Thing,
    config: WriterConfig,
    stop: Arc<AtomicBool>,
}

impl WriterDriver {
    pub fn new(river: &River, config: WriterConfig, stop: Arc<AtomicBool>) -> Result<Self> {
        let thing = river.create_thing(
            ThingSpec::new(&config.thing_id, &config.thing_class)
                .description("throughput writer")
                .output(&config.output_flow, schema::throughput()),
        )?;
        Ok(Self {
            river: river.clone(),
            thing,
            config,
            stop,
        })
    }

    /// Wait for a reader, then write burst-paced sequenced samples until
    /// the running-time budget elapses or the stop flag trips.
    ///
    /// Burst pauses are slept through `sleep`, so callers choose the
    /// pacing primitive (plain sleeps, spin sleeps, or a test recorder).
    pub fn run(&mut self, sleep: &mut dyn FnMut(Duration)) -> Result<(WriterSummary, RunOutcome)> {
        if !self.wait_for_reader() {
            return Ok((WriterSummary::default(), RunOutcome::Interrupted));
        }

        let mut data = vec![
            Nvp::new("sequencenumber", Value::U64(0)),
            Nvp::new(
                "sequencedata",
                Value::Bytes(vec![b'a'; self.config.payload_size]),
            ),
        ];

        let mut scheduler = BurstScheduler::new(self.config.burst_size, self.config.burst_interval);
        let start = Instant::now();
        let mut count = 0u64;
        let mut timed_out = false;

        while !self.stop.load(Ordering::SeqCst) && !timed_out {
            data[0].value = Value::U64(count);
            self.thing.write(&self.config.output_flow, data.clone())?;
            count += 1;

            if let Some(pause) = scheduler.pause_needed() {
                sleep(pause);
            }

            if self.config.running_time != 0
                && start.elapsed() >= Duration::from_secs(self.config.running_time)
            {
                timed_out = true;
            }
        }

        if self.config.send_terminate {
            self.thing.purge(&self.config.output_flow)?;
        }

        let outcome = if timed_out {
            RunOutcome::Completed
        } else {
            RunOutcome::Interrupted
        };
        Ok((WriterSummary { samples: count }, outcome))
    }

    /// Poll discovery until a matching reader shows up; false when the
    /// stop flag trips first.
    fn wait_for_reader(&self) -> bool {
        log::info!("[Throughput] waiting for a reader ({})", self.config.reader_class);
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return false;
            }
            if self.river.find_thing("*", &self.config.reader_class).is_some() {
                return true;
            }
            std::thread::sleep(self.config.poll_interval);
        }
    }
}
