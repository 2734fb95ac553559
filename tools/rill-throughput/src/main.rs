// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rill-throughput - throughput benchmark
//!
//! A burst-paced writer on a worker thread feeds a batch-reading
//! measurement loop in the main thread over the shared in-process
//! river. The reader prints a transfer-rate line per window and a
//! final summary.

use clap::Parser;
use rill::{
    ReaderConfig, ReaderDriver, River, TransferRate, TransferSummary, WriterConfig, WriterDriver,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Throughput benchmark tool
#[derive(Parser, Debug)]
#[command(name = "rill-throughput")]
#[command(version)]
#[command(about = "Measure obtainable throughput over the data river")]
struct Args {
    /// Payload size in bytes
    #[arg(short = 'p', long, default_value = "4096")]
    payload_size: usize,

    /// Samples per burst
    #[arg(short = 'b', long, default_value = "100")]
    burst_size: u64,

    /// Burst interval in milliseconds (0 = unbounded rate)
    #[arg(short = 'i', long, default_value = "100")]
    burst_interval: u64,

    /// Running time in seconds (0 = unlimited)
    #[arg(short = 'r', long, default_value = "0")]
    running_time: u64,

    /// Reader polling delay in milliseconds (0 = none)
    #[arg(short = 'd', long, default_value = "0")]
    polling_delay: u64,

    /// Keep the flow open on writer exit (the reader then only stops
    /// on its own bounds or an interrupt)
    #[arg(long)]
    no_terminate: bool,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    })?;

    println!(
        "payloadSize: {} | burstInterval: {} | burstSize: {} | runningTime: {} | pollingDelay: {}",
        args.payload_size, args.burst_interval, args.burst_size, args.running_time,
        args.polling_delay
    );

    let river = River::new();

    let mut reader = ReaderDriver::new(
        &river,
        ReaderConfig {
            polling_delay: Duration::from_millis(args.polling_delay),
            running_time: args.running_time,
            // Without the terminate marker the reader must wake up on
            // its own to notice an interrupt.
            read_timeout: if args.no_terminate {
                Some(Duration::from_secs(1))
            } else {
                None
            },
            ..ReaderConfig::default()
        },
        stop.clone(),
    )?;
    println!("Throughput reader started");

    let mut writer = WriterDriver::new(
        &river,
        WriterConfig {
            payload_size: args.payload_size,
            burst_size: args.burst_size,
            burst_interval: Duration::from_millis(args.burst_interval),
            running_time: args.running_time,
            send_terminate: !args.no_terminate,
            ..WriterConfig::default()
        },
        stop.clone(),
    )?;
    println!("Throughput writer started");

    let writer_handle = thread::spawn(move || writer.run(&mut |pause| spin_sleep::sleep(pause)));

    println!("Waiting for samples...");
    let (summary, reader_outcome) = reader.run(&mut print_rate)?;

    let (writer_summary, writer_outcome) = writer_handle
        .join()
        .expect("writer thread panicked")?;

    if writer_outcome.interrupted() {
        println!("Terminated: {} samples written", writer_summary.samples);
    } else {
        println!("Timed out: {} samples written", writer_summary.samples);
    }

    print_summary(&summary);

    if reader_outcome.interrupted() || writer_outcome.interrupted() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_rate(rate: &TransferRate) {
    println!(
        "Payload size: {} | Total: {:>9} samples, {:>12} bytes | Out of order: {:>6} samples | \
         Transfer rate: {:>7.0} samples/s, {:>9.2} Mbit/s",
        rate.payload_size,
        rate.total_samples,
        rate.total_bytes,
        rate.out_of_order,
        rate.samples_per_sec,
        rate.mbit_per_sec
    );
}

fn print_summary(summary: &TransferSummary) {
    if summary.batches == 0 {
        return;
    }
    println!();
    println!(
        "Total received: {} samples, {} bytes",
        summary.samples, summary.bytes
    );
    println!("Out of order: {} samples", summary.out_of_order);
    println!(
        "Average transfer rate: {:.0} samples/s, {:.2} Mbit/s",
        summary.samples_per_sec, summary.mbit_per_sec
    );
    println!(
        "Average sample-count per batch: {}, maximum batch-size: {}",
        summary.avg_batch, summary.max_batch
    );
}
