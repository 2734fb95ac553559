// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rill-roundtrip - round-trip latency benchmark
//!
//! Measures round-trip latency with a ping-pong pattern: the echo side
//! runs on a worker thread over the shared in-process river, and the
//! measuring side reports per-second windows plus an overall aggregate.

use clap::Parser;
use colored::*;
use rill::{run_pong, PingConfig, PingDriver, River, RoundTripReport, ThingSpec};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Round-trip latency benchmark tool
#[derive(Parser, Debug)]
#[command(name = "rill-roundtrip")]
#[command(version)]
#[command(about = "Measure round-trip latency over the data river")]
struct Args {
    /// Payload size in bytes
    #[arg(short = 'p', long, default_value = "0")]
    payload_size: usize,

    /// Number of samples (0 = unlimited)
    #[arg(short = 'n', long, default_value = "0")]
    num_samples: u64,

    /// Running time in seconds (0 = unlimited)
    #[arg(short = 'r', long, default_value = "0")]
    running_time: u64,

    /// Send a termination request to the echo side instead of measuring
    #[arg(short = 'q', long)]
    quit: bool,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1), // interrupted
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<bool, Box<dyn std::error::Error>> {
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    })?;

    let river = River::new();

    // Echo side on a worker thread; it terminates when the measuring
    // side purges its flow or drops its thing.
    let pong_river = river.clone();
    let pong = thread::spawn(move || -> rill::Result<u64> {
        let thing = pong_river.create_thing(
            ThingSpec::new("pongThing1", "Pong:com.naskel.example:v1.0")
                .description("round-trip echo responder")
                .input("Ping")
                .output("Pong", rill::schema::pong()),
        )?;
        eprintln!("# Pong started");
        let echoed = run_pong(&thing, "Ping", "Pong")?;
        eprintln!("# Pong stopped");
        Ok(echoed)
    });

    let config = PingConfig {
        payload_size: args.payload_size,
        num_samples: args.num_samples,
        running_time: args.running_time,
        ..PingConfig::default()
    };
    let driver = PingDriver::new(&river, config, stop)?;

    eprintln!("# Ping started");
    eprintln!(
        "# Parameters: payload size: {} | number of samples: {} | running time: {}",
        args.payload_size, args.num_samples, args.running_time
    );

    let interrupted = if args.quit {
        // Let the echo side finish registering before the marker goes out.
        while river
            .find_thing("pongThing1", "Pong:com.naskel.example:v1.0")
            .is_none()
        {
            thread::sleep(std::time::Duration::from_millis(10));
        }
        driver.send_terminate()?;
        false
    } else {
        run_measurement(driver)?
    };

    let echoed = pong.join().expect("pong thread panicked")?;
    eprintln!("# Pong echoed {} samples", echoed);

    Ok(!interrupted)
}

fn run_measurement(mut driver: PingDriver) -> Result<bool, Box<dyn std::error::Error>> {
    eprintln!("# Waiting for pong to run...");
    eprintln!("# Warming up to stabilise performance...");

    let mut header_shown = false;
    let outcome = driver.run(&mut |report| {
        if !header_shown {
            println!("# Round trip measurements (in us)");
            println!(
                "{}",
                "#             Round trip time [us]         Write-access time [us]       Read-access time [us]"
                    .magenta()
            );
            println!(
                "{}",
                "# Seconds     Count   median      min      Count   median      min      Count   median      min"
                    .magenta()
            );
            header_shown = true;
        }
        print_report(report);
    })?;

    // Driver drop purges the ping flow so the echo side exits.
    drop(driver);
    Ok(outcome.interrupted())
}

fn print_report(report: &RoundTripReport) {
    let line = format!(
        "{:>9}{:>10}{:>9.0}{:>9}{:>11}{:>9.0}{:>9}{:>11}{:>9.0}{:>9}",
        if report.overall {
            "# Overall".to_string()
        } else {
            report.elapsed_seconds.to_string()
        },
        report.round_trip.count,
        report.round_trip.median,
        report.round_trip.min,
        report.write_access.count,
        report.write_access.median,
        report.write_access.min,
        report.read_access.count,
        report.read_access.median,
        report.read_access.min,
    );
    if report.overall {
        println!("{}", line.green());
    } else {
        println!("{}", line);
    }
}
