// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! rill-dashboard - schema-evolution dashboard and sensor playground
//!
//! Three modes over the shared in-process river:
//!
//! - `watch`: runs a dashboard that classifies incoming temperature
//!   samples against three schema generations, with discovery listeners
//!   announcing sensors as they come and go;
//! - `sensors`: runs only the simulated sensors;
//! - `browse`: listener-driven browser printing every thing appearing
//!   on or leaving the river.

use clap::{Parser, Subcommand};
use colored::*;
use rill::schema::{self, classify_temperature};
use rill::{
    DiscoveredThing, Nvp, River, SensorGeneration, ThingDiscoveredListener, ThingLostListener,
    ThingSpec, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Sensor dashboard and discovery browser
#[derive(Parser, Debug)]
#[command(name = "rill-dashboard")]
#[command(version)]
#[command(about = "Watch evolving sensor schemas over the data river")]
struct Args {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the dashboard with a set of simulated sensors
    Watch {
        /// Running time in seconds
        #[arg(short = 'r', long, default_value = "30")]
        running_time: u64,
    },
    /// Run only the simulated sensors
    Sensors {
        /// Sensors per schema generation
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Running time in seconds
        #[arg(short = 'r', long, default_value = "30")]
        running_time: u64,
    },
    /// Print discovered and lost things as they happen
    Browse {
        /// Running time in seconds
        #[arg(short = 'r', long, default_value = "20")]
        running_time: u64,
    },
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    ctrlc::set_handler(move || {
        s.store(true, Ordering::SeqCst);
    })?;

    match args.mode {
        Mode::Watch { running_time } => run_watch(running_time, stop),
        Mode::Sensors {
            count,
            running_time,
        } => run_sensors(count, running_time, stop),
        Mode::Browse { running_time } => run_browse(running_time, stop),
    }
}

// ============================================================================
// Simulated sensors
// ============================================================================

struct SensorPlan {
    id: String,
    generation: SensorGeneration,
    start_delay: Duration,
    lifetime: Option<Duration>,
}

fn sensor_plans(count: usize) -> Vec<SensorPlan> {
    let mut plans = Vec::new();
    for i in 0..count {
        for generation in [
            SensorGeneration::Gen1,
            SensorGeneration::Gen2,
            SensorGeneration::Gen3,
        ] {
            plans.push(SensorPlan {
                id: format!("{}-sensor-{}", generation.to_string().to_lowercase(), i + 1),
                generation,
                start_delay: Duration::from_millis(200 * plans.len() as u64),
                lifetime: None,
            });
        }
    }
    plans
}

/// One worker thread per sensor; each owns its thing exclusively and
/// writes jittered readings until told to stop.
fn spawn_sensor(
    river: &River,
    plan: SensorPlan,
    stop: Arc<AtomicBool>,
    verbose: bool,
) -> thread::JoinHandle<rill::Result<(String, u64)>> {
    let river = river.clone();
    thread::spawn(move || {
        thread::sleep(plan.start_delay);
        if stop.load(Ordering::SeqCst) {
            return Ok((plan.id, 0));
        }

        let (class_id, sensor_schema) = match plan.generation {
            SensorGeneration::Gen1 => (
                "TemperatureSensor:com.naskel.example:v1.0",
                schema::temperature_v1(),
            ),
            SensorGeneration::Gen2 => (
                "TemperatureSensor:com.naskel.example:v2.0",
                schema::temperature_v2(),
            ),
            SensorGeneration::Gen3 => (
                "TemperatureSensor:com.naskel.example:v3.0",
                schema::temperature_v3(),
            ),
        };
        let thing = river.create_thing(
            ThingSpec::new(&plan.id, class_id)
                .description(format!("{} temperature sensor", plan.generation))
                .output("temperature", sensor_schema),
        )?;

        let started = Instant::now();
        let mut written = 0u64;
        while !stop.load(Ordering::SeqCst) {
            if let Some(lifetime) = plan.lifetime {
                if started.elapsed() >= lifetime {
                    break;
                }
            }

            let temperature = 15.0 + fastrand::f32() * 10.0;
            let mut data = vec![Nvp::new("temperature", Value::F32(temperature))];
            if plan.generation == SensorGeneration::Gen3 {
                data.push(Nvp::new(
                    "humidity",
                    Value::F32(30.0 + fastrand::f32() * 40.0),
                ));
            }
            thing.write("temperature", data)?;
            written += 1;
            if verbose {
                println!("{}: wrote {:.1}", plan.id, temperature);
            }

            thread::sleep(Duration::from_millis(400 + fastrand::u64(..200)));
        }

        Ok((plan.id, written))
    })
}

fn run_sensors(
    count: usize,
    running_time: u64,
    stop: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let river = River::new();
    println!("Starting {} sensors per generation", count);

    let handles: Vec<_> = sensor_plans(count)
        .into_iter()
        .map(|plan| spawn_sensor(&river, plan, stop.clone(), true))
        .collect();

    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(running_time) && !stop.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }
    stop.store(true, Ordering::SeqCst);

    for handle in handles {
        let (id, written) = handle.join().expect("sensor thread panicked")?;
        println!("{} wrote {} samples", id, written);
    }
    Ok(())
}

// ============================================================================
// Dashboard
// ============================================================================

struct SensorDiscoveredListener;

impl ThingDiscoveredListener for SensorDiscoveredListener {
    fn notify_thing_discovered(&self, thing: &DiscoveredThing) {
        let class_name = thing.class_id.split(':').next().unwrap_or("");
        if class_name == "TemperatureSensor" {
            println!(
                "{}",
                format!(
                    "New temperature sensor discovered: {} ({})",
                    thing.description, thing.id
                )
                .green()
            );
        } else {
            println!(
                "{}",
                format!(
                    "New incompatible sensor type '{}' discovered ({})",
                    class_name, thing.id
                )
                .dimmed()
            );
        }
    }
}

struct SensorLostListener;

impl ThingLostListener for SensorLostListener {
    fn notify_thing_lost(&self, thing: &DiscoveredThing) {
        let class_name = thing.class_id.split(':').next().unwrap_or("");
        if class_name == "TemperatureSensor" {
            println!(
                "{}",
                format!("Temperature sensor stopped: {} ({})", thing.description, thing.id)
                    .magenta()
            );
        } else {
            println!(
                "{}",
                format!("Other sensor stopped: '{}' ({})", class_name, thing.id).dimmed()
            );
        }
    }
}

fn run_watch(running_time: u64, stop: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let river = River::new();

    let dashboard = river.create_thing(
        ThingSpec::new("dashboard1", "TemperatureDashboard:com.naskel.example:v1.0")
            .description("temperature dashboard")
            .input("temperature"),
    )?;

    let _discovered_guard = river.add_discovered_listener(Arc::new(SensorDiscoveredListener));
    let _lost_guard = river.add_lost_listener(Arc::new(SensorLostListener));

    // One sensor per generation, plus one foreign class to exercise the
    // incompatible branch of the listener.
    let mut handles: Vec<_> = sensor_plans(1)
        .into_iter()
        .map(|plan| spawn_sensor(&river, plan, stop.clone(), false))
        .collect();
    handles.push(spawn_speed_sensor(&river, stop.clone()));

    println!("Temperature Dashboard started");

    let newest = schema::temperature_v3();
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(running_time) && !stop.load(Ordering::SeqCst) {
        river.process_events(Duration::from_millis(10));

        let samples = dashboard.read("temperature", Some(Duration::from_millis(250)))?;
        for sample in samples {
            if !sample.is_alive() {
                continue;
            }
            let Some(reading) = classify_temperature(&newest, &sample) else {
                continue;
            };
            match reading.generation {
                SensorGeneration::Gen3 => println!(
                    "Temperature data received for flow {}({}): {:5.1}, {:5.1}%",
                    sample.flow_id, reading.generation, reading.temperature, reading.humidity
                ),
                _ => println!(
                    "Temperature data received for flow {}({}): {:5.1}",
                    sample.flow_id, reading.generation, reading.temperature
                ),
            }
        }
    }

    stop.store(true, Ordering::SeqCst);
    for handle in handles {
        let _ = handle.join().expect("sensor thread panicked")?;
    }
    // Drain the lost notifications the stopping sensors just queued.
    river.process_events(Duration::from_millis(50));

    println!("Temperature Dashboard stopped");
    Ok(())
}

/// A sensor class the dashboard does not understand.
fn spawn_speed_sensor(
    river: &River,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<rill::Result<(String, u64)>> {
    let river = river.clone();
    thread::spawn(move || {
        let thing = river.create_thing(
            ThingSpec::new("speed-sensor-1", "RotationalSpeedSensor:com.naskel.example:v1.0")
                .description("rotational speed sensor")
                .output(
                    "rotationalSpeed",
                    Arc::new(
                        rill::Schema::new("RotationalSpeed", "com.naskel.example", "v1.0")
                            .tag("speed", rill::ValueKind::U32),
                    ),
                ),
        )?;
        let mut written = 0u64;
        while !stop.load(Ordering::SeqCst) {
            thing.write(
                "rotationalSpeed",
                vec![Nvp::new("speed", Value::U32(1000 + fastrand::u32(..500)))],
            )?;
            written += 1;
            thread::sleep(Duration::from_millis(500));
        }
        Ok(("speed-sensor-1".to_string(), written))
    })
}

// ============================================================================
// Browser
// ============================================================================

struct BrowserDiscoveredListener;

impl ThingDiscoveredListener for BrowserDiscoveredListener {
    fn notify_thing_discovered(&self, thing: &DiscoveredThing) {
        println!(
            "{}",
            format!("New Thing discovered: {} ({})", thing.id, thing.class_id).green()
        );
    }
}

struct BrowserLostListener;

impl ThingLostListener for BrowserLostListener {
    fn notify_thing_lost(&self, thing: &DiscoveredThing) {
        println!(
            "{}",
            format!("Thing lost: {} ({})", thing.id, thing.class_id).magenta()
        );
    }
}

fn run_browse(running_time: u64, stop: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let river = River::new();

    let _discovered_guard = river.add_discovered_listener(Arc::new(BrowserDiscoveredListener));
    let _lost_guard = river.add_lost_listener(Arc::new(BrowserLostListener));

    // Staggered, short-lived sensors so both listener paths fire while
    // the browser is watching.
    let handles: Vec<_> = sensor_plans(1)
        .into_iter()
        .enumerate()
        .map(|(i, mut plan)| {
            plan.start_delay = Duration::from_millis(500 * i as u64);
            plan.lifetime = Some(Duration::from_secs((running_time / 2).max(1)));
            spawn_sensor(&river, plan, stop.clone(), false)
        })
        .collect();

    println!("Thing Browser started");

    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(running_time) && !stop.load(Ordering::SeqCst) {
        river.process_events(Duration::from_millis(100));
    }

    stop.store(true, Ordering::SeqCst);
    for handle in handles {
        let _ = handle.join().expect("sensor thread panicked")?;
    }
    river.process_events(Duration::from_millis(50));

    println!("Thing Browser stopped");
    Ok(())
}
