// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Round-trip driver integration tests over the in-process river.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rill::{
    run_pong, Error, Nvp, PingConfig, PingDriver, River, RoundTripReport, RunOutcome, ThingSpec,
    Value,
};

/// Config tuned for tests: no warm-up, fast polling, short windows.
fn fast_config() -> PingConfig {
    PingConfig {
        warmup: Duration::ZERO,
        read_timeout: Duration::from_secs(1),
        poll_interval: Duration::from_millis(10),
        report_window: Duration::from_millis(100),
        ..PingConfig::default()
    }
}

fn spawn_pong(river: &River) -> thread::JoinHandle<rill::Result<u64>> {
    let river = river.clone();
    thread::spawn(move || {
        let thing = river
            .create_thing(
                ThingSpec::new("pongThing1", "Pong:com.naskel.example:v1.0")
                    .description("round-trip echo")
                    .input("Ping")
                    .output("Pong", rill::schema::pong()),
            )
            .expect("create pong thing");
        run_pong(&thing, "Ping", "Pong")
    })
}

#[test]
fn test_round_trip_measures_and_reports() {
    let river = River::new();
    let pong = spawn_pong(&river);

    let stop = Arc::new(AtomicBool::new(false));
    let mut driver = PingDriver::new(
        &river,
        PingConfig {
            payload_size: 32,
            num_samples: 10,
            ..fast_config()
        },
        stop,
    )
    .expect("create ping driver");

    let mut reports: Vec<RoundTripReport> = Vec::new();
    let outcome = driver.run(&mut |r| reports.push(*r)).expect("run ping");
    assert_eq!(outcome, RunOutcome::Completed);

    // Last report is the overall aggregate; windows precede it in
    // close order and sum to the overall count.
    let overall = reports.last().expect("at least the overall report");
    assert!(overall.overall);
    assert_eq!(overall.round_trip.count, 10);
    assert_eq!(overall.write_access.count, 10);
    assert_eq!(overall.read_access.count, 10);
    let windowed: usize = reports
        .iter()
        .filter(|r| !r.overall)
        .map(|r| r.round_trip.count)
        .sum();
    assert_eq!(windowed, 10);
    assert!(overall.round_trip.min as f64 <= overall.round_trip.median);
    assert!(overall.round_trip.median <= overall.round_trip.max as f64);

    // Dropping the driver purges its flows; pong terminates cleanly
    // having echoed every measured sample.
    drop(driver);
    let echoed = pong.join().expect("pong thread").expect("pong result");
    assert_eq!(echoed, 10);
}

#[test]
fn test_no_reply_is_fatal() {
    let river = River::new();
    // Peer exists for discovery but never echoes anything.
    let _mute_peer = river
        .create_thing(
            ThingSpec::new("pongThing1", "Pong:com.naskel.example:v1.0").input("Ping"),
        )
        .expect("create mute peer");

    let stop = Arc::new(AtomicBool::new(false));
    let mut driver = PingDriver::new(
        &river,
        PingConfig {
            num_samples: 3,
            read_timeout: Duration::from_millis(50),
            ..fast_config()
        },
        stop,
    )
    .expect("create ping driver");

    match driver.run(&mut |_| {}) {
        Err(Error::ReplyCount(0)) => {}
        other => panic!("expected ReplyCount(0), got {:?}", other),
    }
}

#[test]
fn test_double_reply_is_fatal() {
    let river = River::new();
    let peer = river
        .create_thing(
            ThingSpec::new("pongThing1", "Pong:com.naskel.example:v1.0")
                .output("Pong", rill::schema::pong()),
        )
        .expect("create peer");

    let stop = Arc::new(AtomicBool::new(false));
    let mut driver = PingDriver::new(
        &river,
        PingConfig {
            num_samples: 1,
            ..fast_config()
        },
        stop,
    )
    .expect("create ping driver");

    // Two replies already queued before the first measured read.
    let reply = vec![Nvp::new("payload", Value::Bytes(Vec::new()))];
    peer.write("Pong", reply.clone()).unwrap();
    peer.write("Pong", reply).unwrap();

    match driver.run(&mut |_| {}) {
        Err(Error::ReplyCount(2)) => {}
        other => panic!("expected ReplyCount(2), got {:?}", other),
    }
}

#[test]
fn test_interrupt_still_emits_overall_report() {
    let river = River::new();
    let stop = Arc::new(AtomicBool::new(true));
    let mut driver =
        PingDriver::new(&river, fast_config(), stop).expect("create ping driver");

    let mut reports: Vec<RoundTripReport> = Vec::new();
    let outcome = driver.run(&mut |r| reports.push(*r)).expect("run ping");

    assert_eq!(outcome, RunOutcome::Interrupted);
    assert_eq!(reports.len(), 1);
    assert!(reports[0].overall);
    assert_eq!(reports[0].round_trip.count, 0);
}

#[test]
fn test_send_terminate_stops_pong() {
    let river = River::new();
    let pong = spawn_pong(&river);

    let stop = Arc::new(AtomicBool::new(false));
    let driver =
        PingDriver::new(&river, fast_config(), stop).expect("create ping driver");

    // The marker must not race the pong thing's subscription.
    while river
        .find_thing("pongThing1", "Pong:com.naskel.example:v1.0")
        .is_none()
    {
        thread::sleep(Duration::from_millis(5));
    }
    driver.send_terminate().expect("send terminate");

    let echoed = pong.join().expect("pong thread").expect("pong result");
    assert_eq!(echoed, 0);
}
