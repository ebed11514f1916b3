//! Full runs of each puzzle with its default configuration.
#![cfg(not(loom))]

mod util;
use util::{trace_init, within_deadline};

use morel::{bounded_channel, fair_room, ordering, rendezvous, Jitter};

#[test]
fn bounded_channel_defaults() {
    trace_init();
    let config = bounded_channel::Config::default();
    let summary = within_deadline("bounded_channel", {
        let config = config.clone();
        move || bounded_channel::run(&config)
    })
    .expect("default config is valid");

    assert_eq!(summary.recorded(), 800);
    assert_eq!(summary.produced, 400);
    assert_eq!(summary.consumed, 400);
    summary
        .verify(config.operations())
        .expect("channel must balance");
}

#[test]
fn bounded_channel_spin_jitter() {
    trace_init();
    let config = bounded_channel::Config {
        capacity: 2,
        producers: 3,
        consumers: 3,
        iterations: 300,
        jitter: Jitter::Spin { max_exp: 6 },
    };
    let summary = within_deadline("bounded_channel", {
        let config = config.clone();
        move || bounded_channel::run(&config)
    })
    .expect("config is valid");
    summary
        .verify(config.operations())
        .expect("channel must balance");
}

#[test]
fn rendezvous_defaults() {
    trace_init();
    let config = rendezvous::Config::default();
    let summary = within_deadline("rendezvous", {
        let config = config.clone();
        move || rendezvous::run(&config)
    });

    assert_eq!(summary.rounds, 1000);
    assert_eq!(summary.total_actions(), 1000);
    summary
        .verify(config.rounds)
        .expect("every round yields one action");
}

#[test]
fn rendezvous_random_jitter() {
    trace_init();
    let config = rendezvous::Config {
        rounds: 500,
        jitter: Jitter::RandomYield { max: 16 },
        ..Default::default()
    };
    let summary = within_deadline("rendezvous", {
        let config = config.clone();
        move || rendezvous::run(&config)
    });
    summary
        .verify(config.rounds)
        .expect("every round yields one action");
}

#[test]
fn fair_room_defaults() {
    trace_init();
    let config = fair_room::Config::default();
    let summary = within_deadline("fair_room", {
        let config = config.clone();
        move || fair_room::run(&config)
    })
    .expect("default config is valid");

    summary.verify().expect("every visit is accounted for");
    assert_eq!(summary.waiting.total(), 2000);
    assert!(summary.stats.longest_run() <= config.threshold);
}

#[test]
fn fair_room_strict_fairness_fill_capacity() {
    trace_init();
    let config = fair_room::Config {
        threshold: 1,
        wake: fair_room::WakePolicy::FillCapacity,
        jitter: Jitter::RandomYield { max: 8 },
        ..Default::default()
    };
    let summary = within_deadline("fair_room", {
        let config = config.clone();
        move || fair_room::run(&config)
    })
    .expect("config is valid");
    summary.verify().expect("every visit is accounted for");
    assert!(summary.stats.longest_run() <= 1);
}

#[test]
fn ordering_demos() {
    trace_init();
    let (barrier, chain) = within_deadline("ordering", || {
        (
            ordering::barrier(3, &Jitter::RandomYield { max: 8 }),
            ordering::chain(&Jitter::RandomYield { max: 8 }),
        )
    });
    assert_eq!(barrier, ["a", "a", "a", "b", "b", "b"]);
    assert_eq!(chain, ["zero", "one", "two", "three"]);
}
