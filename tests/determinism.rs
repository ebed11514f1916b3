//! Seed-dependent results are the same from run to run, however the threads
//! interleave.
#![cfg(not(loom))]

mod util;
use util::{trace_init, within_deadline};

use morel::{
    fair_room::{self, Side},
    rendezvous, Jitter,
};

#[test]
fn rendezvous_counts_follow_the_seed() {
    trace_init();
    for seed in [1, 0xdead_beef, rendezvous::Config::DEFAULT_SEED] {
        let config = rendezvous::Config {
            rounds: 300,
            seed,
            jitter: Jitter::RandomYield { max: 4 },
        };
        let runs = within_deadline("rendezvous", move || {
            [rendezvous::run(&config), rendezvous::run(&config)]
        });
        assert_eq!(runs[0], runs[1], "seed {seed:#x}");
        runs[0].verify(300).expect("every round yields one action");
    }
}

#[test]
fn room_totals_follow_the_seed() {
    trace_init();
    let config = fair_room::Config {
        people: 10,
        iterations: 40,
        seed: 99,
        jitter: Jitter::RandomYield { max: 4 },
        ..Default::default()
    };
    let runs = within_deadline("fair_room", move || {
        [fair_room::run(&config), fair_room::run(&config)]
    });
    let [first, second] = runs.map(|run| run.expect("config is valid"));

    for side in Side::BOTH {
        assert_eq!(first.people(side), second.people(side));
        assert_eq!(first.stats.admitted(side), second.stats.admitted(side));
        assert_eq!(
            first.stats.admitted(side),
            (first.people(side) * 40) as u64
        );
    }
    first.verify().expect("every visit is accounted for");
    second.verify().expect("every visit is accounted for");
}

#[test]
fn different_seeds_can_differ() {
    let pick = |seed| {
        let mut dispenser = rendezvous::Dispenser::new(seed);
        (0..64).map(|_| dispenser.choose()).collect::<Vec<_>>()
    };
    assert_eq!(pick(5), pick(5));
    assert_ne!(pick(5), pick(6));
}
