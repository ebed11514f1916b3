use super::*;
use crate::loom;

#[test]
fn third_and_others() {
    use Resource::*;
    assert_eq!(Resource::third(Match, Paper), Tobacco);
    assert_eq!(Resource::third(Tobacco, Match), Paper);
    assert_eq!(Resource::third(Paper, Tobacco), Match);
    for resource in Resource::ALL {
        let [a, b] = resource.others();
        assert_ne!(a, resource);
        assert_ne!(b, resource);
        assert_eq!(Resource::third(a, b), resource);
    }
}

#[test]
#[should_panic(expected = "two different resources")]
fn third_of_a_non_pair_panics() {
    let _ = Resource::third(Resource::Paper, Resource::Paper);
}

#[test]
fn one_round_reaches_the_right_consumer() {
    // Only the two watchers and the consumer involved in the round are
    // spawned, which keeps the model within loom's thread limit.
    loom::model(|| {
        let rendezvous = Arc::new(Rendezvous::new());
        let watchers = [Resource::Match, Resource::Paper].map(|resource| {
            let rendezvous = rendezvous.clone();
            thread::spawn("watcher", move || rendezvous.watch(resource))
        });
        let consumer = thread::spawn("consumer", {
            let rendezvous = rendezvous.clone();
            move || rendezvous.serve(Resource::Tobacco, &Jitter::Off)
        });

        rendezvous.dispense((Resource::Match, Resource::Paper));
        rendezvous.close();

        for watcher in watchers {
            watcher.join();
        }
        assert_eq!(consumer.join(), 1);

        let summary = rendezvous.summary();
        assert_eq!(summary.rounds, 1);
        assert_eq!(summary.actions(Resource::Tobacco), 1);
        assert_eq!(summary.announced(Resource::Tobacco), 1);
        summary.verify(1).expect("one round, one action");
    })
}

#[test]
fn close_releases_idle_roles() {
    loom::model(|| {
        let rendezvous = Arc::new(Rendezvous::new());
        let watcher = thread::spawn("watcher", {
            let rendezvous = rendezvous.clone();
            move || rendezvous.watch(Resource::Paper)
        });
        let consumer = thread::spawn("consumer", {
            let rendezvous = rendezvous.clone();
            move || rendezvous.serve(Resource::Match, &Jitter::Off)
        });

        rendezvous.close();
        watcher.join();
        assert_eq!(consumer.join(), 0);
        assert_eq!(rendezvous.summary().rounds, 0);
    })
}

#[test]
#[cfg(not(loom))]
fn hundred_rounds_hundred_actions() {
    let _trace = crate::test_util::trace_init();
    let config = Config {
        rounds: 100,
        ..Config::default()
    };
    let summary = run(&config);
    assert_eq!(summary.rounds, 100);
    assert_eq!(summary.total_actions(), 100);
    summary.verify(100).expect("every round yields one action");
}

#[test]
#[cfg(not(loom))]
fn default_run_with_jitter() {
    let _trace = crate::test_util::trace_init();
    let config = Config {
        jitter: Jitter::RandomYield { max: 4 },
        ..Config::default()
    };
    let summary = run(&config);
    summary.verify(config.rounds).expect("every round yields one action");
}

#[test]
#[cfg(not(loom))]
fn same_seed_same_counts() {
    let config = Config {
        rounds: 200,
        seed: 7,
        jitter: Jitter::Yield(1),
    };
    let first = run(&config);
    let second = run(&config);
    assert_eq!(first, second);

    let mut dispenser = Dispenser::new(7);
    let mut expected = [0u64; 3];
    for _ in 0..200 {
        let (a, b) = dispenser.choose();
        expected[Resource::third(a, b).index()] += 1;
    }
    for resource in Resource::ALL {
        assert_eq!(first.actions(resource), expected[resource.index()]);
    }
}

#[test]
fn dispenser_uses_every_pair() {
    let mut dispenser = Dispenser::new(Config::DEFAULT_SEED);
    let mut seen = [false; 3];
    for _ in 0..100 {
        let (a, b) = dispenser.choose();
        assert_ne!(a, b);
        seen[Resource::third(a, b).index()] = true;
    }
    assert_eq!(seen, [true; 3]);
}

#[test]
fn verify_reports_mismatches() {
    let summary = RendezvousSummary {
        rounds: 3,
        announced: [1, 1, 1],
        actions: [2, 0, 1],
    };
    assert_eq!(
        summary.verify(3),
        Err(Violation::RoundMismatch {
            resource: Resource::Match,
            announced: 1,
            acted: 2,
        })
    );

    let summary = RendezvousSummary {
        rounds: 2,
        announced: [1, 1, 0],
        actions: [1, 1, 0],
    };
    assert_eq!(
        summary.verify(3),
        Err(Violation::RoundCount {
            expected: 3,
            rounds: 2,
            actions: 2,
        })
    );
}
