use super::*;
use crate::loom;

fn assert_barrier_order(transcript: &[&str], threads: usize) {
    assert_eq!(transcript.len(), threads * 2);
    let (a, b) = transcript.split_at(threads);
    assert!(a.iter().all(|&s| s == "a"), "transcript: {transcript:?}");
    assert!(b.iter().all(|&s| s == "b"), "transcript: {transcript:?}");
}

#[test]
fn barrier_two_threads() {
    loom::model(|| {
        let transcript = barrier(2, &Jitter::Off);
        assert_barrier_order(&transcript, 2);
    })
}

#[test]
fn chain_is_ordered() {
    loom::model(|| {
        assert_eq!(chain(&Jitter::Off), ["zero", "one", "two", "three"]);
    })
}

#[test]
#[cfg(not(loom))]
fn barrier_many_threads_with_jitter() {
    let _trace = crate::test_util::trace_init();
    for jitter in [Jitter::Off, Jitter::RandomYield { max: 10 }, Jitter::Spin { max_exp: 6 }] {
        for threads in [1, 3, 8] {
            assert_barrier_order(&barrier(threads, &jitter), threads);
        }
    }
}

#[test]
#[cfg(not(loom))]
fn chain_with_jitter() {
    let _trace = crate::test_util::trace_init();
    for _ in 0..32 {
        assert_eq!(
            chain(&Jitter::RandomYield { max: 10 }),
            ["zero", "one", "two", "three"]
        );
    }
}

#[test]
#[should_panic(expected = "at least one thread")]
fn empty_barrier_panics() {
    let _ = barrier(0, &Jitter::Off);
}
