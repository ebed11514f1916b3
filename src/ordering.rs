//! Forcing a total order on output from several threads.
//!
//! Both demonstrations return the transcript their threads produced, in the
//! order it was produced, rather than printing it; the `ordering` binary
//! prints it.
use crate::{loom::sync::Arc, Jitter};
use morel_sync::{thread, Condvar, Lock};

#[cfg(test)]
mod tests;

/// Runs `threads` threads that each record `"a"`, wait until every thread has
/// done so, and then record `"b"`.
///
/// Every `"a"` in the returned transcript comes before every `"b"`.
///
/// # Panics
///
/// If `threads` is zero.
#[tracing::instrument(level = "info", skip(jitter))]
pub fn barrier(threads: usize, jitter: &Jitter) -> Vec<&'static str> {
    assert!(threads > 0, "a barrier needs at least one thread");

    struct Barrier {
        arrived: usize,
        transcript: Vec<&'static str>,
    }

    let state = Arc::new(Lock::new(Barrier {
        arrived: 0,
        transcript: Vec::with_capacity(threads * 2),
    }));
    let all_arrived = Arc::new(state.condvar());

    let handles = (0..threads)
        .map(|_| {
            let state = state.clone();
            let all_arrived = all_arrived.clone();
            let jitter = *jitter;
            thread::spawn("barrier", move || {
                jitter.perturb();
                let mut barrier = state.lock();
                barrier.transcript.push("a");
                barrier.arrived += 1;
                if barrier.arrived == threads {
                    tracing::debug!("last to arrive");
                    all_arrived.broadcast();
                } else {
                    barrier = all_arrived.wait_while(barrier, |b| b.arrived < threads);
                }
                drop(barrier);

                jitter.perturb();
                state.with_lock(|barrier| barrier.transcript.push("b"));
            })
        })
        .collect::<Vec<_>>();
    for t in handles {
        t.join();
    }

    state.with_lock(|barrier| core::mem::take(&mut barrier.transcript))
}

/// Runs three threads that record `"zero"`, `"one"` and `"two"`, in that
/// order, regardless of the order they are scheduled in. Once all three have
/// been joined, `"three"` is appended.
#[tracing::instrument(level = "info", skip(jitter))]
pub fn chain(jitter: &Jitter) -> Vec<&'static str> {
    #[derive(Default)]
    struct Chain {
        zero_done: bool,
        one_done: bool,
        transcript: Vec<&'static str>,
    }

    struct Links {
        state: Lock<Chain>,
        one_may_go: Condvar,
        two_may_go: Condvar,
    }

    let state = Lock::new(Chain::default());
    let links = Arc::new(Links {
        one_may_go: state.condvar(),
        two_may_go: state.condvar(),
        state,
    });
    let jitter = *jitter;

    // Spawned in reverse, so that without the condition variables the
    // transcript would likely come out backwards.
    let two = thread::spawn("two", {
        let links = links.clone();
        move || {
            jitter.perturb();
            let chain = links.state.lock();
            let mut chain = links.two_may_go.wait_while(chain, |c| !c.one_done);
            chain.transcript.push("two");
        }
    });
    let one = thread::spawn("one", {
        let links = links.clone();
        move || {
            jitter.perturb();
            let chain = links.state.lock();
            let mut chain = links.one_may_go.wait_while(chain, |c| !c.zero_done);
            chain.transcript.push("one");
            chain.one_done = true;
            links.two_may_go.signal();
        }
    });
    let zero = thread::spawn("zero", {
        let links = links.clone();
        move || {
            jitter.perturb();
            let mut chain = links.state.lock();
            chain.transcript.push("zero");
            chain.zero_done = true;
            links.one_may_go.signal();
        }
    });

    for t in [zero, one, two] {
        t.join();
    }

    let mut chain = links.state.lock();
    chain.transcript.push("three");
    core::mem::take(&mut chain.transcript)
}
