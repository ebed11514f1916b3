//! Perturbing thread interleavings.
//!
//! The puzzles call [`Jitter::perturb`] at the points where a real workload
//! would do some work: before producing, while consuming, inside the room and
//! after leaving it. With [`Jitter::Off`] that is a no-op, and the runs are as
//! regular as the scheduler makes them; the other modes burn a little time so
//! that threads collide in more varied orders.
//!
//! Under `cfg(loom)` every mode is a no-op. Loom explores the interleavings
//! itself, and extra yields would only multiply the states it has to visit.
#[cfg(not(loom))]
use morel_sync::{thread, util::Backoff};
#[cfg(not(loom))]
use rand::{Rng, SeedableRng};
#[cfg(not(loom))]
use rand_xoshiro::Xoshiro256PlusPlus;

/// How the puzzles perturb the timing of their threads.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Jitter {
    /// Do nothing.
    #[default]
    Off,
    /// Yield the current thread this many times.
    Yield(u32),
    /// Yield the current thread a random number of times, from zero up to
    /// and including `max`.
    RandomYield {
        /// The largest number of yields.
        max: u32,
    },
    /// Spin for a random number of exponential backoff rounds, from zero up
    /// to and including `max_exp`.
    Spin {
        /// The largest backoff exponent. At most
        /// [`Backoff::MAX_EXPONENT`](morel_sync::util::Backoff::MAX_EXPONENT).
        max_exp: u8,
    },
}

impl Jitter {
    /// Perturbs the calling thread's timing according to this mode.
    #[cfg(not(loom))]
    pub fn perturb(&self) {
        match *self {
            Jitter::Off => {}
            Jitter::Yield(n) => yield_times(n),
            Jitter::RandomYield { max } => yield_times(with_rng(|rng| rng.gen_range(0..=max))),
            Jitter::Spin { max_exp } => {
                let rounds = with_rng(|rng| rng.gen_range(0..=max_exp));
                let mut backoff = Backoff::with_max_exponent(max_exp);
                for _ in 0..rounds {
                    backoff.spin();
                }
            }
        }
    }

    /// Perturbs the calling thread's timing according to this mode.
    #[cfg(loom)]
    #[inline(always)]
    pub fn perturb(&self) {}
}

#[cfg(not(loom))]
fn yield_times(n: u32) {
    for _ in 0..n {
        thread::yield_now();
    }
}

/// Each thread draws from its own generator, seeded from a process-wide
/// counter. Jitter only needs to be irregular, not reproducible.
#[cfg(not(loom))]
fn with_rng<T>(f: impl FnOnce(&mut Xoshiro256PlusPlus) -> T) -> T {
    use core::cell::RefCell;
    use core::sync::atomic::{AtomicU64, Ordering::Relaxed};

    static STREAMS: AtomicU64 = AtomicU64::new(0x6a69_7474_6572);

    std::thread_local! {
        static RNG: RefCell<Xoshiro256PlusPlus> = RefCell::new(
            Xoshiro256PlusPlus::seed_from_u64(STREAMS.fetch_add(0x9e37_79b9_7f4a_7c15, Relaxed))
        );
    }

    RNG.with(|rng| f(&mut rng.borrow_mut()))
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn every_mode_returns() {
        let modes = [
            Jitter::Off,
            Jitter::Yield(3),
            Jitter::RandomYield { max: 5 },
            Jitter::Spin { max_exp: 4 },
        ];
        for mode in modes {
            for _ in 0..16 {
                mode.perturb();
            }
        }
    }

    #[test]
    fn random_draws_stay_in_range() {
        for _ in 0..256 {
            let n = with_rng(|rng| rng.gen_range(0..=7u32));
            assert!(n <= 7);
        }
    }

    #[test]
    #[should_panic]
    fn spin_exponent_is_bounded() {
        Jitter::Spin { max_exp: 17 }.perturb();
    }
}
