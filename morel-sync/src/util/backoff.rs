/// An [exponential backoff] for spin loops.
///
/// This is a helper struct for spinning in a busy loop, with an exponentially
/// increasing number of spins up to a maximum value. The puzzles use it to
/// burn a little time between operations so that threads interleave in less
/// regular patterns.
///
/// [exponential backoff]: https://en.wikipedia.org/wiki/Exponential_backoff
#[derive(Debug, Copy, Clone)]
pub struct Backoff {
    exp: u8,
    max: u8,
}

// === impl Backoff ===

impl Backoff {
    /// The largest exponent accepted by [`Backoff::with_max_exponent()`].
    pub const MAX_EXPONENT: u8 = 16;

    /// Returns a new exponential backoff with the provided max exponent.
    ///
    /// # Panics
    ///
    /// If `max` is greater than [`Self::MAX_EXPONENT`].
    #[must_use]
    pub fn with_max_exponent(max: u8) -> Self {
        assert!(
            max <= Self::MAX_EXPONENT,
            "backoff exponent {max} exceeds the maximum of {}",
            Self::MAX_EXPONENT
        );
        Self { exp: 0, max }
    }

    /// Backs off in a spin loop.
    ///
    /// Each time this function is called, it will issue `2^exp` [spin loop
    /// hints], where `exp` is the current exponent value (starting at 0). If
    /// `exp` is less than the configured maximum exponent, the exponent is
    /// incremented once the spin is complete.
    ///
    /// Under `cfg(loom)`, this yields to the model scheduler instead of
    /// spinning.
    ///
    /// [spin loop hints]: core::hint::spin_loop
    #[inline(always)]
    pub fn spin(&mut self) {
        #[cfg_attr(loom, allow(unused_variables))]
        let spins = 1u32 << self.exp;

        #[cfg(not(loom))]
        for _ in 0..spins {
            crate::loom::hint::spin_loop();
        }

        #[cfg(loom)]
        {
            test_debug!("would back off for {spins} spins");
            loom::thread::yield_now();
        }

        if self.exp < self.max {
            self.exp += 1
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn exponent_saturates_at_max() {
        let mut backoff = Backoff::with_max_exponent(3);
        for _ in 0..10 {
            backoff.spin();
        }
        assert_eq!(backoff.exp, 3);
    }

    #[test]
    #[should_panic]
    fn rejects_huge_exponent() {
        let _ = Backoff::with_max_exponent(Backoff::MAX_EXPONENT + 1);
    }
}
