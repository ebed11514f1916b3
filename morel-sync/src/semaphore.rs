//! A blocking [counting semaphore].
//!
//! See the [`Semaphore`] type's documentation for details.
//!
//! [counting semaphore]: https://en.wikipedia.org/wiki/Semaphore_(programming)
use crate::{Condvar, Lock};
use core::fmt;


/// A blocking [counting semaphore].
///
/// A semaphore holds a count of _permits_. [`wait`] (also known as
/// _acquire_, _down_, or _P_) blocks the calling thread while the count is
/// zero, then decrements it. [`signal`] (also known as _release_, _up_, or
/// _V_) increments the count and wakes one blocked waiter, if there is one.
///
/// A semaphore created with one permit and only ever waited on before being
/// signaled by the same thread behaves as a binary mutual exclusion lock.
/// A semaphore created with zero permits can be used by one thread to wait
/// for events that are signaled by another.
///
/// This semaphore is built from a [`Lock`] protecting the permit count and a
/// [`Condvar`] bound to that lock.
///
/// # Fairness
///
/// This semaphore is *not* fair: a thread calling [`wait`] while permits
/// are available may take one ahead of a thread that has been blocked for
/// longer.
///
/// # Examples
///
/// Waiting for a fixed number of threads to finish:
///
/// ```
/// use morel_sync::{thread, Semaphore};
/// use std::sync::Arc;
///
/// const THREADS: usize = 4;
///
/// let done = Arc::new(Semaphore::new(0));
/// let threads = (0..THREADS)
///     .map(|_| {
///         let done = done.clone();
///         thread::spawn("worker", move || {
///             // do some work...
///             done.signal();
///         })
///     })
///     .collect::<Vec<_>>();
///
/// for _ in 0..THREADS {
///     done.wait();
/// }
/// assert_eq!(done.available_permits(), 0);
/// # for t in threads { t.join() }
/// ```
///
/// [counting semaphore]: https://en.wikipedia.org/wiki/Semaphore_(programming)
/// [`wait`]: Semaphore::wait
/// [`signal`]: Semaphore::signal
pub struct Semaphore {
    permits: Lock<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Returns a new `Semaphore` with `permits` permits available.
    #[must_use]
    pub fn new(permits: usize) -> Self {
        let permits = Lock::new(permits);
        let available = permits.condvar();
        Self { permits, available }
    }

    /// Takes one permit from the semaphore, blocking the current thread until
    /// one is available.
    pub fn wait(&self) {
        let mut permits = self.available.wait_while(self.permits.lock(), |permits| {
            test_trace!(permits = *permits, "Semaphore::wait");
            *permits == 0
        });
        *permits -= 1;
        test_trace!(permits = *permits, "Semaphore::wait -> acquired");
    }

    /// Attempts to take one permit without blocking.
    ///
    /// Returns `true` if a permit was taken, or `false` if the semaphore had
    /// no permits available.
    #[must_use]
    pub fn try_wait(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Returns one permit to the semaphore, waking a blocked waiter if there
    /// is one.
    ///
    /// # Panics
    ///
    /// If the permit count would overflow a `usize`.
    pub fn signal(&self) {
        let mut permits = self.permits.lock();
        *permits = permits
            .checked_add(1)
            .expect("semaphore permit count overflowed");
        test_trace!(permits = *permits, "Semaphore::signal");
        drop(permits);
        self.available.signal();
    }

    /// Returns the number of permits currently available.
    ///
    /// The count may change as soon as this method returns; it is only useful
    /// for diagnostics and for tests where every other thread is quiescent.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        *self.permits.lock()
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("permits", &self.permits)
            .finish_non_exhaustive()
    }
}
