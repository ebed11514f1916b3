//! Threads of control.
//!
//! This module provides the thread half of the runtime contract: starting a
//! thread ([`spawn`]), waiting for one to finish ([`JoinHandle::join`]), and
//! giving up the rest of the current time slice ([`yield_now`]).
//!
//! Spawned threads inherit the spawning thread's `tracing` dispatcher, and run
//! inside a span named after the role passed to [`spawn`], so that events
//! from concurrently running threads can be told apart.
use crate::loom::thread as imp;
use core::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering::Relaxed},
};

/// An owned permission to join on a thread (block on its termination).
#[must_use = "threads must be joined"]
pub struct JoinHandle<T> {
    inner: imp::JoinHandle<T>,
    name: &'static str,
    num: usize,
}

/// Spawns a new thread running `f`, returning a [`JoinHandle`] for it.
///
/// `name` describes the role the thread plays (e.g. `"producer"`); it is
/// recorded on the thread's `tracing` span along with a sequence number that
/// is unique within the process.
pub fn spawn<F, T>(name: &'static str, f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    static SPAWNED: AtomicUsize = AtomicUsize::new(1);

    let num = SPAWNED.fetch_add(1, Relaxed);
    let dispatch = tracing::dispatcher::get_default(tracing::Dispatch::clone);
    let parent = tracing::Span::current();
    let inner = imp::spawn(move || {
        let _tracing = tracing::dispatcher::set_default(&dispatch);
        let _span = tracing::info_span!(parent: parent, "thread", name, num).entered();

        tracing::trace!("spawned thread");
        let res = f();
        tracing::trace!("thread completed");

        res
    });
    JoinHandle { inner, name, num }
}

/// Cooperatively gives up the current thread's time slice without blocking.
#[inline]
pub fn yield_now() {
    imp::yield_now();
}

// === impl JoinHandle ===

impl<T> JoinHandle<T> {
    /// Blocks until the thread has run to completion, returning the value its
    /// entry point returned.
    ///
    /// # Panics
    ///
    /// If the joined thread panicked, its panic is resumed on the joining
    /// thread. A panic inside a puzzle is an invariant violation, and
    /// surfacing it in the joiner turns it into a process-level failure.
    #[track_caller]
    pub fn join(self) -> T {
        test_debug!(name = self.name, num = self.num, "JoinHandle::join");
        match self.inner.join() {
            Ok(res) => res,
            Err(panic) => {
                tracing::error!(name = self.name, num = self.num, "joined thread panicked");
                std::panic::resume_unwind(panic)
            }
        }
    }

    /// Returns the role name this thread was spawned with.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> fmt::Debug for JoinHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinHandle")
            .field("name", &self.name)
            .field("num", &self.num)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loom;

    #[test]
    fn join_returns_value() {
        loom::model(|| {
            let t = spawn("answer", || 6 * 7);
            assert_eq!(t.name(), "answer");
            assert_eq!(t.join(), 42);
        });
    }

    #[test]
    fn yield_inside_thread() {
        loom::model(|| {
            let t = spawn("yielder", || {
                yield_now();
                "done"
            });
            yield_now();
            assert_eq!(t.join(), "done");
        });
    }

    #[test]
    #[should_panic(expected = "boom")]
    #[cfg(not(loom))]
    fn join_resumes_panic() {
        let t = spawn("doomed", || panic!("boom"));
        t.join();
    }
}
