//! Reusable utilities for the synchronization primitives.
//!
//! This module exposes the following APIs:
//!
//! - [`Backoff`]: exponential backoff for spin loops

#[cfg(not(any(test, loom)))]
macro_rules! test_debug {
    ($($t:tt)*) => {};
}

#[cfg(any(test, loom))]
macro_rules! test_debug {
    ($($t:tt)*) => { tracing::debug!($($t)*) }
}

#[cfg(not(any(test, loom)))]
macro_rules! test_trace {
    ($($t:tt)*) => {};
}

#[cfg(any(test, loom))]
macro_rules! test_trace {
    ($($t:tt)*) => { tracing::trace!($($t)*) }
}

mod backoff;

pub use self::backoff::Backoff;

#[cfg(test)]
pub(crate) mod test {
    /// A guard that represents the tracing default subscriber guard
    ///
    /// *should* be held until the end of the test, to ensure that tracing messages
    /// actually make it to the fmt subscriber for the entire test.
    #[must_use]
    pub struct TestGuard {
        _x1: tracing::subscriber::DefaultGuard,
    }

    /// Initialize tracing with a default filter directive
    pub(crate) fn trace_init() -> TestGuard {
        trace_init_with_default("morel_sync=debug")
    }

    /// Initialize tracing with the given filter directive
    pub(crate) fn trace_init_with_default(default: &str) -> TestGuard {
        use tracing_subscriber::{
            filter::{EnvFilter, LevelFilter},
            util::SubscriberInitExt,
        };
        const ENV: &str = if cfg!(loom) { "LOOM_LOG" } else { "RUST_LOG" };

        let env = std::env::var(ENV).unwrap_or_default();
        let builder = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into());
        let filter = if env.is_empty() {
            builder.parse_lossy(default)
        } else {
            builder.parse_lossy(env)
        };
        let collector = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_thread_names(true)
            .without_time()
            .finish();

        TestGuard {
            _x1: collector.set_default(),
        }
    }

    pub(crate) fn assert_send_sync<T: Send + Sync>() {}
}
