use std::{
    sync::mpsc::{self, RecvTimeoutError},
    time::Duration,
};

/// Long enough for a default run on a slow, loaded machine. A run that
/// takes longer is assumed to be deadlocked.
pub const DEADLINE: Duration = Duration::from_secs(60);

pub fn trace_init() {
    use tracing_subscriber::filter::{EnvFilter, LevelFilter};
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Runs `f` on its own thread, failing the test if it has not returned
/// within [`DEADLINE`].
#[track_caller]
pub fn within_deadline<T: Send + 'static>(name: &str, f: impl FnOnce() -> T + Send + 'static) -> T {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            let _ = tx.send(f());
        })
        .expect("failed to spawn watchdog thread");
    match rx.recv_timeout(DEADLINE) {
        Ok(res) => res,
        Err(RecvTimeoutError::Timeout) => {
            panic!("{name} did not finish within {DEADLINE:?}, it is probably deadlocked")
        }
        Err(RecvTimeoutError::Disconnected) => panic!("{name} panicked"),
    }
}
