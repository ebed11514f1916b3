//! A bounded channel coordinated with semaphores only.
//!
//! Producers and consumers share a buffer that holds at most `capacity`
//! items. Three [`Semaphore`]s regulate it:
//!
//! - `free` counts empty slots, and starts at `capacity`;
//! - `filled` counts occupied slots, and starts at zero;
//! - `mutex` is a binary semaphore that excludes every other thread while
//!   the occupancy count and histogram are updated.
//!
//! A producer waits on `free` before `mutex`, and a consumer waits on
//! `filled` before `mutex`. Acquiring the capacity semaphore first means a
//! thread never holds the exclusion semaphore while blocked on a full or
//! empty buffer, so the channel cannot deadlock.
//!
//! The items themselves carry no payload; the channel tracks only how many
//! are held, and how often each occupancy level was reached.
use crate::{
    error::{ConfigError, Violation},
    loom::{cell::UnsafeCell, sync::Arc},
    Jitter,
};
use core::fmt;
use morel_sync::{thread, Semaphore};


/// A fixed-capacity channel of payload-free items.
pub struct BoundedChannel {
    capacity: usize,
    free: Semaphore,
    filled: Semaphore,
    mutex: Semaphore,
    tally: UnsafeCell<Tally>,
}

/// Configuration for a [`run`] of the bounded channel simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Items the channel can hold at once.
    pub capacity: usize,
    /// Number of producer threads.
    pub producers: usize,
    /// Number of consumer threads.
    pub consumers: usize,
    /// Items each producer produces, and each consumer consumes.
    pub iterations: usize,
    /// Perturbation applied before every operation.
    pub jitter: Jitter,
}

/// What a [`BoundedChannel`] observed over its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSummary {
    /// The channel's capacity.
    pub capacity: usize,
    /// Items held when the summary was taken.
    pub occupied: usize,
    /// Total items produced.
    pub produced: u64,
    /// Total items consumed.
    pub consumed: u64,
    /// `histogram[n]` is the number of operations after which the channel
    /// held exactly `n` items.
    pub histogram: Vec<u64>,
}

#[derive(Clone, Debug)]
struct Tally {
    occupied: usize,
    produced: u64,
    consumed: u64,
    histogram: Vec<u64>,
}

/// Runs the producer/consumer simulation described by `config`, returning a
/// summary once every thread has been joined.
///
/// # Errors
///
/// Returns a [`ConfigError`] without starting any threads if `config` could
/// never run to completion.
#[tracing::instrument(name = "bounded_channel", level = "info", skip(config), err)]
pub fn run(config: &Config) -> Result<ChannelSummary, ConfigError> {
    config.validate()?;

    let Config {
        capacity,
        producers,
        consumers,
        iterations,
        jitter,
    } = *config;
    tracing::info!(capacity, producers, consumers, iterations, ?jitter, "starting");

    let channel = Arc::new(BoundedChannel::new(capacity));
    let producers = (0..producers)
        .map(|_| {
            let channel = channel.clone();
            thread::spawn("producer", move || {
                for _ in 0..iterations {
                    jitter.perturb();
                    channel.produce();
                }
            })
        })
        .collect::<Vec<_>>();
    let consumers = (0..consumers)
        .map(|_| {
            let channel = channel.clone();
            thread::spawn("consumer", move || {
                for _ in 0..iterations {
                    jitter.perturb();
                    channel.consume();
                }
            })
        })
        .collect::<Vec<_>>();

    for t in producers.into_iter().chain(consumers) {
        t.join();
    }

    let summary = channel.summary();
    tracing::info!(
        produced = summary.produced,
        consumed = summary.consumed,
        "finished"
    );
    Ok(summary)
}

// === impl BoundedChannel ===

impl BoundedChannel {
    /// Returns a new, empty channel that holds at most `capacity` items.
    ///
    /// # Panics
    ///
    /// If `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "a bounded channel must hold at least one item");
        Self {
            capacity,
            free: Semaphore::new(capacity),
            filled: Semaphore::new(0),
            mutex: Semaphore::new(1),
            tally: UnsafeCell::new(Tally {
                occupied: 0,
                produced: 0,
                consumed: 0,
                histogram: vec![0; capacity + 1],
            }),
        }
    }

    /// Adds one item, blocking while the channel is full.
    pub fn produce(&self) {
        self.free.wait();
        let occupied = self.with_tally(|tally| tally.produce(self.capacity));
        tracing::debug!(occupied, "produced");
        self.filled.signal();
    }

    /// Removes one item, blocking while the channel is empty.
    pub fn consume(&self) {
        self.filled.wait();
        let occupied = self.with_tally(Tally::consume);
        tracing::debug!(occupied, "consumed");
        self.free.signal();
    }

    /// Adds one item if there is room, returning `false` instead of blocking
    /// if the channel is full.
    pub fn try_produce(&self) -> bool {
        if !self.free.try_wait() {
            return false;
        }
        let occupied = self.with_tally(|tally| tally.produce(self.capacity));
        tracing::debug!(occupied, "produced");
        self.filled.signal();
        true
    }

    /// Removes one item if there is one, returning `false` instead of
    /// blocking if the channel is empty.
    pub fn try_consume(&self) -> bool {
        if !self.filled.try_wait() {
            return false;
        }
        let occupied = self.with_tally(Tally::consume);
        tracing::debug!(occupied, "consumed");
        self.free.signal();
        true
    }

    /// Returns the most items this channel can hold.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of items currently held.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.with_tally(|tally| tally.occupied)
    }

    /// Returns a snapshot of everything this channel has observed.
    #[must_use]
    pub fn summary(&self) -> ChannelSummary {
        self.with_tally(|tally| ChannelSummary {
            capacity: self.capacity,
            occupied: tally.occupied,
            produced: tally.produced,
            consumed: tally.consumed,
            histogram: tally.histogram.clone(),
        })
    }

    fn with_tally<U>(&self, f: impl FnOnce(&mut Tally) -> U) -> U {
        self.mutex.wait();
        // Safety: `mutex` has a single permit, and we hold it, so no other
        // thread can be inside this closure.
        let res = self.tally.with_mut(|tally| f(unsafe { &mut *tally }));
        self.mutex.signal();
        res
    }
}

// Safety: the tally is only ever accessed through `with_tally`, which holds
// the exclusion semaphore for the duration of the access.
unsafe impl Sync for BoundedChannel {}

impl fmt::Debug for BoundedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedChannel")
            .field("capacity", &self.capacity)
            .field("free", &self.free)
            .field("filled", &self.filled)
            .finish_non_exhaustive()
    }
}

// === impl Tally ===

impl Tally {
    fn produce(&mut self, capacity: usize) -> usize {
        self.occupied += 1;
        assert!(
            self.occupied <= capacity,
            "channel holds {} items, but its capacity is {capacity}",
            self.occupied,
        );
        self.produced += 1;
        self.histogram[self.occupied] += 1;
        self.occupied
    }

    fn consume(&mut self) -> usize {
        assert!(self.occupied > 0, "consumed from an empty channel");
        self.occupied -= 1;
        self.consumed += 1;
        self.histogram[self.occupied] += 1;
        self.occupied
    }
}

// === impl Config ===

impl Config {
    /// Checks that a run with this configuration could finish.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    /// - [`ConfigError::NoThreads`] if there are no producers or no
    ///   consumers.
    /// - [`ConfigError::Unbalanced`] if the producers would produce a
    ///   different total than the consumers would consume.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.producers == 0 {
            return Err(ConfigError::NoThreads { role: "producer" });
        }
        if self.consumers == 0 {
            return Err(ConfigError::NoThreads { role: "consumer" });
        }
        let produced = (self.producers * self.iterations) as u64;
        let consumed = (self.consumers * self.iterations) as u64;
        if produced != consumed {
            return Err(ConfigError::Unbalanced { produced, consumed });
        }
        Ok(())
    }

    /// Returns the number of operations a run of this configuration
    /// performs, which is also the total its histogram should reach.
    #[must_use]
    pub fn operations(&self) -> u64 {
        ((self.producers + self.consumers) * self.iterations) as u64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 10,
            producers: 2,
            consumers: 2,
            iterations: 200,
            jitter: Jitter::Off,
        }
    }
}

// === impl ChannelSummary ===

impl ChannelSummary {
    /// Returns the sum of the occupancy histogram.
    #[must_use]
    pub fn recorded(&self) -> u64 {
        self.histogram.iter().sum()
    }

    /// Checks the summary of a finished run that performed `operations`
    /// produce and consume operations.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] if the totals do not balance.
    pub fn verify(&self, operations: u64) -> Result<(), Violation> {
        if self.produced != self.consumed {
            return Err(Violation::UnbalancedChannel {
                produced: self.produced,
                consumed: self.consumed,
            });
        }
        if self.occupied != 0 {
            return Err(Violation::ItemsLeft {
                occupied: self.occupied,
            });
        }
        let recorded = self.recorded();
        if recorded != operations || recorded != self.produced + self.consumed {
            return Err(Violation::HistogramMismatch {
                histogram: "occupancy",
                recorded,
                expected: operations,
            });
        }
        Ok(())
    }
}

impl fmt::Display for ChannelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "items value histogram:")?;
        for (items, count) in self.histogram.iter().enumerate() {
            writeln!(f, "  items={items}, {count} times")?;
        }
        write!(f, "total: {}", self.recorded())
    }
}
