//! Errors reported by the puzzle simulations.
//!
//! Breaches of a puzzle's safety invariant that are observed *inside* a
//! critical section are assertion panics, since no thread can sensibly
//! continue once the shared state is known to be inconsistent. The types in
//! this module cover the two remaining failure modes: a configuration that
//! could never complete, and end-of-run accounting that does not balance.
use crate::{fair_room::Side, rendezvous::Resource};

/// A simulation configuration that was rejected before any thread started.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A room or channel was configured to hold nothing.
    #[error("capacity must be at least 1")]
    ZeroCapacity,

    /// The fair room's fairness threshold was zero.
    #[error("fairness threshold must be at least 1")]
    ZeroThreshold,

    /// A simulation was configured with no threads for a role it needs.
    #[error("at least one {role} is required")]
    NoThreads {
        /// The role that has no threads.
        role: &'static str,
    },

    /// The channel's producers would produce a different number of items
    /// than its consumers would consume, so some thread would block forever.
    #[error(
        "producers would produce {produced} items, but consumers would consume {consumed}; \
        the run could never finish"
    )]
    Unbalanced {
        /// Total items the producers would produce.
        produced: u64,
        /// Total items the consumers would consume.
        consumed: u64,
    },
}

/// End-of-run accounting that does not balance.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Violation {
    /// A histogram recorded a different number of events than were
    /// performed.
    #[error("{histogram} histogram recorded {recorded} events, but {expected} were performed")]
    HistogramMismatch {
        /// Which histogram is out of balance.
        histogram: &'static str,
        /// The histogram's total.
        recorded: u64,
        /// The number of events that were performed.
        expected: u64,
    },

    /// The channel's producers and consumers did not move the same number
    /// of items.
    #[error("{produced} items were produced, but {consumed} were consumed")]
    UnbalancedChannel {
        /// Items produced.
        produced: u64,
        /// Items consumed.
        consumed: u64,
    },

    /// Items were still in the channel once every thread had finished.
    #[error("{occupied} items were left in the channel")]
    ItemsLeft {
        /// Items left over.
        occupied: usize,
    },

    /// A rendezvous consumer acted a different number of times than its
    /// resource was missing from the table.
    #[error("{resource} was missing in {announced} rounds, but its consumer acted {acted} times")]
    RoundMismatch {
        /// The resource held by the consumer in question.
        resource: Resource,
        /// Rounds in which that resource was the missing one.
        announced: u64,
        /// Actions the consumer performed.
        acted: u64,
    },

    /// The rendezvous completed a different number of rounds, or saw a
    /// different number of actions, than it was configured for.
    #[error("expected {expected} rounds, but {rounds} rounds completed with {actions} actions")]
    RoundCount {
        /// Configured rounds.
        expected: u64,
        /// Rounds the dispenser completed.
        rounds: u64,
        /// Total consumer actions.
        actions: u64,
    },

    /// The room admitted a different number of visits on one side than the
    /// people on that side made.
    #[error("room admitted {admitted} {side} endian visits, but {expected} were made")]
    VisitCount {
        /// The side in question.
        side: Side,
        /// Visits the room admitted on that side.
        admitted: u64,
        /// Visits that people on that side made.
        expected: u64,
    },

    /// Someone was still inside the room once every thread had finished.
    #[error("{occupancy} people were still inside the room")]
    RoomOccupied {
        /// Occupancy after every thread was joined.
        occupancy: usize,
    },

    /// The room admitted one side more times in a row, while the other side
    /// waited, than its fairness threshold allows.
    #[error("room admitted {run} visits in a row while the other side waited (threshold {threshold})")]
    UnfairRun {
        /// The longest run of admissions.
        run: usize,
        /// The room's fairness threshold.
        threshold: usize,
    },
}
