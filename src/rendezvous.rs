//! A three-way resource rendezvous (the "cigarette smokers" problem).
//!
//! There are three kinds of [`Resource`]. Each of three consumers holds an
//! unlimited supply of one kind, and can act only with one unit each of the
//! other two. A dispenser puts two different resources on the table per
//! round, without saying which consumer they are meant for.
//!
//! The consumers cannot simply grab what they need: if the match consumer
//! picks up the paper meant for the tobacco consumer, and the tobacco consumer
//! picks up the match, nobody can act and the round is lost. Instead, one
//! *watcher* per resource kind takes the resource when it is offered and marks
//! it available. Whichever watcher completes a pair authorizes the single
//! consumer that holds the third kind, waits for it to act, and then tells the
//! dispenser that the round is over.
//!
//! All of the flags involved live in one table behind one [`Lock`], and every
//! hand-off has its own [`Condvar`] bound to that lock.
use crate::{error::Violation, loom::sync::Arc, Jitter};
use core::fmt;
use morel_sync::{thread, Condvar, Lock};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

#[cfg(test)]
mod tests;

/// One of the three kinds of resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    /// Matches.
    Match,
    /// Rolling paper.
    Paper,
    /// Tobacco.
    Tobacco,
}

/// The coordinator shared by the dispenser, the watchers and the consumers.
#[derive(Debug)]
pub struct Rendezvous {
    table: Lock<Table>,
    /// Dispenser to watcher: your resource is on the table.
    offered: [Condvar; 3],
    /// Watcher to consumer: both of the resources you need are available.
    may_act: [Condvar; 3],
    /// Consumer to watcher.
    acted: Condvar,
    /// Watcher to dispenser.
    round_complete: Condvar,
}

/// Configuration for a [`run`] of the rendezvous simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Rounds the dispenser runs.
    pub rounds: u64,
    /// Seed for the dispenser's choice of resources.
    pub seed: u64,
    /// Perturbation applied while each consumer acts.
    pub jitter: Jitter,
}

/// Chooses which two resources go on the table each round.
#[derive(Clone, Debug)]
pub struct Dispenser {
    rng: Xoshiro256PlusPlus,
}

/// What a [`Rendezvous`] observed over its lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendezvousSummary {
    /// Rounds the dispenser completed.
    pub rounds: u64,
    announced: [u64; 3],
    actions: [u64; 3],
}

#[derive(Debug, Default)]
struct Table {
    offered: [bool; 3],
    available: [bool; 3],
    may_act: [bool; 3],
    acted: bool,
    round_complete: bool,
    closed: bool,
    announced: [u64; 3],
    actions: [u64; 3],
    rounds: u64,
}

/// Runs the dispenser for `config.rounds` rounds against three watchers and
/// three consumers, returning a summary once every thread has been joined.
#[tracing::instrument(name = "rendezvous", level = "info", skip(config))]
pub fn run(config: &Config) -> RendezvousSummary {
    let Config {
        rounds,
        seed,
        jitter,
    } = *config;
    tracing::info!(rounds, seed, ?jitter, "starting");

    let rendezvous = Arc::new(Rendezvous::new());
    let consumers = Resource::ALL.map(|resource| {
        let rendezvous = rendezvous.clone();
        thread::spawn("consumer", move || {
            (resource, rendezvous.serve(resource, &jitter))
        })
    });
    let watchers = Resource::ALL.map(|resource| {
        let rendezvous = rendezvous.clone();
        thread::spawn("watcher", move || rendezvous.watch(resource))
    });
    let dispenser = thread::spawn("dispenser", {
        let rendezvous = rendezvous.clone();
        move || {
            let mut dispenser = Dispenser::new(seed);
            for _ in 0..rounds {
                rendezvous.dispense(dispenser.choose());
            }
            rendezvous.close();
        }
    });

    dispenser.join();
    for watcher in watchers {
        watcher.join();
    }
    let summary = rendezvous.summary();
    for consumer in consumers {
        let (resource, served) = consumer.join();
        assert_eq!(
            served,
            summary.actions(resource),
            "{resource} consumer's own count disagrees with the table"
        );
    }

    tracing::info!(rounds = summary.rounds, "finished");
    summary
}

// === impl Resource ===

impl Resource {
    /// Every resource, in index order.
    pub const ALL: [Resource; 3] = [Resource::Match, Resource::Paper, Resource::Tobacco];

    /// The three unordered pairs the dispenser chooses between.
    pub const PAIRS: [(Resource, Resource); 3] = [
        (Resource::Match, Resource::Paper),
        (Resource::Match, Resource::Tobacco),
        (Resource::Paper, Resource::Tobacco),
    ];

    /// Returns the resource that is neither `a` nor `b`.
    ///
    /// # Panics
    ///
    /// If `a` and `b` are the same resource.
    #[must_use]
    pub fn third(a: Resource, b: Resource) -> Resource {
        assert_ne!(a, b, "a pair needs two different resources");
        Self::ALL[3 - a.index() - b.index()]
    }

    /// Returns the two resources other than this one.
    #[must_use]
    pub fn others(self) -> [Resource; 2] {
        match self {
            Resource::Match => [Resource::Paper, Resource::Tobacco],
            Resource::Paper => [Resource::Match, Resource::Tobacco],
            Resource::Tobacco => [Resource::Match, Resource::Paper],
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Resource::Match => "match",
            Resource::Paper => "paper",
            Resource::Tobacco => "tobacco",
        })
    }
}

// === impl Rendezvous ===

impl Rendezvous {
    /// Returns a new rendezvous with nothing on the table.
    #[must_use]
    pub fn new() -> Self {
        let table = Lock::new(Table::default());
        Self {
            offered: [(); 3].map(|_| table.condvar()),
            may_act: [(); 3].map(|_| table.condvar()),
            acted: table.condvar(),
            round_complete: table.condvar(),
            table,
        }
    }

    /// Runs one round: puts the two resources in `pair` on the table, and
    /// blocks until the consumer that needed them has acted.
    ///
    /// # Panics
    ///
    /// If the two resources are the same, or the rendezvous is closed.
    pub fn dispense(&self, pair: (Resource, Resource)) {
        let (a, b) = pair;
        let missing = Resource::third(a, b);

        let mut table = self.table.lock();
        assert!(!table.closed, "dispensed into a closed rendezvous");
        table.announced[missing.index()] += 1;
        table.offered[a.index()] = true;
        table.offered[b.index()] = true;
        tracing::debug!(%a, %b, %missing, "offered");
        self.offered[a.index()].signal();
        self.offered[b.index()].signal();

        let mut table = self.round_complete.wait_while(table, |t| !t.round_complete);
        table.round_complete = false;
        table.rounds += 1;
    }

    /// Closes the rendezvous, waking every watcher and consumer so that they
    /// return.
    pub fn close(&self) {
        let mut table = self.table.lock();
        table.closed = true;
        tracing::debug!(rounds = table.rounds, "closed");
        for cv in self.offered.iter().chain(&self.may_act) {
            cv.broadcast();
        }
    }

    /// Runs the watcher for `resource` until the rendezvous is closed.
    pub fn watch(&self, resource: Resource) {
        let i = resource.index();
        let mut table = self.table.lock();
        loop {
            table = self.offered[i].wait_while(table, |t| !t.offered[i] && !t.closed);
            if !table.offered[i] {
                tracing::trace!(%resource, "watcher done");
                return;
            }
            table.offered[i] = false;
            assert!(!table.available[i], "{resource} offered twice in one round");
            table.available[i] = true;

            let Some(other) = resource
                .others()
                .into_iter()
                .find(|other| table.available[other.index()])
            else {
                // first of the pair; the other watcher will resolve it.
                continue;
            };

            let consumer = Resource::third(resource, other);
            assert!(
                !table.available[consumer.index()],
                "all three resources available at once"
            );
            table.available[i] = false;
            table.available[other.index()] = false;
            table.may_act[consumer.index()] = true;
            tracing::debug!(%resource, %other, %consumer, "pair complete");
            self.may_act[consumer.index()].signal();

            table = self.acted.wait_while(table, |t| !t.acted);
            table.acted = false;
            table.round_complete = true;
            self.round_complete.signal();
        }
    }

    /// Runs the consumer that holds `resource` until the rendezvous is
    /// closed, returning the number of times it acted.
    pub fn serve(&self, resource: Resource, jitter: &Jitter) -> u64 {
        let i = resource.index();
        let mut served = 0;
        let mut table = self.table.lock();
        loop {
            table = self.may_act[i].wait_while(table, |t| !t.may_act[i] && !t.closed);
            if !table.may_act[i] {
                tracing::trace!(%resource, served, "consumer done");
                return served;
            }
            table.may_act[i] = false;
            drop(table);

            tracing::debug!(%resource, "acting");
            jitter.perturb();
            served += 1;

            table = self.table.lock();
            table.actions[i] += 1;
            assert!(!table.acted, "two consumers acted in one round");
            table.acted = true;
            self.acted.signal();
        }
    }

    /// Returns a snapshot of the rounds and actions so far.
    #[must_use]
    pub fn summary(&self) -> RendezvousSummary {
        let table = self.table.lock();
        RendezvousSummary {
            rounds: table.rounds,
            announced: table.announced,
            actions: table.actions,
        }
    }
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}

// === impl Dispenser ===

impl Dispenser {
    /// Returns a dispenser whose choices are determined by `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Chooses one of the three pairs uniformly at random.
    pub fn choose(&mut self) -> (Resource, Resource) {
        Resource::PAIRS[self.rng.gen_range(0..Resource::PAIRS.len())]
    }
}

// === impl Config ===

impl Config {
    /// The seed used when none is given.
    pub const DEFAULT_SEED: u64 = 0x6d6f_7265_6c;
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rounds: 1000,
            seed: Self::DEFAULT_SEED,
            jitter: Jitter::Off,
        }
    }
}

// === impl RendezvousSummary ===

impl RendezvousSummary {
    /// Returns the number of rounds in which `resource` was the one missing
    /// from the table.
    #[must_use]
    pub fn announced(&self, resource: Resource) -> u64 {
        self.announced[resource.index()]
    }

    /// Returns the number of times the consumer holding `resource` acted.
    #[must_use]
    pub fn actions(&self, resource: Resource) -> u64 {
        self.actions[resource.index()]
    }

    /// Returns the total number of actions by every consumer.
    #[must_use]
    pub fn total_actions(&self) -> u64 {
        self.actions.iter().sum()
    }

    /// Checks the summary of a finished run that was configured for
    /// `expected` rounds.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] if a consumer acted a different number of times
    /// than its resource was missing, or if the rounds and actions do not add
    /// up to `expected`.
    pub fn verify(&self, expected: u64) -> Result<(), Violation> {
        for resource in Resource::ALL {
            let (announced, acted) = (self.announced(resource), self.actions(resource));
            if announced != acted {
                return Err(Violation::RoundMismatch {
                    resource,
                    announced,
                    acted,
                });
            }
        }
        let actions = self.total_actions();
        if self.rounds != expected || actions != expected {
            return Err(Violation::RoundCount {
                expected,
                rounds: self.rounds,
                actions,
            });
        }
        Ok(())
    }
}

impl fmt::Display for RendezvousSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rounds: {}", self.rounds)?;
        for resource in Resource::ALL {
            writeln!(
                f,
                "  {resource:<7} consumer: acted {} times, announced {} times",
                self.actions(resource),
                self.announced(resource),
            )?;
        }
        write!(f, "total actions: {}", self.total_actions())
    }
}
