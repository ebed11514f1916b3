//! A shared room with a capacity limit and bounded waiting.
//!
//! People on two [`Side`]s (little endians and big endians) share one room.
//! At most `capacity` people may be inside at once, and people from the two
//! sides may never be inside together. Left to itself, a busy side could keep
//! the room forever, so the room counts how many people have been admitted
//! on the active side while the other side is waiting; once that count
//! reaches the fairness threshold, the active side stops admitting, the room
//! drains, and the waiting side is woken.
//!
//! # Admission
//!
//! A person is admitted if they are on the active side, the room is not
//! full, and either nobody on the other side is waiting or the active side
//! has not yet used up its share. An empty room also admits anyone from the
//! inactive side. An empty room does *not* admit the active side once it has
//! used up its share while the other side waits: the other side has just been
//! woken, and letting the active side back in first would start its share
//! over. Everyone else waits on their side's [`Condvar`].
//!
//! When the first person from the inactive side joins its queue, the fairness
//! count resets: the active side's share is measured from the moment it has
//! someone to be fair to. A woken waiter that goes back to waiting has already
//! joined the queue, so it does not reset the count again.
//!
//! The room records the longest run of admissions it granted to one side
//! while the other side waited ([`RoomStats::longest_run`]). With the rules
//! above, that run never exceeds the threshold.
//!
//! # Leaving
//!
//! When someone leaves and the other side is waiting, the other side is woken
//! once the room is empty, unless the active side still has waiters and has
//! not used up its share. Otherwise a single waiter on the active side is
//! woken to take the free place.
use crate::{
    error::{ConfigError, Violation},
    loom::sync::Arc,
    Jitter,
};
use core::fmt;
use morel_sync::{thread, Condvar, Lock};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;


/// Which side of the room someone is on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Little endians.
    Little = 0,
    /// Big endians.
    Big = 1,
}

/// How the room wakes the waiting side once it has drained.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum WakePolicy {
    /// Wake every waiter; those that do not fit go back to waiting.
    #[default]
    Broadcast,
    /// Wake only as many waiters as the room can hold.
    FillCapacity,
}

/// A capacity-bounded room shared by two sides that never mix.
#[derive(Debug)]
pub struct FairRoom {
    room: Lock<Occupants>,
    queues: [Condvar; 2],
    capacity: usize,
    threshold: usize,
    wake: WakePolicy,
}

/// A stay in a [`FairRoom`]. Leaves the room when dropped.
#[must_use = "dropping a `Visit` leaves the room immediately"]
pub struct Visit<'room> {
    room: &'room FairRoom,
    side: Side,
    waited: u64,
    waited_opposite: u64,
}

/// Counters kept by a [`FairRoom`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomStats {
    /// The room's capacity.
    pub capacity: usize,
    /// People inside when the stats were taken.
    pub occupancy: usize,
    /// Admissions the active side may make while the other side waits.
    pub threshold: usize,
    admitted: [u64; 2],
    histogram: [Vec<u64>; 2],
    longest_run: usize,
}

/// Counts of how many admissions each visitor waited through.
///
/// Waits of `len()` admissions or more land in a single overflow bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaitingHistogram {
    buckets: Vec<u64>,
    overflow: u64,
}

/// Configuration for a [`run`] of the fair room simulation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// People the room holds at once.
    pub capacity: usize,
    /// Admissions the active side may make while the other side waits.
    pub threshold: usize,
    /// Number of people (threads).
    pub people: usize,
    /// Visits each person makes.
    pub iterations: usize,
    /// Seed for assigning people to sides.
    pub seed: u64,
    /// Perturbation applied inside the room, and again after leaving it.
    pub jitter: Jitter,
    /// How the waiting side is woken.
    pub wake: WakePolicy,
}

/// What a run of the fair room simulation observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomSummary {
    /// The room's own counters.
    pub stats: RoomStats,
    /// How long each visit waited to be admitted.
    pub waiting: WaitingHistogram,
    /// Visits each person made.
    pub iterations: usize,
    people: [usize; 2],
}

#[derive(Debug)]
struct Occupants {
    occupancy: usize,
    active: Side,
    waiters: [usize; 2],
    fairness: usize,
    /// Admissions to the active side since the other side started waiting.
    run: usize,
    longest_run: usize,
    admissions: u64,
    admitted: [u64; 2],
    histogram: [Vec<u64>; 2],
}

/// Runs `config.people` threads, each visiting the room
/// `config.iterations` times, and returns a summary once every thread has
/// been joined.
///
/// # Errors
///
/// Returns a [`ConfigError`] without starting any threads if `config` could
/// never run.
#[tracing::instrument(name = "fair_room", level = "info", skip(config), err)]
pub fn run(config: &Config) -> Result<RoomSummary, ConfigError> {
    config.validate()?;

    let Config {
        capacity,
        threshold,
        people,
        iterations,
        seed,
        jitter,
        wake,
    } = *config;
    let sides = config.sides();
    let mut on_side = [0; 2];
    for side in &sides {
        on_side[side.index()] += 1;
    }
    tracing::info!(
        capacity,
        threshold,
        people,
        little = on_side[Side::Little.index()],
        big = on_side[Side::Big.index()],
        iterations,
        seed,
        ?jitter,
        ?wake,
        "starting"
    );

    let room = Arc::new(FairRoom::new(capacity, threshold).with_wake_policy(wake));
    let waiting = Arc::new(Lock::new(WaitingHistogram::new(people * iterations)));
    let threads = sides
        .into_iter()
        .map(|side| {
            let room = room.clone();
            let waiting = waiting.clone();
            thread::spawn("person", move || {
                for _ in 0..iterations {
                    let visit = room.enter(side);
                    let waited = visit.waited();
                    jitter.perturb();
                    visit.leave();
                    waiting.with_lock(|histogram| histogram.record(waited));
                    jitter.perturb();
                }
            })
        })
        .collect::<Vec<_>>();
    for t in threads {
        t.join();
    }

    let summary = RoomSummary {
        stats: room.stats(),
        waiting: waiting.with_lock(|histogram| histogram.clone()),
        iterations,
        people: on_side,
    };
    tracing::info!(
        little = summary.stats.admitted(Side::Little),
        big = summary.stats.admitted(Side::Big),
        "finished"
    );
    Ok(summary)
}

// === impl Side ===

impl Side {
    /// Both sides, in index order.
    pub const BOTH: [Side; 2] = [Side::Little, Side::Big];

    /// Returns the other side.
    #[must_use]
    pub fn opposite(self) -> Side {
        match self {
            Side::Little => Side::Big,
            Side::Big => Side::Little,
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Side::Little => "little",
            Side::Big => "big",
        })
    }
}

// === impl FairRoom ===

impl FairRoom {
    /// Returns an empty room holding at most `capacity` people, where the
    /// active side may admit `threshold` people while the other side waits.
    ///
    /// # Panics
    ///
    /// If `capacity` or `threshold` is zero.
    #[must_use]
    pub fn new(capacity: usize, threshold: usize) -> Self {
        assert!(capacity > 0, "a room must hold at least one person");
        assert!(threshold > 0, "the fairness threshold must be at least 1");
        let room = Lock::new(Occupants {
            occupancy: 0,
            active: Side::Little,
            waiters: [0; 2],
            fairness: 0,
            run: 0,
            longest_run: 0,
            admissions: 0,
            admitted: [0; 2],
            histogram: [vec![0; capacity + 1], vec![0; capacity + 1]],
        });
        Self {
            queues: [room.condvar(), room.condvar()],
            room,
            capacity,
            threshold,
            wake: WakePolicy::Broadcast,
        }
    }

    /// Sets how the waiting side is woken when the room switches sides.
    #[must_use]
    pub fn with_wake_policy(self, wake: WakePolicy) -> Self {
        Self { wake, ..self }
    }

    /// Enters the room on `side`, blocking until admitted.
    pub fn enter(&self, side: Side) -> Visit<'_> {
        let i = side.index();
        let mut room = self.room.lock();
        let arrived = room.admissions;
        let arrived_opposite = room.admitted[side.opposite().index()];

        let mut queued = false;
        while !room.admits(side, self.capacity, self.threshold) {
            if !queued && side != room.active && room.waiters[i] == 0 {
                room.fairness = 0;
            }
            queued = true;
            room.waiters[i] += 1;
            tracing::trace!(%side, waiters = room.waiters[i], "waiting");
            room = self.queues[i].wait(room);
            room.waiters[i] -= 1;
        }

        let visit = Visit {
            room: self,
            side,
            waited: room.admissions - arrived,
            waited_opposite: room.admitted[side.opposite().index()] - arrived_opposite,
        };
        room.admit(side, self.capacity);
        tracing::debug!(
            %side,
            occupancy = room.occupancy,
            fairness = room.fairness,
            run = room.run,
            waited = visit.waited,
            "admitted"
        );
        visit
    }

    /// Enters the room on `side` if that is possible without waiting.
    ///
    /// This never queues, so it never resets the fairness count the way a
    /// waiting [`enter`](Self::enter) does.
    pub fn try_enter(&self, side: Side) -> Option<Visit<'_>> {
        let mut room = self.room.lock();
        if !room.admits(side, self.capacity, self.threshold) {
            return None;
        }
        room.admit(side, self.capacity);
        tracing::debug!(%side, occupancy = room.occupancy, "admitted without waiting");
        Some(Visit {
            room: self,
            side,
            waited: 0,
            waited_opposite: 0,
        })
    }

    /// Returns the number of people inside.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.room.lock().occupancy
    }

    /// Returns the number of people on `side` waiting to enter.
    #[must_use]
    pub fn waiting(&self, side: Side) -> usize {
        self.room.lock().waiters[side.index()]
    }

    /// Returns the side currently inside the room, or `None` if it is empty.
    #[must_use]
    pub fn active(&self) -> Option<Side> {
        let room = self.room.lock();
        (room.occupancy > 0).then_some(room.active)
    }

    /// Returns the most people the room holds at once.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a snapshot of the room's counters.
    #[must_use]
    pub fn stats(&self) -> RoomStats {
        let room = self.room.lock();
        RoomStats {
            capacity: self.capacity,
            occupancy: room.occupancy,
            threshold: self.threshold,
            admitted: room.admitted,
            histogram: room.histogram.clone(),
            longest_run: room.longest_run,
        }
    }

    fn leave(&self, side: Side) {
        let mut room = self.room.lock();
        assert!(room.occupancy > 0, "{side} endian left an empty room");
        assert_eq!(
            room.active, side,
            "{side} endian left a room held by the other side"
        );
        room.occupancy -= 1;

        let opposite = side.opposite();
        let same_waiting = room.waiters[side.index()];
        let other_waiting = room.waiters[opposite.index()];
        tracing::debug!(%side, occupancy = room.occupancy, "left");

        if other_waiting > 0 && (same_waiting == 0 || room.fairness >= self.threshold) {
            if room.occupancy == 0 {
                tracing::debug!(%opposite, waiting = other_waiting, "switching sides");
                self.wake_side(opposite, other_waiting);
            }
        } else if same_waiting > 0 {
            self.queues[side.index()].signal();
        }
    }

    fn wake_side(&self, side: Side, waiting: usize) {
        let queue = &self.queues[side.index()];
        match self.wake {
            WakePolicy::Broadcast => queue.broadcast(),
            WakePolicy::FillCapacity => {
                for _ in 0..waiting.min(self.capacity) {
                    queue.signal();
                }
            }
        }
    }
}

// === impl Occupants ===

impl Occupants {
    fn admits(&self, side: Side, capacity: usize, threshold: usize) -> bool {
        if side != self.active {
            return self.occupancy == 0;
        }
        let has_share =
            self.waiters[side.opposite().index()] == 0 || self.fairness < threshold;
        self.occupancy < capacity && has_share
    }

    fn admit(&mut self, side: Side, capacity: usize) {
        assert!(
            self.occupancy == 0 || side == self.active,
            "{side} endian admitted while {} endians are inside",
            self.active,
        );
        let other_waiting = self.waiters[side.opposite().index()] > 0;
        if side == self.active {
            self.fairness += 1;
            self.run = if other_waiting { self.run + 1 } else { 0 };
        } else {
            self.fairness = 0;
            self.run = 0;
            self.active = side;
        }
        self.longest_run = self.longest_run.max(self.run);
        self.occupancy += 1;
        assert!(
            self.occupancy <= capacity,
            "room holds {} people, but its capacity is {capacity}",
            self.occupancy,
        );
        self.admissions += 1;
        self.admitted[side.index()] += 1;
        self.histogram[side.index()][self.occupancy] += 1;
    }
}

// === impl Visit ===

impl Visit<'_> {
    /// Returns the side this visit is on.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// Returns the number of admissions, on either side, between this
    /// visitor's arrival and their own admission.
    #[must_use]
    pub fn waited(&self) -> u64 {
        self.waited
    }

    /// Returns the number of other-side admissions between this visitor's
    /// arrival and their own admission.
    #[must_use]
    pub fn waited_opposite(&self) -> u64 {
        self.waited_opposite
    }

    /// Leaves the room.
    pub fn leave(self) {
        drop(self);
    }
}

impl Drop for Visit<'_> {
    fn drop(&mut self) {
        self.room.leave(self.side);
    }
}

impl fmt::Debug for Visit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Visit")
            .field("side", &self.side)
            .field("waited", &self.waited)
            .field("waited_opposite", &self.waited_opposite)
            .finish_non_exhaustive()
    }
}

// === impl RoomStats ===

impl RoomStats {
    /// Returns the number of visits admitted on `side`.
    #[must_use]
    pub fn admitted(&self, side: Side) -> u64 {
        self.admitted[side.index()]
    }

    /// Returns the number of admissions on `side` that brought the room to
    /// `occupancy` people.
    #[must_use]
    pub fn reached(&self, side: Side, occupancy: usize) -> u64 {
        self.histogram[side.index()]
            .get(occupancy)
            .copied()
            .unwrap_or(0)
    }

    /// Returns the most admissions the room granted to one side, in a row,
    /// while someone on the other side was waiting.
    ///
    /// The admission that switched the room to that side is not counted.
    #[must_use]
    pub fn longest_run(&self) -> usize {
        self.longest_run
    }
}

// === impl WaitingHistogram ===

impl WaitingHistogram {
    /// Returns an empty histogram with `len` buckets before the overflow.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            buckets: vec![0; len],
            overflow: 0,
        }
    }

    /// Records one visit that waited through `admissions` admissions.
    pub fn record(&mut self, admissions: u64) {
        match usize::try_from(admissions)
            .ok()
            .and_then(|i| self.buckets.get_mut(i))
        {
            Some(bucket) => *bucket += 1,
            None => self.overflow += 1,
        }
    }

    /// Returns the number of visits that waited through exactly `admissions`
    /// admissions.
    #[must_use]
    pub fn get(&self, admissions: usize) -> u64 {
        self.buckets.get(admissions).copied().unwrap_or(0)
    }

    /// Returns the number of visits that waited too long for a bucket.
    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Returns the number of buckets before the overflow.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` if there are no buckets before the overflow.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns the number of visits recorded.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum::<u64>() + self.overflow
    }
}

// === impl Config ===

impl Config {
    /// The seed used when none is given.
    pub const DEFAULT_SEED: u64 = 0x6d6f_7265_6c;

    /// Checks that a run with this configuration could start.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    /// - [`ConfigError::ZeroThreshold`] if `threshold` is zero.
    /// - [`ConfigError::NoThreads`] if there are no people.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.threshold == 0 {
            return Err(ConfigError::ZeroThreshold);
        }
        if self.people == 0 {
            return Err(ConfigError::NoThreads { role: "person" });
        }
        Ok(())
    }

    /// Returns the side of each person, as determined by the seed.
    #[must_use]
    pub fn sides(&self) -> Vec<Side> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        (0..self.people)
            .map(|_| if rng.gen::<bool>() { Side::Big } else { Side::Little })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 3,
            threshold: 4,
            people: 20,
            iterations: 100,
            seed: Self::DEFAULT_SEED,
            jitter: Jitter::Yield(20),
            wake: WakePolicy::Broadcast,
        }
    }
}

// === impl RoomSummary ===

impl RoomSummary {
    /// Returns the number of people on `side`.
    #[must_use]
    pub fn people(&self, side: Side) -> usize {
        self.people[side.index()]
    }

    /// Checks that every visit was admitted exactly once and recorded in
    /// both histograms, and that no side was admitted more than `threshold`
    /// times in a row while the other side waited.
    ///
    /// # Errors
    ///
    /// Returns a [`Violation`] describing the first total that does not
    /// balance.
    pub fn verify(&self) -> Result<(), Violation> {
        if self.stats.occupancy != 0 {
            return Err(Violation::RoomOccupied {
                occupancy: self.stats.occupancy,
            });
        }

        if self.stats.longest_run > self.stats.threshold {
            return Err(Violation::UnfairRun {
                run: self.stats.longest_run,
                threshold: self.stats.threshold,
            });
        }

        let mut visits = 0;
        for side in Side::BOTH {
            let expected = (self.people(side) * self.iterations) as u64;
            let admitted = self.stats.admitted(side);
            if admitted != expected {
                return Err(Violation::VisitCount {
                    side,
                    admitted,
                    expected,
                });
            }
            let recorded = self.stats.histogram[side.index()].iter().sum();
            if recorded != admitted {
                return Err(Violation::HistogramMismatch {
                    histogram: "occupancy",
                    recorded,
                    expected: admitted,
                });
            }
            visits += admitted;
        }

        let recorded = self.waiting.total();
        if recorded != visits {
            return Err(Violation::HistogramMismatch {
                histogram: "waiting",
                recorded,
                expected: visits,
            });
        }
        Ok(())
    }
}

impl fmt::Display for RoomSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for side in Side::BOTH {
            writeln!(
                f,
                "{side} endians: {} people, {} visits",
                self.people(side),
                self.stats.admitted(side)
            )?;
            for occupancy in 1..=self.stats.capacity {
                writeln!(
                    f,
                    "  times with {occupancy} {side} endian inside: {}",
                    self.stats.reached(side, occupancy)
                )?;
            }
        }
        writeln!(
            f,
            "longest run while the other side waited: {} (threshold {})",
            self.stats.longest_run, self.stats.threshold
        )?;
        writeln!(f, "waiting histogram (admissions waited):")?;
        for (admissions, &count) in self.waiting.buckets.iter().enumerate() {
            if count > 0 {
                writeln!(f, "  {admissions}: {count}")?;
            }
        }
        write!(f, "  overflow: {}", self.waiting.overflow)
    }
}
