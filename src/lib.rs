//! Classic thread coordination puzzles.
//!
//! Each module in this crate is an independent puzzle, written only in terms
//! of the primitives provided by [`morel_sync`]: a [`Lock`], [`Condvar`]s bound
//! to that lock, and counting [`Semaphore`]s.
//!
//! - [`bounded_channel`]: producers and consumers sharing a fixed-capacity
//!   buffer, coordinated with semaphores only.
//! - [`rendezvous`]: a dispenser that puts out two of three resources per
//!   round, and three consumers that each need the two resources they do not
//!   hold (the "cigarette smokers" problem).
//! - [`fair_room`]: a room of bounded capacity shared by two populations that
//!   may never be inside together, with a bound on how long either side can
//!   be made to wait.
//! - [`ordering`]: two small demonstrations of forcing a total order on
//!   output from several threads.
//!
//! Every puzzle checks its safety invariant with assertions while holding the
//! lock that protects it, and offers a summary that can be verified once all
//! of its threads have been joined.
//!
//! # Loom
//!
//! The puzzles are model-checked with [`loom`] by building with
//! `RUSTFLAGS="--cfg loom"`, which swaps `morel-sync`'s primitives for loom's
//! simulated ones.
//!
//! [`Lock`]: morel_sync::Lock
//! [`Condvar`]: morel_sync::Condvar
//! [`Semaphore`]: morel_sync::Semaphore
//! [`loom`]: https://crates.io/crates/loom
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs, missing_debug_implementations)]

pub(crate) mod loom;

pub mod bounded_channel;
pub mod cli;
pub mod error;
pub mod fair_room;
pub mod jitter;
pub mod ordering;
pub mod rendezvous;
pub mod trace;

pub use self::error::{ConfigError, Violation};
pub use self::jitter::Jitter;
