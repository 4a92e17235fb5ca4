/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Parallel executors.
//!
//! Three disciplines, in increasing order of machinery:
//!
//! - [`do_all`]: a parallel sweep over a fixed slice of items, with work
//!   distributed through a shared chunk cursor. No pushes, no conflicts.
//! - [`for_each`] / [`for_each_checked`]: the work-stealing executor for
//!   dynamically growing worklists. Each worker owns a private deque and
//!   steals when idle; task functions may push new items for the same run,
//!   and (in the checked variant) abort on
//!   [`Conflict`](crate::graph::Conflict), in which case the
//!   original item is requeued. The run ends when the
//!   [termination detector](crate::termination) rules that no worker has
//!   local or stealable work left and nothing is being pushed.
//! - [`Rounds`]: the bulk-synchronous driver, which processes one generation
//!   of items to completion per round and defers pushes to the following
//!   generation. Used when conflicts are too expensive to detect per task
//!   and the algorithm is instead organized so that rounds are internally
//!   conflict-free.
//!
//! All executors spawn a fixed number of OS threads per phase, configured by
//! [`Config`]; tasks run to completion or abort atomically, and there is no
//! ordering guarantee between items.

mod for_each;
mod rounds;

pub use for_each::{for_each, for_each_checked, Ctx};
pub use rounds::{RoundCtx, Rounds};

use std::sync::atomic::{AtomicUsize, Ordering};

/// Executor configuration.
///
/// The worker count is fixed for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct Config {
    num_threads: usize,
    granularity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// The default number of items handed to a worker at a time by the
    /// sweeping executors.
    pub const DEFAULT_GRANULARITY: usize = 64;

    /// Creates a configuration with one worker per available CPU.
    pub fn new() -> Self {
        Self {
            num_threads: num_cpus::get(),
            granularity: Self::DEFAULT_GRANULARITY,
        }
    }

    /// Sets the number of worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `num_threads` is zero.
    pub fn threads(mut self, num_threads: usize) -> Self {
        assert!(num_threads > 0, "At least one worker thread is required");
        self.num_threads = num_threads;
        self
    }

    /// Sets the sweep granularity, i.e. how many items a worker claims from
    /// the shared cursor at a time.
    ///
    /// # Panics
    ///
    /// Panics if `granularity` is zero.
    pub fn granularity(mut self, granularity: usize) -> Self {
        assert!(granularity > 0, "The granularity must be positive");
        self.granularity = granularity;
        self
    }

    /// Returns the number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Returns the chunk size for a sweep over `len` items: the configured
    /// granularity, reduced when the items would not keep all workers busy.
    fn chunk(&self, len: usize) -> usize {
        self.granularity.min(len / self.num_threads).max(1)
    }
}

/// Counters emitted by an executor run.
///
/// The runtime only counts; reporting is the caller's concern (most clients
/// forward interesting counters to [`log`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecStats {
    /// Task-function invocations that committed.
    pub executed: u64,
    /// Items pushed by task functions during the run.
    pub pushed: u64,
    /// Task-function invocations that aborted on a conflict.
    pub aborted: u64,
    /// Generations processed (bulk-synchronous runs only).
    pub rounds: u64,
}

impl ExecStats {
    /// Adds another run's counters into this one.
    pub fn merge(&mut self, other: &ExecStats) {
        self.executed += other.executed;
        self.pushed += other.pushed;
        self.aborted += other.aborted;
        self.rounds += other.rounds;
    }
}

impl std::fmt::Display for ExecStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "executed: {} pushed: {} aborted: {} rounds: {}",
            self.executed, self.pushed, self.aborted, self.rounds
        )
    }
}

/// Applies `op` to every item of a slice, in parallel, with no ordering
/// guarantee.
///
/// Workers claim chunks of items from a shared cursor, so an uneven cost
/// distribution among items does not idle the fast workers.
///
/// # Examples
///
/// ```
/// use amorpha::exec::{do_all, Config};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let items: Vec<u64> = (0..1000).collect();
/// let sum = AtomicU64::new(0);
/// do_all(&Config::new().threads(4), &items, |&item| {
///     sum.fetch_add(item, Ordering::Relaxed);
/// });
/// assert_eq!(sum.into_inner(), 499_500);
/// ```
pub fn do_all<T, F>(config: &Config, items: &[T], op: F)
where
    T: Sync,
    F: Fn(&T) + Sync,
{
    if items.is_empty() {
        return;
    }
    let chunk = config.chunk(items.len());
    let cursor = AtomicUsize::new(0);
    std::thread::scope(|s| {
        for _ in 0..config.num_threads {
            let cursor = &cursor;
            let op = &op;
            s.spawn(move || loop {
                let lo = cursor.fetch_add(chunk, Ordering::Relaxed);
                if lo >= items.len() {
                    break;
                }
                let hi = (lo + chunk).min(items.len());
                for item in &items[lo..hi] {
                    op(item);
                }
            });
        }
    });
}
