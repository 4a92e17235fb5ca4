/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The bulk-synchronous round driver.

use super::{Config, ExecStats};
use crate::worklist::{Advance, Bag, Generations};
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The context handed to a round pass.
///
/// Unlike the work-stealing executor's [`Ctx`](super::Ctx), pushes do not
/// feed the running pass: they land in the *next* generation
/// ([`push`](RoundCtx::push)) or in the *pending* bucket
/// ([`defer`](RoundCtx::defer)) and are only processed after the round
/// completes.
pub struct RoundCtx<'round, T: Send> {
    worker: usize,
    next: &'round Bag<T>,
    pending: &'round Bag<T>,
}

impl<T: Send> RoundCtx<'_, T> {
    /// Returns the index of the worker running this pass chunk.
    #[inline]
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Pushes an item into the next generation.
    #[inline]
    pub fn push(&self, item: T) {
        self.next.push(item);
    }

    /// Defers an item past the current level, into the pending bucket.
    #[inline]
    pub fn defer(&self, item: T) {
        self.pending.push(item);
    }
}

/// A bulk-synchronous executor over a [three-generation
/// worklist](Generations).
///
/// Each [`pass`](Rounds::pass) sweeps the current generation in parallel and
/// ends with an implicit barrier; a round is one or more passes followed by
/// an [`advance`](Rounds::advance). Because pushes are deferred to the next
/// generation, passes see a frozen worklist, and algorithms can arrange
/// their passes so that no two items of one generation conflict — no
/// per-task conflict detection is paid.
///
/// # Examples
///
/// Level-synchronous breadth-first distances:
///
/// ```
/// use amorpha::exec::{Config, Rounds};
/// use amorpha::worklist::Advance;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// // 0 → 1 → 2; distances computed one frontier per round.
/// let adj = vec![vec![1], vec![2], vec![]];
/// let dist: Vec<AtomicUsize> = (0..3).map(|_| AtomicUsize::new(usize::MAX)).collect();
/// dist[0].store(0, Ordering::Relaxed);
///
/// let mut rounds = Rounds::new(Config::new().threads(2), vec![0usize]);
/// loop {
///     rounds.pass(|&node, ctx| {
///         let d = dist[node].load(Ordering::Relaxed);
///         for &succ in &adj[node] {
///             if dist[succ].fetch_min(d + 1, Ordering::Relaxed) > d + 1 {
///                 ctx.push(succ);
///             }
///         }
///     });
///     if rounds.advance() == Advance::Done {
///         break;
///     }
/// }
/// assert_eq!(dist[2].load(Ordering::Relaxed), 2);
/// assert_eq!(rounds.stats().rounds, 3);
/// ```
pub struct Rounds<T: Send> {
    config: Config,
    gens: Generations<T>,
    stats: ExecStats,
}

impl<T: Send + Sync> Rounds<T> {
    /// Creates a driver with `seed` as the first generation.
    pub fn new(config: Config, seed: Vec<T>) -> Self {
        Self::from_generations(config, Generations::seeded(seed))
    }

    /// Creates a driver over an existing worklist triple, e.g. one filled by
    /// an initialization sweep.
    pub fn from_generations(config: Config, gens: Generations<T>) -> Self {
        let rounds = if gens.current().is_empty() { 0 } else { 1 };
        Self {
            config,
            gens,
            stats: ExecStats {
                rounds,
                ..ExecStats::default()
            },
        }
    }

    /// Returns the current generation.
    pub fn current(&self) -> &[T] {
        self.gens.current()
    }

    /// Sweeps the current generation with `op`, in parallel, and waits for
    /// the sweep to complete.
    ///
    /// A round may consist of several passes over the same generation; items
    /// pushed by any of them only become visible after
    /// [`advance`](Self::advance).
    pub fn pass<F>(&mut self, op: F)
    where
        F: Fn(&T, &RoundCtx<'_, T>) + Sync,
    {
        let (items, next, pending) = self.gens.parts();
        if items.is_empty() {
            return;
        }
        let chunk = self.config.chunk(items.len());
        let cursor = AtomicUsize::new(0);
        std::thread::scope(|s| {
            for worker in 0..self.config.num_threads() {
                let cursor = &cursor;
                let op = &op;
                s.spawn(move || {
                    let ctx = RoundCtx {
                        worker,
                        next,
                        pending,
                    };
                    loop {
                        let lo = cursor.fetch_add(chunk, Ordering::Relaxed);
                        if lo >= items.len() {
                            break;
                        }
                        let hi = (lo + chunk).min(items.len());
                        for item in &items[lo..hi] {
                            op(item, &ctx);
                        }
                    }
                });
            }
        });
        self.stats.executed += items.len() as u64;
    }

    /// Promotes the next generation (or, at the end of a level, the pending
    /// bucket) to current.
    pub fn advance(&mut self) -> Advance {
        let advance = self.gens.advance();
        if advance == Advance::Done {
            debug!("Bulk-synchronous run: {}", self.stats);
        } else {
            self.stats.rounds += 1;
            self.stats.pushed += self.gens.current().len() as u64;
        }
        advance
    }

    /// Returns the counters collected so far.
    pub fn stats(&self) -> &ExecStats {
        &self.stats
    }

    /// Consumes the driver, returning its counters.
    pub fn into_stats(self) -> ExecStats {
        self.stats
    }
}
