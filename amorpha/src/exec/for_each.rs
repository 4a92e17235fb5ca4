/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The work-stealing executor.

use super::{Config, ExecStats};
use crate::graph::{Conflict, Frame, NodeTokens};
use crate::termination::TerminationDetection;
use crossbeam_deque::{Injector, Stealer, Worker};
use crossbeam_utils::Backoff;
use log::debug;
use std::cell::Cell;

/// The execution context handed to task functions.
///
/// Through the context a task pushes new work items for the same run and
/// reaches the acquisition [`Frame`] expected by the
/// [conflict-checked accessor](crate::graph::CsrGraph::data_checked).
pub struct Ctx<'run, T: Send> {
    worker: usize,
    local: &'run Worker<T>,
    term: &'run TerminationDetection,
    frame: Frame<'run>,
    pushed: Cell<u64>,
}

impl<'run, T: Send> Ctx<'run, T> {
    /// Returns the index of the worker running this task.
    #[inline]
    pub fn worker(&self) -> usize {
        self.worker
    }

    /// Pushes a new work item for the current run.
    ///
    /// The item lands on this worker's deque and may be stolen by an idle
    /// peer.
    #[inline]
    pub fn push(&self, item: T) {
        self.local.push(item);
        self.term.work_happened(self.worker);
        self.pushed.set(self.pushed.get() + 1);
    }

    /// Returns the acquisition frame of the running task.
    ///
    /// Tokens acquired through this frame are released when the task commits
    /// or aborts.
    #[inline]
    pub fn frame(&self) -> &Frame<'run> {
        &self.frame
    }
}

/// Runs `op` over every seed item and every item pushed during the run.
///
/// Items are distributed over a fixed pool of workers; an idle worker steals
/// a batch from the shared queue or from a peer's deque. The call returns
/// when the termination detector rules that every deque is empty and no task
/// is in flight.
///
/// `op` is invoked once per item, in no particular order, and must be safe
/// to run in any interleaving with other items. This variant has no conflict
/// domain: task functions must be conflict-free by construction (they
/// operate on their own node, or only through lock-free structures such as
/// [`UnionFind`](crate::union_find::UnionFind)) and should never return
/// `Err`.
///
/// # Examples
///
/// ```
/// use amorpha::exec::{for_each, Config};
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// // Count the nodes of a complete binary tree by pushing child indices.
/// let count = AtomicU64::new(0);
/// for_each(&Config::new().threads(4), [0usize], |&node, ctx| {
///     count.fetch_add(1, Ordering::Relaxed);
///     for child in [2 * node + 1, 2 * node + 2] {
///         if child < 1023 {
///             ctx.push(child);
///         }
///     }
///     Ok(())
/// });
/// assert_eq!(count.into_inner(), 1023);
/// ```
pub fn for_each<T, F>(config: &Config, seed: impl IntoIterator<Item = T>, op: F) -> ExecStats
where
    T: Send,
    F: Fn(&T, &Ctx<'_, T>) -> Result<(), Conflict> + Sync,
{
    let tokens = NodeTokens::none();
    for_each_checked(config, &tokens, seed, op)
}

/// Like [`for_each`], but with a conflict domain.
///
/// `tokens` must be the [token domain](crate::graph::CsrGraph::node_tokens)
/// of the graph the task functions access. A task returning
/// [`Conflict`] — normally by propagating the result of a checked accessor
/// call with `?` — is aborted: its tokens are released and its original
/// input item is requeued at the back of the shared queue. Requeueing at the
/// back trades locality for fairness, so a hot node cannot starve one
/// particular item forever.
///
/// Aborted executions leave no trace except writes the task performed before
/// the conflict; task functions must therefore be idempotent, i.e. safe to
/// re-execute from their input item.
pub fn for_each_checked<T, F>(
    config: &Config,
    tokens: &NodeTokens,
    seed: impl IntoIterator<Item = T>,
    op: F,
) -> ExecStats
where
    T: Send,
    F: Fn(&T, &Ctx<'_, T>) -> Result<(), Conflict> + Sync,
{
    let injector = Injector::new();
    for item in seed {
        injector.push(item);
    }

    let num_threads = config.num_threads();
    let term = TerminationDetection::new(num_threads);
    let locals: Vec<Worker<T>> = (0..num_threads).map(|_| Worker::new_lifo()).collect();
    let stealers: Vec<Stealer<T>> = locals.iter().map(Worker::stealer).collect();

    let mut total = ExecStats::default();
    std::thread::scope(|s| {
        let handles: Vec<_> = locals
            .into_iter()
            .enumerate()
            .map(|(worker, local)| {
                let injector = &injector;
                let stealers = &stealers[..];
                let term = &term;
                let op = &op;
                s.spawn(move || worker_main(worker, local, injector, stealers, term, tokens, op))
            })
            .collect();
        for handle in handles {
            match handle.join() {
                Ok(stats) => total.merge(&stats),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
    });
    debug!("Work-stealing run over {num_threads} workers: {total}");
    total
}

/// The scheduling loop of one worker.
fn worker_main<T, F>(
    worker: usize,
    local: Worker<T>,
    injector: &Injector<T>,
    stealers: &[Stealer<T>],
    term: &TerminationDetection,
    tokens: &NodeTokens,
    op: &F,
) -> ExecStats
where
    T: Send,
    F: Fn(&T, &Ctx<'_, T>) -> Result<(), Conflict> + Sync,
{
    let ctx = Ctx {
        worker,
        local: &local,
        term,
        frame: Frame::new(tokens, worker),
        pushed: Cell::new(0),
    };
    let mut stats = ExecStats::default();
    let backoff = Backoff::new();
    loop {
        while let Some(item) = find_task(&local, injector, stealers) {
            backoff.reset();
            term.work_happened(worker);
            match op(&item, &ctx) {
                Ok(()) => stats.executed += 1,
                Err(Conflict) => {
                    stats.aborted += 1;
                    // Requeue the original input; the pushing counts as
                    // work for the termination detector.
                    injector.push(item);
                    term.work_happened(worker);
                }
            }
            ctx.frame.release_all();
        }
        term.local_termination(worker);
        if term.global_termination() {
            break;
        }
        backoff.snooze();
    }
    stats.pushed = ctx.pushed.get();
    stats
}

/// Pops locally, then steals: a batch from the shared queue, or one item
/// from a peer.
fn find_task<T>(local: &Worker<T>, injector: &Injector<T>, stealers: &[Stealer<T>]) -> Option<T> {
    local.pop().or_else(|| {
        std::iter::repeat_with(|| {
            injector
                .steal_batch_and_pop(local)
                .or_else(|| stealers.iter().map(Stealer::steal).collect())
        })
        .find(|steal| !steal.is_retry())
        .and_then(|steal| steal.success())
    })
}
