/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Dijkstra-style dual-ring termination detection.
//!
//! An irregular parallel loop has no natural last iteration: any running task
//! may push new work, so an idle worker cannot tell whether the loop is over
//! or whether work is about to appear. The classic barrier-free answer is
//! Dijkstra's token ring: a token circulates worker 0 → 1 → … → *N* − 1 → 0,
//! and every worker that has performed work since it last saw the token dyes
//! it black. The loop has terminated only when the token completes a circuit
//! while staying white, twice in a row; the double circuit closes the window
//! in which a worker performs work *after* passing a white token along.
//!
//! Per worker the detector keeps a [`TokenHolder`] with three flags:
//! `has_token` (at most one holder per ring instant), `token_is_black` (the
//! dye carried by the token) and `process_is_black` (work happened locally
//! since the token last left this worker). All flags are atomics with
//! acquire/release orderings; the token hand-off is the release point that
//! publishes the dye to the next holder.
//!
//! Workers call [`work_happened`](TerminationDetection::work_happened) when
//! they execute or push an item, [`local_termination`](TerminationDetection::local_termination)
//! once per idle scheduler quantum, and poll
//! [`global_termination`](TerminationDetection::global_termination), which is
//! a plain load. [`reset`](TerminationDetection::reset) rearms the detector
//! for the next phase; the detector is reused across the many phases of one
//! algorithm run.

use crate::per_worker::PerWorker;
use std::sync::atomic::{AtomicBool, Ordering};

/// The ring state of one worker.
#[derive(Debug)]
pub struct TokenHolder {
    has_token: AtomicBool,
    token_is_black: AtomicBool,
    process_is_black: AtomicBool,
}

impl TokenHolder {
    fn new(has_token: bool) -> Self {
        Self {
            has_token: AtomicBool::new(has_token),
            // The initial token is black: nothing can be concluded from the
            // first circuit.
            token_is_black: AtomicBool::new(has_token),
            process_is_black: AtomicBool::new(true),
        }
    }
}

/// A barrier-free termination detector for a fixed ring of workers.
///
/// # Examples
///
/// ```
/// use amorpha::termination::TerminationDetection;
///
/// // A single-worker ring: two idle quanta after the last unit of work
/// // are enough to detect termination.
/// let term = TerminationDetection::new(1);
/// term.work_happened(0);
/// term.local_termination(0);
/// assert!(!term.global_termination());
/// term.local_termination(0);
/// term.local_termination(0);
/// assert!(term.global_termination());
/// ```
#[derive(Debug)]
pub struct TerminationDetection {
    holders: PerWorker<TokenHolder>,
    global_term: AtomicBool,
    last_was_white: AtomicBool,
}

impl TerminationDetection {
    /// Creates a detector for a ring of `num_workers` workers.
    ///
    /// Worker 0 starts out holding a black token.
    pub fn new(num_workers: usize) -> Self {
        assert!(num_workers > 0, "The ring must have at least one worker");
        Self {
            holders: PerWorker::new(num_workers, |w| TokenHolder::new(w == 0)),
            global_term: AtomicBool::new(false),
            last_was_white: AtomicBool::new(false),
        }
    }

    /// Records that `worker` executed or pushed a work item.
    ///
    /// Must be called by the worker itself; the flag is only ever written by
    /// its owner and consumed when the owner forwards the token.
    #[inline]
    pub fn work_happened(&self, worker: usize) {
        self.holders[worker]
            .process_is_black
            .store(true, Ordering::Release);
    }

    /// Advances the ring by one step if `worker` currently holds the token.
    ///
    /// Called periodically by idle workers. If the worker does not hold the
    /// token this is a single load.
    pub fn local_termination(&self, worker: usize) {
        if self.global_term.load(Ordering::Acquire) {
            return;
        }
        let me = &self.holders[worker];
        if !me.has_token.load(Ordering::Acquire) {
            return;
        }

        let process_black = me.process_is_black.swap(false, Ordering::AcqRel);
        let token_black = me.token_is_black.swap(false, Ordering::AcqRel);
        let next = &self.holders[(worker + 1) % self.holders.len()];

        if worker == 0 {
            // The token completed a circuit; judge it and originate a fresh
            // white one.
            let clean = !process_black && !token_black;
            if clean && self.last_was_white.load(Ordering::Relaxed) {
                // Two consecutive white circuits: the token retires.
                self.global_term.store(true, Ordering::Release);
                return;
            }
            self.last_was_white.store(clean, Ordering::Relaxed);
            next.token_is_black.store(false, Ordering::Release);
        } else {
            next.token_is_black
                .store(token_black || process_black, Ordering::Release);
        }

        me.has_token.store(false, Ordering::Relaxed);
        next.has_token.store(true, Ordering::Release);
    }

    /// Returns whether global termination has been detected.
    ///
    /// Non-blocking; once true, stays true until [`reset`](Self::reset).
    #[inline]
    pub fn global_termination(&self) -> bool {
        self.global_term.load(Ordering::Acquire)
    }

    /// Rearms the detector for the next phase.
    ///
    /// Must not be called while workers are still advancing the ring.
    pub fn reset(&self) {
        for (w, holder) in self.holders.iter().enumerate() {
            holder.has_token.store(w == 0, Ordering::Relaxed);
            holder.token_is_black.store(w == 0, Ordering::Relaxed);
            holder.process_is_black.store(true, Ordering::Relaxed);
        }
        self.last_was_white.store(false, Ordering::Relaxed);
        self.global_term.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_single_worker_ring() {
        let term = TerminationDetection::new(1);
        // First circuit is black by construction.
        term.local_termination(0);
        assert!(!term.global_termination());
        term.local_termination(0);
        assert!(!term.global_termination());
        term.local_termination(0);
        assert!(term.global_termination());
    }

    #[test]
    fn test_work_delays_detection() {
        let term = TerminationDetection::new(1);
        term.local_termination(0);
        term.work_happened(0);
        term.local_termination(0);
        // The dirty circuit must not count as white.
        assert!(!term.global_termination());
        term.local_termination(0);
        term.local_termination(0);
        assert!(term.global_termination());
    }

    #[test]
    fn test_reset_rearms() {
        let term = TerminationDetection::new(1);
        for _ in 0..3 {
            term.local_termination(0);
        }
        assert!(term.global_termination());
        term.reset();
        assert!(!term.global_termination());
        for _ in 0..3 {
            term.local_termination(0);
        }
        assert!(term.global_termination());
    }
}
