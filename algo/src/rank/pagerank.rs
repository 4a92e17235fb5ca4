/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Round-synchronous PageRank.
//!
//! A parallel power iteration: every round computes a full new rank vector
//! from the previous one, with the nodes swept by the runtime's
//! [`do_all`] executor. Rounds are internally conflict-free — each task
//! writes exactly one entry of the new vector — so the sweep runs under the
//! unprotected discipline, and the per-round ℓ₁ change is collected through
//! a per-thread [`Accumulator`] and reduced only after the round's barrier.
//!
//! **Warning**: since the update needs to enumerate the _predecessors_ of a
//! node, you must pass to the [constructor](PageRank::new) the **transpose**
//! of the graph. The outdegrees of the original graph are recovered from the
//! transpose at construction time.
//!
//! Dangling nodes (nodes with no outgoing arcs in the original graph)
//! redistribute their rank uniformly, so the rank vector stays stochastic.
//!
//! # Stopping criteria
//!
//! [`run`](PageRank::run) accepts a composable [`Predicate`] evaluated after
//! each round. The predicate receives the round number and a *norm delta* —
//! an upper bound on the ℓ₁ error of the current approximation, computed as
//! α / (1 − α) · ‖**x**⁽ᵗ⁾ − **x**⁽ᵗ⁻¹⁾‖₁. The predicates in [`preds`] stop
//! on a norm threshold ([`L1Norm`](preds::L1Norm)), on a round budget
//! ([`MaxIter`](preds::MaxIter)), or on any `and`/`or` combination of them.

pub mod preds {
    //! Stopping predicates for [PageRank](super::PageRank).
    //!
    //! Each predicate evaluates to true when the computation should stop;
    //! combine them with the `and` and `or` methods of the [`Predicate`]
    //! trait.

    use predicates::reflection::PredicateReflection;
    use predicates::Predicate;
    use std::fmt::Display;

    /// The information handed to stopping predicates after each round.
    #[derive(Debug)]
    pub struct PredParams {
        pub iteration: usize,
        pub norm_delta: f64,
    }

    /// Stops after at most the provided number of rounds.
    #[derive(Debug, Clone)]
    pub struct MaxIter {
        max_iter: usize,
    }

    impl From<usize> for MaxIter {
        fn from(max_iter: usize) -> Self {
            MaxIter { max_iter }
        }
    }

    impl Display for MaxIter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_fmt(format_args!("(max iter: {})", self.max_iter))
        }
    }

    impl PredicateReflection for MaxIter {}

    impl Predicate<PredParams> for MaxIter {
        fn eval(&self, pred_params: &PredParams) -> bool {
            pred_params.iteration >= self.max_iter
        }
    }

    /// Stops when the norm delta falls below a threshold.
    #[derive(Debug, Clone)]
    pub struct L1Norm {
        threshold: f64,
    }

    impl L1Norm {
        pub const DEFAULT_THRESHOLD: f64 = 1E-6;
    }

    impl TryFrom<f64> for L1Norm {
        type Error = anyhow::Error;

        fn try_from(threshold: f64) -> anyhow::Result<Self> {
            anyhow::ensure!(!threshold.is_nan());
            anyhow::ensure!(threshold > 0.0, "The threshold must be positive");
            Ok(L1Norm { threshold })
        }
    }

    impl Default for L1Norm {
        fn default() -> Self {
            L1Norm {
                threshold: Self::DEFAULT_THRESHOLD,
            }
        }
    }

    impl Display for L1Norm {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_fmt(format_args!("(norm: {})", self.threshold))
        }
    }

    impl PredicateReflection for L1Norm {}

    impl Predicate<PredParams> for L1Norm {
        fn eval(&self, pred_params: &PredParams) -> bool {
            pred_params.norm_delta <= self.threshold
        }
    }
}

use amorpha::exec::{do_all, Config};
use amorpha::graph::CsrGraph;
use amorpha::reduce::Accumulator;
use dsi_progress_logger::ProgressLog;
use log::info;
use predicates::Predicate;
use preds::PredParams;
use rayon::prelude::*;
use sync_cell_slice::SyncSlice;

/// A PageRank computation over the transpose of a graph.
///
/// Configured via setters and executed via [`run`](Self::run); the rank
/// vector is then available through [`rank`](Self::rank).
///
/// # Examples
///
/// ```
/// use amorpha::graph::CsrGraphBuilder;
/// use amorpha_algo::rank::pagerank::{preds, PageRank};
/// use dsi_progress_logger::no_logging;
///
/// // Transpose of the 4-cycle 0 → 1 → 2 → 3 → 0: by symmetry all ranks
/// // are equal.
/// let mut builder = CsrGraphBuilder::<(), ()>::new(4);
/// for n in 0..4 {
///     builder.push_arc((n + 1) % 4, n, ());
/// }
/// let transpose = builder.build();
///
/// let mut pr = PageRank::new(&transpose);
/// pr.run(preds::L1Norm::try_from(1E-9).unwrap(), no_logging![]);
///
/// for &rank in pr.rank() {
///     assert!((rank - 0.25).abs() < 1E-6);
/// }
/// ```
pub struct PageRank<'a, N, E> {
    transpose: &'a CsrGraph<N, E>,
    /// Outdegrees in the original orientation, i.e. indegrees of the
    /// transpose.
    outdegrees: Box<[usize]>,
    alpha: f64,
    config: Config,
    rank: Box<[f64]>,
    iteration: usize,
    norm_delta: f64,
}

impl<'a, N: Send + Sync, E: Send + Sync> PageRank<'a, N, E> {
    /// Creates a PageRank computation.
    ///
    /// This constructor takes the _transpose_ of the graph, because the
    /// update rule iterates over the predecessors of each node.
    pub fn new(transpose: &'a CsrGraph<N, E>) -> Self {
        let num_nodes = transpose.num_nodes();
        let mut outdegrees = vec![0; num_nodes].into_boxed_slice();
        for node in 0..num_nodes {
            for pred in transpose.successors(node) {
                outdegrees[pred] += 1;
            }
        }
        Self {
            transpose,
            outdegrees,
            alpha: 0.85,
            config: Config::new(),
            rank: vec![0.0; num_nodes].into_boxed_slice(),
            iteration: 0,
            norm_delta: f64::INFINITY,
        }
    }

    /// Sets the damping factor α.
    ///
    /// # Panics
    ///
    /// Panics if `alpha` is not in the interval [0 . . 1).
    pub fn alpha(&mut self, alpha: f64) -> &mut Self {
        assert!(
            (0.0..1.0).contains(&alpha),
            "The damping factor must be in [0 . . 1), got {alpha}"
        );
        self.alpha = alpha;
        self
    }

    /// Sets the executor configuration.
    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    /// Returns the rank vector computed by the last call to
    /// [`run`](Self::run).
    pub fn rank(&self) -> &[f64] {
        &self.rank
    }

    /// Returns the number of rounds performed by the last call to
    /// [`run`](Self::run).
    pub fn iterations(&self) -> usize {
        self.iteration
    }

    /// Runs rounds until `predicate` evaluates to true.
    pub fn run(&mut self, predicate: impl Predicate<PredParams>, pl: &mut impl ProgressLog) {
        let num_nodes = self.transpose.num_nodes();
        if num_nodes == 0 {
            return;
        }
        let transpose = self.transpose;
        let outdegrees = &self.outdegrees;
        let alpha = self.alpha;
        let uniform = 1.0 / num_nodes as f64;

        self.rank.fill(uniform);
        self.iteration = 0;
        let nodes: Vec<usize> = (0..num_nodes).collect();

        pl.item_name("round");
        pl.start(format!("Ranking {num_nodes} nodes with alpha {alpha}..."));
        info!("Stopping criterion: {predicate}");

        loop {
            let rank = &self.rank;
            // Rank mass of dangling nodes, redistributed uniformly.
            let dangling: f64 = rank
                .par_iter()
                .zip(outdegrees.par_iter())
                .filter_map(|(&rank, &outdegree)| (outdegree == 0).then_some(rank))
                .sum();

            let mut next = vec![0.0; num_nodes].into_boxed_slice();
            let next_sync = next.as_sync_slice();
            let delta = Accumulator::new(|a: f64, b: f64| a + b);

            do_all(&self.config, &nodes, |&node| {
                let mut sum = 0.0;
                for pred in transpose.successors(node) {
                    sum += rank[pred] / outdegrees[pred] as f64;
                }
                let new_rank = (1.0 - alpha) * uniform + alpha * (sum + dangling * uniform);
                // SAFETY: each node is written exactly once per round.
                unsafe { next_sync[node].set(new_rank) };
                delta.update((new_rank - rank[node]).abs());
            });

            self.norm_delta = delta.reduce().unwrap_or(0.0) * alpha / (1.0 - alpha);
            self.rank = next;
            self.iteration += 1;
            pl.update_and_display();

            if predicate.eval(&PredParams {
                iteration: self.iteration,
                norm_delta: self.norm_delta,
            }) {
                break;
            }
        }
        pl.done();
        info!(
            "PageRank stopped after {} rounds with norm delta {}",
            self.iteration, self.norm_delta
        );
    }
}
