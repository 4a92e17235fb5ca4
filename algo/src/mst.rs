/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Boruvka's minimum spanning forest.
//!
//! Boruvka's algorithm repeatedly finds, for every component, the lightest
//! edge leaving it, and contracts all those edges at once. It parallelizes
//! naturally — components find their lightest edges independently — and is
//! implemented here bulk-synchronously on the [round driver](Rounds), which
//! avoids merging edge lists: each round runs a *merge* pass (contract the
//! recorded lightest edges through the [concurrent union-find](UnionFind))
//! followed by a *find* pass (rescan for the next candidate edge and record
//! it in the per-representative [argmin slot](MinSlots)).
//!
//! Work items carry the offset reached in their node's adjacency list, so a
//! rescan resumes where the previous one stopped; this requires every
//! adjacency list to be sorted by weight
//! ([`CsrGraphBuilder::sort_by_data`](amorpha::graph::CsrGraphBuilder::sort_by_data)).
//! Edges heavier than the current weight threshold are deferred to the
//! pending bucket of the [three-generation worklist](Generations); when a
//! level runs dry the threshold doubles and the bucket is admitted. Starting
//! with a low threshold keeps early rounds short and cheap, when most merges
//! are between singletons.
//!
//! # Requirements
//!
//! The graph must be symmetric: every edge must be present as two arcs with
//! the same weight. Weights must be below [`u64::MAX`] and adjacency lists
//! sorted by weight; both are verified before scheduling begins.
//!
//! # Examples
//!
//! ```
//! use amorpha::graph::CsrGraphBuilder;
//! use amorpha_algo::mst::Boruvka;
//! use dsi_progress_logger::no_logging;
//!
//! // A 5-cycle with weights 1..=5: the forest keeps the 4 lightest edges.
//! let mut builder = CsrGraphBuilder::<(), u64>::new(5);
//! for n in 0..5 {
//!     builder.push_edge(n, (n + 1) % 5, n as u64 + 1);
//! }
//! builder.sort_by_data();
//! let graph = builder.build();
//!
//! let forest = Boruvka::new(&graph).run(no_logging![]).unwrap();
//! assert_eq!(forest.total_weight, 10);
//! assert_eq!(forest.num_trees, 1);
//! ```

use amorpha::exec::{Config, ExecStats, RoundCtx, Rounds};
use amorpha::graph::CsrGraph;
use amorpha::union_find::{MinSlots, UnionFind};
use amorpha::worklist::{Advance, Bag, Generations};
use dsi_progress_logger::ProgressLog;
use log::info;
use rayon::prelude::*;
use thiserror::Error;

/// The errors reported by the spanning-forest computation and its
/// verification passes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MstError {
    /// An edge weight equals [`u64::MAX`], which the threshold arithmetic
    /// cannot represent. Detected during preprocessing, before scheduling.
    #[error("Edge weights out of representable range")]
    WeightsOutOfRange,
    /// Some adjacency list is not sorted by weight; rescans would not
    /// resume at the lightest remaining edge.
    #[error("The adjacency lists of node {node} are not sorted by weight")]
    EdgesNotSorted { node: usize },
    /// Verification: two adjacent nodes ended up in different components.
    #[error("Nodes {src} and {dst} are adjacent but in different components")]
    SplitComponent { src: usize, dst: usize },
    /// Verification: a tree edge crosses two components.
    #[error("Tree edge ({src}, {dst}) crosses two components")]
    TreeEdgeAcrossComponents { src: usize, dst: usize },
    /// Verification: the edge count does not match a forest.
    #[error("Not a forest: expected {expected} tree edges but found {found}")]
    NotAForest { expected: usize, found: usize },
}

/// A work item: a node, the offset its adjacency scan reached, and the arc
/// the scan stopped at.
#[derive(Debug, Clone, Copy)]
struct WorkItem {
    src: usize,
    /// Offset of `arc` within the adjacency list of `src`.
    cur: usize,
    arc: usize,
}

/// An edge selected for the spanning forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeEdge {
    pub src: usize,
    pub dst: usize,
    /// The arc index of the `src → dst` direction.
    pub arc: usize,
}

/// The result of a [`Boruvka`] run.
#[derive(Debug)]
pub struct SpanningForest {
    /// The selected edges, in no particular order.
    pub edges: Vec<TreeEdge>,
    /// The sum of the selected edges' weights.
    pub total_weight: u64,
    /// The number of trees, i.e. of connected components of the input.
    pub num_trees: usize,
    components: UnionFind,
    stats: ExecStats,
}

impl SpanningForest {
    /// Returns the union-find structure the contraction left behind; its
    /// roots are the trees of the forest.
    pub fn components(&self) -> &UnionFind {
        &self.components
    }

    /// Returns the executor counters of the run.
    pub fn stats(&self) -> &ExecStats {
        &self.stats
    }
}

/// A Boruvka minimum-spanning-forest computation.
///
/// Configured via setters and executed via [`run`](Self::run); see the
/// [module documentation](self) for the algorithm and its requirements.
#[derive(Debug)]
pub struct Boruvka<'a> {
    graph: &'a CsrGraph<(), u64>,
    config: Config,
}

impl<'a> Boruvka<'a> {
    /// Creates a computation over the given symmetric, weight-sorted graph.
    pub fn new(graph: &'a CsrGraph<(), u64>) -> Self {
        Self {
            graph,
            config: Config::new(),
        }
    }

    /// Sets the executor configuration.
    pub fn config(&mut self, config: Config) -> &mut Self {
        self.config = config;
        self
    }

    /// Runs the computation.
    pub fn run(&mut self, pl: &mut impl ProgressLog) -> Result<SpanningForest, MstError> {
        let graph = self.graph;
        let num_nodes = graph.num_nodes();

        // Preprocessing: reject out-of-range weights and unsorted adjacency
        // lists before any scheduling happens.
        let heaviest = (0..graph.num_arcs())
            .into_par_iter()
            // SAFETY: arc payloads are only written at construction time.
            .map(|arc| unsafe { graph.edge_data(arc).get() })
            .max();
        if heaviest == Some(u64::MAX) {
            return Err(MstError::WeightsOutOfRange);
        }
        if let Some(node) = (0..num_nodes).into_par_iter().find_first(|&node| {
            let weights: Vec<u64> = graph
                .edges(node)
                // SAFETY: as above.
                .map(|arc| unsafe { graph.edge_data(arc).get() })
                .collect();
            weights.windows(2).any(|pair| pair[0] > pair[1])
        }) {
            return Err(MstError::EdgesNotSorted { node });
        }

        let uf = UnionFind::new(num_nodes);
        let lightest = MinSlots::new(num_nodes);
        let forest: Bag<TreeEdge> = Bag::new();
        let heaviest = heaviest.unwrap_or(0);
        // Only read and written between passes.
        let mut limit = (heaviest / 5).max(1);

        pl.item_name("round");
        pl.start(format!(
            "Computing spanning forest ({num_nodes} nodes, {} arcs, heaviest edge {heaviest})...",
            graph.num_arcs()
        ));

        // Initialization sweep: record every node's lightest incident edge.
        // No threshold here: a node's first candidate may be arbitrarily
        // heavy, and deferring it would just re-discover it later.
        let seed = Bag::new();
        (0..num_nodes).into_par_iter().for_each(|src| {
            find_lightest(graph, &uf, &lightest, None, src, 0, |item| seed.push(item), |_| ());
        });

        let mut rounds = Rounds::from_generations(
            self.config.clone(),
            Generations::seeded(seed.into_vec()),
        );
        loop {
            // Merge pass: contract the edges that are still their
            // component's recorded lightest.
            rounds.pass(|item: &WorkItem, _ctx: &RoundCtx<'_, WorkItem>| {
                let rep = uf.find(item.src);
                if lightest.get(rep) == Some(item.arc) {
                    let dst = graph.edge_dst(item.arc);
                    if let Some(survivor) = uf.merge(item.src, dst) {
                        lightest.clear(survivor);
                        forest.push(TreeEdge {
                            src: item.src,
                            dst,
                            arc: item.arc,
                        });
                    }
                }
            });
            // Find pass: rescan from where each item stopped, deferring
            // arcs beyond the current threshold.
            let threshold = limit;
            rounds.pass(|item: &WorkItem, ctx: &RoundCtx<'_, WorkItem>| {
                find_lightest(
                    graph,
                    &uf,
                    &lightest,
                    Some(threshold),
                    item.src,
                    item.cur,
                    |found| ctx.push(found),
                    |deferred| ctx.defer(deferred),
                );
            });
            match rounds.advance() {
                Advance::Round => {}
                Advance::Bucket => {
                    // The level ran dry; admit heavier edges.
                    limit = limit.saturating_mul(2);
                }
                Advance::Done => break,
            }
            pl.light_update();
        }
        pl.done();

        let stats = rounds.into_stats();
        info!("Spanning forest counters: {}", stats);

        let edges = forest.into_vec();
        let total_weight = edges
            .iter()
            // SAFETY: the round threads have been joined.
            .map(|edge| unsafe { graph.edge_data(edge.arc).get() })
            .sum();
        let num_trees = uf.count_roots();
        Ok(SpanningForest {
            edges,
            total_weight,
            num_trees,
            components: uf,
            stats,
        })
    }
}

/// Scans the adjacency list of `src` from `start` for the lightest arc
/// leaving the component of `src`.
///
/// The candidate is handed to `push` and recorded in the representative's
/// argmin slot; an arc heavier than `limit` stops the scan and is handed to
/// `defer` instead.
fn find_lightest(
    graph: &CsrGraph<(), u64>,
    uf: &UnionFind,
    lightest: &MinSlots,
    limit: Option<u64>,
    src: usize,
    start: usize,
    push: impl Fn(WorkItem),
    defer: impl Fn(WorkItem),
) {
    for (cur, arc) in graph.edges(src).enumerate().skip(start) {
        // SAFETY: arc payloads are only written at construction time.
        let weight = unsafe { graph.edge_data(arc).get() };
        if let Some(limit) = limit {
            if weight > limit {
                defer(WorkItem { src, cur, arc });
                return;
            }
        }
        let rep = uf.find(src);
        if rep != uf.find(graph.edge_dst(arc)) {
            push(WorkItem { src, cur, arc });
            lightest.update_min_by_key(rep, arc, |candidate| {
                // SAFETY: as above.
                unsafe { graph.edge_data(candidate).get() }
            });
            return;
        }
    }
}

/// Checks that `forest` is a minimum-spanning-forest-shaped result for
/// `graph`: adjacent nodes share a component, tree edges are
/// intra-component, and the edge count matches the component count.
///
/// The runtime only detects scheduling-level conflicts; this pass is how
/// algorithm-level invariants are checked after the fact.
pub fn verify(graph: &CsrGraph<(), u64>, forest: &SpanningForest) -> Result<(), MstError> {
    let components = forest.components();
    if let Some((src, dst)) = (0..graph.num_nodes()).into_par_iter().find_map_any(|src| {
        graph.edges(src).find_map(|arc| {
            let dst = graph.edge_dst(arc);
            (components.find(src) != components.find(dst)).then_some((src, dst))
        })
    }) {
        return Err(MstError::SplitComponent { src, dst });
    }
    if let Some(edge) = forest
        .edges
        .par_iter()
        .find_any(|edge| components.find(edge.src) != components.find(edge.dst))
    {
        return Err(MstError::TreeEdgeAcrossComponents {
            src: edge.src,
            dst: edge.dst,
        });
    }
    let expected = graph.num_nodes() - forest.num_trees;
    if forest.edges.len() != expected {
        return Err(MstError::NotAForest {
            expected,
            found: forest.edges.len(),
        });
    }
    Ok(())
}
