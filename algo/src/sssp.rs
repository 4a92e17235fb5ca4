/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Data-driven single-source shortest paths.
//!
//! A chaotic-relaxation SSSP: the worklist holds nodes whose distance
//! recently improved; a task re-relaxes the node's outgoing arcs and pushes
//! every neighbor it improves. There is no priority order — the
//! work-stealing executor schedules nodes in whatever order the deques
//! produce — so a node may be relaxed several times with successively better
//! distances. Distances only decrease, which is what makes re-execution
//! after a [conflict abort](amorpha::graph::Conflict) safe: a replayed
//! relaxation can only rediscover improvements.
//!
//! Node payloads are the tentative distances, and all accesses go through
//! the conflict-checked accessor: a task acquires its node under
//! [`Read`](MethodFlag::Read) and each improved neighbor under
//! [`Write`](MethodFlag::Write), so two tasks never interleave updates on
//! the same node. A membership bit per node keeps the worklist free of
//! duplicates.
//!
//! # Examples
//!
//! ```
//! use amorpha::exec::Config;
//! use amorpha::graph::CsrGraphBuilder;
//! use amorpha_algo::sssp::shortest_paths;
//! use dsi_progress_logger::no_logging;
//!
//! // 0 → 1 → 2 with weights 1 and 2, plus a heavy shortcut 0 → 2.
//! let mut builder = CsrGraphBuilder::<u64, u64>::new(3);
//! builder.push_arc(0, 1, 1);
//! builder.push_arc(1, 2, 2);
//! builder.push_arc(0, 2, 10);
//! let graph = builder.build();
//!
//! let paths = shortest_paths(&graph, 0, &Config::new().threads(2), no_logging![]);
//! assert_eq!(paths.dist(0), Some(0));
//! assert_eq!(paths.dist(1), Some(1));
//! assert_eq!(paths.dist(2), Some(3));
//! ```

use amorpha::exec::{for_each_checked, Config, ExecStats};
use amorpha::graph::{CsrGraph, MethodFlag};
use dsi_progress_logger::ProgressLog;
use log::info;
use rayon::prelude::*;
use std::sync::atomic::Ordering;
use sux::bits::AtomicBitVec;

/// The distance payload of a node no path has reached.
pub const UNREACHABLE: u64 = u64::MAX;

/// The result of a [`shortest_paths`] run.
#[derive(Debug)]
pub struct ShortestPaths {
    dist: Box<[u64]>,
    stats: ExecStats,
}

impl ShortestPaths {
    /// Returns the distance of `node` from the source, or `None` if no path
    /// reaches it.
    pub fn dist(&self, node: usize) -> Option<u64> {
        match self.dist[node] {
            UNREACHABLE => None,
            dist => Some(dist),
        }
    }

    /// Returns the whole distance vector; unreached nodes hold
    /// [`UNREACHABLE`].
    pub fn dist_vec(&self) -> &[u64] {
        &self.dist
    }

    /// Returns the executor counters of the run.
    pub fn stats(&self) -> &ExecStats {
        &self.stats
    }
}

/// Computes the distances from `source` to every node of `graph`.
///
/// Arc payloads are the (nonnegative) arc lengths; node payloads are used as
/// the distance table and are overwritten.
pub fn shortest_paths(
    graph: &CsrGraph<u64, u64>,
    source: usize,
    config: &Config,
    pl: &mut impl ProgressLog,
) -> ShortestPaths {
    let num_nodes = graph.num_nodes();
    assert!(source < num_nodes, "Source node {source} out of range");

    pl.start(format!("Computing distances from {source}..."));

    (0..num_nodes).into_par_iter().for_each(|node| {
        // SAFETY: each node is written exactly once, before scheduling.
        unsafe {
            graph
                .data(node)
                .set(if node == source { 0 } else { UNREACHABLE })
        };
    });
    let in_worklist = AtomicBitVec::new(num_nodes);
    in_worklist.set(source, true, Ordering::Relaxed);

    let stats = for_each_checked(config, graph.node_tokens(), [source], |&node, ctx| {
        in_worklist.set(node, false, Ordering::Relaxed);
        let arcs = graph.edges_checked(node, MethodFlag::Read, ctx.frame())?;
        let dist = graph.data_checked(node, MethodFlag::Read, ctx.frame())?.get();
        for arc in arcs {
            let dst = graph.edge_dst(arc);
            // SAFETY: arc payloads are only written at construction time.
            let next = dist.saturating_add(unsafe { graph.edge_data(arc).get() });
            let dst_data = graph.data_checked(dst, MethodFlag::Write, ctx.frame())?;
            if next < dst_data.get() {
                dst_data.set(next);
                if !in_worklist.swap(dst, true, Ordering::Relaxed) {
                    ctx.push(dst);
                }
            }
        }
        Ok(())
    });

    pl.done_with_count(stats.executed as usize);
    info!("Shortest-paths counters: {}", stats);

    let dist = (0..num_nodes)
        // SAFETY: the executor has returned; no task is in flight.
        .map(|node| unsafe { graph.data(node).get() })
        .collect();
    ShortestPaths { dist, stats }
}
