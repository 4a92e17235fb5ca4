/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Connected components of symmetric graphs.
//!
//! A do-all over the nodes that merges every arc's endpoints in a
//! [concurrent union-find](UnionFind): no conflict detection is needed
//! because the union-find itself is lock-free, and the scheduler only has to
//! spread the (irregularly sized) adjacency lists across the workers. A
//! final sequential pass renumbers the representatives into compact
//! component indices.
//!
//! # Requirements
//!
//! The graph should be symmetric; no check is performed, but on a
//! non-symmetric graph the result describes the components of the
//! symmetrized graph anyway (merging is direction-blind).
//!
//! # Examples
//!
//! ```
//! use amorpha::exec::Config;
//! use amorpha::graph::CsrGraphBuilder;
//! use amorpha_algo::components::connected_components;
//! use dsi_progress_logger::no_logging;
//!
//! // Two edges and an isolated node: three components.
//! let mut builder = CsrGraphBuilder::<(), ()>::new(5);
//! builder.push_edge(0, 1, ());
//! builder.push_edge(2, 3, ());
//! let graph = builder.build();
//!
//! let components = connected_components(&graph, &Config::new().threads(2), no_logging![]);
//! assert_eq!(components.count(), 3);
//! assert_eq!(components.component(0), components.component(1));
//! assert_ne!(components.component(1), components.component(4));
//! ```

use amorpha::exec::{for_each, Config};
use amorpha::graph::CsrGraph;
use amorpha::union_find::UnionFind;
use dsi_progress_logger::ProgressLog;
use log::info;

/// A labeling of the nodes of a graph by connected component.
///
/// Component indices are compact (`0..count`) and assigned in increasing
/// order of the components' lowest-numbered nodes.
#[derive(Debug)]
pub struct Components {
    count: usize,
    component: Box<[usize]>,
}

impl Components {
    /// Returns the number of components.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the component index of `node`.
    pub fn component(&self, node: usize) -> usize {
        self.component[node]
    }

    /// Returns the whole labeling.
    pub fn labels(&self) -> &[usize] {
        &self.component
    }
}

/// Computes the connected components of a symmetric graph.
pub fn connected_components<N: Send + Sync, E: Send + Sync>(
    graph: &CsrGraph<N, E>,
    config: &Config,
    pl: &mut impl ProgressLog,
) -> Components {
    let num_nodes = graph.num_nodes();
    pl.item_name("node");
    pl.expected_updates(Some(num_nodes));
    pl.start("Computing connected components...");

    let uf = UnionFind::new(num_nodes);
    let stats = for_each(config, 0..num_nodes, |&node, _ctx| {
        for succ in graph.successors(node) {
            uf.merge(node, succ);
        }
        Ok(())
    });
    info!("Connected-components counters: {}", stats);

    // The union-find has quiesced: compact the representatives. The lowest
    // node of each component is its own representative because merges
    // always keep the lower-index root.
    let mut component = vec![0; num_nodes].into_boxed_slice();
    let mut count = 0;
    for node in 0..num_nodes {
        if uf.is_root(node) {
            component[node] = count;
            count += 1;
        } else {
            component[node] = component[uf.find(node)];
        }
    }

    pl.done_with_count(num_nodes);
    Components { count, component }
}
