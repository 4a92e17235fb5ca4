/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A compressed sparse-row graph with conflict-checked payload access.
//!
//! A [`CsrGraph`] separates immutable topology from mutable payload. The
//! topology — node count and, for each node, the range of its outgoing arcs —
//! is a plain offset/successor pair that every thread may read freely. The
//! payload — one value of type `N` per node and one value of type `E` per
//! arc — is owned by the graph and reached only through accessor calls:
//!
//! - [`data_checked`](CsrGraph::data_checked) and
//!   [`edges_checked`](CsrGraph::edges_checked) take a [`MethodFlag`] and an
//!   acquisition [`Frame`]; under [`Read`](MethodFlag::Read) or
//!   [`Write`](MethodFlag::Write) they first take the node's token, failing
//!   with [`Conflict`] if another in-flight task holds it;
//! - [`data`](CsrGraph::data) and [`edge_data`](CsrGraph::edge_data) return
//!   the raw [`SyncCell`] for algorithms with externally proven
//!   conflict-freedom, which read and write it `unsafe`ly in the usual
//!   [`sync_cell_slice`] style.
//!
//! Graphs are built through a [`CsrGraphBuilder`]; loaders parse whatever
//! external format they support, feed arcs to the builder, and hand the
//! frozen graph to the runtime.

mod acquire;

pub use acquire::{Conflict, Frame, MethodFlag, NodeTokens};

use std::ops::Range;
use sync_cell_slice::SyncCell;

/// A frozen graph: immutable compressed sparse-row topology plus mutable
/// node and arc payloads.
///
/// # Examples
///
/// ```
/// use amorpha::graph::CsrGraphBuilder;
///
/// let mut builder = CsrGraphBuilder::<u64, u64>::new(3);
/// builder.push_arc(0, 1, 10);
/// builder.push_arc(0, 2, 20);
/// builder.push_arc(2, 0, 30);
/// let graph = builder.build_with(|node| node as u64);
///
/// assert_eq!(graph.num_nodes(), 3);
/// assert_eq!(graph.num_arcs(), 3);
/// assert_eq!(graph.outdegree(0), 2);
/// assert_eq!(graph.successors(0).collect::<Vec<_>>(), vec![1, 2]);
/// // Payload access outside any parallel phase.
/// assert_eq!(unsafe { graph.data(2).get() }, 2);
/// ```
pub struct CsrGraph<N, E> {
    /// Degree-cumulative offsets; `offsets[n]..offsets[n + 1]` are the arc
    /// indices of node `n`.
    offsets: Box<[usize]>,
    dsts: Box<[usize]>,
    node_data: Box<[SyncCell<N>]>,
    edge_data: Box<[SyncCell<E>]>,
    tokens: NodeTokens,
}

impl<N, E> std::fmt::Debug for CsrGraph<N, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrGraph")
            .field("num_nodes", &self.num_nodes())
            .field("num_arcs", &self.num_arcs())
            .finish_non_exhaustive()
    }
}

impl<N, E> CsrGraph<N, E> {
    /// Returns the number of nodes.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Returns the number of arcs.
    #[inline]
    pub fn num_arcs(&self) -> usize {
        self.dsts.len()
    }

    /// Returns the outdegree of `node`.
    #[inline]
    pub fn outdegree(&self, node: usize) -> usize {
        self.offsets[node + 1] - self.offsets[node]
    }

    /// Returns the arc indices of the arcs leaving `node`.
    ///
    /// This touches topology only and needs no token.
    #[inline]
    pub fn edges(&self, node: usize) -> Range<usize> {
        self.offsets[node]..self.offsets[node + 1]
    }

    /// Returns the destination of the arc with index `arc`.
    #[inline]
    pub fn edge_dst(&self, arc: usize) -> usize {
        self.dsts[arc]
    }

    /// Returns the successors of `node`.
    #[inline]
    pub fn successors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges(node).map(move |arc| self.dsts[arc])
    }

    /// Returns the token domain of this graph, from which executors and
    /// tests build acquisition [`Frame`]s.
    pub fn node_tokens(&self) -> &NodeTokens {
        &self.tokens
    }

    /// Returns the raw payload cell of `node`, without conflict tracking.
    ///
    /// Reading or writing the cell is `unsafe`: the caller must guarantee
    /// that no concurrently scheduled task accesses the same node, as under
    /// [`MethodFlag::Unprotected`].
    #[inline]
    pub fn data(&self, node: usize) -> &SyncCell<N> {
        &self.node_data[node]
    }

    /// Returns the raw payload cell of the arc with index `arc`, without
    /// conflict tracking.
    ///
    /// Same discipline as [`data`](Self::data); arc payloads are guarded by
    /// the token of their *source* node.
    #[inline]
    pub fn edge_data(&self, arc: usize) -> &SyncCell<E> {
        &self.edge_data[arc]
    }

    /// Returns a guarded handle to the payload of `node`, acquiring its
    /// token as requested by `flag`.
    ///
    /// On [`Conflict`] the caller must abort: propagate the conflict with
    /// `?` so the executor can requeue the work item.
    pub fn data_checked<'g>(
        &'g self,
        node: usize,
        flag: MethodFlag,
        frame: &Frame<'_>,
    ) -> Result<DataRef<'g, N>, Conflict> {
        frame.acquire(node, flag)?;
        Ok(DataRef {
            cell: &self.node_data[node],
        })
    }

    /// Returns the arc indices of the arcs leaving `node`, acquiring the
    /// node's token as requested by `flag`.
    pub fn edges_checked(
        &self,
        node: usize,
        flag: MethodFlag,
        frame: &Frame<'_>,
    ) -> Result<Range<usize>, Conflict> {
        frame.acquire(node, flag)?;
        Ok(self.edges(node))
    }
}

/// A payload handle returned by the conflict-checked accessor.
///
/// The handle is valid for the duration of the task that acquired it; tasks
/// run to completion or abort, so it cannot outlive its token.
pub struct DataRef<'a, T> {
    cell: &'a SyncCell<T>,
}

impl<T> core::fmt::Debug for DataRef<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DataRef").finish_non_exhaustive()
    }
}

impl<T: Copy> DataRef<'_, T> {
    /// Reads the payload.
    #[inline]
    pub fn get(&self) -> T {
        // SAFETY: the frame that created this handle holds the node's token
        // until the task commits or aborts, or the task runs under the
        // unprotected discipline.
        unsafe { self.cell.get() }
    }
}

impl<T> DataRef<'_, T> {
    /// Writes the payload.
    #[inline]
    pub fn set(&self, value: T) {
        // SAFETY: as in [`get`](Self::get).
        unsafe { self.cell.set(value) }
    }
}

/// An arc-list accumulator that freezes into a [`CsrGraph`].
///
/// Arcs are directed; use [`push_edge`](Self::push_edge) to add both
/// directions of an undirected edge. [`sort_by_data`](Self::sort_by_data)
/// orders every adjacency list by arc payload, which algorithms scanning for
/// the lightest arc first (e.g. Boruvka) require.
#[derive(Debug, Clone)]
pub struct CsrGraphBuilder<N, E> {
    num_nodes: usize,
    arcs: Vec<(usize, usize, E)>,
    _marker: std::marker::PhantomData<N>,
}

impl<N, E> CsrGraphBuilder<N, E> {
    /// Creates a builder for a graph with `num_nodes` nodes.
    pub fn new(num_nodes: usize) -> Self {
        Self {
            num_nodes,
            arcs: Vec::new(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Adds the arc `src → dst` with the given payload.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is out of range.
    pub fn push_arc(&mut self, src: usize, dst: usize, data: E) {
        assert!(
            src < self.num_nodes && dst < self.num_nodes,
            "Arc ({src}, {dst}) out of range for {} nodes",
            self.num_nodes
        );
        self.arcs.push((src, dst, data));
    }

    /// Adds both arcs of the undirected edge `u — v`.
    pub fn push_edge(&mut self, u: usize, v: usize, data: E)
    where
        E: Clone,
    {
        self.push_arc(u, v, data.clone());
        self.push_arc(v, u, data);
    }

    /// Returns the number of arcs added so far.
    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Sorts every adjacency list by arc payload, lightest first.
    pub fn sort_by_data(&mut self)
    where
        E: Ord,
    {
        self.arcs
            .sort_by(|(s0, d0, w0), (s1, d1, w1)| (s0, w0, d0).cmp(&(s1, w1, d1)));
    }

    /// Freezes the builder, initializing the payload of node `n` with
    /// `node_init(n)`.
    pub fn build_with(self, mut node_init: impl FnMut(usize) -> N) -> CsrGraph<N, E> {
        let num_nodes = self.num_nodes;
        let mut arcs = self.arcs;
        // A stable sort preserves any payload order established by
        // [`sort_by_data`](Self::sort_by_data).
        arcs.sort_by_key(|&(src, _, _)| src);

        let mut offsets = Vec::with_capacity(num_nodes + 1);
        let mut dsts = Vec::with_capacity(arcs.len());
        let mut edge_data = Vec::with_capacity(arcs.len());
        offsets.push(0);
        let mut last_src = 0;
        for (src, dst, data) in arcs {
            while last_src < src {
                offsets.push(dsts.len());
                last_src += 1;
            }
            dsts.push(dst);
            edge_data.push(SyncCell::new(data));
        }
        for _ in last_src..num_nodes {
            offsets.push(dsts.len());
        }

        CsrGraph {
            offsets: offsets.into(),
            dsts: dsts.into(),
            node_data: (0..num_nodes).map(|n| SyncCell::new(node_init(n))).collect(),
            edge_data: edge_data.into(),
            tokens: NodeTokens::new(num_nodes),
        }
    }

    /// Freezes the builder with default node payloads.
    pub fn build(self) -> CsrGraph<N, E>
    where
        N: Default,
    {
        self.build_with(|_| N::default())
    }
}
