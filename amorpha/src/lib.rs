/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A shared-memory runtime for amorphous data-parallel graph algorithms.
//!
//! Irregular graph algorithms discover most of their work while they run:
//! processing one node creates work on a handful of neighboring nodes, and
//! which nodes conflict with which is only known at run time. This crate
//! provides the scheduling and concurrency-control layer for such algorithms:
//!
//! - [`graph`]: a compressed sparse-row graph with immutable topology,
//!   mutable per-node/per-edge payloads, and a conflict-checked accessor that
//!   aborts and requeues tasks touching the same node concurrently;
//! - [`exec`]: a work-stealing [`for_each`](exec::for_each) executor for
//!   dynamically growing worklists and a bulk-synchronous
//!   [round driver](exec::Rounds) for generation-at-a-time processing;
//! - [`termination`]: Dijkstra-style dual-ring termination detection, which
//!   lets the workers agree that no work is left without a global barrier;
//! - [`union_find`]: a concurrent disjoint-set structure with atomic path
//!   compression, used to merge components without locks;
//! - [`worklist`]: sharded concurrent bags and the three-generation worklist
//!   used for leveled (bucketed) processing;
//! - [`per_worker`] and [`reduce`]: per-thread storage and accumulators that
//!   are combined only after a phase has terminated.
//!
//! Algorithms are clients of this crate: they seed a worklist, hand the
//! executor a task function of the form `|item, ctx| { … }`, and access
//! shared graph state exclusively through the accessor. See the
//! `amorpha-algo` crate for complete examples (minimum spanning forest,
//! shortest paths, PageRank, connected components).

pub mod exec;
pub mod graph;
pub mod per_worker;
pub mod reduce;
pub mod termination;
pub mod union_find;
pub mod worklist;

pub mod prelude {
    pub use crate::exec::{self, Config, Ctx, ExecStats, RoundCtx, Rounds};
    pub use crate::graph::{Conflict, CsrGraph, CsrGraphBuilder, Frame, MethodFlag};
    pub use crate::reduce::Accumulator;
    pub use crate::termination::TerminationDetection;
    pub use crate::union_find::{MinSlots, UnionFind};
    pub use crate::worklist::{Advance, Bag, Generations};
}
