/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Graph algorithms built on the [`amorpha`] runtime.
//!
//! Every algorithm here is a client of the runtime: it seeds a worklist,
//! submits task functions to one of the executors, and touches shared graph
//! state through the runtime's accessor and lock-free primitives. Together
//! they exercise all the scheduling disciplines the runtime offers:
//!
//! - [`mst`]: Boruvka's minimum spanning forest, on the bulk-synchronous
//!   round driver with a three-generation worklist and concurrent
//!   union-find;
//! - [`sssp`]: data-driven shortest paths, on the work-stealing executor
//!   with conflict-checked (abort/retry) distance updates;
//! - [`rank`]: PageRank, as round-synchronous sweeps with per-thread
//!   accumulators and composable stopping predicates;
//! - [`components`]: connected components, as a do-all over the concurrent
//!   union-find.

pub mod components;
pub mod mst;
pub mod rank;
pub mod sssp;

pub mod prelude {
    pub use crate::components::connected_components;
    pub use crate::mst::Boruvka;
    pub use crate::rank::pagerank::PageRank;
    pub use crate::sssp::shortest_paths;
}
