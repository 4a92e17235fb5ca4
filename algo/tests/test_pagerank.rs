/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use amorpha::exec::Config;
use amorpha::graph::{CsrGraph, CsrGraphBuilder};
use amorpha_algo::rank::pagerank::{preds, PageRank};
use dsi_progress_logger::no_logging;
use predicates::prelude::PredicateBooleanExt;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Builds the transpose of a graph given by its arcs.
fn transpose_of(num_nodes: usize, arcs: &[(usize, usize)]) -> CsrGraph<(), ()> {
    let mut builder = CsrGraphBuilder::new(num_nodes);
    for &(src, dst) in arcs {
        builder.push_arc(dst, src, ());
    }
    builder.build()
}

#[test]
fn test_empty_graph() {
    let transpose = CsrGraphBuilder::<(), ()>::new(0).build();
    let mut pr = PageRank::new(&transpose);
    pr.run(preds::L1Norm::default(), no_logging![]);
    assert!(pr.rank().is_empty());
}

/// On a directed cycle the stationary distribution is uniform for every α.
#[test]
fn test_cycle_is_uniform() {
    const N: usize = 32;
    let arcs: Vec<(usize, usize)> = (0..N).map(|n| (n, (n + 1) % N)).collect();
    let transpose = transpose_of(N, &arcs);
    for alpha in [0.25, 0.5, 0.85] {
        let mut pr = PageRank::new(&transpose);
        pr.alpha(alpha).config(Config::new().threads(4));
        pr.run(preds::L1Norm::try_from(1E-12).unwrap(), no_logging![]);
        for &rank in pr.rank() {
            assert!((rank - 1.0 / N as f64).abs() < 1E-9);
        }
    }
}

/// A star with all leaves pointing at the center: the center accumulates
/// rank, the vector stays stochastic, and the dangling center redistributes
/// its mass.
#[test]
fn test_star_concentrates_rank() {
    const N: usize = 20;
    let arcs: Vec<(usize, usize)> = (1..N).map(|leaf| (leaf, 0)).collect();
    let transpose = transpose_of(N, &arcs);
    let mut pr = PageRank::new(&transpose);
    pr.run(preds::L1Norm::try_from(1E-10).unwrap(), no_logging![]);

    let rank = pr.rank();
    let sum: f64 = rank.iter().sum();
    assert!((sum - 1.0).abs() < 1E-6);
    for leaf in 1..N {
        assert!(rank[0] > rank[leaf]);
        assert!(rank[leaf] > 0.0);
    }
}

/// The round budget must cap the iteration count even far from
/// convergence, and predicates must compose.
#[test]
fn test_stopping_predicates_compose() {
    const N: usize = 64;
    let mut rng = SmallRng::seed_from_u64(7);
    let arcs: Vec<(usize, usize)> = (0..4 * N)
        .map(|_| (rng.random_range(0..N), rng.random_range(0..N)))
        .collect();
    let transpose = transpose_of(N, &arcs);

    let mut pr = PageRank::new(&transpose);
    pr.run(preds::MaxIter::from(3), no_logging![]);
    assert_eq!(pr.iterations(), 3);

    let mut pr = PageRank::new(&transpose);
    pr.run(
        preds::L1Norm::try_from(1E-9).unwrap().or(preds::MaxIter::from(200)),
        no_logging![],
    );
    assert!(pr.iterations() <= 200);
    let sum: f64 = pr.rank().iter().sum();
    assert!((sum - 1.0).abs() < 1E-6);
}
