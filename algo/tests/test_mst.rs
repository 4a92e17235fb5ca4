/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use amorpha::exec::Config;
use amorpha::graph::{CsrGraph, CsrGraphBuilder};
use amorpha_algo::mst::{verify, Boruvka, MstError};
use dsi_progress_logger::no_logging;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn build(num_nodes: usize, edges: &[(usize, usize, u64)]) -> CsrGraph<(), u64> {
    let mut builder = CsrGraphBuilder::new(num_nodes);
    for &(u, v, w) in edges {
        builder.push_edge(u, v, w);
    }
    builder.sort_by_data();
    builder.build()
}

/// Kruskal with a plain sequential disjoint-set, as the oracle.
fn kruskal(num_nodes: usize, edges: &[(usize, usize, u64)]) -> u64 {
    fn find(parent: &mut [usize], x: usize) -> usize {
        if parent[x] != x {
            parent[x] = find(parent, parent[x]);
        }
        parent[x]
    }
    let mut parent: Vec<usize> = (0..num_nodes).collect();
    let mut sorted = edges.to_vec();
    sorted.sort_by_key(|&(_, _, w)| w);
    let mut total = 0;
    for (u, v, w) in sorted {
        let (ru, rv) = (find(&mut parent, u), find(&mut parent, v));
        if ru != rv {
            parent[ru] = rv;
            total += w;
        }
    }
    total
}

/// A 5-cycle with weights {1, 2, 3, 4, 5} keeps the 4 lightest edges, and
/// exactly one root remains.
#[test]
fn test_five_cycle() {
    let edges: Vec<(usize, usize, u64)> =
        (0..5).map(|n| (n, (n + 1) % 5, n as u64 + 1)).collect();
    let graph = build(5, &edges);

    let forest = Boruvka::new(&graph)
        .config(Config::new().threads(4))
        .run(no_logging![])
        .unwrap();

    assert_eq!(forest.total_weight, 10);
    assert_eq!(forest.edges.len(), 4);
    assert_eq!(forest.num_trees, 1);
    assert_eq!(forest.components().count_roots(), 1);
    assert!(verify(&graph, &forest).is_ok());
}

/// Random connected graphs with distinct weights have a unique minimum
/// spanning tree; Boruvka must agree with Kruskal on its weight.
#[test]
fn test_matches_kruskal_on_random_graphs() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = SmallRng::seed_from_u64(0x0b0f);
    for num_nodes in [2, 10, 100, 400] {
        let extra = num_nodes * 2;
        let mut pairs: Vec<(usize, usize)> = (1..num_nodes)
            .map(|node| (node, rng.random_range(0..node)))
            .collect();
        for _ in 0..extra {
            let u = rng.random_range(0..num_nodes);
            let v = rng.random_range(0..num_nodes);
            if u != v {
                pairs.push((u, v));
            }
        }
        // Distinct weights: a shuffled permutation of 1..=m.
        let mut weights: Vec<u64> = (1..=pairs.len() as u64).collect();
        weights.shuffle(&mut rng);
        let edges: Vec<(usize, usize, u64)> = pairs
            .into_iter()
            .zip(weights)
            .map(|((u, v), w)| (u, v, w))
            .collect();

        let graph = build(num_nodes, &edges);
        let forest = Boruvka::new(&graph).run(no_logging![]).unwrap();

        assert_eq!(forest.total_weight, kruskal(num_nodes, &edges));
        assert_eq!(forest.num_trees, 1);
        assert_eq!(forest.edges.len(), num_nodes - 1);
        assert!(verify(&graph, &forest).is_ok());
    }
}

/// A disconnected input yields one tree per component.
#[test]
fn test_forest_of_components() {
    // Two triangles and two isolated nodes.
    let edges = [
        (0, 1, 1),
        (1, 2, 2),
        (2, 0, 3),
        (3, 4, 4),
        (4, 5, 5),
        (5, 3, 6),
    ];
    let graph = build(8, &edges);
    let forest = Boruvka::new(&graph).run(no_logging![]).unwrap();

    assert_eq!(forest.num_trees, 4);
    assert_eq!(forest.edges.len(), 4);
    assert_eq!(forest.total_weight, 1 + 2 + 4 + 5);
    assert!(verify(&graph, &forest).is_ok());
}

#[test]
fn test_rejects_out_of_range_weights() {
    let graph = build(2, &[(0, 1, u64::MAX)]);
    assert_eq!(
        Boruvka::new(&graph).run(no_logging![]).unwrap_err(),
        MstError::WeightsOutOfRange
    );
}

#[test]
fn test_rejects_unsorted_adjacency() {
    let mut builder = CsrGraphBuilder::<(), u64>::new(3);
    builder.push_arc(0, 1, 5);
    builder.push_arc(0, 2, 1);
    builder.push_arc(1, 0, 5);
    builder.push_arc(2, 0, 1);
    // No sort_by_data: node 0's list is [5, 1].
    let graph = builder.build();
    assert_eq!(
        Boruvka::new(&graph).run(no_logging![]).unwrap_err(),
        MstError::EdgesNotSorted { node: 0 }
    );
}

/// Tampering with the result must be caught by the forest check.
#[test]
fn test_verify_detects_missing_edge() {
    let edges: Vec<(usize, usize, u64)> =
        (0..5).map(|n| (n, (n + 1) % 5, n as u64 + 1)).collect();
    let graph = build(5, &edges);
    let mut forest = Boruvka::new(&graph).run(no_logging![]).unwrap();

    forest.edges.pop();
    assert_eq!(
        verify(&graph, &forest).unwrap_err(),
        MstError::NotAForest {
            expected: 4,
            found: 3
        }
    );
}
