/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use amorpha::exec::{Config, Rounds};
use amorpha::worklist::Advance;
use std::sync::atomic::{AtomicU64, Ordering};

/// Items deferred past the current level must not be processed until every
/// round at the level has run dry.
#[test]
fn test_levels_run_dry_before_buckets() {
    // Items are (value, level); values above the threshold are deferred.
    const THRESHOLD: u64 = 100;
    let seed: Vec<u64> = (0..200).collect();
    let processed_below = AtomicU64::new(0);
    let first_above = AtomicU64::new(u64::MAX);

    let mut rounds = Rounds::new(Config::new().threads(4), seed);
    let mut buckets = 0;
    loop {
        rounds.pass(|&item, ctx| {
            if buckets == 0 && item >= THRESHOLD {
                ctx.defer(item);
                return;
            }
            if item < THRESHOLD {
                processed_below.fetch_add(1, Ordering::Relaxed);
            } else {
                // By the time any deferred item runs, the whole first level
                // must be done.
                first_above.fetch_min(
                    processed_below.load(Ordering::Relaxed),
                    Ordering::Relaxed,
                );
            }
        });
        match rounds.advance() {
            Advance::Round => {}
            Advance::Bucket => buckets += 1,
            Advance::Done => break,
        }
    }

    assert_eq!(buckets, 1);
    assert_eq!(processed_below.into_inner(), 100);
    assert_eq!(first_above.into_inner(), 100);
}

/// Two passes over the same generation see the same frozen worklist, and
/// pushes from either become visible only after the advance.
#[test]
fn test_passes_share_a_frozen_generation() {
    let mut rounds = Rounds::new(Config::new().threads(2), vec![1u64, 2, 3]);
    let first = AtomicU64::new(0);
    let second = AtomicU64::new(0);

    rounds.pass(|&item, ctx| {
        first.fetch_add(item, Ordering::Relaxed);
        ctx.push(item * 10);
    });
    rounds.pass(|&item, _ctx| {
        second.fetch_add(item, Ordering::Relaxed);
    });
    assert_eq!(first.load(Ordering::Relaxed), 6);
    // The second pass saw the original generation, not the pushes.
    assert_eq!(second.load(Ordering::Relaxed), 6);

    assert_eq!(rounds.advance(), Advance::Round);
    let mut next: Vec<u64> = rounds.current().to_vec();
    next.sort_unstable();
    assert_eq!(next, vec![10, 20, 30]);
    assert_eq!(rounds.stats().rounds, 2);
}
