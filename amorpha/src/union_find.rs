/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Concurrent union-find with atomic path compression.
//!
//! A [`UnionFind`] tracks the connected components of a set of nodes under
//! concurrent merges. Parent pointers are atomic node indices;
//! [`find`](UnionFind::find) walks to the root and opportunistically repoints
//! visited nodes directly at it with compare-and-swap. A failed compression
//! CAS is simply dropped: compression is an optimization, correctness only
//! requires that parent chains always lead to a root.
//!
//! [`merge`](UnionFind::merge) attaches the higher-index root under the
//! lower-index one, again by CAS on the child's parent slot. The fixed
//! ordering guarantees progress when many merges race on overlapping
//! components, and the CAS guarantees that for each pair of components
//! exactly one of any number of concurrent merge attempts succeeds.
//!
//! Component-wide aggregates (for example the lightest edge leaving a
//! component in Boruvka's algorithm) live in a separate [`MinSlots`] array
//! indexed by representative: an atomic slot holding the index of the best
//! candidate seen so far, updated by a CAS loop that only ever replaces a
//! candidate with a strictly better one.

use std::sync::atomic::{AtomicUsize, Ordering};

/// A concurrent disjoint-set structure over nodes `0..len`.
///
/// # Examples
///
/// ```
/// use amorpha::union_find::UnionFind;
///
/// let uf = UnionFind::new(4);
/// assert_eq!(uf.merge(0, 1), Some(0));
/// assert_eq!(uf.merge(2, 3), Some(2));
/// // Merging already-unified nodes is a no-op.
/// assert_eq!(uf.merge(1, 0), None);
/// assert_eq!(uf.merge(1, 3), Some(0));
/// assert_eq!(uf.find(3), uf.find(0));
/// assert_eq!(uf.count_roots(), 1);
/// ```
#[derive(Debug)]
pub struct UnionFind {
    parent: Box<[AtomicUsize]>,
}

impl UnionFind {
    /// Creates `len` singleton components.
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).map(AtomicUsize::new).collect(),
        }
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns true if the structure has no nodes.
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Returns the representative of the component of `node`, compressing
    /// the traversed path.
    ///
    /// Concurrent calls may return different representatives only while a
    /// merge involving the component is in flight; once merges quiesce, all
    /// callers agree.
    pub fn find(&self, node: usize) -> usize {
        let mut root = node;
        loop {
            let parent = self.parent[root].load(Ordering::Acquire);
            if parent == root {
                break;
            }
            root = parent;
        }
        // Second pass: repoint the walked chain at the root. A lost CAS
        // means someone else compressed or merged here; both are fine.
        let mut cur = node;
        while cur != root {
            let parent = self.parent[cur].load(Ordering::Relaxed);
            if parent == root {
                break;
            }
            let _ = self.parent[cur].compare_exchange(
                parent,
                root,
                Ordering::Release,
                Ordering::Relaxed,
            );
            cur = parent;
        }
        root
    }

    /// Returns true if `a` and `b` are currently in the same component.
    ///
    /// Only meaningful when no merge involving the two components is in
    /// flight.
    pub fn same(&self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Returns true if `node` is the representative of its component.
    pub fn is_root(&self, node: usize) -> bool {
        self.parent[node].load(Ordering::Acquire) == node
    }

    /// Merges the components of `a` and `b`.
    ///
    /// Returns the surviving representative, or `None` if the two nodes were
    /// already in the same component (including `a == b`). Among any number
    /// of concurrent attempts to merge the same two components, exactly one
    /// returns `Some`.
    pub fn merge(&self, a: usize, b: usize) -> Option<usize> {
        loop {
            let root_a = self.find(a);
            let root_b = self.find(b);
            if root_a == root_b {
                return None;
            }
            // Canonical ordering: the lower-index root survives. This rules
            // out attach cycles between racing merges.
            let (winner, loser) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            if self.parent[loser]
                .compare_exchange(loser, winner, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return Some(winner);
            }
            // The loser stopped being a root underneath us; retry on the
            // new representatives.
        }
    }

    /// Counts the components by scanning for roots.
    ///
    /// Must only be called after merges have quiesced.
    pub fn count_roots(&self) -> usize {
        (0..self.parent.len()).filter(|&n| self.is_root(n)).count()
    }
}

/// The sentinel stored in an empty [`MinSlots`] slot.
const NONE: usize = usize::MAX;

/// Per-representative argmin slots.
///
/// Each slot holds the index of the best candidate recorded so far (for
/// example an edge index into a weight table), or nothing. Updates are
/// strictly-better-only and lock-free: a CAS failure means a racing update
/// landed first, and the loop re-judges against it.
///
/// # Examples
///
/// ```
/// use amorpha::union_find::MinSlots;
///
/// let weights = [30u64, 10, 20];
/// let slots = MinSlots::new(1);
/// assert!(slots.update_min_by_key(0, 0, |e| weights[e]));
/// assert!(slots.update_min_by_key(0, 1, |e| weights[e]));
/// // 20 is not strictly better than 10.
/// assert!(!slots.update_min_by_key(0, 2, |e| weights[e]));
/// assert_eq!(slots.get(0), Some(1));
/// ```
#[derive(Debug)]
pub struct MinSlots {
    slots: Box<[AtomicUsize]>,
}

impl MinSlots {
    /// Creates `len` empty slots.
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| AtomicUsize::new(NONE)).collect(),
        }
    }

    /// Returns the candidate currently stored in `slot`, if any.
    pub fn get(&self, slot: usize) -> Option<usize> {
        match self.slots[slot].load(Ordering::Acquire) {
            NONE => None,
            candidate => Some(candidate),
        }
    }

    /// Empties `slot`.
    pub fn clear(&self, slot: usize) {
        self.slots[slot].store(NONE, Ordering::Release);
    }

    /// Records `candidate` in `slot` if its key is strictly smaller than the
    /// key of the current occupant (or if the slot is empty).
    ///
    /// Returns whether the candidate was stored. `key` must be pure: it may
    /// be re-evaluated on CAS retries.
    pub fn update_min_by_key<K: PartialOrd>(
        &self,
        slot: usize,
        candidate: usize,
        key: impl Fn(usize) -> K,
    ) -> bool {
        debug_assert_ne!(candidate, NONE);
        let slot = &self.slots[slot];
        let mut current = slot.load(Ordering::Acquire);
        loop {
            if current != NONE && key(current) <= key(candidate) {
                return false;
            }
            match slot.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_merge_is_idempotent() {
        let uf = UnionFind::new(2);
        assert_eq!(uf.merge(0, 0), None);
        assert_eq!(uf.merge(0, 1), Some(0));
        assert_eq!(uf.merge(0, 1), None);
        assert_eq!(uf.merge(1, 0), None);
        assert_eq!(uf.count_roots(), 1);
    }

    #[test]
    fn test_find_compresses() {
        let uf = UnionFind::new(8);
        // Build the chain 7 → 6 → 4 → 0 by merging pairs of roots.
        uf.merge(6, 7);
        uf.merge(4, 6);
        uf.merge(0, 4);
        assert_eq!(uf.parent[7].load(Ordering::Relaxed), 6);
        assert_eq!(uf.find(7), 0);
        // The walked chain now points directly at the root.
        assert_eq!(uf.parent[7].load(Ordering::Relaxed), 0);
        assert_eq!(uf.parent[6].load(Ordering::Relaxed), 0);
    }
}
