/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Per-node tokens and acquisition frames.
//!
//! Speculative tasks must not observe each other's writes to the same node.
//! Rather than blocking on a lock, an accessor call acquires the node's
//! token; if the token is already held by another in-flight task the call
//! fails with [`Conflict`], the task aborts, and the executor requeues its
//! original work item. All tokens held by a task are released when the task
//! commits or aborts, so a task either runs in isolation on the nodes it
//! touched or leaves no trace beyond writes it is prepared to redo.
//!
//! Tokens are exclusive under both [`MethodFlag::Read`] and
//! [`MethodFlag::Write`]: serializing readers costs some parallelism but
//! makes the read-then-write pattern of most graph operators safe without an
//! upgrade protocol.

use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The signal that a speculative task lost its node to a concurrent task.
///
/// Not an error: the executor catches it, releases the task's tokens and
/// requeues the work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict;

/// The concurrency level requested by an accessor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MethodFlag {
    /// No conflict tracking. The caller guarantees that no two concurrently
    /// scheduled tasks touch the same node. This is a documented escape
    /// hatch for algorithms with externally proven conflict-freedom, not a
    /// default.
    Unprotected,
    /// Acquire the node's token before reading.
    Read,
    /// Acquire the node's token before writing.
    #[default]
    Write,
}

/// The token word of a free node.
const FREE: usize = 0;

/// One token word per node; `FREE` or the tag of the holding frame.
#[derive(Debug)]
pub struct NodeTokens {
    owners: Box<[AtomicUsize]>,
}

impl NodeTokens {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            owners: (0..len).map(|_| AtomicUsize::new(FREE)).collect(),
        }
    }

    /// An empty token domain, for executors running task functions that
    /// never acquire.
    pub(crate) fn none() -> Self {
        Self { owners: Box::new([]) }
    }

    /// Tries to take the token of `node` for `tag`.
    ///
    /// Returns whether the token was newly acquired; re-acquisition by the
    /// current holder succeeds without being recorded again.
    fn try_lock(&self, node: usize, tag: usize) -> Result<bool, Conflict> {
        match self.owners[node].compare_exchange(
            FREE,
            tag,
            Ordering::Acquire,
            Ordering::Relaxed,
        ) {
            Ok(_) => Ok(true),
            Err(holder) if holder == tag => Ok(false),
            Err(_) => Err(Conflict),
        }
    }

    fn unlock(&self, node: usize, tag: usize) {
        debug_assert_eq!(self.owners[node].load(Ordering::Relaxed), tag);
        self.owners[node].store(FREE, Ordering::Release);
    }
}

/// The set of tokens held by one in-flight task.
///
/// A frame is owned by a worker and reused across the items it executes; the
/// executor calls [`release_all`](Frame::release_all) after each commit or
/// abort. Acquisitions are recorded so that release is exact.
///
/// # Examples
///
/// Exactly one of two frames contending for the same node proceeds:
///
/// ```
/// use amorpha::graph::{CsrGraphBuilder, Frame, MethodFlag};
///
/// let graph = CsrGraphBuilder::<u32, ()>::new(2).build();
/// let first = Frame::new(graph.node_tokens(), 0);
/// let second = Frame::new(graph.node_tokens(), 1);
///
/// assert!(first.acquire(1, MethodFlag::Write).is_ok());
/// assert!(second.acquire(1, MethodFlag::Write).is_err());
/// first.release_all();
/// assert!(second.acquire(1, MethodFlag::Write).is_ok());
/// ```
#[derive(Debug)]
pub struct Frame<'a> {
    tokens: &'a NodeTokens,
    tag: usize,
    held: RefCell<Vec<usize>>,
}

impl<'a> Frame<'a> {
    /// Creates a frame over the given token domain.
    ///
    /// `owner` must be distinct among concurrently live frames; executors
    /// use the worker index.
    pub fn new(tokens: &'a NodeTokens, owner: usize) -> Self {
        Self {
            tokens,
            // Shift past the FREE word.
            tag: owner + 1,
            held: RefCell::new(Vec::new()),
        }
    }

    /// Acquires the token of `node` under `flag`.
    ///
    /// [`MethodFlag::Unprotected`] always succeeds and records nothing.
    pub fn acquire(&self, node: usize, flag: MethodFlag) -> Result<(), Conflict> {
        match flag {
            MethodFlag::Unprotected => Ok(()),
            MethodFlag::Read | MethodFlag::Write => {
                if self.tokens.try_lock(node, self.tag)? {
                    self.held.borrow_mut().push(node);
                }
                Ok(())
            }
        }
    }

    /// Releases every token held by this frame.
    pub fn release_all(&self) {
        for node in self.held.borrow_mut().drain(..) {
            self.tokens.unlock(node, self.tag);
        }
    }

    /// Returns the number of tokens currently held.
    pub fn held(&self) -> usize {
        self.held.borrow().len()
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        self.release_all();
    }
}
