//! Undo/redo history over structurally-shared tree snapshots.
//!
//! Each entry is a whole tree version, but versions share every subtree the
//! edit between them did not touch, so a snapshot costs roughly the path
//! that changed. Undo and redo move a cursor; they never re-apply or invert
//! an edit.

use sd_core::Tree;
use std::collections::VecDeque;
use std::time::SystemTime;

/// One recorded tree version.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    pub tree: Tree,
    pub timestamp: SystemTime,
}

impl HistorySnapshot {
    fn now(tree: Tree) -> Self {
        Self {
            tree,
            timestamp: SystemTime::now(),
        }
    }
}

/// Bounded snapshot buffer with a cursor at the current version.
#[derive(Debug)]
pub struct HistoryEngine {
    buffer: VecDeque<HistorySnapshot>,
    cursor: usize,
    limit: usize,
}

impl HistoryEngine {
    /// Start with `initial` as the only (current) entry. `limit` counts
    /// every kept snapshot including the current one, minimum 1.
    pub fn new(initial: Tree, limit: usize) -> Self {
        let limit = limit.max(1);
        let mut buffer = VecDeque::with_capacity(limit.min(64));
        buffer.push_back(HistorySnapshot::now(initial));
        Self {
            buffer,
            cursor: 0,
            limit,
        }
    }

    /// Record `new` as the version after `prev`.
    ///
    /// Returns `false` (and records nothing) when `new` is the same version
    /// as `prev`. When `prev` is not the current entry (it carries edits
    /// that were never recorded) it is recorded first, so undo lands on it.
    /// Any redo entries are dropped; the oldest entries are evicted past the
    /// limit.
    pub fn enqueue(&mut self, new: &Tree, prev: &Tree) -> bool {
        if new.ptr_eq(prev) {
            log::trace!("history: unchanged tree, nothing recorded");
            return false;
        }
        self.buffer.truncate(self.cursor + 1);
        if !self.current().is_some_and(|current| current.ptr_eq(prev)) {
            log::trace!("history: recording untracked edits before the new entry");
            self.buffer.push_back(HistorySnapshot::now(prev.clone()));
        }
        self.buffer.push_back(HistorySnapshot::now(new.clone()));
        while self.buffer.len() > self.limit {
            self.buffer.pop_front();
        }
        self.cursor = self.buffer.len() - 1;
        log::debug!("history: recorded entry {} of {}", self.cursor + 1, self.buffer.len());
        true
    }

    /// Step back one version. `None` when already at the oldest entry.
    pub fn undo(&mut self) -> Option<Tree> {
        if self.is_undo_disabled() {
            return None;
        }
        self.cursor -= 1;
        log::debug!("history: undo to entry {}", self.cursor + 1);
        self.current().cloned()
    }

    /// Step forward one version. `None` when already at the newest entry.
    pub fn redo(&mut self) -> Option<Tree> {
        if self.is_redo_disabled() {
            return None;
        }
        self.cursor += 1;
        log::debug!("history: redo to entry {}", self.cursor + 1);
        self.current().cloned()
    }

    pub fn is_undo_disabled(&self) -> bool {
        self.cursor == 0
    }

    pub fn is_redo_disabled(&self) -> bool {
        self.cursor + 1 >= self.buffer.len()
    }

    /// Tree at the cursor.
    pub fn current(&self) -> Option<&Tree> {
        self.buffer.get(self.cursor).map(|s| &s.tree)
    }

    pub fn snapshot(&self) -> Option<&HistorySnapshot> {
        self.buffer.get(self.cursor)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Forget everything and start over from `tree` (screen load).
    pub fn clear(&mut self, tree: Tree) {
        self.buffer.clear();
        self.buffer.push_back(HistorySnapshot::now(tree));
        self.cursor = 0;
    }
}
