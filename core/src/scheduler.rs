//! Timed tasks on the logical clock.
//!
//! Tasks fire in (due, sequence) order, so two tasks due at the same
//! instant run in the order they were scheduled. A task is cancelled by
//! the tiles it references: each PinnedTile carries the generation the
//! tile had at scheduling time, and a moved-on generation turns that
//! part of the task into a no-op.

use crate::{
    tile::TransitionToken,
    types::{SlotIndex, Time},
};

/// A tile reference pinned to the generation it had when a task was
/// scheduled. Any state change in between makes the reference stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinnedTile {
    pub slot:       SlotIndex,
    pub generation: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Task {
    /// End of a self-timed visual transition.
    CompleteTransition(TransitionToken),
    /// Flip a mismatched pair (or a restored stray) back face down.
    CloseRevealed(Vec<PinnedTile>),
}

#[derive(Debug, Clone)]
struct Entry {
    seq:  u64,
    due:  Time,
    task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    entries:  Vec<Entry>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Time, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { seq, due, task });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any close task is still pending.
    pub fn has_pending_close(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.task, Task::CloseRevealed(_)))
    }

    pub fn next_due(&self) -> Option<Time> {
        self.earliest().map(|i| self.entries[i].due)
    }

    /// Remove and return the earliest task due at or before `t`.
    pub fn pop_due(&mut self, t: Time) -> Option<(Time, Task)> {
        let index = self.earliest().filter(|&i| self.entries[i].due <= t)?;
        let entry = self.entries.remove(index);
        Some((entry.due, entry.task))
    }

    fn earliest(&self) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)))
            .map(|(i, _)| i)
    }
}
