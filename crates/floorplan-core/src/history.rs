//! Bounded undo/redo history of state snapshots.

use std::collections::VecDeque;

/// Default maximum number of undo states to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// Two bounded snapshot stacks.
///
/// Call [`push`](Self::push) with the pre-edit state before each logical
/// edit. Pushing invalidates everything that could be redone.
#[derive(Debug, Clone)]
pub struct UndoManager<S> {
    undo_stack: VecDeque<S>,
    redo_stack: VecDeque<S>,
    max_depth: usize,
}

impl<S> Default for UndoManager<S> {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl<S> UndoManager<S> {
    /// Create a manager keeping at most `max_depth` entries per stack.
    /// A depth of zero is treated as one.
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth: max_depth.max(1),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Record the state before an edit. Clears the redo stack.
    pub fn push(&mut self, snapshot: S) {
        self.undo_stack.push_back(snapshot);
        self.redo_stack.clear();
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
    }

    /// Step back. `current` is kept for redo; returns the state to apply,
    /// or `None` (dropping `current`) when there is nothing to undo.
    pub fn undo(&mut self, current: S) -> Option<S> {
        let previous = self.undo_stack.pop_back()?;
        Self::push_bounded(&mut self.redo_stack, current, self.max_depth);
        Some(previous)
    }

    /// Inverse of [`undo`](Self::undo).
    pub fn redo(&mut self, current: S) -> Option<S> {
        let next = self.redo_stack.pop_back()?;
        Self::push_bounded(&mut self.undo_stack, current, self.max_depth);
        Some(next)
    }

    fn push_bounded(stack: &mut VecDeque<S>, snapshot: S, max_depth: usize) {
        stack.push_back(snapshot);
        while stack.len() > max_depth {
            stack.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
