//! # Undo/Redo Stack
//!
//! Linear mutation history for one mutator.
//!
//! ## Design
//!
//! - Entries left of the cursor are applied, entries right of it are redoable
//! - Each entry keeps the mutation, its forward and undo arguments, and the
//!   document edits its apply recorded
//! - Pushing after an undo truncates the redoable tail (no branching)
//! - `max_levels` drops the oldest entries (0 = unlimited)

use std::marker::PhantomData;

use composer_jsonc::EditScript;
use futures::future::LocalBoxFuture;

use crate::ids::MutationId;
use crate::mutation_trait::{Mutation, MutationResult};

/// Type-erased applied mutation, replayable in either direction
pub(crate) trait AppliedMutation<D> {
    /// Write the captured pre-state back to model and runtime
    fn restore(&self, domain: &mut D) -> MutationResult<()>;

    /// Write the applied state back to model and runtime
    fn replay(&self, domain: &mut D) -> MutationResult<()>;

    fn write_document(&self, domain: &mut D) -> MutationResult<()>;

    fn after_persist<'a>(&'a self, domain: &'a mut D) -> LocalBoxFuture<'a, MutationResult<()>>;
}

pub(crate) struct Applied<D, M: Mutation<D>> {
    mutation: M,
    args: M::Args,
    undo_args: M::Args,
    _domain: PhantomData<fn(&mut D)>,
}

impl<D, M: Mutation<D>> Applied<D, M> {
    pub(crate) fn new(mutation: M, args: M::Args, undo_args: M::Args) -> Self {
        Self {
            mutation,
            args,
            undo_args,
            _domain: PhantomData,
        }
    }
}

impl<D, M: Mutation<D>> AppliedMutation<D> for Applied<D, M> {
    fn restore(&self, domain: &mut D) -> MutationResult<()> {
        self.mutation.update(domain, &self.undo_args)
    }

    fn replay(&self, domain: &mut D) -> MutationResult<()> {
        self.mutation.update(domain, &self.args)
    }

    fn write_document(&self, domain: &mut D) -> MutationResult<()> {
        self.mutation.write_document(domain)
    }

    fn after_persist<'a>(&'a self, domain: &'a mut D) -> LocalBoxFuture<'a, MutationResult<()>> {
        self.mutation.after_persist(domain)
    }
}

/// One step of history
pub struct UndoEntry<D> {
    pub id: MutationId,
    pub description: String,
    pub(crate) record: Box<dyn AppliedMutation<D>>,
    /// Forward document edits of this step
    pub(crate) script: EditScript,
}

impl<D> UndoEntry<D> {
    pub(crate) fn new(
        id: MutationId,
        description: String,
        record: Box<dyn AppliedMutation<D>>,
        script: EditScript,
    ) -> Self {
        Self {
            id,
            description,
            record,
            script,
        }
    }

    pub fn script(&self) -> &EditScript {
        &self.script
    }
}

/// Undo/redo history for one mutator
pub struct UndoStack<D> {
    entries: Vec<UndoEntry<D>>,
    cursor: usize,
    max_levels: usize,
}

impl<D> UndoStack<D> {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_levels,
        }
    }

    /// Record an applied step, discarding anything redoable
    pub(crate) fn push(&mut self, entry: UndoEntry<D>) {
        self.entries.truncate(self.cursor);
        self.entries.push(entry);

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.entries.len() > self.max_levels {
            let excess = self.entries.len() - self.max_levels;
            self.entries.drain(..excess);
        }

        self.cursor = self.entries.len();
    }

    pub fn get(&self, id: MutationId) -> Option<&UndoEntry<D>> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Entry the next undo would revert
    pub fn undo_entry(&self) -> Option<&UndoEntry<D>> {
        self.cursor.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub(crate) fn undo_entry_mut(&mut self) -> Option<&mut UndoEntry<D>> {
        self.cursor.checked_sub(1).and_then(|i| self.entries.get_mut(i))
    }

    /// Entry the next redo would re-apply
    pub fn redo_entry(&self) -> Option<&UndoEntry<D>> {
        self.entries.get(self.cursor)
    }

    pub(crate) fn redo_entry_mut(&mut self) -> Option<&mut UndoEntry<D>> {
        self.entries.get_mut(self.cursor)
    }

    pub(crate) fn step_back(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub(crate) fn step_forward(&mut self) {
        self.cursor = (self.cursor + 1).min(self.entries.len());
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor < self.entries.len()
    }

    /// Get the number of undo levels available
    pub fn undo_levels(&self) -> usize {
        self.cursor
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.entries.len() - self.cursor
    }

    /// Id of the most recently applied step
    pub fn latest_id(&self) -> Option<MutationId> {
        self.undo_entry().map(|entry| entry.id)
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_entry().map(|entry| entry.description.as_str())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_entry().map(|entry| entry.description.as_str())
    }
}

impl<D> Default for UndoStack<D> {
    fn default() -> Self {
        Self::new()
    }
}
