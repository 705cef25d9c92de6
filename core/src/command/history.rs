//! Undo/redo command history with nested batches.
//!
//! [`CommandHistory`] keeps a bounded undo stack and an unbounded redo stack
//! of inverse commands, plus a stack of open batch frames. While a batch is
//! open, every inverse produced by [`execute`](CommandHistory::execute) or
//! handed to [`register_to_undo`](CommandHistory::register_to_undo) is
//! collected in the top frame instead of the undo stack. Storing the batch
//! folds the collected inverses into one compound command.

use std::collections::VecDeque;
use std::fmt;

use super::batch::{BatchClose, BatchId, CloseMode, CommandBatch, HistoryError};
use super::reversible::{Command, Editable};

/// Default maximum number of undo steps.
pub const DEFAULT_MAX_UNDO: usize = 100;

struct BatchFrame<T: Editable> {
    id: BatchId,
    title: Option<String>,
    commands: Vec<Command<T>>,
}

/// Manages undo/redo stacks of inverse commands and the open batch frames.
///
/// When the undo stack exceeds `max_undo`, the oldest entry is dropped from
/// the front. The redo stack is cleared whenever a new top-level entry is
/// registered (linear history).
///
/// # Example
///
/// ```ignore
/// let mut history = CommandHistory::new(DEFAULT_MAX_UNDO);
/// let batch = history.start_batch(Some("Create entity"));
/// history.execute(add_cell, &mut document);
/// history.execute(set_state, &mut document);
/// batch.store(&mut history)?;
///
/// history.undo(&mut document); // reverts both commands at once
/// ```
pub struct CommandHistory<T: Editable> {
    undo_stack: VecDeque<Command<T>>,
    redo_stack: Vec<Command<T>>,
    batches: Vec<BatchFrame<T>>,
    next_batch: u64,
    max_undo: usize,
}

impl<T: Editable> CommandHistory<T> {
    /// Creates an empty history with the given maximum undo depth.
    pub fn new(max_undo: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            batches: Vec::new(),
            next_batch: 0,
            max_undo,
        }
    }

    /// Invokes `command` and registers its inverse.
    pub fn execute(&mut self, command: Command<T>, target: &mut T) {
        let inverse = command.invoke(target);
        self.register_to_undo(inverse);
    }

    /// Registers an inverse command for a change that already happened.
    ///
    /// Goes to the active batch if one is open; otherwise onto the undo
    /// stack, clearing the redo stack.
    pub fn register_to_undo(&mut self, command: Command<T>) {
        if let Some(frame) = self.batches.last_mut() {
            frame.commands.push(command);
            return;
        }
        self.redo_stack.clear();
        self.push_undo(command);
    }

    /// Undoes the most recent entry. Returns `false` if nothing was undone.
    ///
    /// Refused while a batch is open: the open frame would otherwise capture
    /// the redo command of an entry that precedes it.
    pub fn undo(&mut self, target: &mut T) -> bool {
        if !self.batches.is_empty() {
            log::warn!(
                "undo requested with {} open batch(es); ignoring",
                self.batches.len()
            );
            return false;
        }
        let Some(command) = self.undo_stack.pop_back() else {
            return false;
        };
        log::debug!("undo: {}", command.title().unwrap_or("<untitled>"));
        let inverse = command.invoke(target);
        self.redo_stack.push(inverse);
        true
    }

    /// Replays the most recently undone entry. Returns `false` if nothing
    /// was redone.
    pub fn redo(&mut self, target: &mut T) -> bool {
        if !self.batches.is_empty() {
            log::warn!(
                "redo requested with {} open batch(es); ignoring",
                self.batches.len()
            );
            return false;
        }
        let Some(command) = self.redo_stack.pop() else {
            return false;
        };
        log::debug!("redo: {}", command.title().unwrap_or("<untitled>"));
        let inverse = command.invoke(target);
        self.push_undo(inverse);
        true
    }

    /// Opens a new batch frame on top of the batch stack.
    pub fn start_batch(&mut self, title: Option<&str>) -> CommandBatch {
        let id = BatchId(self.next_batch);
        self.next_batch += 1;
        self.batches.push(BatchFrame {
            id,
            title: title.map(str::to_owned),
            commands: Vec::new(),
        });
        CommandBatch::new(id)
    }

    /// Clears both stacks, e.g. after importing a fresh document.
    ///
    /// Open batches stay open; their owners are still expected to close them.
    pub fn reset(&mut self) {
        if !self.batches.is_empty() {
            log::warn!(
                "history reset with {} open batch(es)",
                self.batches.len()
            );
        }
        self.undo_stack.clear();
        self.redo_stack.clear();
        log::debug!("command history reset");
    }

    /// Returns `true` if there are entries that can be undone.
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns `true` if there are entries that can be redone.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Returns the number of entries in the undo stack.
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Returns the number of entries in the redo stack.
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Titles of undo entries, most recent first.
    pub fn undo_titles(&self) -> impl Iterator<Item = Option<&str>> {
        self.undo_stack.iter().rev().map(Command::title)
    }

    /// Titles of redo entries, most recent first.
    pub fn redo_titles(&self) -> impl Iterator<Item = Option<&str>> {
        self.redo_stack.iter().rev().map(Command::title)
    }

    /// Number of currently open batches.
    pub fn open_batches(&self) -> usize {
        self.batches.len()
    }

    /// Returns the maximum undo depth.
    pub fn max_undo(&self) -> usize {
        self.max_undo
    }

    pub(super) fn close_batch(
        &mut self,
        id: BatchId,
        mode: CloseMode,
    ) -> Result<BatchClose, HistoryError> {
        let Some(index) = self.batches.iter().rposition(|frame| frame.id == id) else {
            log::warn!("{mode} of {id} which is not open");
            return Err(HistoryError::BatchNotOpen(id));
        };

        let implicitly_closed = self.batches.len() - index - 1;
        if implicitly_closed > 0 {
            log::warn!(
                "{mode} of {id} while {implicitly_closed} batch(es) above it are still open; \
                 closing them first"
            );
        }

        while self.batches.len() > index {
            let Some(frame) = self.batches.pop() else {
                break;
            };
            match mode {
                CloseMode::Store => self.fold(frame),
                CloseMode::Discard | CloseMode::Revert => {
                    log::debug!(
                        "discarding {} with {} command(s)",
                        frame.id,
                        frame.commands.len()
                    );
                }
            }
        }
        Ok(BatchClose { implicitly_closed })
    }

    /// Closes batch `id` (and any above it) by invoking the collected
    /// inverses, most recent first. Nothing reaches the undo stack.
    pub(super) fn revert_batch(&mut self, id: BatchId, target: &mut T) -> Result<BatchClose, HistoryError> {
        let Some(index) = self.batches.iter().rposition(|frame| frame.id == id) else {
            log::warn!("{} of {id} which is not open", CloseMode::Revert);
            return Err(HistoryError::BatchNotOpen(id));
        };

        let implicitly_closed = self.batches.len() - index - 1;
        if implicitly_closed > 0 {
            log::warn!(
                "{} of {id} while {implicitly_closed} batch(es) above it are still open; \
                 reverting them first",
                CloseMode::Revert
            );
        }

        while self.batches.len() > index {
            let Some(frame) = self.batches.pop() else {
                break;
            };
            log::debug!("reverting {} with {} command(s)", frame.id, frame.commands.len());
            for command in frame.commands.into_iter().rev() {
                let _ = command.invoke(target);
            }
        }
        Ok(BatchClose { implicitly_closed })
    }

    fn fold(&mut self, frame: BatchFrame<T>) {
        if frame.commands.is_empty() {
            return;
        }
        let mut commands = frame.commands;
        commands.reverse();
        self.register_to_undo(Command::compound(frame.title, commands));
    }

    fn push_undo(&mut self, command: Command<T>) {
        self.undo_stack.push_back(command);
        if self.undo_stack.len() > self.max_undo {
            self.undo_stack.pop_front();
        }
    }
}

impl<T: Editable> Default for CommandHistory<T> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO)
    }
}

impl<T: Editable> fmt::Debug for CommandHistory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHistory")
            .field("undo_count", &self.undo_stack.len())
            .field("redo_count", &self.redo_stack.len())
            .field("open_batches", &self.batches.len())
            .field("max_undo", &self.max_undo)
            .finish()
    }
}
