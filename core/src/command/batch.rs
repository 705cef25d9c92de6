//! Batch handles for [`CommandHistory`](super::CommandHistory).

use std::fmt;

use super::history::CommandHistory;
use super::reversible::Editable;

/// Identifier of one batch frame within a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchId(pub(super) u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch #{}", self.0)
    }
}

/// Errors reported when closing a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    /// The batch was already stored or discarded (possibly implicitly,
    /// when a batch below it was closed first).
    #[error("{0} is not open")]
    BatchNotOpen(BatchId),
}

/// Result of a successful batch close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchClose {
    /// How many batches above the closed one had to be closed first.
    ///
    /// Non-zero means the caller closed batches out of LIFO order.
    pub implicitly_closed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CloseMode {
    Store,
    Discard,
    Revert,
}

impl fmt::Display for CloseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => f.write_str("store"),
            Self::Discard => f.write_str("discard"),
            Self::Revert => f.write_str("revert"),
        }
    }
}

/// Handle to an open batch.
///
/// Closing consumes the handle. A handle that is dropped without being
/// closed leaves its frame open until a batch below it is closed.
#[must_use = "a batch stays open until it is stored or discarded"]
#[derive(Debug, PartialEq, Eq)]
pub struct CommandBatch {
    id: BatchId,
}

impl CommandBatch {
    pub(super) fn new(id: BatchId) -> Self {
        Self { id }
    }

    /// Identifier of the underlying frame.
    pub fn id(&self) -> BatchId {
        self.id
    }

    /// Folds the collected inverses into one compound undo entry.
    ///
    /// Nothing is pushed when the batch collected no commands.
    pub fn store<T: Editable>(
        self,
        history: &mut CommandHistory<T>,
    ) -> Result<BatchClose, HistoryError> {
        history.close_batch(self.id, CloseMode::Store)
    }

    /// Drops the collected inverses without touching the undo stack.
    pub fn discard<T: Editable>(
        self,
        history: &mut CommandHistory<T>,
    ) -> Result<BatchClose, HistoryError> {
        history.close_batch(self.id, CloseMode::Discard)
    }

    /// Undoes the commands executed inside the batch and drops them.
    ///
    /// Used when the work done inside the batch failed part way.
    pub fn revert<T: Editable>(
        self,
        history: &mut CommandHistory<T>,
        target: &mut T,
    ) -> Result<BatchClose, HistoryError> {
        history.revert_batch(self.id, target)
    }
}
