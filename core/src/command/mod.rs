//! Reversible commands and batched undo/redo history.
//!
//! This module is independent of what is being edited: commands are generic
//! over an [`Editable`] target and the history only shuffles inverses.
//!
//! - [`Command`]: closed set of reversible command variants
//! - [`CommandHistory`]: undo/redo stacks plus a stack of open batches
//! - [`CommandBatch`]: handle that stores or discards one batch frame
//!
//! # Batches
//!
//! Opening a batch while another is open makes the new one the target for
//! registered inverses until it is closed. Batches must be closed in LIFO
//! order; closing a lower batch first closes everything above it and logs a
//! warning, which [`BatchClose::implicitly_closed`] also reports.

mod batch;
mod history;
mod reversible;

pub use batch::{BatchClose, BatchId, CommandBatch, HistoryError};
pub use history::{CommandHistory, DEFAULT_MAX_UNDO};
pub use reversible::{Command, Editable};
