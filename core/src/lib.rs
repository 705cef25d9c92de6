//! # graphedit core
//!
//! Target-agnostic building blocks of the graph authoring engine:
//! reversible [`command`]s with a batched undo/redo history, and the
//! [`compute`] primitives used to run cancellable work off the editing
//! thread.

pub mod command;
pub mod compute;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
