//! # graphedit editor
//!
//! Transaction engine for authoring entity/relation diagrams.
//!
//! - [`model`]: entity and relation data
//! - [`diagram`]: cells and the [`DiagramModel`] contract
//! - [`authoring`]: the immutable diff of pending changes
//! - [`validation`]: asynchronous, stale-safe validation
//! - [`EditorController`]: the editing surface tying them together
//!
//! ```ignore
//! let mut editor = EditorController::new(diagram, IoRuntime::new()?, &EditorConfig::default())
//!     .with_validation_provider(my_rules);
//! let cell = editor.create_entity(EntityData::new("ex:alice"), CreateOptions::default())?;
//! editor.undo();
//! for event in editor.drain_events() { /* refresh views */ }
//! ```

pub mod authoring;
pub mod config;
pub mod controller;
pub mod diagram;
pub mod document;
pub mod error;
pub mod events;
pub mod io_runtime;
pub mod model;
pub mod validation;

pub use authoring::{AuthoringEvent, AuthoringState, TemporaryState};
pub use config::{EditorConfig, ValidationConfig};
pub use controller::{CreateOptions, EditorController, LinkEnd};
pub use diagram::{CellId, DiagramModel, DiagramSnapshot, Element, InMemoryDiagram, Link};
pub use document::EditorDocument;
pub use error::{AuthoringError, EditorError, ValidationFailure};
pub use events::EditorEvent;
pub use io_runtime::IoRuntime;
pub use model::{EntityData, EntityIri, RelationData, RelationKey};
pub use validation::{ValidationProvider, ValidationState};
