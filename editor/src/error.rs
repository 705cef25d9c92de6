use graphedit_core::command::HistoryError;

use crate::diagram::CellId;
use crate::model::{EntityIri, RelationKey};

/// Invariant violations detected by authoring-state transforms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthoringError {
    /// A relation change tried to alter the relation's type or endpoints.
    ///
    /// Identity changes must be expressed as a delete followed by an add.
    #[error("relation identity cannot change from {before} to {after}")]
    RelationIdentityChanged {
        /// Identity before the change.
        before: RelationKey,
        /// Identity requested by the change.
        after: RelationKey,
    },
}

/// Errors returned by [`EditorController`](crate::EditorController) operations.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// No diagram cell with this id exists.
    #[error("cell {0} not found")]
    CellNotFound(CellId),
    /// No diagram cell holds this entity.
    #[error("entity {0} is not on the diagram")]
    EntityNotFound(EntityIri),
    /// No link cell holds this relation and it has no authoring event.
    #[error("relation {0} is not on the diagram")]
    RelationNotFound(RelationKey),
    /// A relation endpoint does not match the entity held by the chosen cell.
    #[error("cell {cell} does not hold entity {expected}")]
    EndpointMismatch {
        /// The cell the relation was attached to.
        cell: CellId,
        /// The entity the relation data refers to.
        expected: EntityIri,
    },
    /// The cell is not a single-entity element.
    #[error("cell {0} does not hold exactly one entity")]
    NotAnEntity(CellId),
    /// A recorded relation would attach to an entity that is only temporary.
    #[error("entity {0} is temporary; only temporary relations may attach to it")]
    TemporaryEndpoint(EntityIri),
    /// An authoring transform rejected the change.
    #[error(transparent)]
    Authoring(#[from] AuthoringError),
    /// A batch was closed out of order or twice.
    #[error(transparent)]
    History(#[from] HistoryError),
    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure reported by a validation provider.
///
/// The controller turns it into a single error entry on the validated
/// entity; it never reaches the caller of an editing operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {message}")]
pub struct ValidationFailure {
    /// Human-readable reason.
    pub message: String,
}

impl ValidationFailure {
    /// Creates a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
