//! Pending edits: the authoring diff and gesture-scoped temporary items.

mod state;
mod temporary;

pub use state::{
    AuthoringEvent, AuthoringState, EntityChange, EntityEvent, EventToken, RelationChange,
    RelationEvent,
};
pub use temporary::TemporaryState;
