//! Asynchronous, cancellable validation of authored entities.
//!
//! - [`ValidationProvider`]: the embedder's validation strategy
//! - [`ValidationState`]: cached results with per-entry identity
//! - [`validate_elements`] / [`PendingValidation`]: dispatch and
//!   stale-safe application of results

mod orchestration;
mod provider;
mod state;

pub use orchestration::{
    PendingValidation, ValidationOutcome, changed_elements_to_validate, validate_elements,
};
pub use provider::{ValidationFuture, ValidationProvider, ValidationRequest, ValidationResult};
pub use state::{Severity, ValidationEntry, ValidationIssue, ValidationState};
