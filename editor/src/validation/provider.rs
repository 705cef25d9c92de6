use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use graphedit_core::compute::CancellationToken;
use serde::{Deserialize, Serialize};

use super::state::{Severity, ValidationIssue};
use crate::authoring::AuthoringState;
use crate::diagram::DiagramSnapshot;
use crate::error::ValidationFailure;
use crate::model::{EntityData, EntityIri, PropertyIri, RelationData, RelationKey};

/// Boxed future returned by [`ValidationProvider::validate`].
pub type ValidationFuture =
    Pin<Box<dyn Future<Output = Result<Vec<ValidationResult>, ValidationFailure>> + Send>>;

/// Everything a validator gets to look at for one entity.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    /// Entity being validated.
    pub target: EntityData,
    /// Relations on the diagram whose source is the target.
    pub outbound_relations: Vec<RelationData>,
    /// Pending changes at the time of the request.
    pub state: AuthoringState,
    /// Diagram content at the time of the request.
    pub graph: Arc<DiagramSnapshot>,
    /// Cancelled when the result is no longer wanted.
    pub cancellation: CancellationToken,
}

/// One issue reported by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValidationResult {
    Entity {
        target: EntityIri,
        message: String,
        severity: Severity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        property: Option<PropertyIri>,
    },
    Relation {
        target: RelationKey,
        message: String,
        severity: Severity,
    },
}

impl ValidationResult {
    /// Error-level issue on an entity.
    pub fn entity_error(target: impl Into<EntityIri>, message: impl Into<String>) -> Self {
        Self::Entity {
            target: target.into(),
            message: message.into(),
            severity: Severity::Error,
            property: None,
        }
    }

    /// Error-level issue on a relation.
    pub fn relation_error(target: RelationKey, message: impl Into<String>) -> Self {
        Self::Relation {
            target,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub(crate) fn into_issue(self) -> ValidationIssue {
        match self {
            Self::Entity {
                message,
                severity,
                property,
                ..
            } => ValidationIssue {
                severity,
                message,
                property,
            },
            Self::Relation { message, severity, .. } => ValidationIssue {
                severity,
                message,
                property: None,
            },
        }
    }
}

/// Pluggable validation strategy supplied by the embedder.
///
/// Implemented for any `Fn(ValidationRequest) -> ValidationFuture`.
pub trait ValidationProvider: Send + Sync + 'static {
    fn validate(&self, request: ValidationRequest) -> ValidationFuture;
}

impl<F> ValidationProvider for F
where
    F: Fn(ValidationRequest) -> ValidationFuture + Send + Sync + 'static,
{
    fn validate(&self, request: ValidationRequest) -> ValidationFuture {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_serializes_with_type_tag() {
        let result = ValidationResult::entity_error("ex:a", "missing label");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "entity",
                "target": "ex:a",
                "message": "missing label",
                "severity": "error",
            })
        );
    }

    #[test]
    fn relation_result_reads_back_from_json() {
        let key = RelationData::new("ex:knows", "ex:a", "ex:b").key();
        let json = serde_json::json!({
            "type": "relation",
            "target": { "link_type": "ex:knows", "source": "ex:a", "target": "ex:b" },
            "message": "dangling",
            "severity": "warning",
        });
        let result: ValidationResult = serde_json::from_value(json).unwrap();
        assert_eq!(
            result,
            ValidationResult::Relation {
                target: key,
                message: "dangling".into(),
                severity: Severity::Warning,
            }
        );
    }
}
