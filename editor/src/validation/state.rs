use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{EntityIri, PropertyIri, RelationKey};

/// How serious a validation issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// One problem found by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
    /// Property the issue concerns, for entity issues.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<PropertyIri>,
}

impl ValidationIssue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            property: None,
        }
    }
}

/// Cached validation outcome for one entity or relation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationEntry {
    /// A validation pass for the target is in flight.
    pub loading: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationEntry {
    /// Entry for a target whose validation is in flight, keeping the issues
    /// known so far on display.
    pub fn loading(previous: Option<&ValidationEntry>) -> Self {
        Self {
            loading: true,
            errors: previous.map(|entry| entry.errors.clone()).unwrap_or_default(),
        }
    }

    pub fn resolved(errors: Vec<ValidationIssue>) -> Self {
        Self {
            loading: false,
            errors,
        }
    }
}

/// Snapshot of validation results for every validated entity and relation.
///
/// Entries are stored behind `Arc`; a pending validation checks that the
/// entry it installed is still the one in place (by pointer) before
/// replacing it, so a newer pass always wins over a slower older one.
#[derive(Debug, Clone, Default)]
pub struct ValidationState {
    entities: Arc<BTreeMap<EntityIri, Arc<ValidationEntry>>>,
    relations: Arc<BTreeMap<RelationKey, Arc<ValidationEntry>>>,
}

impl ValidationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_maps(
        entities: BTreeMap<EntityIri, Arc<ValidationEntry>>,
        relations: BTreeMap<RelationKey, Arc<ValidationEntry>>,
    ) -> Self {
        Self {
            entities: Arc::new(entities),
            relations: Arc::new(relations),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entities, &other.entities) && Arc::ptr_eq(&self.relations, &other.relations)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    pub fn entity(&self, iri: &EntityIri) -> Option<&Arc<ValidationEntry>> {
        self.entities.get(iri)
    }

    pub fn relation(&self, key: &RelationKey) -> Option<&Arc<ValidationEntry>> {
        self.relations.get(key)
    }

    pub fn entities(&self) -> impl Iterator<Item = (&EntityIri, &Arc<ValidationEntry>)> {
        self.entities.iter()
    }

    pub fn relations(&self) -> impl Iterator<Item = (&RelationKey, &Arc<ValidationEntry>)> {
        self.relations.iter()
    }

    /// Returns `true` if any entry is still waiting for its validator.
    pub fn is_loading(&self) -> bool {
        self.entities.values().any(|entry| entry.loading) || self.relations.values().any(|entry| entry.loading)
    }

    pub(crate) fn entity_map(&self) -> &BTreeMap<EntityIri, Arc<ValidationEntry>> {
        &self.entities
    }

    pub(crate) fn relation_map(&self) -> &BTreeMap<RelationKey, Arc<ValidationEntry>> {
        &self.relations
    }
}

impl PartialEq for ValidationState {
    /// Compares content, ignoring entry identity.
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.entities == other.entities && self.relations == other.relations)
    }
}

impl Eq for ValidationState {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_entry_keeps_known_issues() {
        let resolved = ValidationEntry::resolved(vec![ValidationIssue::error("missing label")]);
        let loading = ValidationEntry::loading(Some(&resolved));
        assert!(loading.loading);
        assert_eq!(loading.errors, resolved.errors);
        assert!(ValidationEntry::loading(None).errors.is_empty());
    }

    #[test]
    fn equality_is_structural() {
        let entry = Arc::new(ValidationEntry::resolved(Vec::new()));
        let a = ValidationState::from_maps(BTreeMap::from([(EntityIri::new("ex:a"), entry)]), BTreeMap::new());
        let b = ValidationState::from_maps(
            BTreeMap::from([(EntityIri::new("ex:a"), Arc::new(ValidationEntry::resolved(Vec::new())))]),
            BTreeMap::new(),
        );
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert!(!a.is_loading());
    }

    #[test]
    fn severity_serializes_lowercase() {
        let issue = ValidationIssue::error("bad");
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["severity"], "error");
        assert!(json.get("property").is_none());
    }
}
