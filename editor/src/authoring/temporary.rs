use std::collections::BTreeSet;
use std::sync::Arc;

use crate::model::{EntityIri, RelationKey};

/// Items shown on the diagram while the user is mid-gesture.
///
/// A temporary item is displayed but not yet part of the authoring diff,
/// e.g. the target of a link being dragged out. Like
/// [`AuthoringState`](super::AuthoringState), transforms return new values
/// and share unchanged sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemporaryState {
    entities: Arc<BTreeSet<EntityIri>>,
    relations: Arc<BTreeSet<RelationKey>>,
}

impl TemporaryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entities, &other.entities) && Arc::ptr_eq(&self.relations, &other.relations)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    pub fn has_entity(&self, iri: &EntityIri) -> bool {
        self.entities.contains(iri)
    }

    pub fn has_relation(&self, key: &RelationKey) -> bool {
        self.relations.contains(key)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityIri> {
        self.entities.iter()
    }

    pub fn relations(&self) -> impl Iterator<Item = &RelationKey> {
        self.relations.iter()
    }

    pub fn add_entity(&self, iri: EntityIri) -> Self {
        if self.entities.contains(&iri) {
            return self.clone();
        }
        let mut entities = (*self.entities).clone();
        entities.insert(iri);
        Self {
            entities: Arc::new(entities),
            relations: self.relations.clone(),
        }
    }

    pub fn remove_entity(&self, iri: &EntityIri) -> Self {
        if !self.entities.contains(iri) {
            return self.clone();
        }
        let mut entities = (*self.entities).clone();
        entities.remove(iri);
        Self {
            entities: Arc::new(entities),
            relations: self.relations.clone(),
        }
    }

    pub fn add_relation(&self, key: RelationKey) -> Self {
        if self.relations.contains(&key) {
            return self.clone();
        }
        let mut relations = (*self.relations).clone();
        relations.insert(key);
        Self {
            entities: self.entities.clone(),
            relations: Arc::new(relations),
        }
    }

    pub fn remove_relation(&self, key: &RelationKey) -> Self {
        if !self.relations.contains(key) {
            return self.clone();
        }
        let mut relations = (*self.relations).clone();
        relations.remove(key);
        Self {
            entities: self.entities.clone(),
            relations: Arc::new(relations),
        }
    }
}
