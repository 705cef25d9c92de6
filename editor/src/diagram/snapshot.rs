use std::collections::BTreeMap;

use super::DiagramModel;
use crate::model::{EntityData, EntityIri, RelationData, RelationKey};

/// Read-only copy of the entity and relation data on a diagram.
///
/// Handed to validation providers, which may run on another thread and
/// outlive the edit that triggered them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramSnapshot {
    entities: BTreeMap<EntityIri, EntityData>,
    relations: BTreeMap<RelationKey, RelationData>,
}

impl DiagramSnapshot {
    /// Copies the data currently on `model`.
    ///
    /// An entity shown by several cells appears once; the first cell in id
    /// order wins.
    pub fn capture<M: DiagramModel + ?Sized>(model: &M) -> Self {
        let mut entities = BTreeMap::new();
        for element in model.elements() {
            for data in element.entities() {
                entities.entry(data.id.clone()).or_insert_with(|| data.clone());
            }
        }
        let mut relations = BTreeMap::new();
        for link in model.links() {
            for data in link.relations() {
                relations.entry(data.key()).or_insert_with(|| data.clone());
            }
        }
        Self { entities, relations }
    }

    pub fn entity(&self, iri: &EntityIri) -> Option<&EntityData> {
        self.entities.get(iri)
    }

    pub fn contains_entity(&self, iri: &EntityIri) -> bool {
        self.entities.contains_key(iri)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityData> {
        self.entities.values()
    }

    pub fn relations(&self) -> impl Iterator<Item = &RelationData> {
        self.relations.values()
    }

    /// Relations whose source is `iri`.
    pub fn outbound<'a>(&'a self, iri: &'a EntityIri) -> impl Iterator<Item = &'a RelationData> + 'a {
        self.relations.values().filter(move |data| &data.source == iri)
    }

    /// Relations whose target is `iri`.
    pub fn inbound<'a>(&'a self, iri: &'a EntityIri) -> impl Iterator<Item = &'a RelationData> + 'a {
        self.relations.values().filter(move |data| &data.target == iri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::InMemoryDiagram;

    #[test]
    fn capture_collects_entities_and_relations() {
        let mut diagram = InMemoryDiagram::new();
        let a = diagram.insert_entity(EntityData::new("ex:a").with_label("A"));
        let b = diagram.insert_entity_group(vec![EntityData::new("ex:b"), EntityData::new("ex:a")]);
        diagram.insert_relation(a, b, RelationData::new("ex:p", "ex:a", "ex:b"));

        let snapshot = DiagramSnapshot::capture(&diagram);
        assert_eq!(snapshot.entities().count(), 2);
        assert_eq!(
            snapshot.entity(&"ex:a".into()).unwrap().label.as_deref(),
            Some("A")
        );

        let a_iri = EntityIri::new("ex:a");
        let b_iri = EntityIri::new("ex:b");
        assert_eq!(snapshot.outbound(&a_iri).count(), 1);
        assert_eq!(snapshot.inbound(&b_iri).count(), 1);
        assert_eq!(snapshot.outbound(&b_iri).count(), 0);
        assert!(!snapshot.contains_entity(&"ex:c".into()));
    }
}
