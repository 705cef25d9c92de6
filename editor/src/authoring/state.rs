//! Immutable authoring diff.
//!
//! [`AuthoringState`] records what the user changed relative to the data
//! source: which entities and relations were added, changed or deleted.
//! Every transform is pure and returns a new state; collections are shared
//! copy-on-write between states, so cloning a state is cheap and an
//! unchanged state keeps its identity ([`AuthoringState::ptr_eq`]).
//!
//! Each event carries an [`EventToken`]. [`AuthoringState::discard`] matches
//! events by token rather than by value, so discarding an event that was
//! meanwhile replaced (even by an equal-looking one) is a no-op.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::AuthoringError;
use crate::model::{EntityData, EntityIri, RelationData, RelationKey};

/// Process-unique identity of one authoring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventToken(u64);

impl EventToken {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// What happened to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntityChange {
    /// Created by the user; not yet persisted.
    Added {
        /// Current data.
        data: EntityData,
    },
    /// Persisted entity edited by the user.
    #[serde(rename_all = "camelCase")]
    Changed {
        /// Data as persisted, before the first edit.
        before: EntityData,
        /// Current data.
        data: EntityData,
        /// New IRI when the edit renamed the entity.
        new_iri: Option<EntityIri>,
    },
    /// Persisted entity deleted by the user.
    Deleted {
        /// Data as persisted.
        data: EntityData,
    },
}

/// What happened to a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RelationChange {
    /// Created by the user; not yet persisted.
    Added {
        /// Current data.
        data: RelationData,
    },
    /// Persisted relation whose data (not identity) was edited.
    Changed {
        /// Data as persisted, before the first edit.
        before: RelationData,
        /// Current data.
        data: RelationData,
    },
    /// Persisted relation deleted by the user.
    Deleted {
        /// Data as persisted.
        data: RelationData,
    },
}

/// One authoring event for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEvent {
    token: EventToken,
    #[serde(flatten)]
    change: EntityChange,
}

impl EntityEvent {
    fn new(change: EntityChange) -> Self {
        Self {
            token: EventToken::next(),
            change,
        }
    }

    /// Identity of this event.
    pub fn token(&self) -> EventToken {
        self.token
    }

    /// The recorded change.
    pub fn change(&self) -> &EntityChange {
        &self.change
    }

    /// IRI the event is indexed under (the original IRI for renames).
    pub fn key(&self) -> &EntityIri {
        match &self.change {
            EntityChange::Added { data } | EntityChange::Deleted { data } => &data.id,
            EntityChange::Changed { before, .. } => &before.id,
        }
    }

    /// IRI the entity currently has on the diagram.
    pub fn current_iri(&self) -> &EntityIri {
        match &self.change {
            EntityChange::Changed {
                new_iri: Some(iri), ..
            } => iri,
            _ => self.key(),
        }
    }

    /// Current data of the entity.
    pub fn data(&self) -> &EntityData {
        match &self.change {
            EntityChange::Added { data }
            | EntityChange::Changed { data, .. }
            | EntityChange::Deleted { data } => data,
        }
    }
}

/// One authoring event for a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEvent {
    token: EventToken,
    #[serde(flatten)]
    change: RelationChange,
}

impl RelationEvent {
    fn new(change: RelationChange) -> Self {
        Self {
            token: EventToken::next(),
            change,
        }
    }

    /// Identity of this event.
    pub fn token(&self) -> EventToken {
        self.token
    }

    /// The recorded change.
    pub fn change(&self) -> &RelationChange {
        &self.change
    }

    /// Current data of the relation.
    pub fn data(&self) -> &RelationData {
        match &self.change {
            RelationChange::Added { data }
            | RelationChange::Changed { data, .. }
            | RelationChange::Deleted { data } => data,
        }
    }

    /// Identity of the relation.
    pub fn key(&self) -> RelationKey {
        self.data().key()
    }
}

/// Either kind of authoring event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", content = "event", rename_all = "camelCase")]
pub enum AuthoringEvent {
    /// An entity event.
    Entity(EntityEvent),
    /// A relation event.
    Relation(RelationEvent),
}

impl AuthoringEvent {
    /// Identity of the wrapped event.
    pub fn token(&self) -> EventToken {
        match self {
            Self::Entity(event) => event.token(),
            Self::Relation(event) => event.token(),
        }
    }
}

impl From<EntityEvent> for AuthoringEvent {
    fn from(event: EntityEvent) -> Self {
        Self::Entity(event)
    }
}

impl From<RelationEvent> for AuthoringEvent {
    fn from(event: RelationEvent) -> Self {
        Self::Relation(event)
    }
}

type EntityEvents = BTreeMap<EntityIri, EntityEvent>;
type RelationEvents = BTreeMap<RelationKey, RelationEvent>;

/// Snapshot of pending authoring changes.
///
/// Equality compares content; [`ptr_eq`](Self::ptr_eq) compares identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthoringState {
    entities: Arc<EntityEvents>,
    relations: Arc<RelationEvents>,
}

impl AuthoringState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if both handles share the same snapshot.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entities, &other.entities) && Arc::ptr_eq(&self.relations, &other.relations)
    }

    /// Returns `true` if there are no pending changes.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Entity events in IRI order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityEvent> {
        self.entities.values()
    }

    /// Relation events in key order.
    pub fn relations(&self) -> impl Iterator<Item = &RelationEvent> {
        self.relations.values()
    }

    /// All events, entities first.
    pub fn events(&self) -> impl Iterator<Item = AuthoringEvent> + '_ {
        self.entities()
            .cloned()
            .map(AuthoringEvent::Entity)
            .chain(self.relations().cloned().map(AuthoringEvent::Relation))
    }

    /// Event indexed under `iri`, or recorded for an entity renamed to `iri`.
    pub fn entity_event(&self, iri: &EntityIri) -> Option<&EntityEvent> {
        self.entities.get(iri).or_else(|| {
            self.entities.values().find(|event| {
                matches!(&event.change, EntityChange::Changed { new_iri: Some(renamed), .. } if renamed == iri)
            })
        })
    }

    /// Event recorded for the relation with this identity.
    pub fn relation_event(&self, key: &RelationKey) -> Option<&RelationEvent> {
        self.relations.get(key)
    }

    /// Returns `true` if the entity was created and not yet persisted.
    pub fn is_new_entity(&self, iri: &EntityIri) -> bool {
        matches!(
            self.entity_event(iri).map(EntityEvent::change),
            Some(EntityChange::Added { .. })
        )
    }

    /// Returns `true` if the entity is marked for deletion.
    pub fn is_deleted_entity(&self, iri: &EntityIri) -> bool {
        matches!(
            self.entity_event(iri).map(EntityEvent::change),
            Some(EntityChange::Deleted { .. })
        )
    }

    /// Returns `true` if the relation was created and not yet persisted.
    pub fn is_new_relation(&self, key: &RelationKey) -> bool {
        matches!(
            self.relation_event(key).map(RelationEvent::change),
            Some(RelationChange::Added { .. })
        )
    }

    /// Returns `true` if the relation is marked for deletion.
    pub fn is_deleted_relation(&self, key: &RelationKey) -> bool {
        matches!(
            self.relation_event(key).map(RelationEvent::change),
            Some(RelationChange::Deleted { .. })
        )
    }

    /// Records a newly created entity, replacing any prior event for its IRI.
    pub fn add_entity(&self, data: EntityData) -> Self {
        let mut entities = (*self.entities).clone();
        entities.insert(data.id.clone(), EntityEvent::new(EntityChange::Added { data }));
        self.with_entities(entities)
    }

    /// Records an edit of an entity from `before` to `after`.
    ///
    /// Edits of a not-yet-persisted entity keep it `Added` under its new IRI
    /// and carry added relations along to the new IRI. Edits of a persisted
    /// entity produce a `Changed` event indexed by the original IRI whose
    /// `before` is the data as persisted, however many edits came before.
    pub fn change_entity(&self, before: &EntityData, after: EntityData) -> Self {
        let previous = self.entity_event(&before.id);
        let key = previous.map_or_else(|| before.id.clone(), |event| event.key().clone());

        if let Some(EntityChange::Added { .. }) = previous.map(EntityEvent::change) {
            let mut entities = (*self.entities).clone();
            entities.remove(&key);
            let renamed = after.id != key;
            let new_iri = after.id.clone();
            entities.insert(new_iri.clone(), EntityEvent::new(EntityChange::Added { data: after }));
            if !renamed {
                return self.with_entities(entities);
            }
            let relations = self.rename_added_relations(&key, &new_iri);
            return Self {
                entities: Arc::new(entities),
                relations,
            };
        }

        let original = match previous.map(EntityEvent::change) {
            Some(EntityChange::Changed { before: original, .. }) => original.clone(),
            _ => before.clone(),
        };
        let new_iri = (after.id != key).then(|| after.id.clone());
        let relations = if after.id != before.id {
            self.rename_added_relations(&before.id, &after.id)
        } else {
            self.relations.clone()
        };
        let mut entities = (*self.entities).clone();
        entities.insert(
            key,
            EntityEvent::new(EntityChange::Changed {
                before: original,
                data: after,
                new_iri,
            }),
        );
        Self {
            entities: Arc::new(entities),
            relations,
        }
    }

    /// Records deletion of an entity.
    ///
    /// An entity that was only added disappears from the state entirely.
    /// Relation events touching the entity follow it: added relations are
    /// dropped, changed relations become deleted with their persisted data.
    pub fn delete_entity(&self, data: &EntityData) -> Self {
        let previous = self.entity_event(&data.id);
        let key = previous.map_or_else(|| data.id.clone(), |event| event.key().clone());

        let mut relations = (*self.relations).clone();
        relations.retain(|rel_key, _| !(rel_key.touches(&data.id) || rel_key.touches(&key)));
        for (rel_key, event) in self.relations.iter() {
            if !(rel_key.touches(&data.id) || rel_key.touches(&key)) {
                continue;
            }
            match &event.change {
                RelationChange::Added { .. } => {}
                RelationChange::Changed { before, .. } => {
                    relations.insert(
                        rel_key.clone(),
                        RelationEvent::new(RelationChange::Deleted {
                            data: before.clone(),
                        }),
                    );
                }
                RelationChange::Deleted { .. } => {
                    relations.insert(rel_key.clone(), event.clone());
                }
            }
        }

        let mut entities = (*self.entities).clone();
        match previous.map(EntityEvent::change) {
            Some(EntityChange::Added { .. }) => {
                entities.remove(&key);
            }
            Some(EntityChange::Changed { before, .. }) => {
                entities.insert(
                    key,
                    EntityEvent::new(EntityChange::Deleted {
                        data: before.clone(),
                    }),
                );
            }
            Some(EntityChange::Deleted { .. }) => {}
            None => {
                entities.insert(
                    key,
                    EntityEvent::new(EntityChange::Deleted { data: data.clone() }),
                );
            }
        }

        Self {
            entities: Arc::new(entities),
            relations: Arc::new(relations),
        }
    }

    /// Records a newly created relation, replacing any prior event for its key.
    pub fn add_relation(&self, data: RelationData) -> Self {
        let mut relations = (*self.relations).clone();
        relations.insert(data.key(), RelationEvent::new(RelationChange::Added { data }));
        self.with_relations(relations)
    }

    /// Records an edit of relation data.
    ///
    /// Fails when `before` and `after` differ in type or endpoints.
    pub fn change_relation(
        &self,
        before: &RelationData,
        after: RelationData,
    ) -> Result<Self, AuthoringError> {
        let key = before.key();
        if key != after.key() {
            return Err(AuthoringError::RelationIdentityChanged {
                before: key,
                after: after.key(),
            });
        }

        let change = match self.relations.get(&key).map(RelationEvent::change) {
            Some(RelationChange::Added { .. }) => RelationChange::Added { data: after },
            Some(RelationChange::Changed {
                before: original, ..
            }) => RelationChange::Changed {
                before: original.clone(),
                data: after,
            },
            Some(RelationChange::Deleted { .. }) | None => RelationChange::Changed {
                before: before.clone(),
                data: after,
            },
        };
        let mut relations = (*self.relations).clone();
        relations.insert(key, RelationEvent::new(change));
        Ok(self.with_relations(relations))
    }

    /// Records deletion of a relation.
    ///
    /// A relation that was only added disappears from the state entirely.
    pub fn delete_relation(&self, data: &RelationData) -> Self {
        let key = data.key();
        let mut relations = (*self.relations).clone();
        match self.relations.get(&key).map(RelationEvent::change) {
            Some(RelationChange::Added { .. }) => {
                relations.remove(&key);
            }
            Some(RelationChange::Changed { before, .. }) => {
                relations.insert(
                    key,
                    RelationEvent::new(RelationChange::Deleted {
                        data: before.clone(),
                    }),
                );
            }
            Some(RelationChange::Deleted { .. }) => return self.clone(),
            None => {
                relations.insert(
                    key,
                    RelationEvent::new(RelationChange::Deleted { data: data.clone() }),
                );
            }
        }
        self.with_relations(relations)
    }

    /// Drops every added relation touching one of `entities`.
    pub fn discard_added_relations(&self, entities: &BTreeSet<EntityIri>) -> Self {
        let doomed = |key: &RelationKey, event: &RelationEvent| {
            matches!(event.change, RelationChange::Added { .. })
                && (entities.contains(&key.source) || entities.contains(&key.target))
        };
        if !self.relations.iter().any(|(key, event)| doomed(key, event)) {
            return self.clone();
        }
        let mut relations = (*self.relations).clone();
        relations.retain(|key, event| !doomed(key, event));
        self.with_relations(relations)
    }

    /// Removes exactly `event` from the state.
    ///
    /// Returns `self` unchanged (same identity) when the event is no longer
    /// present, e.g. because a newer event replaced it.
    pub fn discard(&self, event: &AuthoringEvent) -> Self {
        match event {
            AuthoringEvent::Entity(event) => {
                let key = event.key();
                match self.entities.get(key) {
                    Some(current) if current.token == event.token => {
                        let mut entities = (*self.entities).clone();
                        entities.remove(key);
                        self.with_entities(entities)
                    }
                    _ => {
                        log::warn!("entity event for {key} is no longer present");
                        self.clone()
                    }
                }
            }
            AuthoringEvent::Relation(event) => {
                let key = event.key();
                match self.relations.get(&key) {
                    Some(current) if current.token == event.token => {
                        let mut relations = (*self.relations).clone();
                        relations.remove(&key);
                        self.with_relations(relations)
                    }
                    _ => {
                        log::warn!("relation event for {key} is no longer present");
                        self.clone()
                    }
                }
            }
        }
    }

    /// Moves added relation events touching `from` over to `to`.
    pub fn rename_relation_endpoints(&self, from: &EntityIri, to: &EntityIri) -> Self {
        Self {
            entities: self.entities.clone(),
            relations: self.rename_added_relations(from, to),
        }
    }

    fn rename_added_relations(&self, from: &EntityIri, to: &EntityIri) -> Arc<RelationEvents> {
        let touched = self.relations.iter().any(|(key, event)| {
            key.touches(from) && matches!(event.change, RelationChange::Added { .. })
        });
        if !touched {
            return self.relations.clone();
        }
        let mut relations = RelationEvents::new();
        for (key, event) in self.relations.iter() {
            match &event.change {
                RelationChange::Added { data } if key.touches(from) => {
                    let data = data.with_renamed_endpoint(from, to);
                    relations.insert(data.key(), RelationEvent::new(RelationChange::Added { data }));
                }
                _ => {
                    relations.insert(key.clone(), event.clone());
                }
            }
        }
        Arc::new(relations)
    }

    fn with_entities(&self, entities: EntityEvents) -> Self {
        Self {
            entities: Arc::new(entities),
            relations: self.relations.clone(),
        }
    }

    fn with_relations(&self, relations: RelationEvents) -> Self {
        Self {
            entities: self.entities.clone(),
            relations: Arc::new(relations),
        }
    }
}
