//! Entity and relation data exchanged with the data layer.
//!
//! Values here are plain data: the diagram stores them in cells, the
//! authoring state stores them in events, and validators receive them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! iri_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an IRI string.
            pub fn new(iri: impl Into<String>) -> Self {
                Self(iri.into())
            }

            /// Returns the IRI as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(iri: &str) -> Self {
                Self::new(iri)
            }
        }

        impl From<String> for $name {
            fn from(iri: String) -> Self {
                Self(iri)
            }
        }
    };
}

iri_type!(
    /// IRI of an entity (a graph node backed by the data source).
    EntityIri
);
iri_type!(
    /// IRI of an entity type (class).
    EntityTypeIri
);
iri_type!(
    /// IRI of a relation type (predicate).
    RelationTypeIri
);
iri_type!(
    /// IRI of a property.
    PropertyIri
);

/// Property values keyed by property IRI.
pub type Properties = BTreeMap<PropertyIri, Vec<String>>;

/// Data of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityData {
    /// Entity IRI.
    pub id: EntityIri,
    /// Types the entity is an instance of.
    #[serde(default)]
    pub types: Vec<EntityTypeIri>,
    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
    /// Other property values.
    #[serde(default)]
    pub properties: Properties,
}

impl EntityData {
    /// Creates entity data with no types, label or properties.
    pub fn new(id: impl Into<EntityIri>) -> Self {
        Self {
            id: id.into(),
            types: Vec::new(),
            label: None,
            properties: Properties::new(),
        }
    }

    /// Adds a type.
    pub fn with_type(mut self, ty: impl Into<EntityTypeIri>) -> Self {
        self.types.push(ty.into());
        self
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Appends a property value.
    pub fn with_property(mut self, property: impl Into<PropertyIri>, value: impl Into<String>) -> Self {
        self.properties
            .entry(property.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Returns a copy with a different IRI.
    pub fn renamed(&self, id: EntityIri) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }
}

/// Identity of a relation: its type and both endpoints.
///
/// Two relation values with the same key describe the same relation;
/// everything else about them is mutable data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationKey {
    /// Relation type.
    pub link_type: RelationTypeIri,
    /// Source entity.
    pub source: EntityIri,
    /// Target entity.
    pub target: EntityIri,
}

impl RelationKey {
    /// Returns `true` if either endpoint is `iri`.
    pub fn touches(&self, iri: &EntityIri) -> bool {
        &self.source == iri || &self.target == iri
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.link_type, self.target)
    }
}

/// Data of one relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationData {
    /// Relation type.
    pub link_type: RelationTypeIri,
    /// Source entity.
    pub source: EntityIri,
    /// Target entity.
    pub target: EntityIri,
    /// Relation property values.
    #[serde(default)]
    pub properties: Properties,
}

impl RelationData {
    /// Creates relation data with no properties.
    pub fn new(
        link_type: impl Into<RelationTypeIri>,
        source: impl Into<EntityIri>,
        target: impl Into<EntityIri>,
    ) -> Self {
        Self {
            link_type: link_type.into(),
            source: source.into(),
            target: target.into(),
            properties: Properties::new(),
        }
    }

    /// Appends a property value.
    pub fn with_property(mut self, property: impl Into<PropertyIri>, value: impl Into<String>) -> Self {
        self.properties
            .entry(property.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Identity of this relation.
    pub fn key(&self) -> RelationKey {
        RelationKey {
            link_type: self.link_type.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
        }
    }

    /// Returns `true` if either endpoint is `iri`.
    pub fn touches(&self, iri: &EntityIri) -> bool {
        &self.source == iri || &self.target == iri
    }

    /// Returns a copy with every endpoint equal to `from` replaced by `to`.
    pub fn with_renamed_endpoint(&self, from: &EntityIri, to: &EntityIri) -> Self {
        let mut renamed = self.clone();
        if &renamed.source == from {
            renamed.source = to.clone();
        }
        if &renamed.target == from {
            renamed.target = to.clone();
        }
        renamed
    }
}
