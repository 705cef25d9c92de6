//! Diagram cells and the model contract the controller edits through.
//!
//! The diagram stores what is drawn: element cells holding one entity (or
//! a group of entities) and link cells holding one relation (or a group of
//! parallel relations). Geometry and rendering belong to the embedder.

mod memory;
mod snapshot;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{EntityData, EntityIri, RelationData, RelationKey, RelationTypeIri};

pub use memory::InMemoryDiagram;
pub use snapshot::DiagramSnapshot;

/// Identifier of a diagram cell (element or link).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(u64);

impl CellId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What an element cell displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum ElementKind {
    /// A single entity.
    Entity(EntityData),
    /// Several entities collapsed into one node.
    EntityGroup(Vec<EntityData>),
}

/// Element (node) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: CellId,
    pub kind: ElementKind,
}

impl Element {
    /// Creates a single-entity element.
    pub fn entity(id: CellId, data: EntityData) -> Self {
        Self {
            id,
            kind: ElementKind::Entity(data),
        }
    }

    /// Creates a group element.
    pub fn group(id: CellId, items: Vec<EntityData>) -> Self {
        Self {
            id,
            kind: ElementKind::EntityGroup(items),
        }
    }

    /// Every entity this cell represents.
    pub fn entities(&self) -> &[EntityData] {
        match &self.kind {
            ElementKind::Entity(data) => std::slice::from_ref(data),
            ElementKind::EntityGroup(items) => items,
        }
    }

    /// The entity of a single-entity cell.
    pub fn single_entity(&self) -> Option<&EntityData> {
        match &self.kind {
            ElementKind::Entity(data) => Some(data),
            ElementKind::EntityGroup(_) => None,
        }
    }

    /// Returns `true` if the cell represents `iri`.
    pub fn holds(&self, iri: &EntityIri) -> bool {
        self.entities().iter().any(|data| &data.id == iri)
    }

    /// Returns a copy with every occurrence of `iri` replaced by `data`.
    pub fn with_replaced_entity(&self, iri: &EntityIri, data: &EntityData) -> Self {
        let replace = |item: &EntityData| {
            if &item.id == iri {
                data.clone()
            } else {
                item.clone()
            }
        };
        let kind = match &self.kind {
            ElementKind::Entity(item) => ElementKind::Entity(replace(item)),
            ElementKind::EntityGroup(items) => ElementKind::EntityGroup(items.iter().map(replace).collect()),
        };
        Self { id: self.id, kind }
    }
}

/// What a link cell displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LinkKind {
    /// A single relation.
    Relation {
        /// Relation data.
        data: RelationData,
    },
    /// Parallel relations of one type between the same two cells.
    #[serde(rename_all = "camelCase")]
    RelationGroup {
        /// Shared relation type.
        link_type: RelationTypeIri,
        /// Members in insertion order.
        items: Vec<RelationData>,
    },
}

/// Link (edge) cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: CellId,
    pub source: CellId,
    pub target: CellId,
    pub kind: LinkKind,
}

impl Link {
    /// Creates a single-relation link.
    pub fn relation(id: CellId, source: CellId, target: CellId, data: RelationData) -> Self {
        Self {
            id,
            source,
            target,
            kind: LinkKind::Relation { data },
        }
    }

    /// Every relation this cell represents.
    pub fn relations(&self) -> &[RelationData] {
        match &self.kind {
            LinkKind::Relation { data } => std::slice::from_ref(data),
            LinkKind::RelationGroup { items, .. } => items,
        }
    }

    /// Relation type shared by every member.
    pub fn link_type(&self) -> &RelationTypeIri {
        match &self.kind {
            LinkKind::Relation { data } => &data.link_type,
            LinkKind::RelationGroup { link_type, .. } => link_type,
        }
    }

    /// Returns `true` if the cell represents the relation `key`.
    pub fn holds(&self, key: &RelationKey) -> bool {
        self.relations().iter().any(|data| &data.key() == key)
    }

    /// Returns `true` if either end is `cell`.
    pub fn touches(&self, cell: CellId) -> bool {
        self.source == cell || self.target == cell
    }

    /// Returns a copy holding `items`, collapsed to a single relation when
    /// exactly one remains. Returns `None` when `items` is empty.
    pub fn with_relations(&self, mut items: Vec<RelationData>) -> Option<Self> {
        let kind = match items.len() {
            0 => return None,
            1 => LinkKind::Relation {
                data: items.remove(0),
            },
            _ => LinkKind::RelationGroup {
                link_type: self.link_type().clone(),
                items,
            },
        };
        Some(Self {
            id: self.id,
            source: self.source,
            target: self.target,
            kind,
        })
    }
}

/// Storage of diagram cells.
///
/// Implementations only store cells; keeping authoring state consistent
/// with them is the controller's job. Removing an element does not remove
/// its links.
pub trait DiagramModel: 'static {
    /// Reserves a fresh cell id.
    fn allocate_cell_id(&mut self) -> CellId;

    fn add_element(&mut self, element: Element);

    /// Removes and returns the element.
    fn remove_element(&mut self, id: CellId) -> Option<Element>;

    /// Replaces an existing element and returns the previous value.
    fn update_element(&mut self, element: Element) -> Option<Element>;

    fn add_link(&mut self, link: Link);

    /// Removes and returns the link.
    fn remove_link(&mut self, id: CellId) -> Option<Link>;

    /// Replaces an existing link and returns the previous value.
    fn update_link(&mut self, link: Link) -> Option<Link>;

    fn element(&self, id: CellId) -> Option<&Element>;

    fn link(&self, id: CellId) -> Option<&Link>;

    /// Elements in id order.
    fn elements(&self) -> Box<dyn Iterator<Item = &Element> + '_>;

    /// Links in id order.
    fn links(&self) -> Box<dyn Iterator<Item = &Link> + '_>;

    /// Ids of links attached to the element at either end.
    fn links_of(&self, element: CellId) -> Vec<CellId> {
        self.links()
            .filter(|link| link.touches(element))
            .map(|link| link.id)
            .collect()
    }

    /// Ids of elements representing `iri`.
    fn cells_of_entity(&self, iri: &EntityIri) -> Vec<CellId> {
        self.elements()
            .filter(|element| element.holds(iri))
            .map(|element| element.id)
            .collect()
    }

    /// Ids of links representing the relation `key`.
    fn links_with_relation(&self, key: &RelationKey) -> Vec<CellId> {
        self.links()
            .filter(|link| link.holds(key))
            .map(|link| link.id)
            .collect()
    }

    /// Ids of links of `link_type` running from `source` to `target`.
    fn links_between(&self, source: CellId, target: CellId, link_type: &RelationTypeIri) -> Vec<CellId> {
        self.links()
            .filter(|link| link.source == source && link.target == target && link.link_type() == link_type)
            .map(|link| link.id)
            .collect()
    }
}
