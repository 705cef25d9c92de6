use std::collections::BTreeMap;

use super::{CellId, DiagramModel, Element, Link};
use crate::model::{EntityData, RelationData};

/// [`DiagramModel`] kept in ordered maps.
///
/// The `insert_*` helpers build a pre-existing diagram (e.g. one loaded from
/// the data source) before it is handed to a controller.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiagram {
    elements: BTreeMap<CellId, Element>,
    links: BTreeMap<CellId, Link>,
    next_id: u64,
}

impl InMemoryDiagram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element for one entity and returns its id.
    pub fn insert_entity(&mut self, data: EntityData) -> CellId {
        let id = self.allocate_cell_id();
        self.add_element(Element::entity(id, data));
        id
    }

    /// Adds a group element and returns its id.
    pub fn insert_entity_group(&mut self, items: Vec<EntityData>) -> CellId {
        let id = self.allocate_cell_id();
        self.add_element(Element::group(id, items));
        id
    }

    /// Adds a single-relation link and returns its id.
    pub fn insert_relation(&mut self, source: CellId, target: CellId, data: RelationData) -> CellId {
        let id = self.allocate_cell_id();
        self.add_link(Link::relation(id, source, target, data));
        id
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

impl DiagramModel for InMemoryDiagram {
    fn allocate_cell_id(&mut self) -> CellId {
        self.next_id += 1;
        CellId::new(self.next_id)
    }

    fn add_element(&mut self, element: Element) {
        self.next_id = self.next_id.max(element.id.get());
        if self.elements.insert(element.id, element).is_some() {
            log::warn!("element cell was added twice; the previous value was replaced");
        }
    }

    fn remove_element(&mut self, id: CellId) -> Option<Element> {
        self.elements.remove(&id)
    }

    fn update_element(&mut self, element: Element) -> Option<Element> {
        let slot = self.elements.get_mut(&element.id)?;
        Some(std::mem::replace(slot, element))
    }

    fn add_link(&mut self, link: Link) {
        self.next_id = self.next_id.max(link.id.get());
        if self.links.insert(link.id, link).is_some() {
            log::warn!("link cell was added twice; the previous value was replaced");
        }
    }

    fn remove_link(&mut self, id: CellId) -> Option<Link> {
        self.links.remove(&id)
    }

    fn update_link(&mut self, link: Link) -> Option<Link> {
        let slot = self.links.get_mut(&link.id)?;
        Some(std::mem::replace(slot, link))
    }

    fn element(&self, id: CellId) -> Option<&Element> {
        self.elements.get(&id)
    }

    fn link(&self, id: CellId) -> Option<&Link> {
        self.links.get(&id)
    }

    fn elements(&self) -> Box<dyn Iterator<Item = &Element> + '_> {
        Box::new(self.elements.values())
    }

    fn links(&self) -> Box<dyn Iterator<Item = &Link> + '_> {
        Box::new(self.links.values())
    }
}
