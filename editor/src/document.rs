//! The command target: diagram cells plus the pending authoring state.
//!
//! Every recorded edit is expressed with the commands below, so that one
//! undo step restores cells and authoring state together.

use graphedit_core::command::{Command, Editable};

use crate::authoring::{AuthoringState, TemporaryState};
use crate::diagram::{CellId, DiagramModel, Element, Link};

/// Everything an editing command may touch.
#[derive(Debug)]
pub struct EditorDocument<M> {
    pub(crate) model: M,
    pub(crate) authoring: AuthoringState,
    pub(crate) temporary: TemporaryState,
}

impl<M: DiagramModel> Editable for EditorDocument<M> {}

impl<M: DiagramModel> EditorDocument<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            authoring: AuthoringState::new(),
            temporary: TemporaryState::new(),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn authoring_state(&self) -> &AuthoringState {
        &self.authoring
    }

    pub fn temporary_state(&self) -> &TemporaryState {
        &self.temporary
    }
}

type DocCommand<M> = Command<EditorDocument<M>>;

/// Adds `element`; undone by removing it.
pub fn add_element<M: DiagramModel>(element: Element) -> DocCommand<M> {
    Command::basic("Add element", move |doc: &mut EditorDocument<M>| {
        let id = element.id;
        doc.model.add_element(element);
        remove_element(id)
    })
}

/// Removes the element `id`; undone by adding it back.
pub fn remove_element<M: DiagramModel>(id: CellId) -> DocCommand<M> {
    Command::basic("Remove element", move |doc: &mut EditorDocument<M>| {
        match doc.model.remove_element(id) {
            Some(element) => add_element(element),
            None => {
                log::warn!("element {id} was already gone");
                Command::noop(None)
            }
        }
    })
}

/// Replaces an element with `element`; undone by restoring the previous value.
pub fn update_element<M: DiagramModel>(element: Element) -> DocCommand<M> {
    Command::basic("Update element", move |doc: &mut EditorDocument<M>| {
        let id = element.id;
        match doc.model.update_element(element) {
            Some(previous) => update_element(previous),
            None => {
                log::warn!("element {id} is not on the diagram");
                Command::noop(None)
            }
        }
    })
}

/// Adds `link`; undone by removing it.
pub fn add_link<M: DiagramModel>(link: Link) -> DocCommand<M> {
    Command::basic("Add link", move |doc: &mut EditorDocument<M>| {
        let id = link.id;
        doc.model.add_link(link);
        remove_link(id)
    })
}

/// Removes the link `id`; undone by adding it back.
pub fn remove_link<M: DiagramModel>(id: CellId) -> DocCommand<M> {
    Command::basic("Remove link", move |doc: &mut EditorDocument<M>| {
        match doc.model.remove_link(id) {
            Some(link) => add_link(link),
            None => {
                log::warn!("link {id} was already gone");
                Command::noop(None)
            }
        }
    })
}

/// Replaces a link with `link`; undone by restoring the previous value.
pub fn update_link<M: DiagramModel>(link: Link) -> DocCommand<M> {
    Command::basic("Update link", move |doc: &mut EditorDocument<M>| {
        let id = link.id;
        match doc.model.update_link(link) {
            Some(previous) => update_link(previous),
            None => {
                log::warn!("link {id} is not on the diagram");
                Command::noop(None)
            }
        }
    })
}

/// Installs `state`; undone by reinstalling the state it replaced.
pub fn set_authoring_state<M: DiagramModel>(state: AuthoringState) -> DocCommand<M> {
    Command::basic("Change authoring state", move |doc: &mut EditorDocument<M>| {
        let previous = std::mem::replace(&mut doc.authoring, state);
        set_authoring_state(previous)
    })
}
