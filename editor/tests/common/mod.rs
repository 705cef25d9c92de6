#![allow(dead_code)]

use graphedit_core::compute::InlineRunner;
use graphedit_editor::{EditorConfig, EditorController, EntityData, EntityIri, InMemoryDiagram};

pub type InlineEditor = EditorController<InMemoryDiagram, InlineRunner>;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn inline_editor(model: InMemoryDiagram) -> InlineEditor {
    init_logging();
    EditorController::new(model, InlineRunner, &EditorConfig::default())
}

pub fn iri(s: &str) -> EntityIri {
    EntityIri::new(s)
}

pub fn person(id: &str, label: &str) -> EntityData {
    EntityData::new(id).with_type("ex:Person").with_label(label)
}
