mod common;

use common::{inline_editor, iri, person};
use graphedit_editor::{
    CellId, CreateOptions, DiagramModel, EditorError, EditorEvent, EntityData, InMemoryDiagram,
    LinkEnd, RelationData,
};

// ---------------------------------------------------------------------------
// Remove items
// ---------------------------------------------------------------------------

#[test]
fn removing_cells_forgets_their_changes() {
    let mut model = InMemoryDiagram::new();
    let group = model.insert_entity_group(vec![person("ex:a", "A"), person("ex:b", "B")]);
    let c = model.insert_entity(person("ex:c", "C"));
    let mut editor = inline_editor(model);

    let d = editor
        .create_entity(person("ex:d", "D"), CreateOptions::default())
        .unwrap();
    editor
        .create_relation(
            d,
            c,
            RelationData::new("ex:knows", "ex:d", "ex:c"),
            CreateOptions::default(),
        )
        .unwrap();
    editor
        .change_entity(&iri("ex:a"), person("ex:a", "Anna"))
        .unwrap();
    let before_removal = editor.authoring_state().clone();
    let elements_before = editor.model().element_count();
    assert_eq!(before_removal.entities().count(), 2);

    editor.remove_items(&[group, d]).unwrap();

    let state = editor.authoring_state();
    assert!(state.is_empty(), "unexpected events: {:?}", state.events().collect::<Vec<_>>());
    assert!(editor.model().element(group).is_none());
    assert!(editor.model().element(d).is_none());
    assert_eq!(editor.model().link_count(), 0);
    assert_eq!(editor.model().element_count(), 1);

    // One undo restores cells and events together.
    assert!(editor.undo());
    assert_eq!(editor.authoring_state(), &before_removal);
    assert_eq!(editor.model().element_count(), elements_before);
    assert_eq!(editor.model().link_count(), 1);
}

#[test]
fn entity_shown_elsewhere_keeps_its_event() {
    let mut model = InMemoryDiagram::new();
    let first = model.insert_entity(person("ex:a", "A"));
    let second = model.insert_entity(person("ex:a", "A"));
    let mut editor = inline_editor(model);

    editor
        .change_entity(&iri("ex:a"), person("ex:a", "Anna"))
        .unwrap();
    assert_eq!(
        editor.model().element(second).unwrap().single_entity().unwrap().label.as_deref(),
        Some("Anna")
    );

    editor.remove_items(&[first]).unwrap();
    assert!(editor.authoring_state().entity_event(&iri("ex:a")).is_some());
    assert_eq!(editor.model().cells_of_entity(&iri("ex:a")), vec![second]);
}

#[test]
fn removing_a_link_discards_its_relation_event() {
    let mut model = InMemoryDiagram::new();
    let a = model.insert_entity(EntityData::new("ex:a"));
    let b = model.insert_entity(EntityData::new("ex:b"));
    let mut editor = inline_editor(model);

    let rel = RelationData::new("ex:knows", "ex:a", "ex:b");
    let link = editor
        .create_relation(a, b, rel.clone(), CreateOptions::default())
        .unwrap();
    editor.remove_items(&[link]).unwrap();
    assert!(editor.authoring_state().relation_event(&rel.key()).is_none());
    assert_eq!(editor.model().element_count(), 2);
}

#[test]
fn unknown_cell_is_rejected_before_anything_changes() {
    let mut model = InMemoryDiagram::new();
    let a = model.insert_entity(EntityData::new("ex:a"));
    let mut editor = inline_editor(model);

    let err = editor.remove_items(&[a, CellId::new(404)]).unwrap_err();
    assert!(matches!(err, EditorError::CellNotFound(cell) if cell == CellId::new(404)));
    assert!(editor.model().element(a).is_some());
    assert!(!editor.history().can_undo());
}

// ---------------------------------------------------------------------------
// Temporary items
// ---------------------------------------------------------------------------

#[test]
fn temporary_items_never_enter_history() {
    let mut model = InMemoryDiagram::new();
    let a = model.insert_entity(EntityData::new("ex:a"));
    let mut editor = inline_editor(model);

    let draft = editor
        .create_entity(EntityData::new("ex:draft"), CreateOptions::TEMPORARY)
        .unwrap();
    let link = editor
        .create_relation(
            a,
            draft,
            RelationData::new("ex:knows", "ex:a", "ex:draft"),
            CreateOptions::TEMPORARY,
        )
        .unwrap();

    assert!(!editor.history().can_undo());
    assert!(editor.authoring_state().is_empty());
    assert!(editor.temporary_state().has_entity(&iri("ex:draft")));
    assert!(
        editor
            .temporary_state()
            .has_relation(&RelationData::new("ex:knows", "ex:a", "ex:draft").key())
    );
    assert!(editor.model().link(link).is_some());

    let events = editor.drain_events();
    assert!(events.iter().all(|e| matches!(e, EditorEvent::TemporaryStateChanged { .. })));
    assert_eq!(events.len(), 2);

    assert_eq!(editor.remove_temporary_cells(&[a, draft]), 1);
    assert!(editor.model().element(a).is_some());
    assert!(editor.model().element(draft).is_none());
    assert!(editor.model().link(link).is_none());
    assert!(editor.temporary_state().is_empty());
    assert!(!editor.history().can_undo());
}

#[test]
fn discard_temporary_state_clears_every_provisional_cell() {
    let mut editor = inline_editor(InMemoryDiagram::new());
    let kept = editor
        .create_entity(EntityData::new("ex:kept"), CreateOptions::default())
        .unwrap();
    editor
        .create_entity(EntityData::new("ex:t1"), CreateOptions::TEMPORARY)
        .unwrap();
    editor
        .create_entity(EntityData::new("ex:t2"), CreateOptions::TEMPORARY)
        .unwrap();
    assert_eq!(editor.model().element_count(), 3);

    editor.discard_temporary_state();
    assert_eq!(editor.model().element_count(), 1);
    assert!(editor.model().element(kept).is_some());
    assert!(editor.temporary_state().is_empty());
    assert_eq!(editor.history().undo_count(), 1);
}

#[test]
fn temporary_relation_gets_its_own_link() {
    let mut model = InMemoryDiagram::new();
    let people = model.insert_entity_group(vec![person("ex:a1", "A1"), person("ex:a2", "A2")]);
    let c = model.insert_entity(person("ex:c", "C"));
    let mut editor = inline_editor(model);

    let recorded = editor
        .create_relation(
            people,
            c,
            RelationData::new("ex:knows", "ex:a1", "ex:c"),
            CreateOptions::default(),
        )
        .unwrap();
    let provisional = editor
        .create_relation(
            people,
            c,
            RelationData::new("ex:knows", "ex:a2", "ex:c"),
            CreateOptions::TEMPORARY,
        )
        .unwrap();
    assert_ne!(recorded, provisional);
    assert_eq!(editor.model().link_count(), 2);

    // Undoing the recorded relation leaves the temporary one in place.
    assert!(editor.undo());
    assert!(editor.model().link(recorded).is_none());
    assert!(editor.model().link(provisional).is_some());
    assert!(
        editor
            .temporary_state()
            .has_relation(&RelationData::new("ex:knows", "ex:a2", "ex:c").key())
    );

    editor.discard_temporary_state();
    assert_eq!(editor.model().link_count(), 0);
    assert!(editor.temporary_state().is_empty());
}

#[test]
fn recorded_relation_to_temporary_entity_is_rejected() {
    let mut model = InMemoryDiagram::new();
    let a = model.insert_entity(person("ex:a", "A"));
    let mut editor = inline_editor(model);

    let draft = editor
        .create_entity(EntityData::new("ex:draft"), CreateOptions::TEMPORARY)
        .unwrap();
    let err = editor
        .create_relation(
            a,
            draft,
            RelationData::new("ex:knows", "ex:a", "ex:draft"),
            CreateOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, EditorError::TemporaryEndpoint(ref iri) if iri.as_str() == "ex:draft"));
    assert_eq!(editor.model().link_count(), 0);
    assert!(editor.authoring_state().is_empty());
    assert!(!editor.history().can_undo());

    editor.discard_temporary_state();
    assert!(editor.authoring_state().is_empty());
    assert!(editor.model().element(draft).is_none());
}

#[test]
fn recorded_relation_cannot_be_moved_onto_temporary_entity() {
    let mut model = InMemoryDiagram::new();
    let a = model.insert_entity(person("ex:a", "A"));
    let b = model.insert_entity(person("ex:b", "B"));
    let link = model.insert_relation(a, b, RelationData::new("ex:knows", "ex:a", "ex:b"));
    let mut editor = inline_editor(model);

    let draft = editor
        .create_entity(EntityData::new("ex:draft"), CreateOptions::TEMPORARY)
        .unwrap();
    let err = editor
        .move_relation_endpoint(link, LinkEnd::Target, draft)
        .unwrap_err();
    assert!(matches!(err, EditorError::TemporaryEndpoint(_)));
    assert!(editor.authoring_state().is_empty());
    assert_eq!(editor.model().link(link).unwrap().target, b);
}
