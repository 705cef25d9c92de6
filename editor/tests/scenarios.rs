mod common;

use common::{inline_editor, iri, person};
use graphedit_editor::authoring::{EntityChange, RelationChange};
use graphedit_editor::{
    AuthoringEvent, AuthoringState, CreateOptions, DiagramModel, EditorEvent, InMemoryDiagram,
    RelationData,
};

// ---------------------------------------------------------------------------
// Create, edit, undo
// ---------------------------------------------------------------------------

#[test]
fn alice_is_created_edited_and_undone() {
    let mut editor = inline_editor(InMemoryDiagram::new());
    let alice = person("ex:Alice", "Alice");

    editor.create_entity(alice.clone(), CreateOptions::default()).unwrap();
    let renamed = alice.clone().with_label("Alice Liddell");
    editor.change_entity(&iri("ex:Alice"), renamed.clone()).unwrap();

    let event = editor.authoring_state().entity_event(&iri("ex:Alice")).unwrap();
    assert_eq!(event.change(), &EntityChange::Added { data: renamed });

    assert!(editor.undo());
    let event = editor.authoring_state().entity_event(&iri("ex:Alice")).unwrap();
    assert_eq!(event.change(), &EntityChange::Added { data: alice });

    assert!(editor.undo());
    assert!(editor.authoring_state().entity_event(&iri("ex:Alice")).is_none());
    assert!(editor.model().cells_of_entity(&iri("ex:Alice")).is_empty());
    assert!(!editor.undo());
}

// ---------------------------------------------------------------------------
// Delete, discard
// ---------------------------------------------------------------------------

#[test]
fn bob_is_deleted_then_restored_by_discard() {
    let bob = person("ex:bob", "Bob");
    let mut model = InMemoryDiagram::new();
    let bob_cell = model.insert_entity(bob.clone());
    let carol_cell = model.insert_entity(person("ex:carol", "Carol"));
    let knows = RelationData::new("ex:knows", "ex:bob", "ex:carol");
    model.insert_relation(bob_cell, carol_cell, knows.clone());
    let mut editor = inline_editor(model);

    let likes = RelationData::new("ex:likes", "ex:bob", "ex:carol");
    editor
        .create_relation(bob_cell, carol_cell, likes.clone(), CreateOptions::default())
        .unwrap();
    assert!(editor.authoring_state().is_new_relation(&likes.key()));

    editor.delete_entity(&iri("ex:bob")).unwrap();
    let state = editor.authoring_state();
    assert_eq!(
        state.entity_event(&iri("ex:bob")).unwrap().change(),
        &EntityChange::Deleted { data: bob.clone() }
    );
    assert!(state.relation_event(&likes.key()).is_none());
    assert!(state.is_deleted_relation(&knows.key()));
    assert!(
        !state
            .relations()
            .any(|e| e.key().touches(&iri("ex:bob")) && matches!(e.change(), RelationChange::Added { .. }))
    );
    assert!(editor.model().cells_of_entity(&iri("ex:bob")).is_empty());
    assert_eq!(editor.model().link_count(), 0);

    let deletion = AuthoringEvent::from(state.entity_event(&iri("ex:bob")).unwrap().clone());
    editor.discard_change(&deletion).unwrap();

    assert!(editor.authoring_state().entity_event(&iri("ex:bob")).is_none());
    let cells = editor.model().cells_of_entity(&iri("ex:bob"));
    assert_eq!(cells.len(), 1);
    assert_eq!(
        editor.model().element(cells[0]).unwrap().single_entity(),
        Some(&bob)
    );
}

#[test]
fn discarding_a_superseded_event_is_a_noop() {
    let mut model = InMemoryDiagram::new();
    model.insert_entity(person("ex:bob", "Bob"));
    let mut editor = inline_editor(model);

    editor
        .change_entity(&iri("ex:bob"), person("ex:bob", "Bobby"))
        .unwrap();
    let first = AuthoringEvent::from(
        editor
            .authoring_state()
            .entity_event(&iri("ex:bob"))
            .unwrap()
            .clone(),
    );
    editor
        .change_entity(&iri("ex:bob"), person("ex:bob", "Robert"))
        .unwrap();

    let undo_steps = editor.history().undo_count();
    let before = editor.authoring_state().clone();
    editor.discard_change(&first).unwrap();
    assert!(editor.authoring_state().ptr_eq(&before));
    assert_eq!(editor.history().undo_count(), undo_steps);
}

#[test]
fn discarding_a_change_reverts_cells() {
    let bob = person("ex:bob", "Bob");
    let mut model = InMemoryDiagram::new();
    let cell = model.insert_entity(bob.clone());
    let mut editor = inline_editor(model);

    let robert = bob.renamed(iri("ex:robert")).with_label("Robert");
    editor.change_entity(&iri("ex:bob"), robert).unwrap();
    assert!(editor.model().cells_of_entity(&iri("ex:bob")).is_empty());

    let change = AuthoringEvent::from(
        editor
            .authoring_state()
            .entity_event(&iri("ex:robert"))
            .unwrap()
            .clone(),
    );
    editor.discard_change(&change).unwrap();
    assert!(editor.authoring_state().is_empty());
    assert_eq!(editor.model().element(cell).unwrap().single_entity(), Some(&bob));

    // Discarding is itself undoable.
    assert!(editor.undo());
    assert!(editor.model().cells_of_entity(&iri("ex:robert")).contains(&cell));
}

// ---------------------------------------------------------------------------
// History properties
// ---------------------------------------------------------------------------

#[test]
fn undo_redo_round_trip_reproduces_states() {
    let mut model = InMemoryDiagram::new();
    let bob_cell = model.insert_entity(person("ex:bob", "Bob"));
    let mut editor = inline_editor(model);

    let mut states: Vec<AuthoringState> = vec![editor.authoring_state().clone()];
    let alice_cell = editor
        .create_entity(person("ex:alice", "Alice"), CreateOptions::default())
        .unwrap();
    states.push(editor.authoring_state().clone());
    editor
        .create_relation(
            alice_cell,
            bob_cell,
            RelationData::new("ex:knows", "ex:alice", "ex:bob"),
            CreateOptions::default(),
        )
        .unwrap();
    states.push(editor.authoring_state().clone());
    editor
        .change_entity(&iri("ex:bob"), person("ex:bob", "Bobby"))
        .unwrap();
    states.push(editor.authoring_state().clone());
    editor.delete_entity(&iri("ex:alice")).unwrap();
    states.push(editor.authoring_state().clone());

    let steps = editor.history().undo_count();
    assert_eq!(steps, states.len() - 1);
    let final_cells = editor.model().element_count();

    for expected in states.iter().rev().skip(1) {
        assert!(editor.undo());
        assert_eq!(editor.authoring_state(), expected);
    }
    assert!(!editor.history().can_undo());
    assert_eq!(editor.model().element_count(), 1);

    for expected in states.iter().skip(1) {
        assert!(editor.redo());
        assert_eq!(editor.authoring_state(), expected);
    }
    assert!(!editor.history().can_redo());
    assert_eq!(editor.model().element_count(), final_cells);
}

#[test]
fn one_undo_reverts_a_whole_operation() {
    let mut model = InMemoryDiagram::new();
    let a = model.insert_entity(person("ex:a", "A"));
    let b = model.insert_entity(person("ex:b", "B"));
    let c = model.insert_entity(person("ex:c", "C"));
    model.insert_relation(a, b, RelationData::new("ex:knows", "ex:a", "ex:b"));
    model.insert_relation(c, a, RelationData::new("ex:knows", "ex:c", "ex:a"));
    let mut editor = inline_editor(model);
    let cells_before = (editor.model().element_count(), editor.model().link_count());

    editor.delete_entity(&iri("ex:a")).unwrap();
    assert_eq!(editor.history().undo_count(), 1);
    assert_eq!(editor.model().link_count(), 0);
    assert_eq!(editor.authoring_state().relations().count(), 2);

    assert!(editor.undo());
    assert!(editor.authoring_state().is_empty());
    assert_eq!(
        (editor.model().element_count(), editor.model().link_count()),
        cells_before
    );
}

#[test]
fn undo_history_is_bounded() {
    let mut editor = graphedit_editor::EditorController::new(
        InMemoryDiagram::new(),
        graphedit_core::compute::InlineRunner,
        &graphedit_editor::EditorConfig::from_toml_str("max_undo = 2").unwrap(),
    );
    for i in 0..4 {
        editor
            .create_entity(person(&format!("ex:e{i}"), "E"), CreateOptions::default())
            .unwrap();
    }
    assert_eq!(editor.history().undo_count(), 2);
    assert!(editor.undo());
    assert!(editor.undo());
    assert!(!editor.undo());
    assert_eq!(editor.model().element_count(), 2);
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn each_operation_emits_one_authoring_event() {
    let mut editor = inline_editor(InMemoryDiagram::new());
    editor
        .create_entity(person("ex:a", "A"), CreateOptions::default())
        .unwrap();
    let events = editor.drain_events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        EditorEvent::AuthoringStateChanged { previous, current } => {
            assert!(previous.is_empty());
            assert!(current.is_new_entity(&iri("ex:a")));
        }
        other => panic!("unexpected event {other:?}"),
    }

    editor.undo();
    let events = editor.drain_events();
    assert!(matches!(
        events.as_slice(),
        [EditorEvent::AuthoringStateChanged { current, .. }] if current.is_empty()
    ));

    editor.set_authoring_mode(false);
    editor.set_authoring_mode(false);
    assert_eq!(
        editor.drain_events(),
        vec![EditorEvent::ModeChanged { authoring: false }]
    );
}

#[test]
fn reset_history_forgets_steps() {
    let mut editor = inline_editor(InMemoryDiagram::new());
    editor
        .create_entity(person("ex:a", "A"), CreateOptions::default())
        .unwrap();
    editor.reset_history();
    assert!(!editor.undo());
    assert!(editor.authoring_state().is_new_entity(&iri("ex:a")));
}
