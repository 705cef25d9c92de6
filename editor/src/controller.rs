//! Editing surface that keeps diagram cells, authoring state, history and
//! validation in step.
//!
//! Every recorded operation runs inside one history batch, so a single
//! undo reverts it completely, cells and authoring state alike. After each
//! operation (and after undo/redo) the controller compares the document's
//! states with the ones it last reported, emits change events and starts
//! validation for whatever the change made dirty.
//!
//! Operations check their inputs before executing any command, so an
//! operation that fails leaves the document untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use graphedit_core::command::{Command, CommandHistory};
use graphedit_core::compute::{CancellationToken, IoRunner};

use crate::authoring::{
    AuthoringEvent, AuthoringState, EntityChange, RelationChange, TemporaryState,
};
use crate::config::EditorConfig;
use crate::diagram::{CellId, DiagramModel, DiagramSnapshot, Element, ElementKind, Link};
use crate::document::{self, EditorDocument};
use crate::error::{AuthoringError, EditorError};
use crate::events::{EditorEvent, EventQueue};
use crate::io_runtime::IoRuntime;
use crate::model::{EntityData, EntityIri, RelationData, RelationKey};
use crate::validation::{
    PendingValidation, ValidationProvider, ValidationState, changed_elements_to_validate,
    validate_elements,
};

/// Options for creating entities and relations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Show the item without recording it: no authoring event, no undo step.
    pub temporary: bool,
}

impl CreateOptions {
    pub const TEMPORARY: Self = Self { temporary: true };
}

/// End of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEnd {
    Source,
    Target,
}

/// Orchestrates edits of a diagram model `M`, running validation on `R`.
pub struct EditorController<M: DiagramModel, R: IoRunner = IoRuntime> {
    document: EditorDocument<M>,
    history: CommandHistory<EditorDocument<M>>,
    validation: ValidationState,
    provider: Option<Arc<dyn ValidationProvider>>,
    validation_enabled: bool,
    runner: R,
    scope: CancellationToken,
    full_pass: Option<CancellationToken>,
    pending: Vec<PendingValidation>,
    events: EventQueue,
    authoring_mode: bool,
    reported_authoring: AuthoringState,
    reported_temporary: TemporaryState,
    disposed: bool,
}

impl<M: DiagramModel, R: IoRunner> EditorController<M, R> {
    /// Creates a controller over `model`, whose current content is taken as
    /// the persisted baseline.
    pub fn new(model: M, runner: R, config: &EditorConfig) -> Self {
        Self {
            document: EditorDocument::new(model),
            history: CommandHistory::new(config.max_undo),
            validation: ValidationState::new(),
            provider: None,
            validation_enabled: config.validation.enabled,
            runner,
            scope: CancellationToken::new(),
            full_pass: None,
            pending: Vec::new(),
            events: EventQueue::default(),
            authoring_mode: config.authoring_mode,
            reported_authoring: AuthoringState::new(),
            reported_temporary: TemporaryState::new(),
            disposed: false,
        }
    }

    /// Sets the validation strategy.
    pub fn with_validation_provider(mut self, provider: impl ValidationProvider) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// The diagram being edited.
    pub fn model(&self) -> &M {
        &self.document.model
    }

    /// The command target: model plus authoring and temporary state.
    pub fn document(&self) -> &EditorDocument<M> {
        &self.document
    }

    /// Pending changes relative to the persisted baseline.
    pub fn authoring_state(&self) -> &AuthoringState {
        &self.document.authoring
    }

    /// Provisional items shown but not recorded.
    pub fn temporary_state(&self) -> &TemporaryState {
        &self.document.temporary
    }

    /// Latest validation results, including `loading` placeholders.
    pub fn validation_state(&self) -> &ValidationState {
        &self.validation
    }

    /// Undo and redo stacks of recorded operations.
    pub fn history(&self) -> &CommandHistory<EditorDocument<M>> {
        &self.history
    }

    /// Whether the controller is in authoring mode.
    pub fn authoring_mode(&self) -> bool {
        self.authoring_mode
    }

    /// Number of validation tasks not yet applied.
    pub fn pending_validations(&self) -> usize {
        self.pending.len()
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Takes every event emitted since the last call.
    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        self.events.drain()
    }

    /// Cancels outstanding validation and stops starting new passes.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.scope.cancel();
        let dropped = self.pending.len();
        self.pending.clear();
        log::debug!("editor disposed, {dropped} validation task(s) cancelled");
    }

    // ---- mode --------------------------------------------------------------

    /// Enters or leaves authoring mode. Leaving drops every temporary item.
    pub fn set_authoring_mode(&mut self, authoring: bool) {
        if self.authoring_mode == authoring {
            return;
        }
        if !authoring {
            self.discard_temporary_state();
        }
        self.authoring_mode = authoring;
        self.events.push(EditorEvent::ModeChanged { authoring });
    }

    // ---- history -----------------------------------------------------------

    /// Reverts the last recorded operation. Returns `false` if there was none.
    pub fn undo(&mut self) -> bool {
        let done = self.history.undo(&mut self.document);
        if done {
            self.settle();
        }
        done
    }

    /// Replays the last undone operation. Returns `false` if there was none.
    pub fn redo(&mut self) -> bool {
        let done = self.history.redo(&mut self.document);
        if done {
            self.settle();
        }
        done
    }

    /// Forgets undo and redo steps, e.g. after a fresh import.
    pub fn reset_history(&mut self) {
        self.history.reset();
    }

    // ---- entities ----------------------------------------------------------

    /// Places a new entity on the diagram.
    pub fn create_entity(&mut self, data: EntityData, options: CreateOptions) -> Result<CellId, EditorError> {
        self.in_batch("Create entity", options.temporary, |this| {
            let id = this.document.model.allocate_cell_id();
            this.execute(document::add_element(Element::entity(id, data.clone())));
            if options.temporary {
                this.document.temporary = this.document.temporary.add_entity(data.id);
            } else {
                let next = this.document.authoring.add_entity(data);
                this.set_authoring(next);
            }
            Ok(id)
        })
    }

    /// Replaces the data of entity `target` in every cell showing it.
    ///
    /// When the IRI changes, relations on the diagram follow the new IRI.
    pub fn change_entity(&mut self, target: &EntityIri, data: EntityData) -> Result<(), EditorError> {
        let before = self.entity_data(target)?;
        if before == data {
            return Ok(());
        }
        let temporary = self.document.temporary.has_entity(target);

        self.in_batch("Change entity", temporary, |this| {
            for cell in this.document.model.cells_of_entity(target) {
                if let Some(element) = this.document.model.element(cell) {
                    let updated = element.with_replaced_entity(target, &data);
                    this.execute(document::update_element(updated));
                }
            }
            if data.id != *target {
                this.rename_link_endpoints(target, &data.id);
            }

            if temporary {
                this.document.temporary = this
                    .document
                    .temporary
                    .remove_entity(target)
                    .add_entity(data.id.clone());
            } else {
                let next = this.document.authoring.change_entity(&before, data);
                this.set_authoring(next);
            }
            Ok(())
        })
    }

    /// Removes an entity and every relation touching it from the diagram and
    /// records the deletion.
    pub fn delete_entity(&mut self, iri: &EntityIri) -> Result<(), EditorError> {
        let data = self.entity_data(iri)?;
        let temporary = self.document.temporary.has_entity(iri);

        self.in_batch("Delete entity", temporary, |this| {
            for relation in this.relations_touching(iri) {
                this.delete_relation_inner(&relation);
            }
            for cell in this.document.model.cells_of_entity(iri) {
                this.remove_entity_from_cell(cell, iri);
            }
            if temporary {
                this.document.temporary = this.document.temporary.remove_entity(iri);
            } else {
                let next = this.document.authoring.delete_entity(&data);
                this.set_authoring(next);
            }
            Ok(())
        })
    }

    // ---- relations ---------------------------------------------------------

    /// Connects two element cells with a relation.
    ///
    /// When a link of the same type already joins the two cells, the
    /// relation joins it and the link becomes a relation group; the existing
    /// link keeps its id. Returns the id of the link holding the relation.
    pub fn create_relation(
        &mut self,
        source: CellId,
        target: CellId,
        data: RelationData,
        options: CreateOptions,
    ) -> Result<CellId, EditorError> {
        self.check_endpoint(source, &data.source)?;
        self.check_endpoint(target, &data.target)?;
        self.check_recordable(&data, options.temporary)?;
        if let Some(&existing) = self.document.model.links_with_relation(&data.key()).first() {
            log::debug!("relation {} is already on the diagram", data.key());
            return Ok(existing);
        }

        self.in_batch("Create relation", options.temporary, |this| {
            let key = data.key();
            let id = this.place_relation(source, target, data.clone(), options.temporary);
            if options.temporary {
                this.document.temporary = this.document.temporary.add_relation(key);
            } else {
                let next = this.document.authoring.add_relation(data);
                this.set_authoring(next);
            }
            Ok(id)
        })
    }

    /// Replaces relation data.
    ///
    /// A change of type or endpoints cannot be recorded as an edit; the
    /// relation is deleted and recreated instead, attached to cells that
    /// show the new endpoints.
    pub fn change_relation(&mut self, before: &RelationData, after: RelationData) -> Result<(), EditorError> {
        let links = self.document.model.links_with_relation(&before.key());
        let Some(&link_id) = links.first() else {
            return Err(EditorError::RelationNotFound(before.key()));
        };
        if before == &after {
            return Ok(());
        }
        let temporary = self.document.temporary.has_relation(&before.key());

        match self.document.authoring.change_relation(before, after.clone()) {
            Ok(next) => self.in_batch("Change relation", temporary, |this| {
                for link_id in links {
                    this.replace_in_link(link_id, &before.key(), Some(after.clone()));
                }
                if temporary {
                    log::debug!("relation {} is temporary, change not recorded", before.key());
                } else {
                    this.set_authoring(next);
                }
                Ok(())
            }),
            Err(AuthoringError::RelationIdentityChanged { .. }) => {
                let (source, target) = self.endpoint_cells(link_id, before, &after)?;
                self.check_recordable(&after, temporary)?;
                self.in_batch("Change relation", temporary, |this| {
                    this.delete_relation_inner(before);
                    let key = after.key();
                    this.place_relation(source, target, after.clone(), temporary);
                    if temporary {
                        this.document.temporary = this.document.temporary.add_relation(key);
                    } else {
                        let next = this.document.authoring.add_relation(after);
                        this.set_authoring(next);
                    }
                    Ok(())
                })
            }
        }
    }

    /// Re-attaches one end of every relation in `link` to the entity shown by
    /// `cell`. Returns the id of the link now holding the relations.
    pub fn move_relation_endpoint(&mut self, link: CellId, end: LinkEnd, cell: CellId) -> Result<CellId, EditorError> {
        let current = self
            .document
            .model
            .link(link)
            .cloned()
            .ok_or(EditorError::CellNotFound(link))?;
        let entity = self
            .document
            .model
            .element(cell)
            .ok_or(EditorError::CellNotFound(cell))?
            .single_entity()
            .ok_or(EditorError::NotAnEntity(cell))?
            .id
            .clone();
        let (source, target) = match end {
            LinkEnd::Source => (cell, current.target),
            LinkEnd::Target => (current.source, cell),
        };
        if source == current.source && target == current.target {
            return Ok(link);
        }

        let temporary = current
            .relations()
            .iter()
            .all(|relation| self.document.temporary.has_relation(&relation.key()));
        let recorded = current
            .relations()
            .iter()
            .any(|relation| !self.document.temporary.has_relation(&relation.key()));
        if recorded && self.document.temporary.has_entity(&entity) {
            return Err(EditorError::TemporaryEndpoint(entity));
        }
        self.in_batch("Move relation", temporary, |this| {
            let mut moved_to = link;
            for relation in current.relations() {
                let was_temporary = this.document.temporary.has_relation(&relation.key());
                let mut moved = relation.clone();
                match end {
                    LinkEnd::Source => moved.source = entity.clone(),
                    LinkEnd::Target => moved.target = entity.clone(),
                }
                this.delete_relation_inner(relation);
                moved_to = this.place_relation(source, target, moved.clone(), was_temporary);
                if was_temporary {
                    this.document.temporary = this.document.temporary.add_relation(moved.key());
                } else {
                    let next = this.document.authoring.add_relation(moved);
                    this.set_authoring(next);
                }
            }
            log::debug!("moved {} relation(s) to link {moved_to}", current.relations().len());
            Ok(moved_to)
        })
    }

    /// Removes a relation from the diagram and records the deletion.
    pub fn delete_relation(&mut self, data: &RelationData) -> Result<(), EditorError> {
        let key = data.key();
        let on_diagram = !self.document.model.links_with_relation(&key).is_empty();
        if !on_diagram && self.document.authoring.relation_event(&key).is_none() {
            return Err(EditorError::RelationNotFound(key));
        }
        let temporary = self.document.temporary.has_relation(&key);
        self.in_batch("Delete relation", temporary, |this| {
            this.delete_relation_inner(data);
            Ok(())
        })
    }

    // ---- removal and discarding --------------------------------------------

    /// Removes cells from the diagram and forgets the pending changes of the
    /// entities and relations they showed.
    ///
    /// Entities still shown by another cell keep their authoring events.
    pub fn remove_items(&mut self, cells: &[CellId]) -> Result<(), EditorError> {
        for &cell in cells {
            if self.document.model.element(cell).is_none() && self.document.model.link(cell).is_none() {
                return Err(EditorError::CellNotFound(cell));
            }
        }

        self.in_batch("Remove items", false, |this| {
            let mut entities = BTreeSet::new();
            let mut relations = Vec::new();
            for &cell in cells {
                if let Some(link) = this.document.model.link(cell) {
                    relations.extend(link.relations().iter().map(RelationData::key));
                    this.execute(document::remove_link(cell));
                } else if let Some(element) = this.document.model.element(cell) {
                    entities.extend(element.entities().iter().map(|data| data.id.clone()));
                    for link in this.document.model.links_of(cell) {
                        this.execute(document::remove_link(link));
                    }
                    this.execute(document::remove_element(cell));
                }
            }

            let gone: BTreeSet<EntityIri> = entities
                .into_iter()
                .filter(|iri| this.document.model.cells_of_entity(iri).is_empty())
                .collect();

            let mut state = this.document.authoring.clone();
            let mut temporary = this.document.temporary.clone();
            for iri in &gone {
                if let Some(event) = state.entity_event(iri).cloned() {
                    state = state.discard(&event.into());
                }
                temporary = temporary.remove_entity(iri);
            }
            state = state.discard_added_relations(&gone);
            for key in &relations {
                if !this.document.model.links_with_relation(key).is_empty() {
                    continue;
                }
                if let Some(event) = state.relation_event(key).cloned() {
                    state = state.discard(&event.into());
                }
                temporary = temporary.remove_relation(key);
            }
            this.document.temporary = temporary;
            this.set_authoring(state);
            Ok(())
        })
    }

    /// Reverts one pending change on the diagram and drops its event.
    ///
    /// An event that is no longer current (discarded or superseded) is
    /// ignored with a warning.
    pub fn discard_change(&mut self, event: &AuthoringEvent) -> Result<(), EditorError> {
        let current = match event {
            AuthoringEvent::Entity(e) => self
                .document
                .authoring
                .entity_event(e.key())
                .is_some_and(|found| found.token() == e.token()),
            AuthoringEvent::Relation(e) => self
                .document
                .authoring
                .relation_event(&e.key())
                .is_some_and(|found| found.token() == e.token()),
        };
        if !current {
            log::warn!("discarding an authoring event that is no longer in the state");
            return Ok(());
        }

        self.in_batch("Discard change", false, |this| {
            let mut state = this.document.authoring.discard(event);
            match event {
                AuthoringEvent::Entity(e) => match e.change() {
                    EntityChange::Added { data } => {
                        for cell in this.document.model.cells_of_entity(&data.id) {
                            this.remove_entity_from_cell(cell, &data.id);
                        }
                        state = state.discard_added_relations(&BTreeSet::from([data.id.clone()]));
                        this.drop_links_touching(&data.id);
                    }
                    EntityChange::Changed { before, .. } => {
                        let current = e.current_iri().clone();
                        for cell in this.document.model.cells_of_entity(&current) {
                            if let Some(element) = this.document.model.element(cell) {
                                let reverted = element.with_replaced_entity(&current, before);
                                this.execute(document::update_element(reverted));
                            }
                        }
                        if current != before.id {
                            this.rename_link_endpoints(&current, &before.id);
                            state = state.rename_relation_endpoints(&current, &before.id);
                        }
                    }
                    EntityChange::Deleted { data } => {
                        if this.document.model.cells_of_entity(&data.id).is_empty() {
                            let id = this.document.model.allocate_cell_id();
                            this.execute(document::add_element(Element::entity(id, data.clone())));
                        }
                    }
                },
                AuthoringEvent::Relation(e) => match e.change() {
                    RelationChange::Added { data } => {
                        for link in this.document.model.links_with_relation(&data.key()) {
                            this.replace_in_link(link, &data.key(), None);
                        }
                    }
                    RelationChange::Changed { before, .. } => {
                        for link in this.document.model.links_with_relation(&before.key()) {
                            this.replace_in_link(link, &before.key(), Some(before.clone()));
                        }
                    }
                    RelationChange::Deleted { data } => this.restore_relation(data),
                },
            }
            this.set_authoring(state);
            Ok(())
        })
    }

    /// Removes temporary cells without touching history.
    ///
    /// Cells showing anything that is not temporary are left in place.
    /// Returns the number of cells removed.
    pub fn remove_temporary_cells(&mut self, cells: &[CellId]) -> usize {
        let mut removed = 0;
        for &cell in cells {
            let model = &self.document.model;
            let temporary = &self.document.temporary;
            let is_temporary = if let Some(element) = model.element(cell) {
                element.entities().iter().all(|data| temporary.has_entity(&data.id))
            } else if let Some(link) = model.link(cell) {
                link.relations().iter().all(|data| temporary.has_relation(&data.key()))
            } else {
                false
            };
            if !is_temporary {
                log::warn!("cell {cell} is not temporary, keeping it");
                continue;
            }
            self.drop_cell_untracked(cell);
            removed += 1;
        }
        self.settle();
        removed
    }

    /// Removes every temporary item from the diagram without touching history.
    pub fn discard_temporary_state(&mut self) {
        let temporary = self.document.temporary.clone();
        if temporary.is_empty() {
            return;
        }
        let mut cells = BTreeSet::new();
        for iri in temporary.entities() {
            cells.extend(self.document.model.cells_of_entity(iri));
        }
        for key in temporary.relations() {
            cells.extend(self.document.model.links_with_relation(key));
        }
        for cell in cells {
            self.drop_cell_untracked(cell);
        }
        self.document.temporary = TemporaryState::new();
        self.settle();
    }

    // ---- validation --------------------------------------------------------

    /// Validates every entity on the diagram.
    ///
    /// `cancellation` scopes this pass: cancelling it, disposing the
    /// controller, or starting another full pass cancels its tasks.
    /// Returns the number of tasks started.
    pub fn revalidate_all(&mut self, cancellation: &CancellationToken) -> usize {
        let token = self.scope.joined(cancellation);
        if let Some(previous) = self.full_pass.replace(token.clone()) {
            previous.cancel();
        }
        let graph = Arc::new(DiagramSnapshot::capture(&self.document.model));
        let targets: BTreeSet<EntityIri> = graph.entities().map(|data| data.id.clone()).collect();
        self.start_validation(&targets, graph, &token)
    }

    /// Applies results of finished validation tasks without blocking.
    /// Returns the number of tasks that finished.
    pub fn poll_validation(&mut self) -> usize {
        let mut finished = 0;
        for task in std::mem::take(&mut self.pending) {
            match task.try_outcome() {
                Some(outcome) => {
                    finished += 1;
                    if let Some(next) = task.apply(outcome, &self.validation) {
                        self.set_validation(next);
                    }
                }
                None => self.pending.push(task),
            }
        }
        finished
    }

    /// Blocks until every validation task has finished and applies the
    /// results in start order. Returns the number of tasks.
    pub fn wait_validation(&mut self) -> usize {
        let tasks = std::mem::take(&mut self.pending);
        let count = tasks.len();
        for task in tasks {
            let outcome = task.wait();
            if let Some(next) = task.apply(outcome, &self.validation) {
                self.set_validation(next);
            }
        }
        count
    }

    fn start_validation(
        &mut self,
        targets: &BTreeSet<EntityIri>,
        graph: Arc<DiagramSnapshot>,
        token: &CancellationToken,
    ) -> usize {
        let Some(provider) = self.provider.clone() else {
            return 0;
        };
        if self.disposed || !self.validation_enabled || targets.is_empty() {
            return 0;
        }
        let (state, pending) = validate_elements(
            targets,
            &provider,
            &graph,
            &self.document.authoring,
            &self.validation,
            &self.runner,
            token,
        );
        let started = pending.len();
        self.set_validation(state);
        self.pending.extend(pending);
        started
    }

    fn set_validation(&mut self, next: ValidationState) {
        if next.ptr_eq(&self.validation) {
            return;
        }
        let previous = std::mem::replace(&mut self.validation, next);
        self.events.push(EditorEvent::ValidationStateChanged {
            previous,
            current: self.validation.clone(),
        });
    }

    // ---- internals ---------------------------------------------------------

    fn execute(&mut self, command: Command<EditorDocument<M>>) {
        self.history.execute(command, &mut self.document);
    }

    fn set_authoring(&mut self, next: AuthoringState) {
        if !next.ptr_eq(&self.document.authoring) {
            self.execute(document::set_authoring_state(next));
        }
    }

    /// Runs `op` inside a batch; the batch is stored unless `temporary`.
    ///
    /// When `op` fails, the commands it executed are reverted and the
    /// temporary state is restored, so the failure leaves no trace.
    fn in_batch<T>(
        &mut self,
        title: &str,
        temporary: bool,
        op: impl FnOnce(&mut Self) -> Result<T, EditorError>,
    ) -> Result<T, EditorError> {
        let temporary_before = self.document.temporary.clone();
        let batch = self.history.start_batch(Some(title));
        let result = op(self);
        match &result {
            Ok(_) if !temporary => {
                batch.store(&mut self.history)?;
            }
            Ok(_) => {
                batch.discard(&mut self.history)?;
            }
            Err(e) => {
                log::debug!("{title} failed, reverting: {e}");
                batch.revert(&mut self.history, &mut self.document)?;
                self.document.temporary = temporary_before;
            }
        }
        self.settle();
        result
    }

    /// Reports state changes since the last call and starts validation.
    fn settle(&mut self) {
        let current = self.document.authoring.clone();
        if !current.ptr_eq(&self.reported_authoring) {
            let previous = std::mem::replace(&mut self.reported_authoring, current.clone());
            self.events.push(EditorEvent::AuthoringStateChanged {
                previous: previous.clone(),
                current: current.clone(),
            });
            if self.provider.is_some() && self.validation_enabled && !self.disposed {
                let graph = Arc::new(DiagramSnapshot::capture(&self.document.model));
                let targets = changed_elements_to_validate(&previous, &current, &graph);
                let token = self.scope.child();
                self.start_validation(&targets, graph, &token);
            }
        }

        let temporary = self.document.temporary.clone();
        if !temporary.ptr_eq(&self.reported_temporary) {
            let previous = std::mem::replace(&mut self.reported_temporary, temporary.clone());
            self.events.push(EditorEvent::TemporaryStateChanged {
                previous,
                current: temporary,
            });
        }
    }

    fn entity_data(&self, iri: &EntityIri) -> Result<EntityData, EditorError> {
        self.document
            .model
            .elements()
            .flat_map(|element| element.entities())
            .find(|data| &data.id == iri)
            .cloned()
            .ok_or_else(|| EditorError::EntityNotFound(iri.clone()))
    }

    /// A recorded relation may not point at a temporary entity.
    fn check_recordable(&self, data: &RelationData, temporary: bool) -> Result<(), EditorError> {
        if temporary {
            return Ok(());
        }
        match [&data.source, &data.target]
            .into_iter()
            .find(|iri| self.document.temporary.has_entity(iri))
        {
            Some(iri) => Err(EditorError::TemporaryEndpoint(iri.clone())),
            None => Ok(()),
        }
    }

    fn check_endpoint(&self, cell: CellId, expected: &EntityIri) -> Result<(), EditorError> {
        let element = self
            .document
            .model
            .element(cell)
            .ok_or(EditorError::CellNotFound(cell))?;
        if element.holds(expected) {
            Ok(())
        } else {
            Err(EditorError::EndpointMismatch {
                cell,
                expected: expected.clone(),
            })
        }
    }

    /// Cells to attach `after` to when it replaces `before` on `link`.
    fn endpoint_cells(
        &self,
        link: CellId,
        before: &RelationData,
        after: &RelationData,
    ) -> Result<(CellId, CellId), EditorError> {
        let link = self
            .document
            .model
            .link(link)
            .ok_or(EditorError::CellNotFound(link))?;
        let pick = |kept: CellId, old: &EntityIri, new: &EntityIri| {
            if old == new {
                return Ok(kept);
            }
            self.document
                .model
                .cells_of_entity(new)
                .first()
                .copied()
                .ok_or_else(|| EditorError::EntityNotFound(new.clone()))
        };
        let source = pick(link.source, &before.source, &after.source)?;
        let target = pick(link.target, &before.target, &after.target)?;
        Ok((source, target))
    }

    fn relations_touching(&self, iri: &EntityIri) -> Vec<RelationData> {
        let mut seen = BTreeSet::new();
        self.document
            .model
            .links()
            .flat_map(|link| link.relations())
            .filter(|data| data.touches(iri) && seen.insert(data.key()))
            .cloned()
            .collect()
    }

    /// Adds `data` to the link of its type between the two cells, or to a
    /// new link when there is none.
    ///
    /// Temporary and recorded relations never share a link.
    fn place_relation(&mut self, source: CellId, target: CellId, data: RelationData, temporary: bool) -> CellId {
        let model = &self.document.model;
        let state = &self.document.temporary;
        let joinable = model
            .links_between(source, target, &data.link_type)
            .into_iter()
            .filter_map(|id| model.link(id))
            .find(|link| {
                link.relations()
                    .iter()
                    .all(|member| state.has_relation(&member.key()) == temporary)
            });
        if let Some(link) = joinable {
            let id = link.id;
            let mut items = link.relations().to_vec();
            items.push(data);
            if let Some(grouped) = link.with_relations(items) {
                self.execute(document::update_link(grouped));
            }
            return id;
        }
        let id = self.document.model.allocate_cell_id();
        self.execute(document::add_link(Link::relation(id, source, target, data)));
        id
    }

    /// Replaces (or with `None`, removes) relation `key` in `link`.
    ///
    /// A group left with one member becomes a plain relation link; a link
    /// left with none is removed.
    fn replace_in_link(&mut self, link: CellId, key: &RelationKey, replacement: Option<RelationData>) {
        let Some(current) = self.document.model.link(link) else {
            return;
        };
        let items: Vec<RelationData> = current
            .relations()
            .iter()
            .filter_map(|data| {
                if &data.key() == key {
                    replacement.clone()
                } else {
                    Some(data.clone())
                }
            })
            .collect();
        match current.with_relations(items) {
            Some(updated) => self.execute(document::update_link(updated)),
            None => self.execute(document::remove_link(link)),
        }
    }

    fn delete_relation_inner(&mut self, data: &RelationData) {
        let key = data.key();
        let mut shown = None;
        for link in self.document.model.links_with_relation(&key) {
            if shown.is_none() {
                shown = self
                    .document
                    .model
                    .link(link)
                    .and_then(|l| l.relations().iter().find(|r| r.key() == key).cloned());
            }
            self.replace_in_link(link, &key, None);
        }
        if self.document.temporary.has_relation(&key) {
            self.document.temporary = self.document.temporary.remove_relation(&key);
        } else {
            let data = shown.unwrap_or_else(|| data.clone());
            let next = self.document.authoring.delete_relation(&data);
            self.set_authoring(next);
        }
    }

    /// Puts a deleted relation back between cells showing its endpoints.
    fn restore_relation(&mut self, data: &RelationData) {
        if !self.document.model.links_with_relation(&data.key()).is_empty() {
            return;
        }
        let source = self.document.model.cells_of_entity(&data.source).first().copied();
        let target = self.document.model.cells_of_entity(&data.target).first().copied();
        match (source, target) {
            (Some(source), Some(target)) => {
                self.place_relation(source, target, data.clone(), false);
            }
            _ => log::debug!("not restoring {}: an endpoint is not on the diagram", data.key()),
        }
    }

    /// Removes `iri` from `cell`: drops the cell with its links, or shrinks
    /// a group that shows other entities as well.
    fn remove_entity_from_cell(&mut self, cell: CellId, iri: &EntityIri) {
        let Some(element) = self.document.model.element(cell) else {
            return;
        };
        let mut remaining: Vec<EntityData> = element
            .entities()
            .iter()
            .filter(|data| &data.id != iri)
            .cloned()
            .collect();
        let replacement = match element.kind {
            ElementKind::Entity(_) => None,
            ElementKind::EntityGroup(_) => match remaining.len() {
                0 => None,
                1 => Some(Element::entity(cell, remaining.remove(0))),
                _ => Some(Element::group(cell, remaining)),
            },
        };
        match replacement {
            Some(updated) => self.execute(document::update_element(updated)),
            None => {
                for link in self.document.model.links_of(cell) {
                    self.execute(document::remove_link(link));
                }
                self.execute(document::remove_element(cell));
            }
        }
    }

    /// Removes relations touching `iri` from every link.
    fn drop_links_touching(&mut self, iri: &EntityIri) {
        for relation in self.relations_touching(iri) {
            for link in self.document.model.links_with_relation(&relation.key()) {
                self.replace_in_link(link, &relation.key(), None);
            }
        }
    }

    fn rename_link_endpoints(&mut self, from: &EntityIri, to: &EntityIri) {
        let affected: Vec<Link> = self
            .document
            .model
            .links()
            .filter(|link| link.relations().iter().any(|data| data.touches(from)))
            .cloned()
            .collect();
        for link in affected {
            let items = link
                .relations()
                .iter()
                .map(|data| data.with_renamed_endpoint(from, to))
                .collect();
            if let Some(renamed) = link.with_relations(items) {
                self.execute(document::update_link(renamed));
            }
        }
    }

    /// Removes a cell and its temporary entries directly, bypassing history.
    fn drop_cell_untracked(&mut self, cell: CellId) {
        let model = &mut self.document.model;
        let mut temporary = self.document.temporary.clone();
        if let Some(link) = model.remove_link(cell) {
            for data in link.relations() {
                temporary = temporary.remove_relation(&data.key());
            }
        } else if let Some(element) = model.remove_element(cell) {
            for link in model.links_of(cell) {
                if let Some(link) = model.remove_link(link) {
                    for data in link.relations() {
                        temporary = temporary.remove_relation(&data.key());
                    }
                }
            }
            for data in element.entities() {
                temporary = temporary.remove_entity(&data.id);
            }
        }
        self.document.temporary = temporary;
    }
}

impl<M: DiagramModel, R: IoRunner> Drop for EditorController<M, R> {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

impl<M: DiagramModel, R: IoRunner> std::fmt::Debug for EditorController<M, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorController")
            .field("authoring_mode", &self.authoring_mode)
            .field("undo", &self.history.undo_count())
            .field("redo", &self.history.redo_count())
            .field("pending_validations", &self.pending.len())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}
