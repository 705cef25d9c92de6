//! Deciding what to validate, dispatching validators and folding their
//! results back into [`ValidationState`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use graphedit_core::compute::{CancellationToken, Cancelled, HandleState, IoHandle, IoRunner};

use super::provider::{ValidationProvider, ValidationRequest, ValidationResult};
use super::state::{ValidationEntry, ValidationIssue, ValidationState};
use crate::authoring::{AuthoringState, EntityChange, EventToken};
use crate::diagram::DiagramSnapshot;
use crate::error::ValidationFailure;
use crate::model::{EntityIri, RelationKey};

type TaskOutput = Result<Result<Vec<ValidationResult>, ValidationFailure>, Cancelled>;

/// Entities whose validation may be out of date after `previous` became
/// `current`.
///
/// An entity is dirty when its own event changed, when an event of one of
/// its outbound relations changed, or when it points at an entity that has
/// just been marked deleted.
pub fn changed_elements_to_validate(
    previous: &AuthoringState,
    current: &AuthoringState,
    graph: &DiagramSnapshot,
) -> BTreeSet<EntityIri> {
    let mut changed = BTreeSet::new();
    if previous.ptr_eq(current) {
        return changed;
    }

    let relation_tokens = |state: &AuthoringState| -> BTreeMap<RelationKey, EventToken> {
        state.relations().map(|event| (event.key(), event.token())).collect()
    };
    let before = relation_tokens(previous);
    let after = relation_tokens(current);
    for key in before.keys().chain(after.keys()) {
        if before.get(key) != after.get(key) {
            changed.insert(key.source.clone());
        }
    }

    let keys: BTreeSet<&EntityIri> = previous
        .entities()
        .chain(current.entities())
        .map(|event| event.key())
        .collect();
    for key in keys {
        let old = previous.entity_event(key);
        let new = current.entity_event(key);
        if old.map(|e| e.token()) == new.map(|e| e.token()) {
            continue;
        }
        changed.insert(key.clone());
        changed.extend(old.into_iter().chain(new).map(|e| e.current_iri().clone()));

        let newly_deleted = matches!(new.map(|e| e.change()), Some(EntityChange::Deleted { .. }))
            && !matches!(old.map(|e| e.change()), Some(EntityChange::Deleted { .. }));
        if newly_deleted {
            changed.extend(graph.inbound(key).map(|relation| relation.source.clone()));
        }
    }
    changed
}

/// Starts validation of every entity in `targets` that is on the diagram.
///
/// Returns the validation state with `loading` placeholders installed for
/// the targets and their outbound relations, plus one pending task per
/// target. Entities not in `targets` keep their previous entries; entries
/// for entities no longer on the diagram are dropped.
pub fn validate_elements<R: IoRunner>(
    targets: &BTreeSet<EntityIri>,
    provider: &Arc<dyn ValidationProvider>,
    graph: &Arc<DiagramSnapshot>,
    state: &AuthoringState,
    previous: &ValidationState,
    runner: &R,
    cancellation: &CancellationToken,
) -> (ValidationState, Vec<PendingValidation>) {
    if cancellation.is_cancelled() {
        log::debug!("skipping validation of {} entities: cancelled", targets.len());
        return (previous.clone(), Vec::new());
    }

    let mut entities = BTreeMap::new();
    let mut relations = BTreeMap::new();
    let mut pending = Vec::new();

    for target in graph.entities() {
        let iri = &target.id;
        let outbound: Vec<_> = graph.outbound(iri).cloned().collect();

        if !targets.contains(iri) {
            if let Some(entry) = previous.entity(iri) {
                entities.insert(iri.clone(), entry.clone());
            }
            for relation in &outbound {
                let key = relation.key();
                if let Some(entry) = previous.relation(&key) {
                    relations.insert(key, entry.clone());
                }
            }
            continue;
        }

        let placeholder = Arc::new(ValidationEntry::loading(previous.entity(iri).map(Arc::as_ref)));
        entities.insert(iri.clone(), placeholder.clone());
        let relation_placeholders: Vec<_> = outbound
            .iter()
            .map(|relation| {
                let key = relation.key();
                let entry = Arc::new(ValidationEntry::loading(previous.relation(&key).map(Arc::as_ref)));
                relations.insert(key.clone(), entry.clone());
                (key, entry)
            })
            .collect();

        let request = ValidationRequest {
            target: target.clone(),
            outbound_relations: outbound,
            state: state.clone(),
            graph: graph.clone(),
            cancellation: cancellation.clone(),
        };
        let handle = runner.run(cancellation.guard(provider.validate(request)));
        pending.push(PendingValidation {
            target: iri.clone(),
            entity_placeholder: placeholder,
            relation_placeholders,
            cancellation: cancellation.clone(),
            handle,
        });
    }

    log::debug!("validating {} of {} requested entities", pending.len(), targets.len());
    (ValidationState::from_maps(entities, relations), pending)
}

/// How a validation task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The provider returned these results.
    Completed(Vec<ValidationResult>),
    /// The provider failed, or its task vanished.
    Failed(ValidationFailure),
    /// The request was cancelled; nothing is applied.
    Cancelled,
}

/// A validation task in flight for one entity.
pub struct PendingValidation {
    target: EntityIri,
    entity_placeholder: Arc<ValidationEntry>,
    relation_placeholders: Vec<(RelationKey, Arc<ValidationEntry>)>,
    cancellation: CancellationToken,
    handle: IoHandle<TaskOutput>,
}

impl PendingValidation {
    /// The entity being validated.
    pub fn target(&self) -> &EntityIri {
        &self.target
    }

    /// Returns the outcome if the task has finished.
    pub fn try_outcome(&self) -> Option<ValidationOutcome> {
        match self.handle.try_take() {
            HandleState::Pending => None,
            HandleState::Ready(output) => Some(Self::outcome(output)),
            HandleState::Dropped => Some(self.dropped()),
        }
    }

    /// Blocks until the task finishes.
    pub fn wait(&self) -> ValidationOutcome {
        match self.handle.recv() {
            Some(output) => Self::outcome(output),
            None => self.dropped(),
        }
    }

    fn outcome(output: TaskOutput) -> ValidationOutcome {
        match output {
            Ok(Ok(results)) => ValidationOutcome::Completed(results),
            Ok(Err(failure)) => ValidationOutcome::Failed(failure),
            Err(Cancelled) => ValidationOutcome::Cancelled,
        }
    }

    fn dropped(&self) -> ValidationOutcome {
        if self.cancellation.is_cancelled() {
            ValidationOutcome::Cancelled
        } else {
            ValidationOutcome::Failed(ValidationFailure::new("validation task ended without a result"))
        }
    }

    /// Folds `outcome` into `current`.
    ///
    /// Only entries that are still the placeholders this task installed are
    /// replaced; anything a newer pass installed since is left alone.
    /// Returns `None` when nothing changed.
    pub fn apply(self, outcome: ValidationOutcome, current: &ValidationState) -> Option<ValidationState> {
        let (entity_issues, mut relation_issues) = match outcome {
            ValidationOutcome::Cancelled => {
                log::debug!("validation of {} was cancelled", self.target);
                return None;
            }
            ValidationOutcome::Failed(failure) => {
                log::warn!("validation of {} failed: {failure}", self.target);
                (vec![ValidationIssue::error(failure.to_string())], BTreeMap::new())
            }
            ValidationOutcome::Completed(results) => self.partition(results),
        };

        let mut entities = None;
        match current.entity(&self.target) {
            Some(entry) if Arc::ptr_eq(entry, &self.entity_placeholder) => {
                let map = entities.get_or_insert_with(|| current.entity_map().clone());
                map.insert(self.target.clone(), Arc::new(ValidationEntry::resolved(entity_issues)));
            }
            _ => log::debug!("discarding stale validation result for {}", self.target),
        }

        let mut relations = None;
        for (key, placeholder) in &self.relation_placeholders {
            match current.relation(key) {
                Some(entry) if Arc::ptr_eq(entry, placeholder) => {
                    let issues = relation_issues.remove(key).unwrap_or_default();
                    let map = relations.get_or_insert_with(|| current.relation_map().clone());
                    map.insert(key.clone(), Arc::new(ValidationEntry::resolved(issues)));
                }
                _ => log::debug!("discarding stale validation result for {key}"),
            }
        }

        if entities.is_none() && relations.is_none() {
            return None;
        }
        Some(ValidationState::from_maps(
            entities.unwrap_or_else(|| current.entity_map().clone()),
            relations.unwrap_or_else(|| current.relation_map().clone()),
        ))
    }

    fn partition(
        &self,
        results: Vec<ValidationResult>,
    ) -> (Vec<ValidationIssue>, BTreeMap<RelationKey, Vec<ValidationIssue>>) {
        let mut entity_issues = Vec::new();
        let mut relation_issues: BTreeMap<RelationKey, Vec<ValidationIssue>> = BTreeMap::new();
        for result in results {
            let relation = match &result {
                ValidationResult::Entity { target, .. } if target == &self.target => None,
                ValidationResult::Relation { target, .. }
                    if self.relation_placeholders.iter().any(|(key, _)| key == target) =>
                {
                    Some(target.clone())
                }
                _ => {
                    log::debug!("ignoring result outside of {}: {result:?}", self.target);
                    continue;
                }
            };
            match relation {
                None => entity_issues.push(result.into_issue()),
                Some(key) => relation_issues.entry(key).or_default().push(result.into_issue()),
            }
        }
        (entity_issues, relation_issues)
    }
}

impl std::fmt::Debug for PendingValidation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingValidation")
            .field("target", &self.target)
            .field("relations", &self.relation_placeholders.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::InMemoryDiagram;
    use crate::model::{EntityData, RelationData};
    use crate::validation::ValidationFuture;
    use graphedit_core::compute::InlineRunner;

    fn graph() -> Arc<DiagramSnapshot> {
        let mut diagram = InMemoryDiagram::new();
        let a = diagram.insert_entity(EntityData::new("ex:a"));
        let b = diagram.insert_entity(EntityData::new("ex:b"));
        diagram.insert_relation(a, b, RelationData::new("ex:p", "ex:a", "ex:b"));
        Arc::new(DiagramSnapshot::capture(&diagram))
    }

    fn label_required() -> Arc<dyn ValidationProvider> {
        Arc::new(|request: ValidationRequest| -> ValidationFuture {
            Box::pin(async move {
                let mut results = Vec::new();
                if request.target.label.is_none() {
                    results.push(ValidationResult::entity_error(request.target.id.clone(), "missing label"));
                }
                for relation in &request.outbound_relations {
                    results.push(ValidationResult::relation_error(relation.key(), "unchecked"));
                }
                Ok::<_, ValidationFailure>(results)
            })
        })
    }

    fn iri(s: &str) -> EntityIri {
        EntityIri::new(s)
    }

    fn targets(items: &[&str]) -> BTreeSet<EntityIri> {
        items.iter().map(|s| iri(s)).collect()
    }

    #[test]
    fn nothing_changed_for_identical_states() {
        let state = AuthoringState::new().add_entity(EntityData::new("ex:a"));
        assert!(changed_elements_to_validate(&state, &state.clone(), &graph()).is_empty());
    }

    #[test]
    fn changed_set_covers_entities_and_relation_sources() {
        let previous = AuthoringState::new();
        let current = previous
            .add_entity(EntityData::new("ex:n"))
            .add_relation(RelationData::new("ex:p", "ex:x", "ex:y"));
        let changed = changed_elements_to_validate(&previous, &current, &graph());
        assert_eq!(changed, targets(&["ex:n", "ex:x"]));
    }

    #[test]
    fn deletion_dirties_inbound_sources() {
        let previous = AuthoringState::new();
        let current = previous.delete_entity(&EntityData::new("ex:b"));
        let changed = changed_elements_to_validate(&previous, &current, &graph());
        assert_eq!(changed, targets(&["ex:a", "ex:b"]));
    }

    #[test]
    fn rename_dirties_both_iris() {
        let previous = AuthoringState::new();
        let current = previous.change_entity(&EntityData::new("ex:a"), EntityData::new("ex:a2"));
        let changed = changed_elements_to_validate(&previous, &current, &graph());
        assert_eq!(changed, targets(&["ex:a", "ex:a2"]));
    }

    #[test]
    fn placeholders_then_results() {
        let graph = graph();
        let (state, pending) = validate_elements(
            &targets(&["ex:a"]),
            &label_required(),
            &graph,
            &AuthoringState::new(),
            &ValidationState::new(),
            &InlineRunner,
            &CancellationToken::new(),
        );
        assert_eq!(pending.len(), 1);
        assert!(state.entity(&iri("ex:a")).unwrap().loading);
        let key = RelationData::new("ex:p", "ex:a", "ex:b").key();
        assert!(state.relation(&key).unwrap().loading);
        assert!(state.entity(&iri("ex:b")).is_none());

        let task = pending.into_iter().next().unwrap();
        let outcome = task.try_outcome().unwrap();
        let state = task.apply(outcome, &state).unwrap();
        let entry = state.entity(&iri("ex:a")).unwrap();
        assert!(!entry.loading);
        assert_eq!(entry.errors[0].message, "missing label");
        assert_eq!(state.relation(&key).unwrap().errors.len(), 1);
        assert!(!state.is_loading());
    }

    #[test]
    fn stale_result_is_discarded() {
        let graph = graph();
        let provider = label_required();
        let token = CancellationToken::new();
        let (first_state, first) = validate_elements(
            &targets(&["ex:a"]),
            &provider,
            &graph,
            &AuthoringState::new(),
            &ValidationState::new(),
            &InlineRunner,
            &token,
        );
        let (second_state, second) = validate_elements(
            &targets(&["ex:a"]),
            &provider,
            &graph,
            &AuthoringState::new(),
            &first_state,
            &InlineRunner,
            &token,
        );

        let second_task = second.into_iter().next().unwrap();
        let outcome = second_task.wait();
        let resolved = second_task.apply(outcome, &second_state).unwrap();

        let first_task = first.into_iter().next().unwrap();
        let outcome = first_task.wait();
        assert!(first_task.apply(outcome, &resolved).is_none());
    }

    #[test]
    fn failure_becomes_single_error() {
        let failing: Arc<dyn ValidationProvider> = Arc::new(|_request: ValidationRequest| -> ValidationFuture {
            Box::pin(async { Err::<Vec<ValidationResult>, _>(ValidationFailure::new("backend down")) })
        });
        let graph = graph();
        let (state, pending) = validate_elements(
            &targets(&["ex:a"]),
            &failing,
            &graph,
            &AuthoringState::new(),
            &ValidationState::new(),
            &InlineRunner,
            &CancellationToken::new(),
        );
        let task = pending.into_iter().next().unwrap();
        let outcome = task.wait();
        let state = task.apply(outcome, &state).unwrap();
        let entry = state.entity(&iri("ex:a")).unwrap();
        assert_eq!(entry.errors.len(), 1);
        assert_eq!(entry.errors[0].message, "validation failed: backend down");
        let key = RelationData::new("ex:p", "ex:a", "ex:b").key();
        assert!(state.relation(&key).unwrap().errors.is_empty());
    }

    #[test]
    fn cancelled_task_changes_nothing() {
        let token = CancellationToken::new();
        let graph = graph();
        let pending_provider: Arc<dyn ValidationProvider> = Arc::new(|_request: ValidationRequest| -> ValidationFuture {
            Box::pin(std::future::pending::<Result<Vec<ValidationResult>, ValidationFailure>>())
        });
        let (state, pending) = validate_elements(
            &targets(&["ex:a"]),
            &pending_provider,
            &graph,
            &AuthoringState::new(),
            &ValidationState::new(),
            &InlineRunner,
            &token,
        );
        token.cancel();
        let task = pending.into_iter().next().unwrap();
        let outcome = task.wait();
        assert_eq!(outcome, ValidationOutcome::Cancelled);
        assert!(task.apply(outcome, &state).is_none());
    }

    #[test]
    fn untargeted_entries_carry_over() {
        let graph = graph();
        let provider = label_required();
        let (state, pending) = validate_elements(
            &targets(&["ex:a", "ex:b"]),
            &provider,
            &graph,
            &AuthoringState::new(),
            &ValidationState::new(),
            &InlineRunner,
            &CancellationToken::new(),
        );
        let mut state = state;
        for task in pending {
            let outcome = task.wait();
            if let Some(next) = task.apply(outcome, &state) {
                state = next;
            }
        }
        let b_entry = state.entity(&iri("ex:b")).unwrap().clone();

        let (next, pending) = validate_elements(
            &targets(&["ex:a"]),
            &provider,
            &graph,
            &AuthoringState::new(),
            &state,
            &InlineRunner,
            &CancellationToken::new(),
        );
        assert_eq!(pending.len(), 1);
        assert!(Arc::ptr_eq(next.entity(&iri("ex:b")).unwrap(), &b_entry));
    }
}
