use crate::authoring::{AuthoringState, TemporaryState};
use crate::validation::ValidationState;

/// Notification emitted by the controller.
///
/// Events accumulate in the controller and are collected with
/// [`EditorController::drain_events`](crate::EditorController::drain_events),
/// typically once per frame. Each state event carries both snapshots, so a
/// listener can diff them without keeping its own copy.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    AuthoringStateChanged {
        previous: AuthoringState,
        current: AuthoringState,
    },
    TemporaryStateChanged {
        previous: TemporaryState,
        current: TemporaryState,
    },
    ValidationStateChanged {
        previous: ValidationState,
        current: ValidationState,
    },
    /// Authoring mode was entered or left.
    ModeChanged { authoring: bool },
}

impl EditorEvent {
    /// Short name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthoringStateChanged { .. } => "authoring-state-changed",
            Self::TemporaryStateChanged { .. } => "temporary-state-changed",
            Self::ValidationStateChanged { .. } => "validation-state-changed",
            Self::ModeChanged { .. } => "mode-changed",
        }
    }
}

/// Queue of emitted events, drained by the embedder.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    events: Vec<EditorEvent>,
}

impl EventQueue {
    pub(crate) fn push(&mut self, event: EditorEvent) {
        log::trace!("emit {}", event.name());
        self.events.push(event);
    }

    pub(crate) fn drain(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue() {
        let mut queue = EventQueue::default();
        queue.push(EditorEvent::ModeChanged { authoring: true });
        queue.push(EditorEvent::ModeChanged { authoring: false });
        let events = queue.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), "mode-changed");
        assert!(queue.drain().is_empty());
    }
}
