//! Reversible commands.
//!
//! A [`Command`] is a closed set of variants rather than a trait object
//! hierarchy: every command is either a closure-defined action, a
//! one-directional effect, or an ordered group of other commands.
//!
//! Invoking a command consumes it, performs its effect on the editing target
//! and returns the command that reverts exactly that effect. Undoing means
//! invoking the returned command, which in turn yields the redo command.

use std::fmt;
use std::sync::Arc;

/// Marker trait for types that serve as command targets.
///
/// Implement it on whatever aggregate the commands mutate: a diagram
/// document, a test counter, and so on.
pub trait Editable: 'static {}

type Action<T> = Box<dyn FnOnce(&mut T) -> Command<T> + Send>;
type EffectBody<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// A unit of reversible work on an editing target `T`.
pub enum Command<T: Editable> {
    /// Runs `action` once and returns whatever inverse it produced.
    Basic {
        /// Human-readable title, shown in undo/redo listings.
        title: Option<String>,
        /// The action; must return a command that exactly undoes it.
        action: Action<T>,
    },
    /// Runs `body` in one direction only.
    ///
    /// The inverse of a performing effect is a skipping effect with the same
    /// body, and vice versa, so the body runs on every other invocation.
    Effect {
        /// Human-readable title.
        title: Option<String>,
        /// Side effect to perform.
        body: EffectBody<T>,
        /// Whether this invocation is the skipped direction.
        skip: bool,
    },
    /// Ordered group of commands, inverted in reverse order.
    Compound {
        /// Human-readable title.
        title: Option<String>,
        /// Member commands in execution order.
        commands: Vec<Command<T>>,
    },
}

impl<T: Editable> Command<T> {
    /// Creates a closure-defined command.
    ///
    /// If the inverse returned by `action` carries no title, it inherits
    /// this command's title so that undo and redo listings stay readable.
    pub fn basic<F>(title: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(&mut T) -> Command<T> + Send + 'static,
    {
        Self::Basic {
            title: Some(title.into()),
            action: Box::new(action),
        }
    }

    /// Creates an effect that runs `body` now and is skipped when undone.
    pub fn effect<F>(title: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        Self::Effect {
            title: Some(title.into()),
            body: Arc::new(body),
            skip: false,
        }
    }

    /// Creates a compound command from commands in execution order.
    pub fn compound(title: Option<String>, commands: Vec<Command<T>>) -> Self {
        Self::Compound { title, commands }
    }

    /// A command that does nothing; its inverse does nothing as well.
    pub fn noop(title: Option<String>) -> Self {
        Self::Compound {
            title,
            commands: Vec::new(),
        }
    }

    /// Returns the human-readable title, if any.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Basic { title, .. } | Self::Effect { title, .. } | Self::Compound { title, .. } => {
                title.as_deref()
            }
        }
    }

    /// Returns `true` for a compound with no members (recursively).
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Compound { commands, .. } => commands.iter().all(Command::is_noop),
            _ => false,
        }
    }

    /// Sets the title when the command has none.
    pub fn with_default_title(mut self, default: Option<&str>) -> Self {
        let slot = match &mut self {
            Self::Basic { title, .. } | Self::Effect { title, .. } | Self::Compound { title, .. } => {
                title
            }
        };
        if slot.is_none() {
            *slot = default.map(str::to_owned);
        }
        self
    }

    /// Performs the command and returns its inverse.
    pub fn invoke(self, target: &mut T) -> Command<T> {
        match self {
            Self::Basic { title, action } => action(target).with_default_title(title.as_deref()),
            Self::Effect { title, body, skip } => {
                if !skip {
                    body(target);
                }
                Self::Effect {
                    title,
                    body,
                    skip: !skip,
                }
            }
            Self::Compound { title, commands } => {
                let mut inverses: Vec<Command<T>> =
                    commands.into_iter().map(|c| c.invoke(target)).collect();
                inverses.reverse();
                Self::Compound {
                    title,
                    commands: inverses,
                }
            }
        }
    }
}

impl<T: Editable> fmt::Debug for Command<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { title, .. } => f.debug_struct("Basic").field("title", title).finish(),
            Self::Effect { title, skip, .. } => f
                .debug_struct("Effect")
                .field("title", title)
                .field("skip", skip)
                .finish(),
            Self::Compound { title, commands } => f
                .debug_struct("Compound")
                .field("title", title)
                .field("commands", commands)
                .finish(),
        }
    }
}
