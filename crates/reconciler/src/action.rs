//! Desired-state actions.

use opkit_core::DynamicObject;

use crate::error::{Error, Result};
use crate::runner::ActionRunner;

/// A single step towards the desired state.
///
/// The variant set is closed: every action is a create, update, delete, or
/// an error produced while computing the desired state.
#[derive(Debug, Clone)]
pub enum Action {
    /// Create an object, owned by the managing instance unless skipped.
    Create {
        object: DynamicObject,
        skip_owner_ref: bool,
        message: String,
    },
    /// Update an object, owned by the managing instance unless skipped.
    Update {
        object: DynamicObject,
        skip_owner_ref: bool,
        message: String,
    },
    /// Delete an object.
    Delete {
        object: DynamicObject,
        message: String,
    },
    /// Surface an error through the apply pipeline.
    Error { error: Error, message: String },
}

impl Action {
    /// Create `object`, owned by the managing instance.
    pub fn create(object: DynamicObject, message: impl Into<String>) -> Self {
        Self::Create {
            object,
            skip_owner_ref: false,
            message: message.into(),
        }
    }

    /// Create `object` without an owner reference.
    pub fn create_unowned(object: DynamicObject, message: impl Into<String>) -> Self {
        Self::Create {
            object,
            skip_owner_ref: true,
            message: message.into(),
        }
    }

    /// Update `object`, owned by the managing instance.
    pub fn update(object: DynamicObject, message: impl Into<String>) -> Self {
        Self::Update {
            object,
            skip_owner_ref: false,
            message: message.into(),
        }
    }

    /// Update `object` without touching its owner references.
    pub fn update_unowned(object: DynamicObject, message: impl Into<String>) -> Self {
        Self::Update {
            object,
            skip_owner_ref: true,
            message: message.into(),
        }
    }

    /// Delete `object`.
    pub fn delete(object: DynamicObject, message: impl Into<String>) -> Self {
        Self::Delete {
            object,
            message: message.into(),
        }
    }

    /// Carry `error` through the apply pipeline.
    pub fn error(error: Error, message: impl Into<String>) -> Self {
        Self::Error {
            error,
            message: message.into(),
        }
    }

    /// Human-readable description of the action.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Create { message, .. }
            | Self::Update { message, .. }
            | Self::Delete { message, .. }
            | Self::Error { message, .. } => message,
        }
    }

    /// Operation name, for logs.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Error { .. } => "error",
        }
    }

    /// The object this action targets, if any.
    #[must_use]
    pub const fn target(&self) -> Option<&DynamicObject> {
        match self {
            Self::Create { object, .. } | Self::Update { object, .. } | Self::Delete { object, .. } => {
                Some(object)
            }
            Self::Error { .. } => None,
        }
    }

    /// Apply this action through `runner`.
    ///
    /// Returns the action's message alongside the outcome so callers can
    /// report both regardless of success.
    pub async fn run<R: ActionRunner + ?Sized>(&self, runner: &R) -> (&str, Result<()>) {
        let outcome = match self {
            Self::Create {
                object,
                skip_owner_ref,
                ..
            } => runner.create(object, *skip_owner_ref).await,
            Self::Update {
                object,
                skip_owner_ref,
                ..
            } => runner.update(object, *skip_owner_ref).await,
            Self::Delete { object, .. } => runner.delete(object).await,
            Self::Error { error, .. } => runner.error(error),
        };
        (self.message(), outcome)
    }
}

/// Ordered sequence of actions.
///
/// Order is significant (owners before dependents) and is never changed:
/// no sorting, no deduplication.
#[derive(Debug, Clone, Default)]
pub struct DesiredState {
    actions: Vec<Action>,
}

impl DesiredState {
    /// Create an empty desired state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action. `None` is ignored.
    pub fn add_action(&mut self, action: impl Into<Option<Action>>) -> &mut Self {
        if let Some(action) = action.into() {
            self.actions.push(action);
        }
        self
    }

    /// Append several actions in order. `None` entries are ignored.
    pub fn add_actions<I, A>(&mut self, actions: I) -> &mut Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Option<Action>>,
    {
        self.actions
            .extend(actions.into_iter().filter_map(Into::<Option<Action>>::into));
        self
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate actions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }
}

impl<'a> IntoIterator for &'a DesiredState {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl FromIterator<Action> for DesiredState {
    fn from_iter<T: IntoIterator<Item = Action>>(iter: T) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<Option<Action>> for DesiredState {
    fn from_iter<T: IntoIterator<Item = Option<Action>>>(iter: T) -> Self {
        Self {
            actions: iter.into_iter().flatten().collect(),
        }
    }
}
