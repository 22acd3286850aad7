//! Failure types of the planning core.

use serde::Serialize;
use thiserror::Error;

use crate::advisor::Suggestion;

/// The caller asked for something the trip does not contain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("day `{day_id}` is not present in the trip (known days: {known})")]
    UnknownDay { day_id: String, known: String },
}

/// The mandatory set cannot fit the day.
///
/// Carries a readable message and the advisor's structured suggestions,
/// so callers can both display and branch on it.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message}")]
pub struct ConstraintError {
    pub message: String,
    pub suggestions: Vec<Suggestion>,
}

impl ConstraintError {
    pub fn new(message: impl Into<String>, suggestions: Vec<Suggestion>) -> Self {
        Self {
            message: message.into(),
            suggestions,
        }
    }

    /// Suggestions of one kind, e.g. `"dropMustVisit"`.
    pub fn suggestions_of<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Suggestion> + 'a {
        self.suggestions.iter().filter(move |suggestion| suggestion.kind() == kind)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error(transparent)]
    Usage(#[from] UsageError),
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}

impl PlanError {
    pub fn as_constraint(&self) -> Option<&ConstraintError> {
        match self {
            PlanError::Constraint(error) => Some(error),
            PlanError::Usage(_) => None,
        }
    }
}
