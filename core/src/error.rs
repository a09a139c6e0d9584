use thiserror::Error;

use crate::models::EntryId;

/// Failures the calorie log can report.
///
/// None of these are fatal. Callers recover from `Validation` by leaving the
/// input for correction, tolerate `NotFound` as a no-op, and only ever see
/// `SyncDelivery` in the transport's own diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalorieError {
    #[error("{0}")]
    Validation(String),

    #[error("Entry {0} not found")]
    NotFound(EntryId),

    #[error("Failed to deliver '{action}' for entry {id} to the mirror: {reason}")]
    SyncDelivery {
        action: &'static str,
        id: EntryId,
        reason: String,
    },
}

impl CalorieError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T, E = CalorieError> = std::result::Result<T, E>;
