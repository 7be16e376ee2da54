// Error type shared by every library module

use crate::forms::FormPhase;
use crate::validation::FieldErrors;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodomiError {
    #[error("apartment not found: {0}")]
    ApartmentNotFound(String),

    #[error("owner not found: {0}")]
    OwnerNotFound(String),

    #[error("building not found: {0}")]
    BuildingNotFound(String),

    #[error("aliquot type not found: {0}")]
    AliquotTypeNotFound(String),

    /// Field-level validation failure, recoverable by editing the form
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("cannot {action} while the form is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: FormPhase,
    },

    #[error("field is read-only: {0}")]
    ReadOnlyField(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodomiError>;
