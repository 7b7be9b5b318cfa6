use thiserror::Error;

use crate::specimens::SpecimenId;
use crate::storage::StorageError;
use crate::workflows::{Role, Stage};

/// Malformed or missing input, rejected before any workflow rule runs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("{field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Failures of the tracking workflow, surfaced to callers as typed errors.
/// None of them leave partial state behind.
#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Specimen {specimen} not found")]
    NotFound { specimen: String },

    #[error("Role '{actor_role}' may not move specimens to {stage}")]
    PermissionDenied {
        stage: Stage,
        actor_role: Role,
        allowed_roles: Vec<Role>,
    },

    #[error("Notes are required for the {} stage", stage.label())]
    NotesRequired { stage: Stage },

    #[error("A photo is compulsory for the {} stage", stage.label())]
    PhotoEvidenceRequired { stage: Stage },

    #[error("Cannot move from {current} to {target}: only the next stage may follow")]
    StageOutOfSequence { current: Stage, target: Stage },

    #[error("Could not allocate a unique accession number after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),
}

impl TrackingError {
    pub fn not_found(specimen: SpecimenId) -> Self {
        TrackingError::NotFound {
            specimen: specimen.to_string(),
        }
    }

    /// Internal faults that should be logged and reported generically
    pub fn is_internal(&self) -> bool {
        matches!(self, TrackingError::Persistence(_))
    }
}
