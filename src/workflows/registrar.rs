use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::permissions::{allowed_roles, is_allowed};
use super::stages::Stage;
use crate::error::TrackingError;
use crate::specimens::{
    now, AccessionSource, Actor, NewSpecimen, NewStageEntry, Specimen, StageHistoryEntry,
};
use crate::storage::{StorageError, TrackingStore};

/// Default cap on accession-number draws per registration
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// A freshly created specimen and its initial ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub specimen: Specimen,
    pub reception_entry: StageHistoryEntry,
}

/// Creates specimens. Accession numbers are drawn at random, so uniqueness
/// comes from the store's constraint: a collision means draw again.
pub struct Registrar {
    store: Arc<dyn TrackingStore>,
    accessions: Arc<dyn AccessionSource>,
    max_attempts: u32,
}

impl Registrar {
    pub fn new(
        store: Arc<dyn TrackingStore>,
        accessions: Arc<dyn AccessionSource>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            accessions,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn register(
        &self,
        input: NewSpecimen,
        actor: &Actor,
    ) -> Result<Registration, TrackingError> {
        let input = input.validated()?;

        if !is_allowed(actor.role, Stage::Reception) {
            warn!(
                actor_id = %actor.id,
                actor_role = %actor.role,
                "registration denied"
            );
            return Err(TrackingError::PermissionDenied {
                stage: Stage::Reception,
                actor_role: actor.role,
                allowed_roles: allowed_roles(Stage::Reception).to_vec(),
            });
        }

        let created_at = now();
        let reception = NewStageEntry {
            stage: Stage::Reception,
            notes: Some("Specimen registered".to_string()),
            performed_by: actor.clone(),
            photo_reference: None,
            requested_at: created_at,
        };

        for attempt in 1..=self.max_attempts {
            let specimen = Specimen {
                id: Uuid::new_v4(),
                accession_number: self.accessions.generate(created_at),
                patient_name: input.patient_name.clone(),
                patient_id: input.patient_id.clone(),
                age: input.age,
                sex: input.sex.clone(),
                specimen_type: input.specimen_type.clone(),
                clinical_notes: input.clinical_notes.clone(),
                referring_doctor: input.referring_doctor.clone(),
                priority: input.priority,
                current_stage: Stage::Reception,
                registered_by: actor.id.clone(),
                created_at,
                updated_at: created_at,
            };

            match self.store.register(&specimen, &reception).await {
                Ok(reception_entry) => {
                    info!(
                        specimen_id = %specimen.id,
                        accession_number = %specimen.accession_number,
                        priority = %specimen.priority,
                        attempt,
                        "Specimen registered"
                    );
                    return Ok(Registration {
                        specimen,
                        reception_entry,
                    });
                }
                Err(StorageError::DuplicateAccession(taken)) => {
                    warn!(
                        accession_number = %taken,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Accession number collision, drawing again"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(TrackingError::GenerationExhausted {
            attempts: self.max_attempts,
        })
    }
}
