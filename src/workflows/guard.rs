use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

use super::permissions::{allowed_roles, is_allowed};
use super::stages::{NotesPolicy, Stage};
use crate::error::TrackingError;
use crate::specimens::{now, optional, Actor, NewStageEntry, Specimen, SpecimenId};
use crate::storage::{TrackingStore, TransitionWrite};
use crate::telemetry::{create_transition_span, generate_correlation_id};

/// Which target stages a permitted actor may choose
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Any stage, forward, backward or skipping
    #[default]
    Permissive,
    /// Only the catalog successor of the stored current stage
    Adjacent,
}

/// A request to move one specimen into `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub specimen_id: SpecimenId,
    pub target: Stage,
    pub actor: Actor,
    pub notes: Option<String>,
    pub photo_reference: Option<String>,
}

/// Validates a stage change and commits it together with its ledger row.
///
/// Checks run in a fixed order: existence, role, photo evidence (when
/// enforced), mandatory notes. The write itself is one store call, so a
/// rejected request never leaves anything behind.
pub struct TransitionGuard {
    store: Arc<dyn TrackingStore>,
    policy: TransitionPolicy,
    require_photo_evidence: bool,
}

impl TransitionGuard {
    pub fn new(
        store: Arc<dyn TrackingStore>,
        policy: TransitionPolicy,
        require_photo_evidence: bool,
    ) -> Self {
        Self {
            store,
            policy,
            require_photo_evidence,
        }
    }

    /// Whether the caller must capture a photo before entering `stage`
    pub fn photo_required(&self, stage: Stage) -> bool {
        stage.photo_required()
    }

    pub fn notes_policy(&self, stage: Stage) -> NotesPolicy {
        stage.notes_policy()
    }

    pub async fn attempt_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<Specimen, TrackingError> {
        let correlation_id = generate_correlation_id();
        let specimen_id = request.specimen_id.to_string();
        let span = create_transition_span(
            "attempt_transition",
            Some(&specimen_id),
            Some(request.actor.role.as_str()),
            Some(&correlation_id),
        );
        self.attempt(request).instrument(span).await
    }

    async fn attempt(&self, request: TransitionRequest) -> Result<Specimen, TrackingError> {
        let TransitionRequest {
            specimen_id,
            target,
            actor,
            notes,
            photo_reference,
        } = request;

        let current = self
            .store
            .get(specimen_id)
            .await?
            .ok_or_else(|| TrackingError::not_found(specimen_id))?;

        if !is_allowed(actor.role, target) {
            warn!(
                actor_id = %actor.id,
                actor_role = %actor.role,
                target_stage = %target,
                "Transition denied"
            );
            return Err(TrackingError::PermissionDenied {
                stage: target,
                actor_role: actor.role,
                allowed_roles: allowed_roles(target).to_vec(),
            });
        }

        let photo_reference = optional(photo_reference);
        if self.require_photo_evidence && target.photo_required() && photo_reference.is_none() {
            return Err(TrackingError::PhotoEvidenceRequired { stage: target });
        }

        let notes = optional(notes);
        match (target.notes_policy(), notes.is_some()) {
            (NotesPolicy::Mandatory, false) => {
                return Err(TrackingError::NotesRequired { stage: target });
            }
            (NotesPolicy::Recommended, false) => {
                debug!(target_stage = %target, "Proceeding without recommended notes");
            }
            _ => {}
        }

        let expected_current = match self.policy {
            TransitionPolicy::Permissive => None,
            TransitionPolicy::Adjacent => match target.predecessor() {
                Some(previous) => Some(previous),
                None => {
                    return Err(TrackingError::StageOutOfSequence {
                        current: current.current_stage,
                        target,
                    })
                }
            },
        };

        let entry = NewStageEntry {
            stage: target,
            notes,
            performed_by: actor,
            photo_reference,
            requested_at: now(),
        };

        match self
            .store
            .apply_transition(specimen_id, expected_current, entry)
            .await?
        {
            TransitionWrite::Applied {
                previous,
                specimen,
                entry,
            } => {
                info!(
                    from = %previous,
                    to = %specimen.current_stage,
                    performed_by = %entry.performed_by,
                    ledger_entry = entry.id,
                    "Stage updated"
                );
                Ok(specimen)
            }
            TransitionWrite::NotFound => Err(TrackingError::not_found(specimen_id)),
            TransitionWrite::StageConflict { actual } => {
                warn!(current = %actual, target_stage = %target, "Transition out of sequence");
                Err(TrackingError::StageOutOfSequence {
                    current: actual,
                    target,
                })
            }
        }
    }
}
