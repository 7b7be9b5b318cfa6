use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::accession::AccessionNumber;
use crate::error::ValidationError;
use crate::priority::Priority;
use crate::workflows::{Role, Stage};

pub type SpecimenId = Uuid;

/// Oldest plausible patient age accepted at registration
pub const MAX_PATIENT_AGE: u16 = 150;

/// A pre-verified identity. The engine trusts the role claim as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}

/// Current-state record of a tracked specimen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specimen {
    pub id: SpecimenId,
    pub accession_number: AccessionNumber,
    pub patient_name: String,
    pub patient_id: String,
    pub age: Option<u16>,
    pub sex: Option<String>,
    pub specimen_type: String,
    pub clinical_notes: Option<String>,
    pub referring_doctor: Option<String>,
    pub priority: Priority,
    pub current_stage: Stage,
    pub registered_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Specimen {
    /// Case-insensitive substring match on accession number, patient name
    /// and patient id.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            self.accession_number.as_str(),
            self.patient_name.as_str(),
            self.patient_id.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Registration input, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSpecimen {
    pub patient_name: String,
    pub patient_id: String,
    #[serde(default)]
    pub age: Option<u16>,
    #[serde(default)]
    pub sex: Option<String>,
    pub specimen_type: String,
    #[serde(default)]
    pub clinical_notes: Option<String>,
    #[serde(default)]
    pub referring_doctor: Option<String>,
    pub priority: Priority,
}

impl NewSpecimen {
    /// Trim every field, drop blank optionals and reject missing or
    /// out-of-range values.
    pub fn validated(self) -> Result<Self, ValidationError> {
        let patient_name = required("patientName", self.patient_name)?;
        let patient_id = required("patientId", self.patient_id)?;
        let specimen_type = required("specimenType", self.specimen_type)?;

        if let Some(age) = self.age {
            if age > MAX_PATIENT_AGE {
                return Err(ValidationError::InvalidField {
                    field: "age",
                    reason: format!("must be at most {MAX_PATIENT_AGE}"),
                });
            }
        }

        Ok(Self {
            patient_name,
            patient_id,
            age: self.age,
            sex: optional(self.sex),
            specimen_type,
            clinical_notes: optional(self.clinical_notes),
            referring_doctor: optional(self.referring_doctor),
            priority: self.priority,
        })
    }
}

fn required(field: &'static str, value: String) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField { field })
    } else {
        Ok(trimmed.to_string())
    }
}

/// Blank optional text is treated as absent
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// One immutable row of the audit ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub id: i64,
    pub specimen_id: SpecimenId,
    pub stage: Stage,
    pub notes: Option<String>,
    pub performed_by: String,
    pub performed_by_role: Role,
    pub photo_reference: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Ledger row to be appended as part of a write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStageEntry {
    pub stage: Stage,
    pub notes: Option<String>,
    pub performed_by: Actor,
    pub photo_reference: Option<String>,
    /// Wall-clock time of the request; stores clamp it so ledger order stays
    /// monotonic per specimen
    pub requested_at: DateTime<Utc>,
}

/// Counts of specimens by current stage and by priority
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpecimenStats {
    pub total: usize,
    pub by_stage: BTreeMap<Stage, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
}

impl SpecimenStats {
    pub fn from_specimens<'a>(specimens: impl IntoIterator<Item = &'a Specimen>) -> Self {
        let mut stats = SpecimenStats {
            by_stage: Stage::ALL.iter().map(|s| (*s, 0)).collect(),
            by_priority: Priority::ALL.iter().map(|p| (*p, 0)).collect(),
            ..Default::default()
        };
        for specimen in specimens {
            stats.total += 1;
            *stats.by_stage.entry(specimen.current_stage).or_default() += 1;
            *stats.by_priority.entry(specimen.priority).or_default() += 1;
        }
        stats
    }
}
