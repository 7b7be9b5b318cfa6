// Repository interfaces injected into the workflow components, so the engine
// runs unchanged against SQLite or the in-memory store.

use async_trait::async_trait;

use super::StorageError;
use crate::specimens::{AccessionNumber, NewStageEntry, Specimen, SpecimenId, StageHistoryEntry};
use crate::workflows::Stage;

/// Result of an atomic stage write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionWrite {
    /// `current_stage` was updated and exactly one ledger row appended
    Applied {
        /// Stage the specimen held when the write took the lock
        previous: Stage,
        specimen: Specimen,
        entry: StageHistoryEntry,
    },
    /// No specimen with that id
    NotFound,
    /// The stored stage did not match the expected one; nothing was written
    StageConflict { actual: Stage },
}

/// A specimen and its ledger read at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecimenSnapshot {
    pub specimen: Specimen,
    pub history: Vec<StageHistoryEntry>,
}

/// Current-state records. Every write here also appends to the ledger inside
/// the same transaction; there is no other way to add ledger rows.
#[async_trait]
pub trait SpecimenStore: Send + Sync {
    /// Insert a new specimen together with its initial ledger row.
    ///
    /// Fails with [`StorageError::DuplicateAccession`] when the accession
    /// number is taken, leaving nothing behind.
    async fn register(
        &self,
        specimen: &Specimen,
        reception: &NewStageEntry,
    ) -> Result<StageHistoryEntry, StorageError>;

    async fn get(&self, id: SpecimenId) -> Result<Option<Specimen>, StorageError>;

    async fn find_by_accession(
        &self,
        accession: &AccessionNumber,
    ) -> Result<Option<Specimen>, StorageError>;

    /// The specimen together with its ledger, oldest first, with no
    /// transition able to land between the two reads
    async fn snapshot(&self, id: SpecimenId) -> Result<Option<SpecimenSnapshot>, StorageError>;

    /// All specimens, newest first
    async fn list(&self) -> Result<Vec<Specimen>, StorageError>;

    /// Case-insensitive substring search over accession number, patient name
    /// and patient id, newest first
    async fn search(&self, query: &str) -> Result<Vec<Specimen>, StorageError>;

    /// Atomically set `current_stage = entry.stage` and append `entry`.
    ///
    /// When `expected_current` is given the write only happens if the stored
    /// stage still equals it (compare-and-set).
    async fn apply_transition(
        &self,
        id: SpecimenId,
        expected_current: Option<Stage>,
        entry: NewStageEntry,
    ) -> Result<TransitionWrite, StorageError>;
}

/// Read side of the append-only audit trail
#[async_trait]
pub trait AuditLedger: Send + Sync {
    /// Ledger rows for a specimen, oldest first
    async fn history(&self, id: SpecimenId) -> Result<Vec<StageHistoryEntry>, StorageError>;
}

/// A backend providing both the current-state store and the ledger
pub trait TrackingStore: SpecimenStore + AuditLedger {}

impl<T: SpecimenStore + AuditLedger + ?Sized> TrackingStore for T {}
