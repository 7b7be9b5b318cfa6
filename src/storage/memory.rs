use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::{AuditLedger, SpecimenSnapshot, SpecimenStore, StorageError, TransitionWrite};
use crate::specimens::{AccessionNumber, NewStageEntry, Specimen, SpecimenId, StageHistoryEntry};
use crate::workflows::Stage;

#[derive(Debug, Default)]
struct MemoryState {
    specimens: HashMap<SpecimenId, Specimen>,
    /// Registration order, used to break created_at ties
    insertion_order: Vec<SpecimenId>,
    ledger: Vec<StageHistoryEntry>,
    next_entry_id: i64,
}

impl MemoryState {
    fn append(&mut self, specimen_id: SpecimenId, entry: &NewStageEntry) -> StageHistoryEntry {
        self.next_entry_id += 1;
        let row = StageHistoryEntry {
            id: self.next_entry_id,
            specimen_id,
            stage: entry.stage,
            notes: entry.notes.clone(),
            performed_by: entry.performed_by.id.clone(),
            performed_by_role: entry.performed_by.role,
            photo_reference: entry.photo_reference.clone(),
            timestamp: entry.requested_at,
        };
        self.ledger.push(row.clone());
        row
    }

    fn history_of(&self, id: SpecimenId) -> Vec<StageHistoryEntry> {
        self.ledger
            .iter()
            .filter(|entry| entry.specimen_id == id)
            .cloned()
            .collect()
    }

    fn newest_first(&self, filter: impl Fn(&Specimen) -> bool) -> Vec<Specimen> {
        let mut found: Vec<Specimen> = self
            .insertion_order
            .iter()
            .rev()
            .filter_map(|id| self.specimens.get(id))
            .filter(|specimen| filter(specimen))
            .cloned()
            .collect();
        // stable sort keeps the reversed insertion order among equal timestamps
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

/// Process-local store. A single lock covers both tables, so every write is
/// serialized exactly like a database transaction would be.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SpecimenStore for InMemoryStore {
    async fn register(
        &self,
        specimen: &Specimen,
        reception: &NewStageEntry,
    ) -> Result<StageHistoryEntry, StorageError> {
        let mut state = self.state.lock().await;

        if state
            .specimens
            .values()
            .any(|existing| existing.accession_number == specimen.accession_number)
        {
            return Err(StorageError::DuplicateAccession(
                specimen.accession_number.to_string(),
            ));
        }

        state.specimens.insert(specimen.id, specimen.clone());
        state.insertion_order.push(specimen.id);
        let entry = state.append(specimen.id, reception);
        debug!(specimen_id = %specimen.id, "registered specimen in memory");
        Ok(entry)
    }

    async fn get(&self, id: SpecimenId) -> Result<Option<Specimen>, StorageError> {
        Ok(self.state.lock().await.specimens.get(&id).cloned())
    }

    async fn find_by_accession(
        &self,
        accession: &AccessionNumber,
    ) -> Result<Option<Specimen>, StorageError> {
        let state = self.state.lock().await;
        Ok(state
            .specimens
            .values()
            .find(|specimen| &specimen.accession_number == accession)
            .cloned())
    }

    async fn snapshot(&self, id: SpecimenId) -> Result<Option<SpecimenSnapshot>, StorageError> {
        let state = self.state.lock().await;
        Ok(state.specimens.get(&id).map(|specimen| SpecimenSnapshot {
            specimen: specimen.clone(),
            history: state.history_of(id),
        }))
    }

    async fn list(&self) -> Result<Vec<Specimen>, StorageError> {
        Ok(self.state.lock().await.newest_first(|_| true))
    }

    async fn search(&self, query: &str) -> Result<Vec<Specimen>, StorageError> {
        Ok(self
            .state
            .lock()
            .await
            .newest_first(|specimen| specimen.matches(query)))
    }

    async fn apply_transition(
        &self,
        id: SpecimenId,
        expected_current: Option<Stage>,
        mut entry: NewStageEntry,
    ) -> Result<TransitionWrite, StorageError> {
        let mut state = self.state.lock().await;

        let Some(specimen) = state.specimens.get_mut(&id) else {
            return Ok(TransitionWrite::NotFound);
        };

        if let Some(expected) = expected_current {
            if specimen.current_stage != expected {
                return Ok(TransitionWrite::StageConflict {
                    actual: specimen.current_stage,
                });
            }
        }

        let previous = specimen.current_stage;
        entry.requested_at = entry.requested_at.max(specimen.updated_at);
        specimen.current_stage = entry.stage;
        specimen.updated_at = entry.requested_at;
        let specimen = specimen.clone();
        let entry = state.append(id, &entry);

        Ok(TransitionWrite::Applied {
            previous,
            specimen,
            entry,
        })
    }
}

#[async_trait]
impl AuditLedger for InMemoryStore {
    async fn history(&self, id: SpecimenId) -> Result<Vec<StageHistoryEntry>, StorageError> {
        Ok(self.state.lock().await.history_of(id))
    }
}
