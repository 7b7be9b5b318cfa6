use serde::Serialize;
use std::sync::Arc;

use super::stages::Stage;
use crate::error::TrackingError;
use crate::specimens::{SpecimenId, StageHistoryEntry};
use crate::storage::TrackingStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    InProgress,
    Pending,
}

/// Display row for one catalog stage.
///
/// Status comes from catalog position alone. A `Completed` row may have no
/// `entry` when the specimen jumped over that stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    pub stage: Stage,
    pub label: &'static str,
    pub status: StageStatus,
    pub entry: Option<StageHistoryEntry>,
}

/// Pure timeline derivation from the current stage and the ledger rows.
pub fn build_timeline(current: Stage, entries: &[StageHistoryEntry]) -> Vec<TimelineEntry> {
    Stage::ALL
        .iter()
        .map(|&stage| {
            let status = match stage.index().cmp(&current.index()) {
                std::cmp::Ordering::Less => StageStatus::Completed,
                std::cmp::Ordering::Equal => StageStatus::InProgress,
                std::cmp::Ordering::Greater => StageStatus::Pending,
            };
            // latest row wins; ties fall to the later append
            let entry = entries
                .iter()
                .filter(|e| e.stage == stage)
                .max_by_key(|e| (e.timestamp, e.id))
                .cloned();

            TimelineEntry {
                stage,
                label: stage.label(),
                status,
                entry,
            }
        })
        .collect()
}

pub struct TimelineReconstructor {
    store: Arc<dyn TrackingStore>,
}

impl TimelineReconstructor {
    pub fn new(store: Arc<dyn TrackingStore>) -> Self {
        Self { store }
    }

    pub async fn reconstruct(&self, id: SpecimenId) -> Result<Vec<TimelineEntry>, TrackingError> {
        let snapshot = self
            .store
            .snapshot(id)
            .await?
            .ok_or_else(|| TrackingError::not_found(id))?;
        Ok(build_timeline(snapshot.specimen.current_stage, &snapshot.history))
    }
}
