//! Facade over the workflow engine, shared by the HTTP API and the CLI.

use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::{HistopathConfig, WorkflowConfig};
#[cfg(feature = "database")]
use crate::database::DatabaseManager;
use crate::error::TrackingError;
use crate::specimens::{
    AccessionNumber, AccessionSource, Actor, NewSpecimen, RandomAccessionSource, Specimen,
    SpecimenId, SpecimenStats, StageHistoryEntry,
};
use crate::storage::{InMemoryStore, SpecimenSnapshot, StorageError, TrackingStore};
use crate::workflows::registrar::DEFAULT_MAX_ATTEMPTS;
use crate::workflows::{
    allowed_roles, build_timeline, catalog, Registrar, Registration, Role, StageDefinition,
    TimelineEntry, TimelineReconstructor, TransitionGuard, TransitionRequest,
};

/// Specimen with its derived timeline and raw ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecimenDetail {
    pub specimen: Specimen,
    pub timeline: Vec<TimelineEntry>,
    pub ledger: Vec<StageHistoryEntry>,
}

/// Catalog row as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOverview {
    #[serde(flatten)]
    pub definition: StageDefinition,
    pub allowed_roles: Vec<Role>,
}

pub struct TrackingService {
    store: Arc<dyn TrackingStore>,
    registrar: Registrar,
    guard: TransitionGuard,
    timeline: TimelineReconstructor,
    #[cfg(feature = "database")]
    database: Option<DatabaseManager>,
}

impl TrackingService {
    pub fn new(
        store: Arc<dyn TrackingStore>,
        accessions: Arc<dyn AccessionSource>,
        max_attempts: u32,
        workflow: &WorkflowConfig,
    ) -> Self {
        Self {
            registrar: Registrar::new(store.clone(), accessions, max_attempts),
            guard: TransitionGuard::new(
                store.clone(),
                workflow.transition_policy,
                workflow.require_photo_evidence,
            ),
            timeline: TimelineReconstructor::new(store.clone()),
            store,
            #[cfg(feature = "database")]
            database: None,
        }
    }

    /// Process-local service with default rules
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(RandomAccessionSource::new()),
            DEFAULT_MAX_ATTEMPTS,
            &WorkflowConfig::default(),
        )
    }

    /// Build the service from configuration, opening SQLite when a database
    /// is configured.
    pub async fn open(config: &HistopathConfig) -> Result<Self, StorageError> {
        let accessions: Arc<dyn AccessionSource> = Arc::new(RandomAccessionSource::new());

        #[cfg(feature = "database")]
        if let Some(db_config) = &config.database {
            let database = DatabaseManager::new(db_config).await?;
            let store = Arc::new(crate::storage::SqliteSpecimenStore::new(&database));
            let mut service = Self::new(
                store,
                accessions,
                config.accession.max_attempts,
                &config.workflow,
            );
            service.database = Some(database);
            return Ok(service);
        }

        info!("No database configured, specimens are kept in memory");
        Ok(Self::new(
            Arc::new(InMemoryStore::new()),
            accessions,
            config.accession.max_attempts,
            &config.workflow,
        ))
    }

    #[cfg(feature = "database")]
    pub fn database(&self) -> Option<&DatabaseManager> {
        self.database.as_ref()
    }

    pub fn guard(&self) -> &TransitionGuard {
        &self.guard
    }

    pub async fn register(
        &self,
        input: NewSpecimen,
        actor: &Actor,
    ) -> Result<Registration, TrackingError> {
        self.registrar.register(input, actor).await
    }

    pub async fn list(&self) -> Result<Vec<Specimen>, TrackingError> {
        Ok(self.store.list().await?)
    }

    /// Blank queries return the full list
    pub async fn search(&self, query: &str) -> Result<Vec<Specimen>, TrackingError> {
        Ok(self.store.search(query).await?)
    }

    pub async fn get(&self, id: SpecimenId) -> Result<Specimen, TrackingError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| TrackingError::not_found(id))
    }

    /// Look a specimen up by UUID or accession number
    pub async fn resolve(&self, reference: &str) -> Result<Specimen, TrackingError> {
        let reference = reference.trim();
        if let Ok(id) = Uuid::parse_str(reference) {
            return self.get(id).await;
        }

        let missing = || TrackingError::NotFound {
            specimen: reference.to_string(),
        };
        let accession: AccessionNumber = reference.parse().map_err(|_| missing())?;
        self.store
            .find_by_accession(&accession)
            .await?
            .ok_or_else(missing)
    }

    async fn snapshot(&self, id: SpecimenId) -> Result<SpecimenSnapshot, TrackingError> {
        self.store
            .snapshot(id)
            .await?
            .ok_or_else(|| TrackingError::not_found(id))
    }

    /// Specimen, timeline and ledger from a single consistent read
    pub async fn detail(&self, id: SpecimenId) -> Result<SpecimenDetail, TrackingError> {
        let SpecimenSnapshot { specimen, history } = self.snapshot(id).await?;
        let timeline = build_timeline(specimen.current_stage, &history);
        Ok(SpecimenDetail {
            specimen,
            timeline,
            ledger: history,
        })
    }

    pub async fn timeline(&self, id: SpecimenId) -> Result<Vec<TimelineEntry>, TrackingError> {
        self.timeline.reconstruct(id).await
    }

    pub async fn history(&self, id: SpecimenId) -> Result<Vec<StageHistoryEntry>, TrackingError> {
        // an unknown id is a 404, not an empty ledger
        Ok(self.snapshot(id).await?.history)
    }

    pub async fn update_stage(&self, request: TransitionRequest) -> Result<Specimen, TrackingError> {
        self.guard.attempt_transition(request).await
    }

    pub async fn stats(&self) -> Result<SpecimenStats, TrackingError> {
        let specimens = self.store.list().await?;
        Ok(SpecimenStats::from_specimens(&specimens))
    }

    pub fn stages(&self) -> Vec<StageOverview> {
        catalog()
            .into_iter()
            .map(|definition| StageOverview {
                allowed_roles: allowed_roles(definition.stage).to_vec(),
                definition,
            })
            .collect()
    }
}
