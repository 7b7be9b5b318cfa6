// SQLite-backed store: persistence, constraints and append-only ledger
#![cfg(feature = "database")]

mod fixtures;

use std::sync::Arc;

use fixtures::{actor, intake, john_doe, memory_service, register, service_over};
use histopath_tracker::config::DatabaseConfig;
use histopath_tracker::specimens::NewStageEntry;
use histopath_tracker::storage::SqliteSpecimenStore;
use histopath_tracker::{
    AuditLedger, DatabaseManager, Priority, Role, SpecimenStore, Stage, StorageError,
    TrackingError, TransitionPolicy, TransitionRequest,
};
use tempfile::TempDir;

fn file_config(dir: &TempDir) -> DatabaseConfig {
    DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("data/histopath.db").display()),
        max_connections: 4,
        auto_migrate: true,
        busy_timeout_ms: 5_000,
    }
}

async fn open(dir: &TempDir) -> (DatabaseManager, Arc<SqliteSpecimenStore>) {
    let database = DatabaseManager::new(&file_config(dir)).await.unwrap();
    let store = Arc::new(SqliteSpecimenStore::new(&database));
    (database, store)
}

fn to(specimen_id: uuid::Uuid, target: Stage, role: Role, notes: Option<&str>) -> TransitionRequest {
    TransitionRequest {
        specimen_id,
        target,
        actor: actor(role),
        notes: notes.map(str::to_string),
        photo_reference: None,
    }
}

#[tokio::test]
async fn test_specimens_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let specimen = {
        let (database, store) = open(&dir).await;
        let service = service_over(store, TransitionPolicy::Permissive, false);
        let specimen = register(&service, john_doe()).await;
        service
            .update_stage(to(specimen.id, Stage::Grossing, Role::LabTechnician, Some("2 cores")))
            .await
            .unwrap();
        database.shutdown().await;
        specimen
    };

    let (_database, store) = open(&dir).await;
    let stored = store.get(specimen.id).await.unwrap().unwrap();
    assert_eq!(stored.current_stage, Stage::Grossing);
    assert_eq!(stored.accession_number, specimen.accession_number);
    assert_eq!(stored.created_at, specimen.created_at);
    assert_eq!(stored.priority, Priority::Stat);

    let history = store.history(specimen.id).await.unwrap();
    let stages: Vec<Stage> = history.iter().map(|e| e.stage).collect();
    assert_eq!(stages, vec![Stage::Reception, Stage::Grossing]);
    assert_eq!(history[1].notes.as_deref(), Some("2 cores"));
    assert_eq!(history[1].performed_by_role, Role::LabTechnician);
    assert_eq!(history[1].timestamp, stored.updated_at);
}

#[tokio::test]
async fn test_duplicate_accession_is_rejected_atomically() {
    let dir = TempDir::new().unwrap();
    let (_database, store) = open(&dir).await;
    let service = service_over(store.clone(), TransitionPolicy::Permissive, false);
    let first = register(&service, john_doe()).await;

    let mut clash = first.clone();
    clash.id = uuid::Uuid::new_v4();
    clash.patient_name = "Somebody Else".to_string();
    let reception = NewStageEntry {
        stage: Stage::Reception,
        notes: None,
        performed_by: actor(Role::Receptionist),
        photo_reference: None,
        requested_at: clash.created_at,
    };

    let err = store.register(&clash, &reception).await.unwrap_err();
    assert!(matches!(err, StorageError::DuplicateAccession(ref n) if *n == first.accession_number.to_string()));
    assert!(store.get(clash.id).await.unwrap().is_none());
    assert!(store.history(clash.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_ledger_rows_cannot_be_changed() {
    let dir = TempDir::new().unwrap();
    let (database, store) = open(&dir).await;
    let service = service_over(store, TransitionPolicy::Permissive, false);
    let specimen = register(&service, john_doe()).await;

    let update = sqlx::query("UPDATE stage_history SET notes = 'edited' WHERE specimen_id = ?1")
        .bind(specimen.id.to_string())
        .execute(database.pool())
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM stage_history WHERE specimen_id = ?1")
        .bind(specimen.id.to_string())
        .execute(database.pool())
        .await;
    assert!(delete.is_err());

    assert_eq!(service.history(specimen.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_search_and_ordering_match_memory_store() {
    let dir = TempDir::new().unwrap();
    let (_database, store) = open(&dir).await;
    let service = service_over(store, TransitionPolicy::Permissive, false);

    let older = register(&service, intake("Amina Bello", "LAU-1", Priority::Routine)).await;
    let newer = register(&service, intake("Kofi Mensah", "LAU-2", Priority::Urgent)).await;

    let all = service.list().await.unwrap();
    assert_eq!(all.iter().map(|s| s.id).collect::<Vec<_>>(), vec![newer.id, older.id]);

    let by_name = service.search("  aMiNa ").await.unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].id, older.id);

    let accession = newer.accession_number.as_str().to_lowercase();
    let by_accession = service.search(&accession).await.unwrap();
    assert_eq!(by_accession[0].id, newer.id);

    assert_eq!(service.search("lau-").await.unwrap().len(), 2);
    assert_eq!(service.search("").await.unwrap().len(), 2);
    assert!(service.search("nobody").await.unwrap().is_empty());

    // case folding beyond ASCII, same answer as the in-memory store
    let memory = memory_service(TransitionPolicy::Permissive);
    let accented = intake("ÉMILE ÖZTÜRK", "LAU-3", Priority::Stat);
    let stored = register(&service, accented.clone()).await;
    register(&memory, accented).await;

    let sqlite_hits = service.search("émile öztürk").await.unwrap();
    let memory_hits = memory.search("émile öztürk").await.unwrap();
    assert_eq!(sqlite_hits.len(), 1);
    assert_eq!(sqlite_hits[0].id, stored.id);
    assert_eq!(memory_hits.len(), sqlite_hits.len());
    assert_eq!(service.search("ztürk").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_adjacent_race_has_single_winner_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let (_database, store) = open(&dir).await;
    let service = Arc::new(service_over(store.clone(), TransitionPolicy::Adjacent, false));
    let specimen = register(&service, john_doe()).await;

    let attempts = (0..6).map(|_| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .update_stage(to(specimen.id, Stage::Grossing, Role::LabScientist, None))
                .await
        })
    });
    let results: Vec<Result<_, TrackingError>> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(store.history(specimen.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_permissive_writes_are_serialized() {
    let dir = TempDir::new().unwrap();
    let (_database, store) = open(&dir).await;
    let service = Arc::new(service_over(store.clone(), TransitionPolicy::Permissive, false));
    let specimen = register(&service, john_doe()).await;

    let targets = [Stage::Processing, Stage::Embedding, Stage::Sectioning, Stage::Staining];
    let attempts = targets.into_iter().map(|target| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .update_stage(to(specimen.id, target, Role::LabTechnician, None))
                .await
        })
    });
    for joined in futures::future::join_all(attempts).await {
        joined.unwrap().unwrap();
    }

    let stored = store.get(specimen.id).await.unwrap().unwrap();
    let history = store.history(specimen.id).await.unwrap();
    assert_eq!(history.len(), 1 + targets.len());
    assert_eq!(history.last().map(|e| e.stage), Some(stored.current_stage));
    assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn test_in_memory_database_runs_migrations() {
    let database = DatabaseManager::in_memory().await.unwrap();
    let store = Arc::new(SqliteSpecimenStore::new(&database));
    let service = service_over(store, TransitionPolicy::Permissive, false);

    let specimen = register(&service, john_doe()).await;
    let detail = service.detail(specimen.id).await.unwrap();
    assert_eq!(detail.ledger.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_detail_reads_one_snapshot_while_writes_commit() {
    let dir = TempDir::new().unwrap();
    let (_database, store) = open(&dir).await;
    let service = Arc::new(service_over(store, TransitionPolicy::Permissive, false));
    let specimen = register(&service, john_doe()).await;

    let writer = {
        let service = service.clone();
        tokio::spawn(async move {
            let lab = [Stage::Processing, Stage::Embedding, Stage::Sectioning, Stage::Staining];
            for target in lab.into_iter().cycle().take(60) {
                service
                    .update_stage(to(specimen.id, target, Role::LabTechnician, None))
                    .await
                    .unwrap();
            }
        })
    };

    while !writer.is_finished() {
        let detail = service.detail(specimen.id).await.unwrap();
        assert_eq!(
            detail.ledger.last().map(|e| e.stage),
            Some(detail.specimen.current_stage)
        );
        let current = &detail.timeline[detail.specimen.current_stage.index()];
        assert_eq!(current.entry.as_ref(), detail.ledger.last());
    }
    writer.await.unwrap();
}
