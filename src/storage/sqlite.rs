//! SQLite implementation of the specimen store and audit ledger.
//!
//! All SQL is runtime-checked (`sqlx::query`) so building does not need a
//! live database. Writes run under `BEGIN IMMEDIATE`, which takes the write
//! lock up front: two concurrent transitions on the same specimen are
//! serialized by SQLite instead of both reading the same stage.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{AuditLedger, SpecimenSnapshot, SpecimenStore, StorageError, TransitionWrite};
use crate::database::DatabaseManager;
use crate::specimens::{AccessionNumber, NewStageEntry, Specimen, SpecimenId, StageHistoryEntry};
use crate::workflows::Stage;

const SPECIMEN_COLUMNS: &str = "id, accession_number, patient_name, patient_id, age, sex, \
     specimen_type, clinical_notes, referring_doctor, priority, current_stage, registered_by, \
     created_at, updated_at";

const HISTORY_COLUMNS: &str =
    "id, specimen_id, stage, notes, performed_by, performed_by_role, photo_reference, timestamp";

#[derive(Debug, Clone)]
pub struct SqliteSpecimenStore {
    pool: SqlitePool,
}

impl SqliteSpecimenStore {
    pub fn new(database: &DatabaseManager) -> Self {
        Self {
            pool: database.pool().clone(),
        }
    }

    /// Run `BEGIN IMMEDIATE .. COMMIT` on a task of its own, so a caller that
    /// is dropped mid-request cannot return a connection with an open
    /// transaction to the pool.
    async fn write_detached<T, F, Fut>(&self, work: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(PoolConnection<Sqlite>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = (PoolConnection<Sqlite>, Result<T, StorageError>)>
            + Send
            + 'static,
    {
        let handle = tokio::spawn(run_immediate(self.pool.clone(), work));

        handle
            .await
            .map_err(|e| StorageError::WriteTask(e.to_string()))?
    }
}

async fn run_immediate<T, F, Fut>(pool: SqlitePool, work: F) -> Result<T, StorageError>
where
    F: FnOnce(PoolConnection<Sqlite>) -> Fut,
    Fut: std::future::Future<Output = (PoolConnection<Sqlite>, Result<T, StorageError>)>,
{
    let mut conn = pool.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    let (mut conn, outcome) = work(conn).await;
    finish(&mut conn, outcome).await
}

async fn finish<T>(
    conn: &mut SqliteConnection,
    outcome: Result<T, StorageError>,
) -> Result<T, StorageError> {
    match outcome {
        Ok(value) => match sqlx::query("COMMIT").execute(&mut *conn).await {
            Ok(_) => Ok(value),
            Err(commit_err) => {
                rollback(conn).await;
                Err(commit_err.into())
            }
        },
        Err(err) => {
            rollback(conn).await;
            Err(err)
        }
    }
}

async fn rollback(conn: &mut SqliteConnection) {
    if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        warn!("Rollback failed: {}", e);
    }
}

pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    // fixed width keeps lexical and chronological order identical
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::corrupt(format!("bad timestamp '{raw}': {e}")))
}

fn parse_column<T: std::str::FromStr>(column: &str, raw: &str) -> Result<T, StorageError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| StorageError::corrupt(format!("bad {column} '{raw}': {e}")))
}

fn specimen_from_row(row: &SqliteRow) -> Result<Specimen, StorageError> {
    let id: String = row.try_get("id")?;
    let accession: String = row.try_get("accession_number")?;
    let age: Option<i64> = row.try_get("age")?;
    let priority: String = row.try_get("priority")?;
    let stage: String = row.try_get("current_stage")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let age = age
        .map(u16::try_from)
        .transpose()
        .map_err(|e| StorageError::corrupt(format!("bad age: {e}")))?;

    Ok(Specimen {
        id: parse_column::<Uuid>("id", &id)?,
        accession_number: parse_column::<AccessionNumber>("accession_number", &accession)?,
        patient_name: row.try_get("patient_name")?,
        patient_id: row.try_get("patient_id")?,
        age,
        sex: row.try_get("sex")?,
        specimen_type: row.try_get("specimen_type")?,
        clinical_notes: row.try_get("clinical_notes")?,
        referring_doctor: row.try_get("referring_doctor")?,
        priority: parse_column("priority", &priority)?,
        current_stage: parse_column::<Stage>("current_stage", &stage)?,
        registered_by: row.try_get("registered_by")?,
        created_at: decode_timestamp(&created_at)?,
        updated_at: decode_timestamp(&updated_at)?,
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<StageHistoryEntry, StorageError> {
    let specimen_id: String = row.try_get("specimen_id")?;
    let stage: String = row.try_get("stage")?;
    let role: String = row.try_get("performed_by_role")?;
    let timestamp: String = row.try_get("timestamp")?;

    Ok(StageHistoryEntry {
        id: row.try_get("id")?,
        specimen_id: parse_column::<Uuid>("specimen_id", &specimen_id)?,
        stage: parse_column("stage", &stage)?,
        notes: row.try_get("notes")?,
        performed_by: row.try_get("performed_by")?,
        performed_by_role: parse_column("performed_by_role", &role)?,
        photo_reference: row.try_get("photo_reference")?,
        timestamp: decode_timestamp(&timestamp)?,
    })
}

async fn append_entry(
    conn: &mut SqliteConnection,
    specimen_id: SpecimenId,
    entry: &NewStageEntry,
    timestamp: &str,
) -> Result<StageHistoryEntry, StorageError> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO stage_history
            (specimen_id, stage, notes, performed_by, performed_by_role, photo_reference, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        RETURNING {HISTORY_COLUMNS}
        "#
    ))
    .bind(specimen_id.to_string())
    .bind(entry.stage.as_str())
    .bind(entry.notes.as_deref())
    .bind(&entry.performed_by.id)
    .bind(entry.performed_by.role.as_str())
    .bind(entry.photo_reference.as_deref())
    .bind(timestamp)
    .fetch_one(&mut *conn)
    .await?;

    entry_from_row(&row)
}

async fn insert_registration(
    conn: &mut SqliteConnection,
    specimen: &Specimen,
    reception: &NewStageEntry,
) -> Result<StageHistoryEntry, StorageError> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO specimens
            (id, accession_number, patient_name, patient_id, age, sex, specimen_type,
             clinical_notes, referring_doctor, priority, current_stage, registered_by,
             created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
    )
    .bind(specimen.id.to_string())
    .bind(specimen.accession_number.as_str())
    .bind(&specimen.patient_name)
    .bind(&specimen.patient_id)
    .bind(specimen.age.map(i64::from))
    .bind(specimen.sex.as_deref())
    .bind(&specimen.specimen_type)
    .bind(specimen.clinical_notes.as_deref())
    .bind(specimen.referring_doctor.as_deref())
    .bind(specimen.priority.as_str())
    .bind(specimen.current_stage.as_str())
    .bind(&specimen.registered_by)
    .bind(encode_timestamp(&specimen.created_at))
    .bind(encode_timestamp(&specimen.updated_at))
    .execute(&mut *conn)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(db_err))
            if db_err.is_unique_violation() && db_err.message().contains("accession_number") =>
        {
            return Err(StorageError::DuplicateAccession(
                specimen.accession_number.to_string(),
            ));
        }
        Err(e) => return Err(e.into()),
    }

    append_entry(
        conn,
        specimen.id,
        reception,
        &encode_timestamp(&reception.requested_at),
    )
    .await
}

async fn update_stage(
    conn: &mut SqliteConnection,
    id: SpecimenId,
    expected_current: Option<Stage>,
    entry: &NewStageEntry,
) -> Result<TransitionWrite, StorageError> {
    // the write lock is already held, so this read cannot go stale
    let stored: Option<String> =
        sqlx::query_scalar("SELECT current_stage FROM specimens WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
    let Some(stored) = stored else {
        return Ok(TransitionWrite::NotFound);
    };
    let previous: Stage = parse_column("current_stage", &stored)?;
    if let Some(expected) = expected_current {
        if previous != expected {
            return Ok(TransitionWrite::StageConflict { actual: previous });
        }
    }

    // clamp so the new ledger row is never older than the last change
    let row = sqlx::query(&format!(
        r#"
        UPDATE specimens
        SET current_stage = ?1, updated_at = max(updated_at, ?2)
        WHERE id = ?3
        RETURNING {SPECIMEN_COLUMNS}
        "#
    ))
    .bind(entry.stage.as_str())
    .bind(encode_timestamp(&entry.requested_at))
    .bind(id.to_string())
    .fetch_one(&mut *conn)
    .await?;

    let specimen = specimen_from_row(&row)?;
    let entry = append_entry(conn, id, entry, &encode_timestamp(&specimen.updated_at)).await?;
    Ok(TransitionWrite::Applied {
        previous,
        specimen,
        entry,
    })
}

async fn select_specimen(
    conn: &mut SqliteConnection,
    id: SpecimenId,
) -> Result<Option<Specimen>, StorageError> {
    let row = sqlx::query(&format!(
        "SELECT {SPECIMEN_COLUMNS} FROM specimens WHERE id = ?1"
    ))
    .bind(id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(specimen_from_row).transpose()
}

async fn select_history(
    conn: &mut SqliteConnection,
    id: SpecimenId,
) -> Result<Vec<StageHistoryEntry>, StorageError> {
    let rows = sqlx::query(&format!(
        "SELECT {HISTORY_COLUMNS} FROM stage_history WHERE specimen_id = ?1 ORDER BY timestamp ASC, id ASC"
    ))
    .bind(id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(entry_from_row).collect()
}

#[async_trait]
impl SpecimenStore for SqliteSpecimenStore {
    async fn register(
        &self,
        specimen: &Specimen,
        reception: &NewStageEntry,
    ) -> Result<StageHistoryEntry, StorageError> {
        let specimen = specimen.clone();
        let reception = reception.clone();

        let entry = self
            .write_detached(move |mut conn| async move {
                let outcome = insert_registration(&mut conn, &specimen, &reception).await;
                (conn, outcome)
            })
            .await?;

        debug!(specimen_id = %entry.specimen_id, "registered specimen");
        Ok(entry)
    }

    async fn get(&self, id: SpecimenId) -> Result<Option<Specimen>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        select_specimen(&mut conn, id).await
    }

    async fn snapshot(&self, id: SpecimenId) -> Result<Option<SpecimenSnapshot>, StorageError> {
        // one read transaction: both selects see the same WAL snapshot
        let mut tx = self.pool.begin().await?;
        let Some(specimen) = select_specimen(&mut tx, id).await? else {
            return Ok(None);
        };
        let history = select_history(&mut tx, id).await?;
        tx.commit().await?;

        Ok(Some(SpecimenSnapshot { specimen, history }))
    }

    async fn find_by_accession(
        &self,
        accession: &AccessionNumber,
    ) -> Result<Option<Specimen>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {SPECIMEN_COLUMNS} FROM specimens WHERE accession_number = ?1"
        ))
        .bind(accession.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(specimen_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Specimen>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {SPECIMEN_COLUMNS} FROM specimens ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(specimen_from_row).collect()
    }

    async fn search(&self, query: &str) -> Result<Vec<Specimen>, StorageError> {
        // SQLite's lower() folds ASCII only, so matching happens here
        let specimens = self.list().await?;
        Ok(specimens
            .into_iter()
            .filter(|specimen| specimen.matches(query))
            .collect())
    }

    async fn apply_transition(
        &self,
        id: SpecimenId,
        expected_current: Option<Stage>,
        entry: NewStageEntry,
    ) -> Result<TransitionWrite, StorageError> {
        self.write_detached(move |mut conn| async move {
            let outcome = update_stage(&mut conn, id, expected_current, &entry).await;
            (conn, outcome)
        })
        .await
    }
}

#[async_trait]
impl AuditLedger for SqliteSpecimenStore {
    async fn history(&self, id: SpecimenId) -> Result<Vec<StageHistoryEntry>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        select_history(&mut conn, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::priority::Priority;
    use crate::specimens::{now, Actor};
    use crate::workflows::Role;

    async fn seeded() -> (DatabaseManager, SqliteSpecimenStore, Specimen) {
        let database = DatabaseManager::in_memory().await.unwrap();
        let store = SqliteSpecimenStore::new(&database);
        let at = now();
        let specimen = Specimen {
            id: Uuid::new_v4(),
            accession_number: AccessionNumber::new(2026, 7),
            patient_name: "Ngozi Okafor".to_string(),
            patient_id: "P-9".to_string(),
            age: Some(41),
            sex: None,
            specimen_type: "Biopsy".to_string(),
            clinical_notes: None,
            referring_doctor: None,
            priority: Priority::Urgent,
            current_stage: Stage::Reception,
            registered_by: "rec-1".to_string(),
            created_at: at,
            updated_at: at,
        };
        let reception = entry(Stage::Reception, Role::Receptionist);
        store.register(&specimen, &reception).await.unwrap();
        (database, store, specimen)
    }

    fn entry(stage: Stage, role: Role) -> NewStageEntry {
        NewStageEntry {
            stage,
            notes: None,
            performed_by: Actor::new(format!("{role}-1"), role),
            photo_reference: None,
            requested_at: now(),
        }
    }

    async fn panicking_write(
        conn: PoolConnection<Sqlite>,
    ) -> (PoolConnection<Sqlite>, Result<(), StorageError>) {
        drop(conn);
        panic!("write closure panicked");
    }

    #[tokio::test]
    async fn test_panicking_write_is_reported_as_write_task_failure() {
        let database = DatabaseManager::in_memory().await.unwrap();
        let store = SqliteSpecimenStore::new(&database);

        let err = store.write_detached(panicking_write).await.unwrap_err();
        assert!(matches!(err, StorageError::WriteTask(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_transition_reports_stage_held_under_lock() {
        let (_database, store, specimen) = seeded().await;

        let write = store
            .apply_transition(specimen.id, None, entry(Stage::Grossing, Role::LabTechnician))
            .await
            .unwrap();
        let TransitionWrite::Applied { previous, specimen: updated, .. } = write else {
            panic!("expected the transition to apply");
        };
        assert_eq!(previous, Stage::Reception);
        assert_eq!(updated.current_stage, Stage::Grossing);

        let conflict = store
            .apply_transition(
                specimen.id,
                Some(Stage::Reception),
                entry(Stage::Grossing, Role::LabTechnician),
            )
            .await
            .unwrap();
        assert_eq!(
            conflict,
            TransitionWrite::StageConflict {
                actual: Stage::Grossing
            }
        );
    }

    #[tokio::test]
    async fn test_snapshot_pairs_specimen_with_ledger() {
        let (_database, store, specimen) = seeded().await;
        store
            .apply_transition(specimen.id, None, entry(Stage::Grossing, Role::LabScientist))
            .await
            .unwrap();

        let snapshot = store.snapshot(specimen.id).await.unwrap().unwrap();
        assert_eq!(snapshot.specimen.current_stage, Stage::Grossing);
        assert_eq!(
            snapshot.history.iter().map(|e| e.stage).collect::<Vec<_>>(),
            vec![Stage::Reception, Stage::Grossing]
        );
        assert!(store.snapshot(Uuid::new_v4()).await.unwrap().is_none());
    }
}
