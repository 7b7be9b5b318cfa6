// Specimen records, accession numbering and ledger rows

pub mod accession;
pub mod types;

use chrono::{DateTime, SubsecRound, Utc};

pub use accession::{AccessionNumber, AccessionParseError, AccessionSource, RandomAccessionSource};
#[cfg(any(test, feature = "testing"))]
pub use accession::MockAccessionSource;
pub use types::{
    optional, Actor, NewSpecimen, NewStageEntry, Specimen, SpecimenId, SpecimenStats,
    StageHistoryEntry, MAX_PATIENT_AGE,
};

/// Current time at the precision the stores persist
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
