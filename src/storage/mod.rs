//! Persistence for specimens and their stage ledger

pub mod error;
pub mod memory;
#[cfg(feature = "database")]
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use memory::InMemoryStore;
#[cfg(feature = "database")]
pub use sqlite::SqliteSpecimenStore;
pub use traits::{AuditLedger, SpecimenSnapshot, SpecimenStore, TrackingStore, TransitionWrite};
