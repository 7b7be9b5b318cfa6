// HistoPath Tracker Library - specimen stage-transition workflow engine
// This exposes the core components for testing and integration

pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod http;
pub mod priority;
pub mod service;
pub mod shutdown;
pub mod specimens;
pub mod storage;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use crate::config::{config, HistopathConfig};
#[cfg(feature = "database")]
pub use database::DatabaseManager;
pub use error::{TrackingError, ValidationError};
pub use priority::Priority;
pub use service::{SpecimenDetail, StageOverview, TrackingService};
pub use shutdown::ShutdownCoordinator;
pub use specimens::{AccessionNumber, Actor, NewSpecimen, Specimen, StageHistoryEntry};
pub use storage::{AuditLedger, InMemoryStore, SpecimenStore, StorageError, TrackingStore};
pub use telemetry::{create_transition_span, generate_correlation_id, init_telemetry};
pub use workflows::{
    allowed_roles, NotesPolicy, Registrar, Role, Stage, StageStatus, TimelineEntry,
    TransitionGuard, TransitionPolicy, TransitionRequest,
};
