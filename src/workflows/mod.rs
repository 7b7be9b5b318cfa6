// Stage-transition workflow engine
// Catalog and permission matrix are fixed tables; the guard and registrar
// are the only writers of specimen state.

pub mod guard;
pub mod permissions;
pub mod registrar;
pub mod stages;
pub mod timeline;

pub use guard::{TransitionGuard, TransitionPolicy, TransitionRequest};
pub use permissions::{allowed_roles, is_allowed, Role, UnknownRole};
pub use registrar::{Registrar, Registration};
pub use stages::{catalog, NotesPolicy, Stage, StageDefinition, UnknownStage};
pub use timeline::{build_timeline, StageStatus, TimelineEntry, TimelineReconstructor};
