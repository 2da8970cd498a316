//! Pure reconciliation core for coursesync.
//!
//! - [`reconcile`]: turns desired + persisted entities into an [`EntityPlan`]
//! - [`changes`]: maps changed file paths to a [`ChangeSet`]
//! - [`entity`]: shared entity traits and the insertion-ordered map
//!
//! Nothing here performs I/O or returns errors.

pub mod changes;
pub mod entity;
pub mod reconcile;

pub use changes::{
    candidate_qids, extract_course_instance_from_path, fast_sync_strategy, identify_changes,
    normalize_path, qid_from_file_path, ChangeSet, FastSyncStrategy,
};
pub use entity::{DesiredEntity, ExistingEntity, OrderedEntities, SyncEntity, DEFAULT_ENTITY_NAME};
pub use reconcile::{reconcile, reconcile_entities, EntityPlan, PlanSummary, ReconcileInput};
