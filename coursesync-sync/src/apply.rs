//! Applying an [`EntityPlan`] to the stored rows of one collection.
//!
//! A collection is committed as a unit: if the plan does not fit the rows it
//! was computed against, nothing in that collection changes and the failure
//! is reported alongside the other collections.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use coursesync_reconcile::{EntityPlan, ExistingEntity, SyncEntity};

use crate::error::ApplyError;

/// One reconciled collection of the state store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "course_instance")]
pub enum Collection {
    Topics,
    Tags,
    AssessmentSets,
    AssessmentModules,
    Questions,
    CourseInstances,
    /// Assessments of one course instance.
    Assessments(String),
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Topics => write!(f, "topics"),
            Collection::Tags => write!(f, "tags"),
            Collection::AssessmentSets => write!(f, "assessment_sets"),
            Collection::AssessmentModules => write!(f, "assessment_modules"),
            Collection::Questions => write!(f, "questions"),
            Collection::CourseInstances => write!(f, "course_instances"),
            Collection::Assessments(instance) => write!(f, "assessments[{instance}]"),
        }
    }
}

/// Outcome for one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub collection: Collection,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CollectionReport {
    pub fn failed(collection: Collection, error: &ApplyError) -> Self {
        Self {
            collection,
            created: 0,
            updated: 0,
            deleted: 0,
            error: Some(error.to_string()),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.error.is_none() && self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

/// New row set for a collection after applying `plan`.
///
/// Desired rows come first in number order; rows the plan neither keeps nor
/// deletes (deletion disabled) follow in their stored order, renumbered after
/// the last desired row so numbers stay unique.
pub fn apply_plan<T: SyncEntity>(
    rows: &[ExistingEntity<T>],
    plan: &EntityPlan<T>,
) -> Result<Vec<ExistingEntity<T>>, ApplyError> {
    let stored: HashSet<&str> = rows.iter().map(|r| r.name()).collect();

    if let Some(entity) = plan.to_create.iter().find(|e| stored.contains(e.name.as_str())) {
        return Err(ApplyError::AlreadyExists(entity.name.clone()));
    }
    if let Some(entity) = plan.to_update.iter().find(|e| !stored.contains(e.name.as_str())) {
        return Err(ApplyError::NotFound(entity.name.clone()));
    }

    let desired = plan.desired();
    let desired_names: HashSet<&str> = desired.iter().map(|e| e.name.as_str()).collect();

    let mut out: Vec<ExistingEntity<T>> = desired
        .into_iter()
        .map(|e| e.clone().into_existing())
        .collect();
    let mut next = out.iter().filter_map(|r| r.number).max().unwrap_or(0);
    for row in rows
        .iter()
        .filter(|r| !desired_names.contains(r.name()) && !plan.to_delete.contains(r.name()))
    {
        next += 1;
        let mut row = row.clone();
        row.number = Some(next);
        out.push(row);
    }
    Ok(out)
}

/// Apply `plan` to `rows` in place and record the outcome.
///
/// On failure `rows` is left untouched and the report carries the error.
pub fn commit<T: SyncEntity>(
    collection: Collection,
    rows: &mut Vec<ExistingEntity<T>>,
    plan: &EntityPlan<T>,
    reports: &mut Vec<CollectionReport>,
) {
    match apply_plan(rows, plan) {
        Ok(updated) => {
            let summary = plan.summary();
            tracing::debug!(
                "{collection}: {} created, {} updated, {} deleted",
                summary.created,
                summary.updated,
                summary.deleted
            );
            *rows = updated;
            reports.push(CollectionReport {
                collection,
                created: summary.created,
                updated: summary.updated,
                deleted: summary.deleted,
                error: None,
            });
        }
        Err(err) => {
            tracing::warn!("{collection}: plan not applied: {err}");
            reports.push(CollectionReport::failed(collection, &err));
        }
    }
}
