//! Course sync orchestration.
//!
//! A sync loads the course, decides which collections are affected (all of
//! them for a full sync, the planner's [`ChangeSet`] otherwise), reconciles
//! each affected collection against the state store and saves the result.
//!
//! Collections are processed in dependency order:
//!
//! 1. course record
//! 2. topics and tags
//! 3. assessment sets and modules
//! 4. questions
//! 5. course instances
//! 6. assessments, per course instance

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use coursesync_core::{config, registry, CourseName, InfoFile, SyncConfig};
use coursesync_reconcile::{
    fast_sync_strategy, identify_changes, normalize_path, reconcile_entities, ChangeSet,
    ExistingEntity, FastSyncStrategy, PlanSummary, ReconcileInput, SyncEntity,
};

use crate::apply::{commit, Collection, CollectionReport};
use crate::course_db::{self, CourseData};
use crate::error::{ApplyError, SyncError};
use crate::fast;
use crate::records::{
    default_assessment_sets, default_tags, Assessment, AssessmentModule, AssessmentSet,
    CourseInstance, CourseRecord, Question, SyncProblems, Tag, Topic,
};
use crate::staleness::{self, StalenessSignal};
use crate::store::{self, CourseState};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Which files a sync should consider changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncMode {
    /// Reconcile every collection.
    Full,
    /// Compare file hashes with the state store and plan from the difference.
    Incremental,
    /// Plan from these course-relative paths (reported by a watcher).
    Paths(Vec<String>),
}

/// What a sync actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    Full,
    Planned,
    Fast,
    NoChanges,
}

impl SyncKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncKind::Full => "full",
            SyncKind::Planned => "planned",
            SyncKind::Fast => "fast",
            SyncKind::NoChanges => "no_changes",
        }
    }
}

/// Result of syncing a single course.
#[derive(Debug, Clone, Serialize)]
pub struct SyncCourseResult {
    pub course_name: String,
    pub kind: SyncKind,
    pub changed_files: Vec<String>,
    pub changes: ChangeSet,
    pub reports: Vec<CollectionReport>,
    /// Errors and warnings found in the course's info files.
    pub problems: Vec<String>,
    pub dry_run: bool,
    /// The state after the sync (saved unless `dry_run`).
    #[serde(skip)]
    pub state: CourseState,
}

impl SyncCourseResult {
    pub fn summary(&self) -> PlanSummary {
        let mut total = PlanSummary::default();
        for report in self.reports.iter().filter(|r| r.error.is_none()) {
            total.add(PlanSummary {
                created: report.created,
                updated: report.updated,
                deleted: report.deleted,
            });
        }
        total
    }

    /// Collections whose plan could not be applied.
    pub fn failures(&self) -> impl Iterator<Item = &CollectionReport> {
        self.reports.iter().filter(|r| r.error.is_some())
    }
}

/// A course that could not be synced at all.
#[derive(Debug)]
pub struct CourseFailure {
    pub course_name: String,
    pub error: SyncError,
}

/// Results of a sync over one or more courses.
#[derive(Debug, Default)]
pub struct SyncRun {
    pub results: Vec<SyncCourseResult>,
    pub failures: Vec<CourseFailure>,
}

impl SyncRun {
    /// `true` if a course or any of its collections failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty() || self.results.iter().any(|r| r.failures().next().is_some())
    }
}

/// What the next incremental sync of a course would do, without doing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoursePlan {
    pub course_name: String,
    pub never_synced: bool,
    pub changed_files: Vec<String>,
    pub changes: ChangeSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast_sync: Option<FastSyncStrategy>,
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// Sync one registered course.
///
/// In dry-run mode the state store is not written; the returned `state`
/// shows what would have been saved.
pub fn sync_course(
    home: &Path,
    course_name: &str,
    mode: SyncMode,
    dry_run: bool,
) -> Result<SyncCourseResult, SyncError> {
    let sync_started_at = Utc::now();
    let course = registry::load_course_at(home, &CourseName::from(course_name))?;
    let config = config::load_at(home)?;
    let mut state = store::load_at(home, course_name)?;
    let current = staleness::hash_course_files(&course.path, config.ignore_hidden)?;

    let mode = match mode {
        SyncMode::Incremental | SyncMode::Paths(_) if state.synced_at.is_none() => {
            tracing::info!("{course_name}: never synced, running a full sync");
            SyncMode::Full
        }
        other => other,
    };

    let changed_files = match &mode {
        SyncMode::Full | SyncMode::Incremental => staleness::changed_paths(&state.files, &current),
        SyncMode::Paths(paths) => paths
            .iter()
            .map(|p| normalize_path(p))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    let mut reports = Vec::new();
    let mut problems = Vec::new();

    let (kind, changes) = if mode == SyncMode::Full {
        let data = course_db::load_full_course(&course.path, config.ignore_hidden)?;
        let changes = ChangeSet::full(data.course_instance_names());
        sync_collections(&mut state, &data, &changes, &config, course_name, &mut reports);
        problems = data.problems();
        (SyncKind::Full, changes)
    } else if changed_files.is_empty() {
        (SyncKind::NoChanges, ChangeSet::default())
    } else {
        let fast_report = match fast_sync_strategy(&changed_files) {
            Some(strategy) => fast::try_fast_question_sync(&course.path, &mut state, &strategy)?,
            None => None,
        };
        match fast_report {
            Some(report) => {
                reports.push(report);
                let changes = ChangeSet {
                    sync_questions: true,
                    ..Default::default()
                };
                (SyncKind::Fast, changes)
            }
            None => {
                let known =
                    staleness::known_course_instances(&state, &course.path, config.ignore_hidden)?;
                let changes = identify_changes(&changed_files, &known);
                if changes.is_empty() {
                    tracing::debug!("{course_name}: no info files changed");
                    (SyncKind::NoChanges, changes)
                } else {
                    let data = course_db::load_full_course(&course.path, config.ignore_hidden)?;
                    sync_collections(&mut state, &data, &changes, &config, course_name, &mut reports);
                    problems = data.problems();
                    (SyncKind::Planned, changes)
                }
            }
        }
    };

    match &mode {
        SyncMode::Paths(_) => {
            for path in &changed_files {
                match current.get(path) {
                    Some(digest) => {
                        state.files.insert(path.clone(), digest.clone());
                    }
                    None => {
                        state.files.remove(path);
                    }
                }
            }
        }
        SyncMode::Full | SyncMode::Incremental => state.files = current,
    }
    state.synced_at = Some(sync_started_at);

    if dry_run {
        tracing::info!("[dry-run] {course_name}: state store not written");
    } else {
        store::save_at(home, course_name, &state)?;
    }

    Ok(SyncCourseResult {
        course_name: course_name.to_string(),
        kind,
        changed_files,
        changes,
        reports,
        problems,
        dry_run,
        state,
    })
}

/// Sync every registered course.
///
/// A course that cannot be synced (missing directory, unreadable state) is
/// recorded in [`SyncRun::failures`] and the remaining courses still run.
/// Only a failure to read the registry itself is returned as an error.
pub fn sync_all(home: &Path, mode: SyncMode, dry_run: bool) -> Result<SyncRun, SyncError> {
    let courses = registry::list_courses_at(home)?;
    let mut run = SyncRun::default();
    for course in courses {
        let name = course.name.0;
        match sync_course(home, &name, mode.clone(), dry_run) {
            Ok(result) => run.results.push(result),
            Err(error) => {
                tracing::warn!("{name}: sync failed: {error}");
                run.failures.push(CourseFailure {
                    course_name: name,
                    error,
                });
            }
        }
    }
    Ok(run)
}

/// Describe what an incremental sync of `course_name` would touch.
pub fn plan_course(home: &Path, course_name: &str) -> Result<CoursePlan, SyncError> {
    let course = registry::load_course_at(home, &CourseName::from(course_name))?;
    let plan = match staleness::check(home, &course)? {
        StalenessSignal::NeverSynced => {
            let config = config::load_at(home)?;
            let instances = course_db::load_course_instances(&course.path, config.ignore_hidden)?;
            let changed_files =
                staleness::hash_course_files(&course.path, config.ignore_hidden)?
                    .into_keys()
                    .collect();
            CoursePlan {
                course_name: course_name.to_string(),
                never_synced: true,
                changed_files,
                changes: ChangeSet::full(instances.into_keys()),
                fast_sync: None,
            }
        }
        StalenessSignal::Current => CoursePlan {
            course_name: course_name.to_string(),
            never_synced: false,
            changed_files: Vec::new(),
            changes: ChangeSet::default(),
            fast_sync: None,
        },
        StalenessSignal::Pending { files, changes } => CoursePlan {
            course_name: course_name.to_string(),
            never_synced: false,
            fast_sync: fast_sync_strategy(&files),
            changed_files: files,
            changes,
        },
    };
    Ok(plan)
}

/// Describe what a sync of exactly `paths` would touch.
pub fn plan_paths(home: &Path, course_name: &str, paths: &[String]) -> Result<CoursePlan, SyncError> {
    let course = registry::load_course_at(home, &CourseName::from(course_name))?;
    let config = config::load_at(home)?;
    let state = store::load_at(home, course_name)?;
    let changed_files: Vec<String> = paths
        .iter()
        .map(|p| normalize_path(p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let known = staleness::known_course_instances(&state, &course.path, config.ignore_hidden)?;
    Ok(CoursePlan {
        course_name: course_name.to_string(),
        never_synced: state.synced_at.is_none(),
        changes: identify_changes(&changed_files, &known),
        fast_sync: fast_sync_strategy(&changed_files),
        changed_files,
    })
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

fn sync_collections(
    state: &mut CourseState,
    data: &CourseData,
    changes: &ChangeSet,
    config: &SyncConfig,
    course_name: &str,
    reports: &mut Vec<CollectionReport>,
) {
    let course_json = data.course.valid_data();
    let course_valid = !data.course.has_errors();
    if !course_valid {
        tracing::warn!("{course_name}: infoCourse.json has errors; course-level collections keep their rows");
    }

    // 1. course record
    if changes.sync_course {
        let mut record = match (course_json, &state.course) {
            (Some(json), _) => CourseRecord::from(json),
            (None, Some(existing)) => existing.clone(),
            (None, None) => CourseRecord {
                uuid: data.course.uuid.clone(),
                name: course_name.to_string(),
                title: String::new(),
                sync_errors: Vec::new(),
                sync_warnings: Vec::new(),
            },
        };
        record.set_problems(data.course.errors.clone(), data.course.warnings.clone());
        state.course = Some(record);
    }

    // 2. topics and tags
    if changes.sync_course || changes.sync_questions {
        let declared: Vec<Topic> = course_json
            .map(|c| c.topics.iter().map(Topic::from).collect())
            .unwrap_or_default();
        let known = data.topics_in_use();
        let plan = reconcile_entities(ReconcileInput {
            course_entities: &declared,
            extra_entities: &[],
            existing_entities: &state.topics,
            known_names: &known,
            is_source_valid: course_valid,
            delete_unused: config.delete_unused,
        });
        commit(Collection::Topics, &mut state.topics, &plan, reports);

        let declared: Vec<Tag> = course_json
            .map(|c| c.tags.iter().map(Tag::from).collect())
            .unwrap_or_default();
        let (extras, known) = split_defaults(default_tags(), data.tags_in_use());
        let plan = reconcile_entities(ReconcileInput {
            course_entities: &declared,
            extra_entities: &extras,
            existing_entities: &state.tags,
            known_names: &known,
            is_source_valid: course_valid,
            delete_unused: config.delete_unused,
        });
        commit(Collection::Tags, &mut state.tags, &plan, reports);
    }

    // 3. assessment sets and modules
    if changes.sync_course || changes.syncs_assessments() {
        let declared: Vec<AssessmentSet> = course_json
            .map(|c| c.assessment_sets.iter().map(AssessmentSet::from).collect())
            .unwrap_or_default();
        let (extras, known) = split_defaults(default_assessment_sets(), data.assessment_sets_in_use());
        let plan = reconcile_entities(ReconcileInput {
            course_entities: &declared,
            extra_entities: &extras,
            existing_entities: &state.assessment_sets,
            known_names: &known,
            is_source_valid: course_valid,
            delete_unused: config.delete_unused,
        });
        commit(Collection::AssessmentSets, &mut state.assessment_sets, &plan, reports);

        let declared: Vec<AssessmentModule> = course_json
            .map(|c| c.assessment_modules.iter().map(AssessmentModule::from).collect())
            .unwrap_or_default();
        let known = data.assessment_modules_in_use();
        let plan = reconcile_entities(ReconcileInput {
            course_entities: &declared,
            extra_entities: &[],
            existing_entities: &state.assessment_modules,
            known_names: &known,
            is_source_valid: course_valid,
            delete_unused: config.delete_unused,
        });
        commit(Collection::AssessmentModules, &mut state.assessment_modules, &plan, reports);
    }

    let no_names = BTreeSet::new();

    // 4. questions
    if changes.sync_questions {
        let declared = desired_records(
            &data.questions,
            &state.questions,
            Question::from_json,
            Question::placeholder,
        );
        let plan = reconcile_entities(ReconcileInput {
            course_entities: &declared,
            extra_entities: &[],
            existing_entities: &state.questions,
            known_names: &no_names,
            is_source_valid: true,
            delete_unused: config.delete_unused,
        });
        commit(Collection::Questions, &mut state.questions, &plan, reports);
    }

    // 5. course instances
    if changes.sync_course_instances {
        let infos: BTreeMap<&String, &InfoFile<_>> = data
            .course_instances
            .iter()
            .map(|(name, ci)| (name, &ci.course_instance))
            .collect();
        let declared = desired_records(
            infos,
            &state.course_instances,
            CourseInstance::from_json,
            CourseInstance::placeholder,
        );
        let plan = reconcile_entities(ReconcileInput {
            course_entities: &declared,
            extra_entities: &[],
            existing_entities: &state.course_instances,
            known_names: &no_names,
            is_source_valid: true,
            delete_unused: config.delete_unused,
        });
        commit(Collection::CourseInstances, &mut state.course_instances, &plan, reports);

        for orphan in state.prune_orphan_assessments() {
            tracing::info!("{course_name}: dropped assessments of deleted course instance {orphan}");
        }
    }

    // 6. assessments
    for instance_name in &changes.sync_course_instance_assessments {
        let collection = Collection::Assessments(instance_name.clone());
        let Some(instance) = data.course_instances.get(instance_name) else {
            tracing::debug!("{course_name}: course instance {instance_name} is gone; skipping its assessments");
            continue;
        };
        if !state.has_course_instance(instance_name) {
            let err = ApplyError::MissingCourseInstance(instance_name.clone());
            tracing::warn!("{course_name}: {err}");
            reports.push(CollectionReport::failed(collection, &err));
            continue;
        }

        let rows = state.assessments.entry(instance_name.clone()).or_default();
        let declared = desired_records(
            &instance.assessments,
            rows,
            Assessment::from_json,
            Assessment::placeholder,
        );
        let plan = reconcile_entities(ReconcileInput {
            course_entities: &declared,
            extra_entities: &[],
            existing_entities: rows.as_slice(),
            known_names: &no_names,
            is_source_valid: true,
            delete_unused: config.delete_unused,
        });
        commit(collection, rows, &plan, reports);
    }
}

/// Records for every loaded info file, in name order.
///
/// A file with errors keeps the stored row's attributes (or an identity-only
/// placeholder when there is no row) and carries its errors on the record.
fn desired_records<'a, J, T, I>(
    infos: I,
    rows: &[ExistingEntity<T>],
    from_json: fn(&str, &J) -> T,
    placeholder: fn(&str, Option<String>) -> T,
) -> Vec<T>
where
    J: 'a,
    T: SyncEntity + SyncProblems,
    I: IntoIterator<Item = (&'a String, &'a InfoFile<J>)>,
{
    infos
        .into_iter()
        .map(|(name, info)| {
            let mut record = match info.valid_data() {
                Some(json) => from_json(name, json),
                None => rows
                    .iter()
                    .find(|row| row.name() == name.as_str())
                    .map(|row| row.data.clone())
                    .unwrap_or_else(|| placeholder(name, info.uuid.clone())),
            };
            record.set_problems(info.errors.clone(), info.warnings.clone());
            record
        })
        .collect()
}

/// Split names in use into platform defaults (returned as entities) and
/// the remaining names the reconciler should synthesize.
fn split_defaults<T: SyncEntity>(
    defaults: Vec<T>,
    in_use: BTreeSet<String>,
) -> (Vec<T>, BTreeSet<String>) {
    let extras: Vec<T> = defaults
        .into_iter()
        .filter(|d| in_use.contains(d.name()))
        .collect();
    let known = in_use
        .into_iter()
        .filter(|name| !extras.iter().any(|e| e.name() == name.as_str()))
        .collect();
    (extras, known)
}
