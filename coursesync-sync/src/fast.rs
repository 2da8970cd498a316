//! Single-question fast path.
//!
//! When every changed file sits under one question directory, the question
//! row can be refreshed directly without reloading the whole course. Any
//! change that could ripple into another collection (new topic or tag,
//! UUID reuse, grading-method switch to or from `Manual`) declines the fast
//! path so the caller falls back to a planned sync.

use std::path::Path;

use coursesync_core::schema::QuestionJson;
use coursesync_reconcile::changes::{QUESTIONS_DIR, QUESTION_INFO_FILE};
use coursesync_reconcile::{candidate_qids, ExistingEntity, FastSyncStrategy};

use crate::apply::{Collection, CollectionReport};
use crate::course_db::load_info_file;
use crate::error::SyncError;
use crate::records::{Question, SyncProblems};
use crate::store::CourseState;

const MANUAL_GRADING: &str = "Manual";

/// Refresh the question named by `strategy` in `state`.
///
/// Returns `Ok(None)` when the fast path does not apply; `state` is then
/// unchanged.
pub fn try_fast_question_sync(
    course_path: &Path,
    state: &mut CourseState,
    strategy: &FastSyncStrategy,
) -> Result<Option<CollectionReport>, SyncError> {
    let FastSyncStrategy::Question { path_prefix } = strategy;

    let Some(qid) = locate_question(course_path, path_prefix) else {
        tracing::debug!("fast sync: no info file under {path_prefix}");
        return Ok(None);
    };
    if qid.starts_with('@') {
        return Ok(None);
    }

    let rel = format!("{QUESTIONS_DIR}/{qid}/{QUESTION_INFO_FILE}");
    let Some(info) = load_info_file::<QuestionJson>(course_path, &rel, true)? else {
        return Ok(None);
    };
    let Some(uuid) = info.uuid.clone() else {
        tracing::debug!("fast sync: {rel} has no usable UUID");
        return Ok(None);
    };

    if state
        .questions
        .iter()
        .any(|q| q.name() != qid && q.data.uuid.as_deref() == Some(uuid.as_str()))
    {
        tracing::debug!("fast sync: UUID of {qid} is used by another question");
        return Ok(None);
    }

    let position = state.questions.iter().position(|q| q.name() == qid);
    let existing = position.map(|idx| &state.questions[idx].data);

    if let Some(existing) = existing {
        if existing.uuid.as_deref() != Some(uuid.as_str()) {
            tracing::debug!("fast sync: UUID of {qid} changed");
            return Ok(None);
        }
    }

    let question = match info.valid_data() {
        Some(json) => {
            if !state.has_topic(&json.topic) || !json.tags.iter().all(|t| state.has_tag(t)) {
                tracing::debug!("fast sync: {qid} references a new topic or tag");
                return Ok(None);
            }
            let was_manual = existing.and_then(|q| q.grading_method.as_deref()) == Some(MANUAL_GRADING);
            let is_manual = json.grading_method.as_deref() == Some(MANUAL_GRADING);
            if existing.is_some() && was_manual != is_manual {
                tracing::debug!("fast sync: grading method of {qid} switched to or from Manual");
                return Ok(None);
            }
            let mut question = Question::from_json(&qid, json);
            question.set_problems(Vec::new(), info.warnings.clone());
            question
        }
        None => {
            let mut question = match existing {
                Some(existing) => existing.clone(),
                None => Question::placeholder(&qid, Some(uuid)),
            };
            question.set_problems(info.errors.clone(), info.warnings.clone());
            question
        }
    };

    let (created, updated) = match position {
        Some(idx) => {
            state.questions[idx].data = question;
            (0, 1)
        }
        None => {
            let number = state
                .questions
                .iter()
                .filter_map(|q| q.number)
                .max()
                .unwrap_or(0)
                + 1;
            state
                .questions
                .push(ExistingEntity::new(Some(number), false, question));
            (1, 0)
        }
    };

    tracing::info!("fast sync: refreshed question {qid}");
    Ok(Some(CollectionReport {
        collection: Collection::Questions,
        created,
        updated,
        deleted: 0,
        error: None,
    }))
}

/// The QID whose `info.json` exists along `path_prefix`, shortest first.
fn locate_question(course_path: &Path, path_prefix: &str) -> Option<String> {
    candidate_qids(path_prefix).into_iter().find(|qid| {
        course_path
            .join(QUESTIONS_DIR)
            .join(qid)
            .join(QUESTION_INFO_FILE)
            .is_file()
    })
}
