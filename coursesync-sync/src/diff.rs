//! Dry-run unified diff support for `coursesync diff`.

use std::path::Path;

use similar::TextDiff;

use crate::course_sync::{sync_course, SyncMode};
use crate::{store, SyncError};

/// A single collection diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionDiff {
    pub collection: String,
    pub unified_diff: String,
}

/// Diff result for a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffCourseResult {
    pub course_name: String,
    pub diffs: Vec<CollectionDiff>,
}

/// Run a full dry-run sync and compare the resulting collections with the
/// stored ones.
///
/// Nothing is written.
pub fn diff_course(course_name: &str, home: &Path) -> Result<DiffCourseResult, SyncError> {
    let stored = store::load_at(home, course_name)?.entities_json()?;
    let synced = sync_course(home, course_name, SyncMode::Full, true)?
        .state
        .entities_json()?;

    let empty = serde_json::Map::new();
    let before = stored.as_object().unwrap_or(&empty);
    let after = synced.as_object().unwrap_or(&empty);

    let mut diffs = Vec::new();
    for (collection, new_value) in after {
        let old_value = before.get(collection).unwrap_or(&serde_json::Value::Null);
        let existing = render(old_value)?;
        let rendered = render(new_value)?;
        if existing == rendered {
            continue;
        }

        let old_header = format!("a/{collection}");
        let new_header = format!("b/{collection}");
        let unified = TextDiff::from_lines(&existing, &rendered)
            .unified_diff()
            .header(&old_header, &new_header)
            .context_radius(3)
            .to_string();

        diffs.push(CollectionDiff {
            collection: collection.clone(),
            unified_diff: unified,
        });
    }

    Ok(DiffCourseResult {
        course_name: course_name.to_string(),
        diffs,
    })
}

fn render(value: &serde_json::Value) -> Result<String, SyncError> {
    if value.is_null() {
        return Ok(String::new());
    }
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}
