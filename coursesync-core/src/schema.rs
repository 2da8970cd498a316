//! Parsed course JSON documents.
//!
//! These mirror the info files found in a course repository:
//!
//! ```text
//! infoCourse.json
//! questions/<qid>/info.json
//! courseInstances/<name>/infoCourseInstance.json
//! courseInstances/<name>/assessments/<tid>/infoAssessment.json
//! ```
//!
//! Only the attributes the sync engine reconciles are modelled; unknown keys
//! are ignored by serde.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// infoCourse.json
// ---------------------------------------------------------------------------

/// `infoCourse.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseJson {
    pub uuid: String,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub topics: Vec<TopicJson>,
    #[serde(default)]
    pub tags: Vec<TagJson>,
    #[serde(default)]
    pub assessment_sets: Vec<AssessmentSetJson>,
    #[serde(default)]
    pub assessment_modules: Vec<AssessmentModuleJson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicJson {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagJson {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSetJson {
    pub abbreviation: String,
    pub name: String,
    pub heading: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentModuleJson {
    pub name: String,
    pub heading: String,
}

// ---------------------------------------------------------------------------
// questions/**/info.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionJson {
    pub uuid: String,
    pub title: String,
    pub topic: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_method: Option<String>,
}

// ---------------------------------------------------------------------------
// courseInstances/**/infoCourseInstance.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInstanceJson {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
}

// ---------------------------------------------------------------------------
// courseInstances/<name>/assessments/**/infoAssessment.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentJson {
    pub uuid: String,
    #[serde(rename = "type")]
    pub assessment_type: String,
    pub title: String,
    pub set: String,
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}
