//! Stored records for every synced collection, and the platform defaults.
//!
//! Each record implements [`SyncEntity`] so the reconciler can key it by
//! name and synthesize it when it is only referenced.

use serde::{Deserialize, Serialize};

use coursesync_core::schema::{
    AssessmentJson, AssessmentModuleJson, AssessmentSetJson, CourseInstanceJson, CourseJson,
    QuestionJson, TagJson, TopicJson,
};
use coursesync_reconcile::{SyncEntity, DEFAULT_ENTITY_NAME};

/// Color given to anything synthesized without a declaration.
pub const IMPLICIT_COLOR: &str = "gray1";

// ---------------------------------------------------------------------------
// Course
// ---------------------------------------------------------------------------

/// The single course row; not reconciled, replaced whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub uuid: Option<String>,
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_warnings: Vec<String>,
}

impl From<&CourseJson> for CourseRecord {
    fn from(json: &CourseJson) -> Self {
        Self {
            uuid: Some(json.uuid.clone()),
            name: json.name.clone(),
            title: json.title.clone(),
            sync_errors: Vec::new(),
            sync_warnings: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Topics and tags
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SyncEntity for Topic {
    fn name(&self) -> &str {
        &self.name
    }

    fn make_implicit(name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: IMPLICIT_COLOR.to_string(),
            description: Some(name.to_string()),
        }
    }
}

impl From<&TopicJson> for Topic {
    fn from(json: &TopicJson) -> Self {
        Self {
            name: json.name.clone(),
            color: json.color.clone(),
            description: json.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SyncEntity for Tag {
    fn name(&self) -> &str {
        &self.name
    }

    fn make_implicit(name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: IMPLICIT_COLOR.to_string(),
            description: Some(name.to_string()),
        }
    }
}

impl From<&TagJson> for Tag {
    fn from(json: &TagJson) -> Self {
        Self {
            name: json.name.clone(),
            color: json.color.clone(),
            description: json.description.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Assessment sets and modules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentSet {
    pub abbreviation: String,
    pub name: String,
    pub heading: String,
    pub color: String,
}

impl SyncEntity for AssessmentSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn make_implicit(name: &str) -> Self {
        Self {
            abbreviation: name.to_string(),
            name: name.to_string(),
            heading: format!(
                "{name} (Auto-generated from use in an assessment; add this assessment set to infoCourse.json to customize)"
            ),
            color: IMPLICIT_COLOR.to_string(),
        }
    }
}

impl From<&AssessmentSetJson> for AssessmentSet {
    fn from(json: &AssessmentSetJson) -> Self {
        Self {
            abbreviation: json.abbreviation.clone(),
            name: json.name.clone(),
            heading: json.heading.clone(),
            color: json.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentModule {
    pub name: String,
    pub heading: String,
}

impl SyncEntity for AssessmentModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn make_implicit(name: &str) -> Self {
        Self {
            name: name.to_string(),
            heading: name.to_string(),
        }
    }

    fn make_default() -> Option<Self> {
        Some(Self {
            name: DEFAULT_ENTITY_NAME.to_string(),
            heading: "Default module".to_string(),
        })
    }
}

impl From<&AssessmentModuleJson> for AssessmentModule {
    fn from(json: &AssessmentModuleJson) -> Self {
        Self {
            name: json.name.clone(),
            heading: json.heading.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub qid: String,
    pub uuid: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_method: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_warnings: Vec<String>,
}

impl SyncEntity for Question {
    fn name(&self) -> &str {
        &self.qid
    }

    fn make_implicit(name: &str) -> Self {
        Self::placeholder(name, None)
    }
}

impl Question {
    pub fn from_json(qid: &str, json: &QuestionJson) -> Self {
        Self {
            qid: qid.to_string(),
            uuid: Some(json.uuid.clone()),
            title: json.title.clone(),
            topic: json.topic.clone(),
            tags: json.tags.clone(),
            question_type: json.question_type.clone(),
            grading_method: json.grading_method.clone(),
            sync_errors: Vec::new(),
            sync_warnings: Vec::new(),
        }
    }

    /// A row holding only identity, used when the info file is unusable.
    pub fn placeholder(qid: &str, uuid: Option<String>) -> Self {
        Self {
            qid: qid.to_string(),
            uuid,
            title: String::new(),
            topic: String::new(),
            tags: Vec::new(),
            question_type: None,
            grading_method: None,
            sync_errors: Vec::new(),
            sync_warnings: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Course instances and assessments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInstance {
    /// Directory under `courseInstances/`; may contain `/`.
    pub short_name: String,
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_warnings: Vec<String>,
}

impl SyncEntity for CourseInstance {
    fn name(&self) -> &str {
        &self.short_name
    }

    fn make_implicit(name: &str) -> Self {
        Self::placeholder(name, None)
    }
}

impl CourseInstance {
    pub fn from_json(short_name: &str, json: &CourseInstanceJson) -> Self {
        Self {
            short_name: short_name.to_string(),
            uuid: Some(json.uuid.clone()),
            long_name: json.long_name.clone(),
            sync_errors: Vec::new(),
            sync_warnings: Vec::new(),
        }
    }

    pub fn placeholder(short_name: &str, uuid: Option<String>) -> Self {
        Self {
            short_name: short_name.to_string(),
            uuid,
            long_name: None,
            sync_errors: Vec::new(),
            sync_warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// Directory under the instance's `assessments/`; may contain `/`.
    pub tid: String,
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assessment_type: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,
    /// Display number from `infoAssessment.json` (e.g. `"3"`), distinct from the row number.
    #[serde(default)]
    pub assessment_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sync_warnings: Vec<String>,
}

impl SyncEntity for Assessment {
    fn name(&self) -> &str {
        &self.tid
    }

    fn make_implicit(name: &str) -> Self {
        Self::placeholder(name, None)
    }
}

impl Assessment {
    pub fn from_json(tid: &str, json: &AssessmentJson) -> Self {
        Self {
            tid: tid.to_string(),
            uuid: Some(json.uuid.clone()),
            assessment_type: Some(json.assessment_type.clone()),
            title: json.title.clone(),
            set: Some(json.set.clone()),
            assessment_number: json.number.clone(),
            module: json.module.clone(),
            sync_errors: Vec::new(),
            sync_warnings: Vec::new(),
        }
    }

    pub fn placeholder(tid: &str, uuid: Option<String>) -> Self {
        Self {
            tid: tid.to_string(),
            uuid,
            assessment_type: None,
            title: String::new(),
            set: None,
            assessment_number: String::new(),
            module: None,
            sync_errors: Vec::new(),
            sync_warnings: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sync problems
// ---------------------------------------------------------------------------

/// Records that carry the errors and warnings of their info file.
pub trait SyncProblems {
    fn set_problems(&mut self, errors: Vec<String>, warnings: Vec<String>);
}

impl SyncProblems for CourseRecord {
    fn set_problems(&mut self, errors: Vec<String>, warnings: Vec<String>) {
        self.sync_errors = errors;
        self.sync_warnings = warnings;
    }
}

impl SyncProblems for Question {
    fn set_problems(&mut self, errors: Vec<String>, warnings: Vec<String>) {
        self.sync_errors = errors;
        self.sync_warnings = warnings;
    }
}

impl SyncProblems for CourseInstance {
    fn set_problems(&mut self, errors: Vec<String>, warnings: Vec<String>) {
        self.sync_errors = errors;
        self.sync_warnings = warnings;
    }
}

impl SyncProblems for Assessment {
    fn set_problems(&mut self, errors: Vec<String>, warnings: Vec<String>) {
        self.sync_errors = errors;
        self.sync_warnings = warnings;
    }
}

// ---------------------------------------------------------------------------
// Platform defaults
// ---------------------------------------------------------------------------

const DEFAULT_ASSESSMENT_SETS: &[(&str, &str, &str, &str)] = &[
    ("HW", "Homework", "Homeworks", "green1"),
    ("Q", "Quiz", "Quizzes", "red1"),
    ("PQ", "Practice Quiz", "Practice Quizzes", "pink1"),
    ("E", "Exam", "Exams", "brown1"),
    ("PE", "Practice Exam", "Practice Exams", "yellow1"),
    ("P", "Prep", "Question Preparation", "gray1"),
    ("MP", "Machine Problem", "Machine Problems", "turquoise1"),
    ("WS", "Worksheet", "Worksheets", "purple1"),
    ("U", "Unknown", "Unknown", "red3"),
];

const DEFAULT_TAGS: &[(&str, &str, &str)] = &[
    ("numeric", "brown1", "The answer format is one or more numerical values."),
    ("symbolic", "blue1", "The answer format is a symbolic expression."),
    (
        "drawing",
        "yellow1",
        "The answer format requires drawing on a canvas to input a graphical representation of an answer.",
    ),
    (
        "MC",
        "green1",
        "The answer format is choosing from a small finite set of answers (multiple choice, possibly with multiple selections allowed, up to 10 possible answers).",
    ),
    ("code", "turquoise1", "The answer format is a piece of code."),
    (
        "multianswer",
        "orange2",
        "The question requires multiple answers, either as steps in a sequence or as separate questions.",
    ),
    (
        "graph",
        "purple1",
        "The question tests reading information from a graph or drawing a graph.",
    ),
    ("concept", "pink1", "The question tests conceptual understanding of a topic."),
    (
        "calculate",
        "green2",
        "The questions tests performing a numerical calculation, with either a calculator or equivalent software.",
    ),
    (
        "compute",
        "purple1",
        "The question tests the writing and running of a piece of code to compute the answer. The answer itself is not the code, but could be a numeric answer output by the code, for example (use `code` when the answer is the code).",
    ),
    (
        "software",
        "orange1",
        "The question tests the use of a specific piece of software (e.g., Matlab).",
    ),
    (
        "estimation",
        "red2",
        "Answering the question correctly will require some amount of estimation, so an exact answer is not possible.",
    ),
    (
        "secret",
        "red3",
        "Only use this question on exams or quizzes that won't be released to students, so the question can be kept secret.",
    ),
    (
        "nontest",
        "green3",
        "This question is not appropriate for use in a restricted testing environment, so only use it on homeworks or similar.",
    ),
];

const SEMESTER_TAGS: &[&str] = &[
    "Sp15", "Su15", "Fa15", "Sp16", "Su16", "Fa16", "Sp17", "Su17", "Fa17", "Sp18", "Su18",
    "Fa18", "Sp19", "Su19", "Fa19", "Sp20", "Su20", "Fa20", "Sp21", "Su21", "Fa21",
];

/// Assessment sets every course gets when an assessment uses them.
pub fn default_assessment_sets() -> Vec<AssessmentSet> {
    DEFAULT_ASSESSMENT_SETS
        .iter()
        .map(|(abbreviation, name, heading, color)| AssessmentSet {
            abbreviation: abbreviation.to_string(),
            name: name.to_string(),
            heading: heading.to_string(),
            color: color.to_string(),
        })
        .collect()
}

/// Tags every course gets when a question uses them.
pub fn default_tags() -> Vec<Tag> {
    let described = DEFAULT_TAGS.iter().map(|(name, color, description)| Tag {
        name: name.to_string(),
        color: color.to_string(),
        description: Some(description.to_string()),
    });
    let semesters = SEMESTER_TAGS.iter().map(|name| Tag {
        name: name.to_string(),
        color: IMPLICIT_COLOR.to_string(),
        description: None,
    });
    described.chain(semesters).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursesync_reconcile::ExistingEntity;

    #[test]
    fn implicit_assessment_set_explains_itself() {
        let set = AssessmentSet::make_implicit("Lab");
        assert_eq!(set.abbreviation, "Lab");
        assert_eq!(set.color, "gray1");
        assert!(set.heading.starts_with("Lab (Auto-generated from use in an assessment"));
    }

    #[test]
    fn only_modules_have_a_default() {
        assert_eq!(
            AssessmentModule::make_default().map(|m| m.heading),
            Some("Default module".to_string())
        );
        assert!(Topic::make_default().is_none());
        assert!(AssessmentSet::make_default().is_none());
    }

    #[test]
    fn defaults_are_complete() {
        assert_eq!(default_assessment_sets().len(), 9);
        let tags = default_tags();
        assert_eq!(tags.len(), 14 + 21);
        assert!(tags.iter().any(|t| t.name == "Fa21" && t.description.is_none()));
    }

    #[test]
    fn stored_question_row_is_flat() {
        let row = ExistingEntity::new(Some(2), false, Question::placeholder("intro/add", None));
        let json = serde_json::to_value(&row).expect("serialize");
        assert_eq!(json["qid"], "intro/add");
        assert_eq!(json["number"], 2);
        assert!(json.get("sync_errors").is_none());
    }

    #[test]
    fn stored_assessment_row_round_trips() {
        let mut assessment = Assessment::placeholder("hw1", None);
        assessment.assessment_number = "3".to_string();
        let row = ExistingEntity::new(Some(7), false, assessment);

        let json = serde_json::to_string(&row).expect("serialize");
        let back: ExistingEntity<Assessment> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, row);
    }
}
