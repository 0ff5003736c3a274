use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// A scored assessment attached to a candidate and a job. Both references
/// are weak; deleting either side leaves the assessment in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: u64,
    pub candidate_id: u64,
    pub job_id: u64,
    pub score: u8,
    pub status: AssessmentStatus,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    Pending,
    Completed,
}

impl AssessmentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            AssessmentStatus::Pending => "pending",
            AssessmentStatus::Completed => "completed",
        }
    }
}

impl Default for AssessmentStatus {
    fn default() -> Self {
        AssessmentStatus::Pending
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssessment {
    pub candidate_id: u64,
    pub job_id: u64,
    #[serde(default)]
    pub score: u8,
    #[serde(default)]
    pub status: AssessmentStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentPatch {
    pub score: Option<u8>,
    pub status: Option<AssessmentStatus>,
}

/// The per-job assessment form, keyed one-to-one by job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentBuilder {
    pub job_id: u64,
    pub sections: Vec<Section>,
}

impl AssessmentBuilder {
    pub fn empty(job_id: u64) -> Self {
        Self {
            job_id,
            sections: Vec::new(),
        }
    }

    fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections
            .iter()
            .flat_map(|section| section.questions.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub title: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_if: Option<ShowIf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Single,
    Multi,
    Short,
    Long,
    Number,
    File,
}

impl QuestionKind {
    pub const fn label(self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Multi => "multi",
            QuestionKind::Short => "short",
            QuestionKind::Long => "long",
            QuestionKind::Number => "number",
            QuestionKind::File => "file",
        }
    }

    const fn needs_options(self) -> bool {
        matches!(self, QuestionKind::Single | QuestionKind::Multi)
    }
}

/// Conditional visibility: the question is shown only when the referenced
/// question's answer equals the given value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowIf {
    pub question_id: String,
    pub equals: String,
}

/// One answer per question kind. The tag keeps the wire shape honest: an
/// answer cannot smuggle a payload its question type has no use for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Answer {
    Single { value: String },
    Multi { values: Vec<String> },
    Short { value: String },
    Long { value: String },
    Number { value: f64 },
    File { filename: String },
}

impl Answer {
    const fn kind(&self) -> QuestionKind {
        match self {
            Answer::Single { .. } => QuestionKind::Single,
            Answer::Multi { .. } => QuestionKind::Multi,
            Answer::Short { .. } => QuestionKind::Short,
            Answer::Long { .. } => QuestionKind::Long,
            Answer::Number { .. } => QuestionKind::Number,
            Answer::File { .. } => QuestionKind::File,
        }
    }

    /// The string an answer presents to `show_if` equality checks.
    fn as_equality_text(&self) -> Option<&str> {
        match self {
            Answer::Single { value } | Answer::Short { value } | Answer::Long { value } => {
                Some(value)
            }
            _ => None,
        }
    }
}

/// A submitted response, append-only. Answers are keyed by question id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub id: u64,
    pub job_id: u64,
    pub candidate_id: u64,
    pub answers: BTreeMap<String, Answer>,
    pub created_at: i64,
}

/// Check a builder document before it is stored: question ids must be
/// unique, choice questions need options, numeric bounds must be ordered,
/// and visibility rules may only reference questions that exist.
pub fn validate_builder(builder: &AssessmentBuilder) -> Result<(), String> {
    let mut seen = HashSet::new();
    for question in builder.questions() {
        if question.id.is_empty() {
            return Err("question id must not be empty".to_string());
        }
        if !seen.insert(question.id.as_str()) {
            return Err(format!("duplicate question id {:?}", question.id));
        }
        if question.kind.needs_options() && question.options.is_empty() {
            return Err(format!(
                "question {:?} is a choice question and needs options",
                question.id
            ));
        }
        if let (Some(min), Some(max)) = (question.min, question.max) {
            if min > max {
                return Err(format!(
                    "question {:?} has min {min} above max {max}",
                    question.id
                ));
            }
        }
    }
    for question in builder.questions() {
        if let Some(show_if) = &question.show_if {
            if !seen.contains(show_if.question_id.as_str()) {
                return Err(format!(
                    "question {:?} is conditional on unknown question {:?}",
                    question.id, show_if.question_id
                ));
            }
        }
    }
    Ok(())
}

/// Check submitted answers against the job's builder. Required questions
/// must be answered unless hidden by their visibility rule, answer shapes
/// must match their question's type, and choice/numeric payloads must stay
/// within the question's declared options and bounds.
pub fn validate_answers(
    builder: &AssessmentBuilder,
    answers: &BTreeMap<String, Answer>,
) -> Result<(), String> {
    let questions: BTreeMap<&str, &Question> = builder
        .questions()
        .map(|question| (question.id.as_str(), question))
        .collect();

    for id in answers.keys() {
        if !questions.contains_key(id.as_str()) {
            return Err(format!("answer for unknown question {id:?}"));
        }
    }

    for question in builder.questions() {
        let visible = match &question.show_if {
            Some(show_if) => answers
                .get(&show_if.question_id)
                .and_then(Answer::as_equality_text)
                .is_some_and(|text| text == show_if.equals),
            None => true,
        };
        let answer = match answers.get(&question.id) {
            Some(answer) => answer,
            None => {
                if question.required && visible {
                    return Err(format!("question {:?} is required", question.id));
                }
                continue;
            }
        };
        if answer.kind() != question.kind {
            return Err(format!(
                "question {:?} expects a {} answer, got {}",
                question.id,
                question.kind.label(),
                answer.kind().label()
            ));
        }
        match answer {
            Answer::Single { value } => {
                if !question.options.iter().any(|option| option == value) {
                    return Err(format!(
                        "question {:?} does not offer option {value:?}",
                        question.id
                    ));
                }
            }
            Answer::Multi { values } => {
                for value in values {
                    if !question.options.iter().any(|option| option == value) {
                        return Err(format!(
                            "question {:?} does not offer option {value:?}",
                            question.id
                        ));
                    }
                }
            }
            Answer::Number { value } => {
                if question.min.is_some_and(|min| *value < min)
                    || question.max.is_some_and(|max| *value > max)
                {
                    return Err(format!(
                        "question {:?} answer {value} is out of bounds",
                        question.id
                    ));
                }
            }
            Answer::Short { .. } | Answer::Long { .. } | Answer::File { .. } => {}
        }
    }
    Ok(())
}
