use serde::{Deserialize, Serialize};

/// A candidate in the hiring pipeline. `job_id` is a weak reference: the
/// store never cascades job deletions into candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub job_id: Option<u64>,
    pub stage: Stage,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Applied,
    Screen,
    Interview,
    Offer,
    Rejected,
    Hired,
}

impl Stage {
    pub const fn label(self) -> &'static str {
        match self {
            Stage::Applied => "applied",
            Stage::Screen => "screen",
            Stage::Interview => "interview",
            Stage::Offer => "offer",
            Stage::Rejected => "rejected",
            Stage::Hired => "hired",
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::Applied
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub job_id: Option<u64>,
    #[serde(default)]
    pub stage: Stage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    // Two levels so `jobId: null` clears the reference while an absent
    // field leaves it alone.
    #[serde(default, deserialize_with = "deserialize_explicit_job_id")]
    pub job_id: Option<Option<u64>>,
    pub stage: Option<Stage>,
}

fn deserialize_explicit_job_id<'de, D>(deserializer: D) -> Result<Option<Option<u64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<u64>::deserialize(deserializer).map(Some)
}

/// An entry in a candidate's append-only timeline: stage moves recorded by
/// the pipeline and free-form notes added by recruiters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: u64,
    pub candidate_id: u64,
    #[serde(rename = "type")]
    pub kind: TimelineKind,
    pub message: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineKind {
    Stage,
    Note,
}
