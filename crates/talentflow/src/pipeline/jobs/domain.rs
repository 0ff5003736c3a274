use serde::{Deserialize, Serialize};

/// A job posting. `title_lowercase` and `slug` are derived from the title;
/// the slug is unique among non-deleted jobs. `order` is the manual ranking
/// used by drag-and-drop views: dense per view after a full renumbering, but
/// not required to be globally contiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: u64,
    pub title: String,
    pub department: String,
    pub location: String,
    pub status: JobStatus,
    pub created_at: i64,
    pub title_lowercase: String,
    pub slug: String,
    #[serde(default)]
    pub archived: bool,
    pub order: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Open,
    Paused,
    Closed,
}

impl JobStatus {
    pub const fn label(self) -> &'static str {
        match self {
            JobStatus::Open => "open",
            JobStatus::Paused => "paused",
            JobStatus::Closed => "closed",
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Open
    }
}

/// Fields accepted when creating a job; everything but the title defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub description: String,
}

fn default_location() -> String {
    "Remote".to_string()
}

/// Partial update. Derived fields (`title_lowercase`, `slug`) follow the
/// title; `archived` and `order` have dedicated commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Derive the URL-safe slug: lowercase, every whitespace run becomes a
/// hyphen, everything outside `[a-z0-9-]` is stripped.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut in_whitespace = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            in_whitespace = true;
            continue;
        }
        if in_whitespace {
            slug.push('-');
            in_whitespace = false;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
            slug.push(ch);
        }
    }
    if in_whitespace {
        slug.push('-');
    }
    slug
}
