//! Deterministic startup data: the same profile always produces the same
//! rows, so local runs and demos are reproducible.

use chrono::Utc;
use talentflow::error::AppError;
use talentflow::pipeline::assessments::{
    Assessment, AssessmentBuilder, AssessmentStatus, Question, QuestionKind, Section, ShowIf,
};
use talentflow::pipeline::candidates::{Candidate, Stage, TimelineEntry, TimelineKind};
use talentflow::pipeline::jobs::{slugify, Job, JobStatus};
use talentflow::session::{Role, User};
use talentflow::store::{collections, Store};

const LEVELS: &[&str] = &["Junior", "Mid-level", "Senior", "Staff", "Principal"];
const ROLES: &[&str] = &[
    "Backend Engineer",
    "Frontend Engineer",
    "Product Designer",
    "Data Analyst",
    "QA Engineer",
    "Platform Engineer",
    "Technical Recruiter",
    "Engineering Manager",
];
const DEPARTMENTS: &[&str] = &["Engineering", "Design", "Data", "People"];
const LOCATIONS: &[&str] = &["Remote", "Berlin", "Lisbon", "New York"];
const TAGS: &[&str] = &["backend", "frontend", "design", "data", "infra", "senior"];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Radia", "Vint", "Margaret", "Dennis",
];
const LAST_NAMES: &[&str] = &[
    "Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Knuth", "Perlman", "Cerf", "Hamilton",
    "Ritchie",
];

const STAGES: &[Stage] = &[
    Stage::Applied,
    Stage::Screen,
    Stage::Interview,
    Stage::Offer,
    Stage::Rejected,
    Stage::Hired,
];

#[derive(Debug, Clone, Copy)]
pub(crate) struct SeedProfile {
    pub(crate) jobs: usize,
    pub(crate) candidates: usize,
}

#[derive(Debug, Default)]
pub(crate) struct SeedSummary {
    pub(crate) jobs: usize,
    pub(crate) candidates: usize,
    pub(crate) assessments: usize,
    pub(crate) users: usize,
}

fn job_title(i: usize) -> String {
    let level = LEVELS[i % LEVELS.len()];
    let role = ROLES[(i / LEVELS.len()) % ROLES.len()];
    if i < LEVELS.len() * ROLES.len() {
        format!("{level} {role}")
    } else {
        format!("{level} {role} {i}")
    }
}

pub(crate) async fn seed(store: &Store, profile: SeedProfile) -> Result<SeedSummary, AppError> {
    let mut summary = SeedSummary::default();
    if store.count(collections::JOBS).await? > 0 {
        return Ok(summary);
    }

    let now = Utc::now().timestamp_millis();
    let mut job_ids = Vec::with_capacity(profile.jobs);

    for i in 0..profile.jobs {
        let title = job_title(i);
        let job = Job {
            id: 0,
            title_lowercase: title.to_lowercase(),
            slug: slugify(&title),
            title,
            department: DEPARTMENTS[i % DEPARTMENTS.len()].to_string(),
            location: LOCATIONS[i % LOCATIONS.len()].to_string(),
            status: match i % 5 {
                2 => JobStatus::Paused,
                4 => JobStatus::Closed,
                _ => JobStatus::Open,
            },
            created_at: now - (i as i64) * 3_600_000,
            archived: i % 7 == 3,
            order: i as i64,
            tags: vec![
                TAGS[i % TAGS.len()].to_string(),
                TAGS[(i + 2) % TAGS.len()].to_string(),
            ],
            description: String::new(),
        };
        let id = store
            .insert(collections::JOBS, serde_json::to_value(&job)?)
            .await?;
        job_ids.push(id);
        summary.jobs += 1;
    }

    for i in 0..profile.candidates {
        let first = FIRST_NAMES[i % FIRST_NAMES.len()];
        let last = LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()];
        let stage = STAGES[i % STAGES.len()];
        let candidate = Candidate {
            id: 0,
            name: format!("{first} {last}"),
            email: format!("{first}.{last}.{i}@example.com").to_lowercase(),
            job_id: if job_ids.is_empty() || i % 5 == 0 {
                None
            } else {
                Some(job_ids[i % job_ids.len()])
            },
            stage,
            created_at: now - (i as i64) * 420_000,
        };
        let candidate_id = store
            .insert(collections::CANDIDATES, serde_json::to_value(&candidate)?)
            .await?;
        summary.candidates += 1;

        let entry = TimelineEntry {
            id: 0,
            candidate_id,
            kind: TimelineKind::Stage,
            message: format!("moved to {}", stage.label()),
            created_at: candidate.created_at,
        };
        store
            .insert(
                collections::CANDIDATE_TIMELINES,
                serde_json::to_value(&entry)?,
            )
            .await?;

        // Roughly every third job-linked candidate has been assessed.
        if let Some(job_id) = candidate.job_id {
            if i % 3 == 0 {
                let completed = i % 2 == 0;
                let assessment = Assessment {
                    id: 0,
                    candidate_id,
                    job_id,
                    score: if completed { ((i * 13) % 101) as u8 } else { 0 },
                    status: if completed {
                        AssessmentStatus::Completed
                    } else {
                        AssessmentStatus::Pending
                    },
                    created_at: candidate.created_at + 3_600_000,
                };
                store
                    .insert(
                        collections::ASSESSMENTS,
                        serde_json::to_value(&assessment)?,
                    )
                    .await?;
                summary.assessments += 1;
            }
        }
    }

    for &job_id in job_ids.iter().take(3) {
        let builder = starter_builder(job_id);
        store
            .put(
                collections::ASSESSMENT_BUILDERS,
                job_id,
                serde_json::to_value(&builder)?,
            )
            .await?;
    }

    for (username, name, role) in [
        ("admin", "Admin User", Role::Admin),
        ("recruiter", "Recruiter User", Role::Recruiter),
        ("viewer", "Viewer User", Role::Viewer),
    ] {
        let user = User {
            id: 0,
            username: username.to_string(),
            email: format!("{username}@talentflow.com"),
            name: name.to_string(),
            role,
            created_at: now,
        };
        store
            .insert(collections::USERS, serde_json::to_value(&user)?)
            .await?;
        summary.users += 1;
    }

    Ok(summary)
}

fn starter_builder(job_id: u64) -> AssessmentBuilder {
    AssessmentBuilder {
        job_id,
        sections: vec![Section {
            title: "Screening".to_string(),
            questions: vec![
                Question {
                    id: "q-experience".to_string(),
                    kind: QuestionKind::Number,
                    label: "Years of relevant experience".to_string(),
                    required: true,
                    options: Vec::new(),
                    min: Some(0.0),
                    max: Some(50.0),
                    show_if: None,
                },
                Question {
                    id: "q-remote".to_string(),
                    kind: QuestionKind::Single,
                    label: "Are you open to remote work?".to_string(),
                    required: true,
                    options: vec!["yes".to_string(), "no".to_string()],
                    min: None,
                    max: None,
                    show_if: None,
                },
                Question {
                    id: "q-setup".to_string(),
                    kind: QuestionKind::Long,
                    label: "Describe your remote work setup".to_string(),
                    required: false,
                    options: Vec::new(),
                    min: None,
                    max: None,
                    show_if: Some(ShowIf {
                        question_id: "q-remote".to_string(),
                        equals: "yes".to_string(),
                    }),
                },
            ],
        }],
    }
}
