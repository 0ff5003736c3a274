//! Versioned schema for the document store.
//!
//! Each migration carries a monotonically increasing version and an upgrade
//! step that may create collections, widen index coverage, or transform
//! existing documents. Opening a store at a version it has already reached
//! is a no-op, so repeated opens are idempotent; upgrades never reassign or
//! drop existing keys.

use serde_json::Value;

use super::{StoreData, StoreError};

pub mod collections {
    pub const JOBS: &str = "jobs";
    pub const CANDIDATES: &str = "candidates";
    pub const ASSESSMENTS: &str = "assessments";
    pub const CANDIDATE_TIMELINES: &str = "candidateTimelines";
    pub const ASSESSMENT_BUILDERS: &str = "assessmentBuilders";
    pub const ASSESSMENT_RESPONSES: &str = "assessmentResponses";
    pub const USERS: &str = "users";
}

pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub upgrade: fn(&mut StoreData) -> Result<(), StoreError>,
}

/// The full schema history. `Store::open` replays everything above the
/// stored version, in order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "baseline",
        upgrade: baseline,
    },
    Migration {
        version: 2,
        name: "job-archival",
        upgrade: job_archival,
    },
    Migration {
        version: 3,
        name: "assessment-authoring",
        upgrade: assessment_authoring,
    },
    Migration {
        version: 4,
        name: "user-accounts",
        upgrade: user_accounts,
    },
];

fn baseline(data: &mut StoreData) -> Result<(), StoreError> {
    data.ensure_collection(
        collections::JOBS,
        &["titleLowercase", "status", "createdAt"],
    );
    data.ensure_collection(
        collections::CANDIDATES,
        &["jobId", "email", "stage", "createdAt"],
    );
    data.ensure_collection(
        collections::ASSESSMENTS,
        &["candidateId", "jobId", "status", "createdAt"],
    );
    Ok(())
}

/// Version 2 introduces slug/archived/order on jobs and backfills them for
/// rows created under version 1: the slug derives from the title, nothing is
/// archived, and the order mirrors the key order at upgrade time.
fn job_archival(data: &mut StoreData) -> Result<(), StoreError> {
    data.ensure_collection(
        collections::JOBS,
        &[
            "titleLowercase",
            "status",
            "createdAt",
            "slug",
            "archived",
            "order",
        ],
    );

    let jobs = data.collection_mut(collections::JOBS)?;
    let mut position: i64 = 0;
    jobs.update_all(|_, doc| {
        if !doc.contains_key("slug") {
            let title = doc.get("title").and_then(Value::as_str).unwrap_or_default();
            doc.insert(
                "slug".to_string(),
                Value::from(crate::pipeline::jobs::slugify(title)),
            );
        }
        doc.entry("archived".to_string())
            .or_insert_with(|| Value::from(false));
        doc.entry("order".to_string())
            .or_insert_with(|| Value::from(position));
        position += 1;
    });
    Ok(())
}

fn assessment_authoring(data: &mut StoreData) -> Result<(), StoreError> {
    data.ensure_collection(
        collections::CANDIDATE_TIMELINES,
        &["candidateId", "createdAt"],
    );
    data.ensure_collection(collections::ASSESSMENT_BUILDERS, &["jobId"]);
    data.ensure_collection(
        collections::ASSESSMENT_RESPONSES,
        &["jobId", "candidateId", "createdAt"],
    );
    Ok(())
}

fn user_accounts(data: &mut StoreData) -> Result<(), StoreError> {
    data.ensure_collection(collections::USERS, &["username", "email", "role"]);
    Ok(())
}
