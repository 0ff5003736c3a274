//! The hiring pipeline: jobs, candidates, assessments, and dashboard
//! analytics over the shared document store, exposed as an axum router.

pub mod analytics;
pub mod assessments;
pub mod candidates;
pub mod jobs;
pub mod page;
pub mod sim;

use std::sync::Arc;

use axum::Router;

use crate::session::{auth_router, session_layer, AuthService, SessionStore};
use crate::store::Store;

use analytics::AnalyticsService;
use assessments::AssessmentService;
use candidates::CandidateService;
use jobs::JobService;
use sim::Simulation;

/// All services over one store, plus the session registry. Cloning the
/// router is cheap, so one pipeline can serve both the HTTP listener and
/// in-process clients.
pub struct Pipeline {
    pub jobs: Arc<JobService>,
    pub candidates: Arc<CandidateService>,
    pub assessments: Arc<AssessmentService>,
    pub analytics: Arc<AnalyticsService>,
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionStore>,
}

impl Pipeline {
    pub fn new(store: Arc<Store>, sim: Simulation) -> Self {
        let sessions = Arc::new(SessionStore::new());
        Self {
            jobs: Arc::new(JobService::new(store.clone(), sim.clone())),
            candidates: Arc::new(CandidateService::new(store.clone(), sim.clone())),
            assessments: Arc::new(AssessmentService::new(store.clone(), sim.clone())),
            analytics: Arc::new(AnalyticsService::new(store.clone(), sim.clone())),
            auth: Arc::new(AuthService::new(store, sessions.clone(), sim)),
            sessions,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .merge(jobs::jobs_router(self.jobs.clone()))
            .merge(candidates::candidates_router(self.candidates.clone()))
            .merge(assessments::assessments_router(self.assessments.clone()))
            .merge(analytics::analytics_router(self.analytics.clone()))
            .merge(auth_router(self.auth.clone()))
            .layer(axum::middleware::from_fn_with_state(
                self.sessions.clone(),
                session_layer,
            ))
    }
}
