//! Explicit session lifecycle for the auth surface.
//!
//! Every request carries a [`Session`] in its extensions, attached by
//! [`session_layer`]: anonymous when no token is presented, authenticated
//! while the token is live, expired once its deadline passes. Handlers
//! receive the session as a value instead of consulting ambient state.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::pipeline::sim::Simulation;
use crate::store::{collections, Store, StoreError};

const TOKEN_LEN: usize = 32;
const DEFAULT_SESSION_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Recruiter,
    Admin,
}

impl Role {
    const fn rank(self) -> u8 {
        match self {
            Role::Viewer => 0,
            Role::Recruiter => 1,
            Role::Admin => 2,
        }
    }

    pub const fn grants(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub expires_at: i64,
}

/// Where a request stands in the session lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Anonymous,
    Authenticated(AuthSession),
    Expired,
}

impl Session {
    pub fn has_role(&self, required: Role) -> bool {
        match self {
            Session::Authenticated(auth) => auth.role.grants(required),
            Session::Anonymous | Session::Expired => false,
        }
    }

    pub fn authenticated(&self) -> Option<&AuthSession> {
        match self {
            Session::Authenticated(auth) => Some(auth),
            Session::Anonymous | Session::Expired => None,
        }
    }
}

/// Live tokens and their sessions. Expiry is checked on resolve, and an
/// expired token is dropped at that point.
pub struct SessionStore {
    ttl_ms: i64,
    sessions: Mutex<HashMap<String, AuthSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL_MS)
    }

    pub fn with_ttl(ttl_ms: i64) -> Self {
        Self {
            ttl_ms,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub async fn create(&self, user: &User) -> (String, AuthSession) {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        let session = AuthSession {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            expires_at: Utc::now().timestamp_millis() + self.ttl_ms,
        };
        self.sessions
            .lock()
            .await
            .insert(token.clone(), session.clone());
        (token, session)
    }

    pub async fn resolve(&self, token: &str) -> Session {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(token) {
            Some(session) if session.expires_at > Utc::now().timestamp_millis() => {
                Session::Authenticated(session.clone())
            }
            Some(_) => {
                sessions.remove(token);
                Session::Expired
            }
            None => Session::Anonymous,
        }
    }

    pub async fn revoke(&self, token: &str) {
        self.sessions.lock().await.remove(token);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Not authenticated")]
    NotAuthenticated,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored user is not decodable: {0}")]
    Decode(#[from] serde_json::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthError::InvalidCredentials | AuthError::NotAuthenticated => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::Store(_) | AuthError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

pub struct AuthService {
    store: Arc<Store>,
    sessions: Arc<SessionStore>,
    sim: Simulation,
}

impl AuthService {
    pub fn new(store: Arc<Store>, sessions: Arc<SessionStore>, sim: Simulation) -> Self {
        Self {
            store,
            sessions,
            sim,
        }
    }

    /// Username lookup with a mock shared password. A real deployment would
    /// verify a hash here.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(String, User), AuthError> {
        self.sim.delay().await;
        let docs = self
            .store
            .where_equals(collections::USERS, "username", &json!(username))
            .await?;
        let user: User = match docs.into_iter().next() {
            Some(doc) => serde_json::from_value(doc)?,
            None => return Err(AuthError::InvalidCredentials),
        };
        if password != "password" {
            return Err(AuthError::InvalidCredentials);
        }
        let (token, _) = self.sessions.create(&user).await;
        Ok((token, user))
    }

    pub async fn logout(&self, token: &str) {
        self.sessions.revoke(token).await;
    }

    /// The user behind an authenticated session.
    pub async fn current_user(&self, session: &Session) -> Result<User, AuthError> {
        self.sim.delay().await;
        let auth = session.authenticated().ok_or(AuthError::NotAuthenticated)?;
        match self.store.get(collections::USERS, auth.user_id).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Err(AuthError::NotAuthenticated),
        }
    }
}

/// Attach a [`Session`] to every request, resolved from the bearer token.
pub async fn session_layer(
    State(sessions): State<Arc<SessionStore>>,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match bearer_token(&request) {
        Some(token) => sessions.resolve(&token).await,
        None => Session::Anonymous,
    };
    request.extensions_mut().insert(session);
    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

pub fn auth_router(service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .with_state(service)
}

async fn login(
    State(service): State<Arc<AuthService>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<serde_json::Value>, AuthError> {
    let (token, user) = service.login(&body.username, &body.password).await?;
    Ok(Json(json!({ "token": token, "user": user })))
}

async fn logout(
    State(service): State<Arc<AuthService>>,
    request: Request,
) -> Json<serde_json::Value> {
    if let Some(token) = bearer_token(&request) {
        service.logout(&token).await;
    }
    Json(json!({ "ok": true }))
}

async fn me(
    State(service): State<Arc<AuthService>>,
    Extension(session): Extension<Session>,
) -> Result<Json<User>, AuthError> {
    Ok(Json(service.current_user(&session).await?))
}
