use std::time::Duration;

use axum::body::Body;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;

const RETRY_DELAY: Duration = Duration::from_millis(150);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The backend answered with a non-success status and a message.
    #[error("{message}")]
    Request { status: StatusCode, message: String },
    /// The response body looked like an HTML document even after a retry,
    /// which usually means the request never reached the emulated backend.
    #[error("request to {path} returned HTML instead of JSON; the backend is not intercepting this route")]
    HtmlBody { path: String },
    #[error("malformed response body: {0}")]
    Malformed(String),
    #[error("failed to build request: {0}")]
    Http(#[from] axum::http::Error),
}

/// In-process HTTP client over the pipeline router. Each call drives a
/// clone of the router to completion, so requests interleave exactly as
/// they would against a listener.
#[derive(Clone)]
pub struct ApiClient {
    router: Router,
    retry_delay: Duration,
    bearer: Option<String>,
}

impl ApiClient {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            retry_delay: RETRY_DELAY,
            bearer: None,
        }
    }

    /// Shrink the retry pause, for tests that exercise the HTML heuristic.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Attach a session token to every request.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, TransportError> {
        self.request(Method::POST, path, Some(encode(body)?)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, TransportError> {
        self.request(Method::PUT, path, Some(encode(body)?)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, TransportError> {
        self.request(Method::PATCH, path, Some(encode(body)?)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        self.request(Method::DELETE, path, None).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, TransportError> {
        let (mut status, mut text) = self.dispatch(&method, path, body.clone()).await?;

        // A suspiciously HTML-shaped body gets one transparent retry on the
        // theory that the interception layer was not yet attached.
        if looks_like_html(&text) {
            tokio::time::sleep(self.retry_delay).await;
            (status, text) = self.dispatch(&method, path, body).await?;
        }
        if looks_like_html(&text) {
            return Err(TransportError::HtmlBody {
                path: path.to_string(),
            });
        }

        if !status.is_success() {
            return Err(TransportError::Request {
                status,
                message: failure_message(status, &text),
            });
        }

        serde_json::from_str(&text).map_err(|err| TransportError::Malformed(err.to_string()))
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, String), TransportError> {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(path)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/plain, */*");
        if let Some(token) = &self.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(match body {
            Some(bytes) => Body::from(bytes),
            None => Body::empty(),
        })?;

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        };
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|err| TransportError::Malformed(err.to_string()))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        Ok((status, text))
    }
}

fn encode(body: &impl Serialize) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(body).map_err(|err| TransportError::Malformed(err.to_string()))
}

fn looks_like_html(text: &str) -> bool {
    text.trim_start().starts_with("<!") || text.to_lowercase().contains("<!doctype")
}

/// `message`, then `error`, then a generic status line.
fn failure_message(status: StatusCode, text: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str(text) {
        for key in ["message", "error"] {
            if let Some(Value::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }
    if text.is_empty() {
        format!("Request failed: {}", status.as_u16())
    } else {
        text.to_string()
    }
}
