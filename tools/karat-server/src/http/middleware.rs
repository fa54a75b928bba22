//! Request tracing, session and admin middleware.

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, Request, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use karat_cache::SessionId;
use rand::Rng;
use serde::Deserialize;
use tracing::Instrument;

use super::error::ApiError;
use super::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Deserialize)]
struct SessionParams {
    session_id: Option<String>,
}

/// Run the request inside an `http.request` span and echo the request id.
pub async fn request_tracing(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request.uri().path().to_string();
    let request_id = header_str(request.headers(), REQUEST_ID_HEADER)
        .filter(|id| id.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let span = tracing::info_span!(
        "http.request",
        request_id = %request_id,
        method = %method,
        route = %route,
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Attach the caller's [`SessionId`] to the request, minting one if absent.
pub async fn session(mut request: Request<Body>, next: Next) -> Response {
    let session = session_from(request.headers(), request.uri()).unwrap_or_else(|| {
        let id = SessionId::generate();
        tracing::debug!(session = %id, "new session");
        id
    });
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(session.as_str()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// Reject admin requests without the configured bearer token.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected) = state.admin_token.as_deref() {
        let presented = header_str(request.headers(), header::AUTHORIZATION.as_str())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented != Some(expected) {
            tracing::warn!(route = %request.uri().path(), "admin request rejected");
            return ApiError::Unauthorized.into_response();
        }
    }
    next.run(request).await
}

fn session_from(headers: &HeaderMap, uri: &Uri) -> Option<SessionId> {
    if let Some(id) = header_str(headers, SESSION_HEADER).and_then(SessionId::parse) {
        return Some(id);
    }
    let Query(params) = Query::<SessionParams>::try_from_uri(uri).ok()?;
    params.session_id.as_deref().and_then(SessionId::parse)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn generate_request_id() -> String {
    format!("req-{:016x}", rand::thread_rng().gen::<u64>())
}
