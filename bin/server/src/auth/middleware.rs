//! Session loading and access gate middleware for Axum.

use authgate_platform_access::{ReturnTo, Session};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use std::convert::Infallible;
use std::sync::Arc;

use super::AppState;

/// The session attached to the current request, if any.
///
/// Populated by [`load_session`]; handlers behind it read the caller's
/// session through this extractor and never from the store directly.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession(pub Option<Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Loads the caller's session and keeps it alive.
///
/// A live session has its expiry pushed out and its cookie re-issued on
/// every request. Store failures degrade to an anonymous request.
pub async fn load_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.session_config.cookie_name.as_str();

    let mut session = match state.token_from_cookie(jar.get(cookie_name)) {
        Some(token) => state.find_session(&token).await,
        None => None,
    };

    if let Some(live) = session.as_mut() {
        live.touch(state.session_config.max_age());
        // Only ever update in place; a record destroyed since the load stays gone.
        match state.sessions.touch(live.token(), live.expires_at()).await {
            Ok(true) => {}
            Ok(false) => session = None,
            Err(e) => tracing::warn!(error = %e, "Failed to refresh session expiry"),
        }
    }

    let refreshed = session.as_ref().map(|session| state.session_cookie(session));
    request.extensions_mut().insert(CurrentSession(session));

    let mut response = next.run(request).await;

    // Handlers that replace or drop the session set their own cookie.
    if let Some(cookie) = refreshed.filter(|_| !sets_cookie(&response, cookie_name)) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to re-issue session cookie"),
        }
    }

    response
}

fn sets_cookie(response: &Response, name: &str) -> bool {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| {
            value
                .split_once('=')
                .is_some_and(|(cookie_name, _)| cookie_name.trim() == name)
        })
}

/// Sends anonymous callers on non-public paths to `/login`.
///
/// The original path and query are staged on the session so the login can
/// return there. Everything else passes through untouched.
pub async fn access_gate(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if !state.gate.requires_login(path) || session.as_ref().is_some_and(Session::is_authenticated)
    {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map_or(path, |path_and_query| path_and_query.as_str());

    let mut session = session.unwrap_or_else(|| state.new_session());
    if let Some(return_to) = ReturnTo::parse(target) {
        session.stage_return_to(return_to);
    }

    let jar = match state.sessions.save(&session).await {
        Ok(()) => jar.add(state.session_cookie(&session)),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to stage return-to path");
            jar
        }
    };

    tracing::debug!(path = %target, "Login required; redirecting");
    (jar, Redirect::to("/login")).into_response()
}
