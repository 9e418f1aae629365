//! Authentication routes for login, callback, logout and whoami.

use authgate_platform_access::{CallbackParams, DEFAULT_LANDING_PATH, Profile, ReturnTo, Session};
use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{
        HeaderMap, StatusCode,
        header::{ACCEPT, REFERER, VARY},
    },
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::json;
use std::sync::Arc;

use super::{AppState, cookies, middleware::CurrentSession};
use crate::negotiate;

const HTML: &str = "text/html";
const JSON: &str = "application/json";

/// Starts a login by redirecting to the identity provider.
///
/// The path the gate staged on the session, or failing that a same-origin
/// `Referer`, moves into the flow cookie as the place to return to. Every
/// login consumes the staged path, so an abandoned one leaves nothing behind.
pub async fn login(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthError> {
    let mut staged = None;
    if let Some(mut session) = session {
        staged = session.take_return_to();
        if staged.is_some() {
            if let Err(e) = state.sessions.save(&session).await {
                tracing::warn!(error = %e, "Failed to clear staged return-to path");
            }
        }
    }

    let return_to = staged.or_else(|| {
        headers
            .get(REFERER)
            .and_then(|value| value.to_str().ok())
            .and_then(|referer| state.origin.same_origin_path(referer))
    });

    let request = state.bridge.begin_login();
    let pending = cookies::PendingLogin {
        flow: request.flow,
        return_to,
    };
    let flow = cookies::flow_cookie(&pending, state.session_config.secure_cookies)
        .map_err(AuthError::FlowState)?;

    Ok((jar.add(flow), Redirect::to(&request.url)))
}

/// Handles the provider's redirect back after the user authenticates.
///
/// Any failure sends the browser back to `/login` and leaves the existing
/// session as it was.
pub async fn logged_in(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    query: Result<Query<CallbackParams>, QueryRejection>,
    jar: CookieJar,
) -> Response {
    let pending = jar
        .get(cookies::FLOW_COOKIE)
        .and_then(|cookie| cookies::read_flow(cookie.value()));
    let jar = jar.add(cookies::clear_flow_cookie());

    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Login failed: unreadable callback query");
            return (jar, Redirect::to("/login")).into_response();
        }
    };

    let flow = pending.as_ref().map(|pending| &pending.flow);
    let profile = match state.bridge.complete_login(&params, flow).await {
        Ok(profile) => profile,
        Err(report) => {
            tracing::warn!(error = %report, "Login failed");
            return (jar, Redirect::to("/login")).into_response();
        }
    };

    // Logins always get a fresh token.
    let mut fresh = state.new_session();
    if let Err(e) = fresh.authenticate(&profile) {
        tracing::warn!(error = %e, username = %profile.username(), "Failed to encode profile");
        return (jar, Redirect::to("/login")).into_response();
    }
    if let Err(e) = state.sessions.save(&fresh).await {
        tracing::warn!(error = %e, username = %profile.username(), "Failed to save login session");
        return (jar, Redirect::to("/login")).into_response();
    }

    if let Some(previous) = session {
        if let Err(e) = state.sessions.destroy(previous.token()).await {
            tracing::warn!(error = %e, "Failed to destroy pre-login session");
        }
    }

    tracing::info!(
        username = %profile.username(),
        groups = profile.groups().len(),
        "User logged in"
    );

    let target = pending
        .as_ref()
        .and_then(|pending| pending.return_to.as_ref())
        .map_or(DEFAULT_LANDING_PATH, ReturnTo::as_str);

    (jar.add(state.session_cookie(&fresh)), Redirect::to(target)).into_response()
}

/// Logs the user out locally, then at the identity provider.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let cookie_name = state.session_config.cookie_name.as_str();

    if let Some(token) = state.token_from_cookie(jar.get(cookie_name)) {
        match state.sessions.destroy(&token).await {
            Ok(()) => tracing::info!("User logged out"),
            Err(e) => tracing::warn!(error = %e, "Failed to destroy session on logout"),
        }
    }

    let target = state
        .bridge
        .logout_url(&state.origin)
        .unwrap_or_else(|| DEFAULT_LANDING_PATH.to_string());

    (jar.add(state.clear_session_cookie()), Redirect::to(&target))
}

/// Reports who the caller is signed in as, in HTML or JSON.
pub async fn whoami(CurrentSession(session): CurrentSession, headers: HeaderMap) -> Response {
    let profile = session.as_ref().and_then(Session::profile);
    let accept = headers.get(ACCEPT).and_then(|value| value.to_str().ok());

    match negotiate::preferred(accept, &[HTML, JSON]) {
        Some(JSON) => ([(VARY, "Accept")], Json(json!({ "user": profile }))).into_response(),
        Some(_) => ([(VARY, "Accept")], Html(whoami_html(profile.as_ref()))).into_response(),
        None => (StatusCode::NOT_ACCEPTABLE, [(VARY, "Accept")]).into_response(),
    }
}

fn whoami_html(profile: Option<&Profile>) -> String {
    match profile {
        Some(profile) => format!(
            "You\u{2019}re logged in as <strong>{}</strong>. \
             You are in the groups <strong>{}</strong>. \
             <a href=\"/logout\">Logout</a>",
            escape_html(profile.username()),
            escape_html(&profile.groups().join(", ")),
        ),
        None => "You are not logged in. <a href=\"/login\">Login</a>".to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Authentication errors.
#[derive(Debug)]
pub enum AuthError {
    FlowState(serde_json::Error),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::FlowState(e) => {
                tracing::error!(error = %e, "Failed to encode login flow state");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn html_escapes_user_values() {
        let info = authgate_platform_access::UserInfo::from_response(
            json!({ "username": "<script>" }),
        )
        .expect("valid user info");
        let profile = Profile::new(info, vec!["a&b".to_string()]);

        let html = whoami_html(Some(&profile));
        assert!(html.contains("<strong>&lt;script&gt;</strong>"));
        assert!(html.contains("<strong>a&amp;b</strong>"));
    }

    #[test]
    fn anonymous_html_links_to_login() {
        assert_eq!(
            whoami_html(None),
            "You are not logged in. <a href=\"/login\">Login</a>"
        );
    }
}
