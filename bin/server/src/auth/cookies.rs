//! Cookies set by the auth layer.

use authgate_core::SessionToken;
use authgate_platform_access::{FlowState, ReturnTo};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration as TimeDuration;

/// Flow state cookie name (CSRF state and PKCE verifier during login).
pub const FLOW_COOKIE: &str = "authgate_flow";

/// A login in progress, as carried by the flow cookie.
///
/// The return-to path lives here rather than on the session, so a login
/// that is never completed forgets it when the cookie expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    /// Secrets the callback is checked against.
    #[serde(flatten)]
    pub flow: FlowState,
    /// Where to send the browser once the login completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<ReturnTo>,
}

/// Builds the session cookie.
pub fn session_cookie(
    name: &str,
    token: &SessionToken,
    max_age_days: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), token.as_str().to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::days(max_age_days))
        .build()
}

/// Builds a cookie that makes the browser drop the session cookie.
pub fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}

/// Builds the short-lived cookie carrying a login flow across the
/// provider round trip.
///
/// # Errors
///
/// Returns an error if the flow state cannot be serialized.
pub fn flow_cookie(
    pending: &PendingLogin,
    secure: bool,
) -> Result<Cookie<'static>, serde_json::Error> {
    let value = serde_json::to_string(pending)?;

    Ok(Cookie::build((FLOW_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::minutes(10))
        .build())
}

/// Reads the login flow back from its cookie.
///
/// A missing or unreadable cookie means no flow is in progress.
pub fn read_flow(value: &str) -> Option<PendingLogin> {
    match serde_json::from_str(value) {
        Ok(flow) => Some(flow),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unreadable flow cookie");
            None
        }
    }
}

/// Builds a cookie that makes the browser drop the flow cookie.
pub fn clear_flow_cookie() -> Cookie<'static> {
    Cookie::build((FLOW_COOKIE, ""))
        .path("/")
        .max_age(TimeDuration::ZERO)
        .build()
}
