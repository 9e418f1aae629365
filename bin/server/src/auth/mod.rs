//! Authentication module for the authgate server.
//!
//! This module provides:
//! - The OAuth2 client for the Cognito hosted UI and its group directory
//! - The PostgreSQL session store
//! - Session loading and the access gate as Axum middleware
//! - The `/login`, `/logged-in`, `/logout` and `/whoami` handlers
//!
//! # Authorization Model
//!
//! The gate only decides whether a request needs a signed-in user at all.
//! Paths under a non-public source prefix require a session with a profile;
//! which sources a given user may read is left to the content layer, which
//! sees the profile (and its groups) through [`CurrentSession`].
//!
//! Group memberships are captured once at login, so membership changes
//! take effect on the next login or when the session expires.

pub mod cookies;
pub mod db;
pub mod groups;
pub mod middleware;
pub mod oauth;
pub mod routes;

use authgate_core::SessionToken;
use authgate_platform_access::{
    IdentityBridge, NonPublicPaths, ServingOrigin, Session, SessionStore,
};
use axum_extra::extract::cookie::Cookie;
use std::sync::Arc;

use crate::config::SessionConfig;

pub use db::PgSessionStore;
pub use groups::CognitoGroupDirectory;
pub use middleware::{CurrentSession, access_gate, load_session};
pub use oauth::CognitoProvider;
pub use routes::{logged_in, login, logout, whoami};

/// Shared application state.
pub struct AppState {
    /// Session storage.
    pub sessions: Arc<dyn SessionStore>,
    /// Login pipeline against the identity provider.
    pub bridge: IdentityBridge,
    /// Path prefixes that require a signed-in user.
    pub gate: NonPublicPaths,
    /// Origin this deployment is served from.
    pub origin: ServingOrigin,
    /// Session configuration.
    pub session_config: SessionConfig,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        bridge: IdentityBridge,
        gate: NonPublicPaths,
        origin: ServingOrigin,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            sessions,
            bridge,
            gate,
            origin,
            session_config,
        }
    }

    /// Starts a new, anonymous session under a fresh token.
    ///
    /// Nothing is stored until the caller saves it.
    pub fn new_session(&self) -> Session {
        Session::new(SessionToken::generate(), self.session_config.max_age())
    }

    /// Looks up a session, treating store failures as no session.
    pub async fn find_session(&self, token: &SessionToken) -> Option<Session> {
        match self.sessions.load(token).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Session store unavailable; continuing anonymously");
                None
            }
        }
    }

    /// Reads the session token from a cookie value.
    pub fn token_from_cookie(&self, cookie: Option<&Cookie<'_>>) -> Option<SessionToken> {
        cookie.and_then(|cookie| cookie.value().parse().ok())
    }

    /// Builds the cookie that carries `session`.
    pub fn session_cookie(&self, session: &Session) -> Cookie<'static> {
        cookies::session_cookie(
            &self.session_config.cookie_name,
            session.token(),
            self.session_config.max_age_days,
            self.session_config.secure_cookies,
        )
    }

    /// Builds the cookie that drops the session cookie.
    pub fn clear_session_cookie(&self) -> Cookie<'static> {
        cookies::clear_session_cookie(&self.session_config.cookie_name)
    }
}
