//! The login pipeline between the browser and the identity provider.
//!
//! A login is two requests. `begin_login` produces the provider's
//! authorization URL together with the per-flow secrets (anti-CSRF state and
//! PKCE verifier) that the caller must keep until the callback arrives.
//! `complete_login` checks the callback against those secrets and then runs
//! exchange → user info → groups, stopping at the first failure. Only a
//! fully assembled [`Profile`] ever leaves this module.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::LoginError;
use crate::origin::ServingOrigin;
use crate::profile::{Profile, UserInfo};

/// Per-flow secrets held by the browser between `/login` and `/logged-in`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    /// Anti-CSRF `state` parameter sent to the provider.
    pub csrf_token: String,
    /// PKCE code verifier whose challenge was sent to the provider.
    pub pkce_verifier: String,
}

/// A provider authorization redirect and the flow state it depends on.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// URL to redirect the browser to.
    pub url: String,
    /// Secrets to keep until the callback.
    pub flow: FlowState,
}

/// Query parameters the provider sends to the callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code to exchange for an access token.
    pub code: Option<String>,
    /// Echo of the anti-CSRF `state` sent with the authorization request.
    pub state: Option<String>,
    /// OAuth2 error code, set when the provider refused the login.
    pub error: Option<String>,
    /// Human-readable detail accompanying `error`.
    pub error_description: Option<String>,
}

/// The OAuth2 side of the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Builds an authorization redirect with fresh state and PKCE challenge.
    fn authorization_request(&self) -> AuthorizationRequest;

    /// Exchanges an authorization code for an access token.
    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, LoginError>;

    /// Fetches the user's claims with an access token.
    async fn user_info(&self, access_token: &str) -> Result<UserInfo, LoginError>;

    /// Builds the provider logout URL that returns the browser to `logout_uri`.
    fn logout_url(&self, logout_uri: &str) -> Option<String>;
}

/// Group-membership lookups, made with server-side credentials.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Lists the names of the groups the user belongs to.
    async fn groups_for_user(&self, username: &str) -> Result<Vec<String>, LoginError>;
}

/// Orchestrates logins against an identity provider.
#[derive(Clone)]
pub struct IdentityBridge {
    provider: Arc<dyn IdentityProvider>,
    groups: Arc<dyn GroupDirectory>,
}

impl IdentityBridge {
    /// Creates a bridge over a provider and its group directory.
    pub fn new(provider: Arc<dyn IdentityProvider>, groups: Arc<dyn GroupDirectory>) -> Self {
        Self { provider, groups }
    }

    /// Starts a login.
    #[must_use]
    pub fn begin_login(&self) -> AuthorizationRequest {
        self.provider.authorization_request()
    }

    /// Finishes a login from the provider's callback.
    ///
    /// Every user the provider vouches for is accepted; the user pool is
    /// the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::AuthExchange`] if the callback does not match
    /// `flow` or the code exchange fails, [`LoginError::ProfileFetch`] if
    /// user info cannot be loaded, and [`LoginError::GroupFetch`] if group
    /// memberships cannot be listed.
    #[instrument(skip_all)]
    pub async fn complete_login(
        &self,
        params: &CallbackParams,
        flow: Option<&FlowState>,
    ) -> authgate_core::Result<Profile, LoginError> {
        if let Some(error) = &params.error {
            let description = params.error_description.as_deref().unwrap_or("no description");
            return Err(
                LoginError::auth_exchange(format!("provider returned '{error}': {description}"))
                    .into(),
            );
        }

        let flow = flow.ok_or_else(|| LoginError::auth_exchange("no login flow in progress"))?;

        if params.state.as_deref() != Some(flow.csrf_token.as_str()) {
            return Err(LoginError::auth_exchange("state mismatch").into());
        }

        let code = params
            .code
            .as_deref()
            .ok_or_else(|| LoginError::auth_exchange("callback carried no code"))?;

        let access_token = self
            .provider
            .exchange_code(code, &flow.pkce_verifier)
            .await?;
        debug!("authorization code exchanged");

        let info = self.provider.user_info(&access_token).await?;
        debug!(username = %info.username(), "user info loaded");

        let groups = self.groups.groups_for_user(info.username()).await?;
        debug!(username = %info.username(), groups = groups.len(), "groups loaded");

        Ok(Profile::new(info, groups))
    }

    /// Builds the provider logout URL that returns the browser to `origin`.
    #[must_use]
    pub fn logout_url(&self, origin: &ServingOrigin) -> Option<String> {
        self.provider.logout_url(&origin.as_str())
    }
}
