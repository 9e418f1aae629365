//! In-process stand-ins for the identity provider, for tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::bridge::{AuthorizationRequest, FlowState, GroupDirectory, IdentityProvider};
use crate::error::LoginError;
use crate::profile::UserInfo;

/// The `state` every fake authorization request carries.
pub const FAKE_STATE: &str = "fake-state";
/// The PKCE verifier every fake authorization request carries.
pub const FAKE_VERIFIER: &str = "fake-verifier";
/// The only authorization code the fake provider accepts.
pub const FAKE_CODE: &str = "fake-code";
/// Authorization endpoint of the fake provider.
pub const FAKE_AUTHORIZE_URL: &str = "https://idp.test/oauth2/authorize";

const FAKE_ACCESS_TOKEN: &str = "fake-access-token";

/// Identity provider that signs in one fixed user.
#[derive(Debug, Clone)]
pub struct FakeProvider {
    user_info: Value,
    exchange_fails: bool,
    user_info_fails: bool,
}

impl FakeProvider {
    /// Signs in the user described by a user-info response body.
    #[must_use]
    pub fn for_user(user_info: Value) -> Self {
        Self {
            user_info,
            exchange_fails: false,
            user_info_fails: false,
        }
    }

    /// Makes every code exchange fail.
    #[must_use]
    pub fn failing_exchange(mut self) -> Self {
        self.exchange_fails = true;
        self
    }

    /// Makes every user-info request fail.
    #[must_use]
    pub fn failing_user_info(mut self) -> Self {
        self.user_info_fails = true;
        self
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_request(&self) -> AuthorizationRequest {
        AuthorizationRequest {
            url: format!("{FAKE_AUTHORIZE_URL}?response_type=code&state={FAKE_STATE}"),
            flow: FlowState {
                csrf_token: FAKE_STATE.to_string(),
                pkce_verifier: FAKE_VERIFIER.to_string(),
            },
        }
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, LoginError> {
        if self.exchange_fails {
            return Err(LoginError::auth_exchange("token endpoint unavailable"));
        }
        if code != FAKE_CODE {
            return Err(LoginError::auth_exchange("invalid_grant"));
        }
        if pkce_verifier != FAKE_VERIFIER {
            return Err(LoginError::auth_exchange("code verifier mismatch"));
        }
        Ok(FAKE_ACCESS_TOKEN.to_string())
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, LoginError> {
        if self.user_info_fails || access_token != FAKE_ACCESS_TOKEN {
            return Err(LoginError::profile_fetch("user info endpoint unavailable"));
        }
        UserInfo::from_response(self.user_info.clone())
    }

    fn logout_url(&self, logout_uri: &str) -> Option<String> {
        Some(format!(
            "https://idp.test/logout?client_id=fake-client&logout_uri={logout_uri}"
        ))
    }
}

/// Group directory with a fixed answer.
#[derive(Debug, Clone)]
pub struct FakeGroups {
    groups: Option<Vec<String>>,
}

impl FakeGroups {
    /// Reports the same groups for every user.
    pub fn new<'a>(groups: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            groups: Some(groups.into_iter().map(str::to_string).collect()),
        }
    }

    /// Fails every lookup.
    #[must_use]
    pub fn failing() -> Self {
        Self { groups: None }
    }
}

#[async_trait]
impl GroupDirectory for FakeGroups {
    async fn groups_for_user(&self, username: &str) -> Result<Vec<String>, LoginError> {
        self.groups
            .clone()
            .ok_or_else(|| LoginError::group_fetch(username, "directory unavailable"))
    }
}
