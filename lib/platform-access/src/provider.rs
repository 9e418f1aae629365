//! Identity provider configuration.
//!
//! The provider is an AWS Cognito user pool fronted by its hosted UI. All
//! OAuth2 endpoints hang off a single base URL; the group-membership API is
//! addressed by user pool id and region.

use serde::{Deserialize, Serialize};

/// Configuration for the identity provider.
///
/// Fields with defaults can be omitted when loading from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the hosted UI (e.g., "https://login.nextstrain.org").
    base_url: String,
    /// The OAuth2 client ID registered with the user pool.
    client_id: String,
    /// The OAuth2 client secret. Public clients relying on PKCE have none.
    #[serde(default)]
    client_secret: Option<String>,
    /// The user pool ID (e.g., "us-east-1_Cg5rcTged").
    user_pool_id: String,
    /// AWS region of the user pool. Derived from the pool ID when unset.
    #[serde(default)]
    region: Option<String>,
    /// OAuth2 scopes to request as a comma-separated string.
    /// Default: "openid,email,profile"
    #[serde(default = "default_scopes")]
    scopes: String,
}

fn default_scopes() -> String {
    "openid,email,profile".to_string()
}

impl ProviderConfig {
    /// Creates a new provider configuration with defaults for optional fields.
    #[must_use]
    pub fn new(base_url: String, client_id: String, user_pool_id: String) -> Self {
        Self {
            base_url,
            client_id,
            client_secret: None,
            user_pool_id,
            region: None,
            scopes: default_scopes(),
        }
    }

    /// Sets the client secret.
    #[must_use]
    pub fn with_client_secret(mut self, secret: Option<String>) -> Self {
        self.client_secret = secret;
        self
    }

    /// Sets the region explicitly.
    #[must_use]
    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    /// Returns the hosted UI base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Returns the OAuth2 client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the OAuth2 client secret, if configured.
    #[must_use]
    pub fn client_secret(&self) -> Option<&str> {
        self.client_secret.as_deref()
    }

    /// Returns the user pool ID.
    #[must_use]
    pub fn user_pool_id(&self) -> &str {
        &self.user_pool_id
    }

    /// Returns the AWS region of the user pool.
    ///
    /// Pool IDs have the form `<region>_<id>`, so the region is everything
    /// before the first underscore unless configured explicitly.
    #[must_use]
    pub fn region(&self) -> &str {
        match &self.region {
            Some(region) => region,
            None => self
                .user_pool_id
                .split_once('_')
                .map_or(self.user_pool_id.as_str(), |(region, _)| region),
        }
    }

    /// Returns the OAuth2 scopes to request, parsed from comma-separated string.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Returns the authorization endpoint.
    #[must_use]
    pub fn authorize_url(&self) -> String {
        format!("{}/oauth2/authorize", self.base_url())
    }

    /// Returns the token endpoint.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.base_url())
    }

    /// Returns the user-info endpoint.
    #[must_use]
    pub fn user_info_url(&self) -> String {
        format!("{}/oauth2/userInfo", self.base_url())
    }

    /// Returns the logout endpoint.
    #[must_use]
    pub fn logout_url(&self) -> String {
        format!("{}/logout", self.base_url())
    }
}
