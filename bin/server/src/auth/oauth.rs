//! OAuth2 client for the Cognito hosted UI, using the oauth2 crate.

use async_trait::async_trait;
use authgate_platform_access::{
    AuthorizationRequest, FlowState, IdentityProvider, LoginError, ProviderConfig, UserInfo,
};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient, url::Url,
};

/// Identity provider backed by a Cognito user pool's hosted UI.
pub struct CognitoProvider {
    client_id: ClientId,
    client_secret: Option<ClientSecret>,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    redirect_url: RedirectUrl,
    user_info_url: Url,
    logout_url: String,
    scopes: Vec<Scope>,
    http_client: reqwest::Client,
}

impl CognitoProvider {
    /// Creates a provider client.
    ///
    /// `redirect_url` is the absolute URL of the `/logged-in` callback.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ProviderConfig, redirect_url: String) -> Result<Self, ProviderSetupError> {
        let auth_url = AuthUrl::new(config.authorize_url())
            .map_err(|e| ProviderSetupError(format!("invalid authorize URL: {}", e)))?;
        let token_url = TokenUrl::new(config.token_url())
            .map_err(|e| ProviderSetupError(format!("invalid token URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(redirect_url)
            .map_err(|e| ProviderSetupError(format!("invalid redirect URL: {}", e)))?;
        let user_info_url = Url::parse(&config.user_info_url())
            .map_err(|e| ProviderSetupError(format!("invalid user info URL: {}", e)))?;
        Url::parse(&config.logout_url())
            .map_err(|e| ProviderSetupError(format!("invalid logout URL: {}", e)))?;

        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProviderSetupError(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client_id: ClientId::new(config.client_id().to_string()),
            client_secret: config
                .client_secret()
                .map(|secret| ClientSecret::new(secret.to_string())),
            auth_url,
            token_url,
            redirect_url,
            user_info_url,
            logout_url: config.logout_url(),
            scopes: config
                .scopes()
                .into_iter()
                .map(|scope| Scope::new(scope.to_string()))
                .collect(),
            http_client,
        })
    }
}

#[async_trait]
impl IdentityProvider for CognitoProvider {
    fn authorization_request(&self) -> AuthorizationRequest {
        let client = BasicClient::new(self.client_id.clone())
            .set_auth_uri(self.auth_url.clone())
            .set_redirect_uri(self.redirect_url.clone());

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_token) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned())
            .set_pkce_challenge(pkce_challenge)
            .url();

        AuthorizationRequest {
            url: auth_url.to_string(),
            flow: FlowState {
                csrf_token: csrf_token.secret().clone(),
                pkce_verifier: pkce_verifier.secret().clone(),
            },
        }
    }

    async fn exchange_code(&self, code: &str, pkce_verifier: &str) -> Result<String, LoginError> {
        let client = BasicClient::new(self.client_id.clone())
            .set_token_uri(self.token_url.clone())
            .set_redirect_uri(self.redirect_url.clone());
        let client = match &self.client_secret {
            Some(secret) => client.set_client_secret(secret.clone()),
            None => client,
        };

        let token_response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| LoginError::auth_exchange(format!("token exchange failed: {}", e)))?;

        Ok(token_response.access_token().secret().clone())
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, LoginError> {
        let response = self
            .http_client
            .get(self.user_info_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| LoginError::profile_fetch(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoginError::profile_fetch(format!(
                "user info endpoint returned {}",
                status
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LoginError::profile_fetch(format!("invalid response body: {}", e)))?;

        UserInfo::from_response(body)
    }

    fn logout_url(&self, logout_uri: &str) -> Option<String> {
        Url::parse_with_params(
            &self.logout_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("logout_uri", logout_uri),
            ],
        )
        .ok()
        .map(String::from)
    }
}

/// Failure to set up the provider client.
#[derive(Debug)]
pub struct ProviderSetupError(String);

impl std::fmt::Display for ProviderSetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "identity provider configuration error: {}", self.0)
    }
}

impl std::error::Error for ProviderSetupError {}
