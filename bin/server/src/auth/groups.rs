//! Group memberships from the Cognito user pool.
//!
//! Group names are what the source catalog restricts on, so they are
//! fetched once at login with the server's own AWS credentials and kept in
//! the session.

use async_trait::async_trait;
use authgate_platform_access::{GroupDirectory, LoginError, ProviderConfig};
use aws_sdk_cognitoidentityprovider::Client;
use aws_sdk_cognitoidentityprovider::error::DisplayErrorContext;
use tracing::instrument;

/// Group directory backed by `AdminListGroupsForUser`.
#[derive(Debug, Clone)]
pub struct CognitoGroupDirectory {
    client: Client,
    user_pool_id: String,
}

impl CognitoGroupDirectory {
    /// Creates a directory for the configured user pool.
    ///
    /// Credentials come from the standard AWS environment (env vars,
    /// profile, or instance role).
    pub async fn new(config: &ProviderConfig) -> Self {
        let region = config.region().to_string();
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .load()
            .await;

        tracing::info!(
            region = %region,
            user_pool_id = %config.user_pool_id(),
            "Cognito group directory initialized"
        );

        Self::from_client(Client::new(&sdk_config), config.user_pool_id())
    }

    /// Creates a directory on an already configured client.
    pub fn from_client(client: Client, user_pool_id: impl Into<String>) -> Self {
        Self {
            client,
            user_pool_id: user_pool_id.into(),
        }
    }
}

#[async_trait]
impl GroupDirectory for CognitoGroupDirectory {
    #[instrument(skip(self))]
    async fn groups_for_user(&self, username: &str) -> Result<Vec<String>, LoginError> {
        let mut groups = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .admin_list_groups_for_user()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| LoginError::group_fetch(username, DisplayErrorContext(&e).to_string()))?;

            groups.extend(
                output
                    .groups()
                    .iter()
                    .filter_map(|group| group.group_name())
                    .map(str::to_string),
            );

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_cognitoidentityprovider::config::{BehaviorVersion, Credentials, Region};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIST_GROUPS: &str = "AWSCognitoIdentityProviderService.AdminListGroupsForUser";
    const AMZ_JSON: &str = "application/x-amz-json-1.1";

    fn directory(server: &MockServer) -> CognitoGroupDirectory {
        let config = aws_sdk_cognitoidentityprovider::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("akid", "secret", None, None, "test"))
            .endpoint_url(server.uri())
            .build();
        CognitoGroupDirectory::from_client(Client::from_conf(config), "us-east-1_Cg5rcTged")
    }

    fn page(body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body.to_string(), AMZ_JSON)
    }

    #[tokio::test]
    async fn lists_groups_across_pages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", LIST_GROUPS))
            .and(body_partial_json(json!({
                "UserPoolId": "us-east-1_Cg5rcTged",
                "Username": "alice",
                "NextToken": "page-2"
            })))
            .respond_with(page(json!({ "Groups": [{ "GroupName": "staff" }] })))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", LIST_GROUPS))
            .and(body_partial_json(json!({
                "UserPoolId": "us-east-1_Cg5rcTged",
                "Username": "alice"
            })))
            .respond_with(page(json!({
                "Groups": [{ "GroupName": "blab" }, { "GroupName": "nextstrain" }],
                "NextToken": "page-2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let groups = directory(&server)
            .groups_for_user("alice")
            .await
            .expect("groups");
        assert_eq!(groups, ["blab", "nextstrain", "staff"]);
    }

    #[tokio::test]
    async fn user_without_groups_has_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", LIST_GROUPS))
            .respond_with(page(json!({ "Groups": [] })))
            .mount(&server)
            .await;

        let groups = directory(&server)
            .groups_for_user("alice")
            .await
            .expect("groups");
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn service_errors_fail_group_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-amz-target", LIST_GROUPS))
            .respond_with(ResponseTemplate::new(400).set_body_raw(
                json!({
                    "__type": "UserNotFoundException",
                    "message": "User does not exist."
                })
                .to_string(),
                AMZ_JSON,
            ))
            .mount(&server)
            .await;

        let err = directory(&server)
            .groups_for_user("mallory")
            .await
            .expect_err("group fetch fails");
        match err {
            LoginError::GroupFetch { username, reason } => {
                assert_eq!(username, "mallory");
                assert!(reason.contains("UserNotFoundException"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
