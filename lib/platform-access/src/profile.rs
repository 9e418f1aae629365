//! Authenticated user profiles.
//!
//! A profile is assembled from two provider calls: the user-info endpoint
//! (username plus arbitrary claims) and the group-membership listing. The
//! two halves are kept as separate types so that a profile can only exist
//! once both calls have succeeded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LoginError;

/// Claims returned by the provider's user-info endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    username: String,
    claims: Map<String, Value>,
}

impl UserInfo {
    /// Builds user info from a user-info response body.
    ///
    /// The body must be a JSON object with a non-empty string `username`.
    /// Any `groups` claim is discarded; group membership always comes from
    /// the group listing.
    ///
    /// # Errors
    ///
    /// Returns [`LoginError::ProfileFetch`] if the body is not an object or
    /// lacks a usable username.
    pub fn from_response(body: Value) -> Result<Self, LoginError> {
        let Value::Object(mut claims) = body else {
            return Err(LoginError::profile_fetch("user info is not a JSON object"));
        };

        let username = match claims.remove("username") {
            Some(Value::String(username)) if !username.is_empty() => username,
            Some(_) => {
                return Err(LoginError::profile_fetch(
                    "user info 'username' is not a non-empty string",
                ));
            }
            None => return Err(LoginError::profile_fetch("user info has no 'username'")),
        };
        claims.remove("groups");

        Ok(Self { username, claims })
    }

    /// Returns the provider-issued username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// The authenticated user stored in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    username: String,
    #[serde(flatten)]
    claims: Map<String, Value>,
    #[serde(default)]
    groups: Vec<String>,
}

impl Profile {
    /// Completes a profile with the user's group memberships.
    #[must_use]
    pub fn new(info: UserInfo, groups: Vec<String>) -> Self {
        Self {
            username: info.username,
            claims: info.claims,
            groups,
        }
    }

    /// Returns the provider-issued username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the names of the groups the user belongs to.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Returns a provider claim by name.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// Returns true if the user belongs to the named group.
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Encodes the profile for storage in a session record.
    ///
    /// # Errors
    ///
    /// Returns an error if a claim cannot be represented as JSON.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a stored profile.
    ///
    /// Returns `None` when the blob is not a well-formed profile. Callers
    /// treat that as an anonymous session.
    #[must_use]
    pub fn decode(blob: &str) -> Option<Self> {
        match serde_json::from_str(blob) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding undecodable stored profile");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alice_info() -> UserInfo {
        UserInfo::from_response(json!({
            "username": "alice",
            "email": "alice@example.org",
            "sub": "0b7c6f1e",
        }))
        .expect("valid user info")
    }

    #[test]
    fn user_info_requires_username() {
        let err = UserInfo::from_response(json!({"email": "x@example.org"})).unwrap_err();
        assert!(matches!(err, LoginError::ProfileFetch { .. }));

        let err = UserInfo::from_response(json!({"username": 42})).unwrap_err();
        assert!(matches!(err, LoginError::ProfileFetch { .. }));

        let err = UserInfo::from_response(json!(["alice"])).unwrap_err();
        assert!(matches!(err, LoginError::ProfileFetch { .. }));
    }

    #[test]
    fn user_info_drops_provider_groups_claim() {
        let info = UserInfo::from_response(json!({
            "username": "alice",
            "groups": ["forged"],
        }))
        .expect("valid user info");
        let profile = Profile::new(info, vec!["staff".to_string()]);
        assert_eq!(profile.groups(), ["staff".to_string()]);
    }

    #[test]
    fn profile_serializes_flat() {
        let profile = Profile::new(alice_info(), vec!["staff".to_string()]);
        let value = serde_json::to_value(&profile).expect("serialize");
        assert_eq!(
            value,
            json!({
                "username": "alice",
                "email": "alice@example.org",
                "sub": "0b7c6f1e",
                "groups": ["staff"],
            })
        );
    }

    #[test]
    fn profile_survives_storage() {
        let profile = Profile::new(alice_info(), vec!["staff".to_string(), "blab".to_string()]);
        let blob = profile.encode().expect("encode");
        let decoded = Profile::decode(&blob).expect("decode");
        assert_eq!(decoded, profile);
        assert_eq!(decoded.claim("email"), Some(&json!("alice@example.org")));
        assert!(decoded.in_group("blab"));
        assert!(!decoded.in_group("admins"));
    }

    #[test]
    fn decode_tolerates_missing_groups() {
        let profile = Profile::decode(r#"{"username":"alice"}"#).expect("decode");
        assert!(profile.groups().is_empty());
    }

    #[test]
    fn decode_rejects_malformed_blobs() {
        assert!(Profile::decode("not json").is_none());
        assert!(Profile::decode(r#"{"groups":["staff"]}"#).is_none());
        assert!(Profile::decode(r#"{"username":"alice","groups":"staff"}"#).is_none());
        assert!(Profile::decode(r#"{"username":"alice","groups":[1,2]}"#).is_none());
        assert!(Profile::decode("null").is_none());
    }
}
