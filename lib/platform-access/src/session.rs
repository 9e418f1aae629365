//! Session records.
//!
//! A session is created the first time the server needs to remember
//! something about a browser: either a return-to path staged during the
//! login handshake, or the authenticated profile once login completes.
//! The profile is held in its encoded form so that the record stays an
//! opaque blob to the store.

use authgate_core::SessionToken;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::origin::ReturnTo;
use crate::profile::Profile;

/// A server-side session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Token carried in the session cookie.
    token: SessionToken,
    /// When the session was created.
    created_at: DateTime<Utc>,
    /// When the session expires unless refreshed.
    expires_at: DateTime<Utc>,
    /// Encoded [`Profile`] of the authenticated user.
    profile: Option<String>,
    /// Path to return to once the login handshake completes.
    return_to: Option<ReturnTo>,
}

impl Session {
    /// Creates an anonymous session that lives for `max_age`.
    #[must_use]
    pub fn new(token: SessionToken, max_age: Duration) -> Self {
        let now = Utc::now();
        Self {
            token,
            created_at: now,
            expires_at: now + max_age,
            profile: None,
            return_to: None,
        }
    }

    /// Creates a session with all fields specified.
    ///
    /// Use this when reconstituting a session from storage.
    #[must_use]
    pub fn with_all_fields(
        token: SessionToken,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        profile: Option<String>,
        return_to: Option<ReturnTo>,
    ) -> Self {
        Self {
            token,
            created_at,
            expires_at,
            profile,
            return_to,
        }
    }

    /// Returns the session token.
    #[must_use]
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Returns when the session was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the session expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns the encoded profile, exactly as stored.
    #[must_use]
    pub fn encoded_profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    /// Returns the authenticated user, if any.
    ///
    /// A stored profile that no longer decodes is reported as no user.
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.profile.as_deref().and_then(Profile::decode)
    }

    /// Returns true if the session carries a usable profile.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.profile().is_some()
    }

    /// Records the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be encoded; the session is
    /// left unchanged in that case.
    pub fn authenticate(&mut self, profile: &Profile) -> Result<(), serde_json::Error> {
        self.profile = Some(profile.encode()?);
        Ok(())
    }

    /// Returns the staged return-to path.
    #[must_use]
    pub fn return_to(&self) -> Option<&ReturnTo> {
        self.return_to.as_ref()
    }

    /// Stages a path to return to after login, replacing any previous one.
    pub fn stage_return_to(&mut self, path: ReturnTo) {
        self.return_to = Some(path);
    }

    /// Removes and returns the staged return-to path.
    pub fn take_return_to(&mut self) -> Option<ReturnTo> {
        self.return_to.take()
    }

    /// Returns true if the session has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Pushes expiry out to `max_age` from now.
    pub fn touch(&mut self, max_age: Duration) {
        self.expires_at = Utc::now() + max_age;
    }

    pub(crate) fn set_expires_at(&mut self, expires_at: DateTime<Utc>) {
        self.expires_at = expires_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::UserInfo;
    use serde_json::json;

    fn token() -> SessionToken {
        "abc".parse().expect("valid token")
    }

    fn alice() -> Profile {
        let info = UserInfo::from_response(json!({"username": "alice"})).expect("user info");
        Profile::new(info, vec!["staff".to_string()])
    }

    #[test]
    fn new_session_is_anonymous() {
        let before = Utc::now();
        let session = Session::new(token(), Duration::days(30));

        assert_eq!(session.token(), &token());
        assert!(session.created_at() >= before);
        assert!(session.expires_at() > session.created_at());
        assert!(!session.is_authenticated());
        assert!(session.profile().is_none());
        assert!(session.return_to().is_none());
        assert!(!session.is_expired());
    }

    #[test]
    fn authenticate_stores_encoded_profile() {
        let mut session = Session::new(token(), Duration::days(30));
        session.authenticate(&alice()).expect("encode");

        assert!(session.is_authenticated());
        assert_eq!(session.profile(), Some(alice()));
        let stored: serde_json::Value =
            serde_json::from_str(session.encoded_profile().expect("stored")).expect("json");
        assert_eq!(stored, json!({"username": "alice", "groups": ["staff"]}));
    }

    #[test]
    fn corrupt_profile_reads_as_anonymous() {
        let session = Session::with_all_fields(
            token(),
            Utc::now(),
            Utc::now() + Duration::days(1),
            Some("{\"user\":".to_string()),
            None,
        );
        assert!(!session.is_authenticated());
        assert!(session.profile().is_none());
    }

    #[test]
    fn return_to_is_taken_once() {
        let mut session = Session::new(token(), Duration::days(30));
        session.stage_return_to(ReturnTo::parse("/groups/blab?x=1").expect("path"));
        session.stage_return_to(ReturnTo::parse("/ncov").expect("path"));

        assert_eq!(session.take_return_to().map(String::from), Some("/ncov".to_string()));
        assert!(session.take_return_to().is_none());
    }

    #[test]
    fn touch_extends_expiry() {
        let mut session = Session::new(token(), Duration::seconds(-1));
        assert!(session.is_expired());

        session.touch(Duration::days(30));
        assert!(!session.is_expired());
        assert!(session.expires_at() > Utc::now() + Duration::days(29));
    }
}
