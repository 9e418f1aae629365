//! Error types for the platform-access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `LoginError`: a login round trip with the identity provider failed
//! - `SessionStoreError`: the session store could not be read or written
//! - `CatalogError`: a source specification could not be parsed

use std::fmt;

/// Errors that abort a login attempt.
///
/// Every variant results in the browser being sent back to `/login`; the
/// details are for logs only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// The authorization code could not be exchanged for an access token.
    ///
    /// Covers a provider-reported error on the callback, a missing or
    /// mismatched `state`, a missing flow cookie, and token endpoint failures.
    AuthExchange { reason: String },
    /// The user-info endpoint failed or returned an unusable profile.
    ProfileFetch { reason: String },
    /// Group memberships could not be listed for the user.
    GroupFetch { username: String, reason: String },
}

impl LoginError {
    /// Shorthand for an [`LoginError::AuthExchange`] error.
    pub fn auth_exchange(reason: impl Into<String>) -> Self {
        Self::AuthExchange {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`LoginError::ProfileFetch`] error.
    pub fn profile_fetch(reason: impl Into<String>) -> Self {
        Self::ProfileFetch {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`LoginError::GroupFetch`] error.
    pub fn group_fetch(username: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GroupFetch {
            username: username.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LoginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthExchange { reason } => {
                write!(f, "authorization code exchange failed: {reason}")
            }
            Self::ProfileFetch { reason } => {
                write!(f, "unable to fetch user info: {reason}")
            }
            Self::GroupFetch { username, reason } => {
                write!(f, "unable to list groups for '{username}': {reason}")
            }
        }
    }
}

impl std::error::Error for LoginError {}

/// Errors from session store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    /// The backing store could not be reached or rejected the operation.
    Unavailable { details: String },
    /// A stored record could not be decoded.
    Corrupt { token: String, details: String },
}

impl fmt::Display for SessionStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { details } => {
                write!(f, "session store unavailable: {details}")
            }
            Self::Corrupt { token, details } => {
                write!(f, "session '{token}' is corrupt: {details}")
            }
        }
    }
}

impl std::error::Error for SessionStoreError {}

/// Errors from parsing source catalog specifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A source entry had no name.
    MissingName { spec: String },
    /// A source name contained characters that cannot form a path prefix.
    InvalidName { name: String },
    /// A group-restricted source listed no groups.
    EmptyGroups { name: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingName { spec } => {
                write!(f, "source spec '{spec}' has no name")
            }
            Self::InvalidName { name } => {
                write!(f, "source name '{name}' is not a valid path prefix")
            }
            Self::EmptyGroups { name } => {
                write!(f, "source '{name}' is restricted to an empty group list")
            }
        }
    }
}

impl std::error::Error for CatalogError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_error_display_names_the_failed_step() {
        let err = LoginError::auth_exchange("state mismatch");
        assert!(err.to_string().contains("exchange"));
        assert!(err.to_string().contains("state mismatch"));

        let err = LoginError::profile_fetch("HTTP 500");
        assert!(err.to_string().contains("user info"));

        let err = LoginError::group_fetch("alice", "throttled");
        assert!(err.to_string().contains("alice"));
        assert!(err.to_string().contains("throttled"));
    }

    #[test]
    fn session_store_error_display() {
        let err = SessionStoreError::Unavailable {
            details: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("unavailable"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn catalog_error_display() {
        let err = CatalogError::EmptyGroups {
            name: "groups/blab".to_string(),
        };
        assert!(err.to_string().contains("groups/blab"));
    }
}
