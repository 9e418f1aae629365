//! Opaque session tokens.
//!
//! A session token is the only thing the browser holds; it names a session
//! record in the store. Freshly issued tokens carry 256 bits of randomness
//! encoded as unpadded base64url.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest token accepted from a cookie.
const MAX_TOKEN_LEN: usize = 128;

/// Error returned when a cookie value is not a plausible session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTokenError {
    /// The reason the value was rejected.
    pub reason: &'static str,
}

impl fmt::Display for ParseTokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid session token: {}", self.reason)
    }
}

impl std::error::Error for ParseTokenError {}

/// Opaque identifier of a session record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Generates a new random token.
    #[must_use]
    pub fn generate() -> Self {
        let random_bytes: [u8; 32] = rand::rng().random();
        Self(URL_SAFE_NO_PAD.encode(random_bytes))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SessionToken {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ParseTokenError { reason: "empty" });
        }
        if s.len() > MAX_TOKEN_LEN {
            return Err(ParseTokenError { reason: "too long" });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ParseTokenError {
                reason: "unexpected character",
            });
        }
        Ok(Self(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_url_safe() {
        let token = SessionToken::generate();
        assert_eq!(token.as_str().len(), 43);
        assert!(token.as_str().parse::<SessionToken>().is_ok());
    }

    #[test]
    fn generated_tokens_are_unique() {
        assert_ne!(SessionToken::generate(), SessionToken::generate());
    }

    #[test]
    fn parse_accepts_short_tokens() {
        let token: SessionToken = "abc".parse().expect("should parse");
        assert_eq!(token.to_string(), "abc");
    }

    #[test]
    fn parse_rejects_junk() {
        assert_eq!(
            "".parse::<SessionToken>().unwrap_err().reason,
            "empty"
        );
        assert!("abc; Path=/".parse::<SessionToken>().is_err());
        assert!("a".repeat(200).parse::<SessionToken>().is_err());
    }

    #[test]
    fn token_serializes_as_plain_string() {
        let token: SessionToken = "abc".parse().expect("should parse");
        let json = serde_json::to_string(&token).expect("serialize");
        assert_eq!(json, "\"abc\"");
    }
}
