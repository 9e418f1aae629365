//! The serving origin and same-origin return-to paths.
//!
//! After a login round trip the browser is redirected to a path staged
//! before it left. Only origin-relative paths are ever staged or followed, so
//! the login flow cannot be used to bounce a user to another site.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::{Origin, Url};

/// Where the browser lands after login when nothing was staged.
pub const DEFAULT_LANDING_PATH: &str = "/";

/// A validated origin-relative path, including any query string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReturnTo(String);

impl ReturnTo {
    /// Validates a path for use as a post-login redirect.
    ///
    /// Accepts `/`-prefixed paths only. Protocol-relative forms (`//host`,
    /// `/\host`) and anything containing control characters are refused.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let mut chars = path.chars();
        if chars.next() != Some('/') {
            return None;
        }
        if matches!(chars.next(), Some('/') | Some('\\')) {
            return None;
        }
        if path.chars().any(char::is_control) {
            return None;
        }
        Some(Self(path.to_string()))
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReturnTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ReturnTo {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("'{value}' is not an origin-relative path"))
    }
}

impl From<ReturnTo> for String {
    fn from(value: ReturnTo) -> Self {
        value.0
    }
}

/// The scheme, host and port this deployment is served from.
#[derive(Debug, Clone)]
pub struct ServingOrigin {
    url: Url,
    origin: Origin,
}

impl ServingOrigin {
    /// Parses the configured public origin (e.g. `https://nextstrain.org`).
    ///
    /// # Errors
    ///
    /// Returns the parse error if the value is not an absolute URL, or a
    /// `url::ParseError::EmptyHost` if it has no host.
    pub fn parse(origin: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(origin)?;
        if url.host_str().is_none() {
            return Err(url::ParseError::EmptyHost);
        }
        let origin = url.origin();
        Ok(Self { url, origin })
    }

    /// Returns the origin serialized as `scheme://host[:port]`.
    #[must_use]
    pub fn as_str(&self) -> String {
        self.origin.ascii_serialization()
    }

    /// Resolves an origin-relative path against this origin.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the joined URL is invalid.
    pub fn join(&self, path: &str) -> Result<Url, url::ParseError> {
        self.url.join(path)
    }

    /// Extracts a return-to path from a `Referer` header value.
    ///
    /// Returns `None` unless the referer parses as an absolute URL whose
    /// origin is exactly this origin.
    #[must_use]
    pub fn same_origin_path(&self, referer: &str) -> Option<ReturnTo> {
        let referer = Url::parse(referer).ok()?;
        if referer.origin() != self.origin {
            return None;
        }
        let path = match referer.query() {
            Some(query) => format!("{}?{}", referer.path(), query),
            None => referer.path().to_string(),
        };
        ReturnTo::parse(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> ServingOrigin {
        ServingOrigin::parse("https://nextstrain.org").expect("valid origin")
    }

    #[test]
    fn return_to_accepts_relative_paths() {
        assert_eq!(
            ReturnTo::parse("/groups/blab?x=1").map(|r| r.to_string()),
            Some("/groups/blab?x=1".to_string())
        );
        assert!(ReturnTo::parse("/").is_some());
    }

    #[test]
    fn return_to_refuses_other_origins() {
        assert!(ReturnTo::parse("https://evil.example/").is_none());
        assert!(ReturnTo::parse("//evil.example/").is_none());
        assert!(ReturnTo::parse("/\\evil.example/").is_none());
        assert!(ReturnTo::parse("groups/blab").is_none());
        assert!(ReturnTo::parse("").is_none());
        assert!(ReturnTo::parse("/a\r\nSet-Cookie: x").is_none());
    }

    #[test]
    fn return_to_deserialization_validates() {
        let ok: ReturnTo = serde_json::from_str("\"/about\"").expect("valid");
        assert_eq!(ok.as_str(), "/about");
        assert!(serde_json::from_str::<ReturnTo>("\"//evil.example\"").is_err());
    }

    #[test]
    fn origin_serialization_omits_default_port() {
        assert_eq!(origin().as_str(), "https://nextstrain.org");
        let dev = ServingOrigin::parse("http://localhost:5000").expect("valid origin");
        assert_eq!(dev.as_str(), "http://localhost:5000");
    }

    #[test]
    fn origin_requires_host() {
        assert!(ServingOrigin::parse("not a url").is_err());
        assert!(ServingOrigin::parse("data:text/plain,hi").is_err());
    }

    #[test]
    fn same_origin_referer_is_staged() {
        let staged = origin().same_origin_path("https://nextstrain.org/ncov/global?l=clock");
        assert_eq!(
            staged.map(|r| r.to_string()),
            Some("/ncov/global?l=clock".to_string())
        );
    }

    #[test]
    fn mismatched_referers_are_ignored() {
        let origin = origin();
        assert!(origin.same_origin_path("https://evil.example/ncov").is_none());
        assert!(origin.same_origin_path("http://nextstrain.org/ncov").is_none());
        assert!(origin.same_origin_path("https://nextstrain.org:8443/ncov").is_none());
        assert!(origin.same_origin_path("https://dev.nextstrain.org/ncov").is_none());
        assert!(origin.same_origin_path("/ncov").is_none());
        assert!(origin.same_origin_path("garbage").is_none());
    }

    #[test]
    fn join_resolves_callback_path() {
        let url = origin().join("/logged-in").expect("join");
        assert_eq!(url.as_str(), "https://nextstrain.org/logged-in");
    }
}
