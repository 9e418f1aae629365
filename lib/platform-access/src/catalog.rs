//! Source catalog and the gated path prefixes derived from it.
//!
//! Each named source is served under `/<name>`. A source that an anonymous
//! caller cannot see puts its whole prefix behind login.

use percent_encoding::percent_decode_str;
use std::str::FromStr;

use crate::error::CatalogError;
use crate::profile::Profile;

/// Who may see a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Everyone, signed in or not.
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Members of at least one of the listed groups.
    Groups(Vec<String>),
}

/// A named, independently visible collection of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    name: String,
    visibility: Visibility,
}

impl Source {
    /// Creates a source.
    ///
    /// # Errors
    ///
    /// Returns an error if the name cannot form a path prefix or a group
    /// restriction lists no groups.
    pub fn new(name: impl Into<String>, visibility: Visibility) -> Result<Self, CatalogError> {
        let name = name.into().trim_matches('/').to_string();
        if name.is_empty() {
            return Err(CatalogError::MissingName { spec: name });
        }
        if name
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
            || name.contains(|c: char| c.is_whitespace() || c == '?' || c == '#')
        {
            return Err(CatalogError::InvalidName { name });
        }
        if matches!(&visibility, Visibility::Groups(groups) if groups.is_empty()) {
            return Err(CatalogError::EmptyGroups { name });
        }
        Ok(Self { name, visibility })
    }

    /// Returns the source name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns who may see the source.
    #[must_use]
    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    /// Returns true if the caller may see this source.
    ///
    /// `None` is the anonymous caller.
    #[must_use]
    pub fn visible_to_user(&self, user: Option<&Profile>) -> bool {
        match (&self.visibility, user) {
            (Visibility::Public, _) => true,
            (_, None) => false,
            (Visibility::Authenticated, Some(_)) => true,
            (Visibility::Groups(groups), Some(user)) => groups.iter().any(|g| user.in_group(g)),
        }
    }
}

/// Parses `name`, `name=*` or `name=group1|group2`.
impl FromStr for Source {
    type Err = CatalogError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let spec = spec.trim();
        let (name, visibility) = match spec.split_once('=') {
            None => (spec, Visibility::Public),
            Some((name, "*")) => (name, Visibility::Authenticated),
            Some((name, groups)) => (
                name,
                Visibility::Groups(
                    groups
                        .split('|')
                        .map(str::trim)
                        .filter(|g| !g.is_empty())
                        .map(str::to_string)
                        .collect(),
                ),
            ),
        };
        if name.trim().is_empty() {
            return Err(CatalogError::MissingName {
                spec: spec.to_string(),
            });
        }
        Self::new(name.trim(), visibility)
    }
}

/// The set of sources known to this deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCatalog {
    sources: Vec<Source>,
}

impl SourceCatalog {
    /// Creates a catalog from sources.
    #[must_use]
    pub fn new(sources: Vec<Source>) -> Self {
        Self { sources }
    }

    /// Parses a comma-separated list of source specs.
    ///
    /// # Errors
    ///
    /// Returns the first spec that fails to parse.
    pub fn parse_list(specs: &str) -> Result<Self, CatalogError> {
        let sources = specs
            .split(',')
            .filter(|spec| !spec.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Source>, _>>()?;
        Ok(Self::new(sources))
    }

    /// Returns the sources in the catalog.
    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Returns the path prefixes of every source hidden from anonymous callers.
    #[must_use]
    pub fn non_public_paths(&self) -> NonPublicPaths {
        NonPublicPaths::new(
            self.sources
                .iter()
                .filter(|source| !source.visible_to_user(None))
                .map(|source| format!("/{}", source.name())),
        )
    }
}

/// Path prefixes that require an authenticated session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NonPublicPaths {
    prefixes: Vec<String>,
}

impl NonPublicPaths {
    /// Creates the set from `/`-prefixed path prefixes.
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|prefix| prefix.trim_end_matches('/').to_ascii_lowercase())
                .filter(|prefix| !prefix.is_empty())
                .collect(),
        }
    }

    /// Returns the gated prefixes.
    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Returns true if the request path is a gated prefix or lies below one.
    ///
    /// Matching happens on the percent-decoded path with empty and dot
    /// segments resolved, ignores ASCII case and respects segment
    /// boundaries: `/groups/blab` gates `/groups/blab` and
    /// `/groups/blab/ncov` but not `/groups/blabber`.
    #[must_use]
    pub fn requires_login(&self, path: &str) -> bool {
        let decoded = percent_decode_str(path).decode_utf8_lossy();
        let lowered = decoded.to_ascii_lowercase();

        let mut segments = Vec::new();
        for segment in lowered.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                segment => segments.push(segment),
            }
        }
        let path = format!("/{}", segments.join("/"));

        self.prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::UserInfo;
    use serde_json::json;

    fn user(groups: &[&str]) -> Profile {
        let info = UserInfo::from_response(json!({"username": "alice"})).expect("user info");
        Profile::new(info, groups.iter().map(|g| g.to_string()).collect())
    }

    #[test]
    fn parses_source_specs() {
        let catalog =
            SourceCatalog::parse_list("community, staging=*, groups/blab=blab|staff,,").expect("parse");

        assert_eq!(
            catalog.sources(),
            [
                Source::new("community", Visibility::Public).expect("source"),
                Source::new("staging", Visibility::Authenticated).expect("source"),
                Source::new(
                    "groups/blab",
                    Visibility::Groups(vec!["blab".to_string(), "staff".to_string()])
                )
                .expect("source"),
            ]
        );
    }

    #[test]
    fn rejects_bad_specs() {
        assert!(matches!(
            "=staff".parse::<Source>(),
            Err(CatalogError::MissingName { .. })
        ));
        assert!(matches!(
            "groups/blab=|".parse::<Source>(),
            Err(CatalogError::EmptyGroups { .. })
        ));
        assert!(matches!(
            "groups//blab".parse::<Source>(),
            Err(CatalogError::InvalidName { .. })
        ));
        assert!(matches!(
            "../etc".parse::<Source>(),
            Err(CatalogError::InvalidName { .. })
        ));
    }

    #[test]
    fn visibility_predicate() {
        let public = Source::new("community", Visibility::Public).expect("source");
        let signed_in = Source::new("staging", Visibility::Authenticated).expect("source");
        let blab = Source::new("groups/blab", Visibility::Groups(vec!["blab".to_string()]))
            .expect("source");

        assert!(public.visible_to_user(None));
        assert!(!signed_in.visible_to_user(None));
        assert!(!blab.visible_to_user(None));

        let member = user(&["blab"]);
        let outsider = user(&["staff"]);
        assert!(signed_in.visible_to_user(Some(&outsider)));
        assert!(blab.visible_to_user(Some(&member)));
        assert!(!blab.visible_to_user(Some(&outsider)));
    }

    #[test]
    fn non_public_paths_come_from_anonymous_visibility() {
        let catalog =
            SourceCatalog::parse_list("community,staging=*,groups/blab=blab").expect("parse");
        let gated = catalog.non_public_paths();
        assert_eq!(
            gated.prefixes(),
            ["/staging".to_string(), "/groups/blab".to_string()]
        );
    }

    #[test]
    fn requires_login_respects_segments() {
        let gated = NonPublicPaths::new(["/groups/blab".to_string()]);

        assert!(gated.requires_login("/groups/blab"));
        assert!(gated.requires_login("/groups/blab/"));
        assert!(gated.requires_login("/groups/blab/ncov/global"));
        assert!(!gated.requires_login("/groups/blabber"));
        assert!(!gated.requires_login("/groups"));
        assert!(!gated.requires_login("/"));
        assert!(!gated.requires_login("/community/groups/blab"));
    }

    #[test]
    fn requires_login_sees_through_case_and_encoding() {
        let gated = NonPublicPaths::new(["/groups/blab".to_string()]);

        assert!(gated.requires_login("/Groups/BLAB/ncov"));
        assert!(gated.requires_login("/groups%2Fblab"));
        assert!(gated.requires_login("/%67roups/blab"));
    }

    #[test]
    fn requires_login_resolves_empty_and_dot_segments() {
        let gated = NonPublicPaths::new(["/groups/blab".to_string()]);

        assert!(gated.requires_login("//groups/blab"));
        assert!(gated.requires_login("/groups//blab/ncov"));
        assert!(gated.requires_login("/community/../groups/blab"));
        assert!(gated.requires_login("/./groups/./blab"));
        assert!(!gated.requires_login("/groups/blab/../other"));
    }

    #[test]
    fn empty_catalog_gates_nothing() {
        let gated = SourceCatalog::default().non_public_paths();
        assert!(gated.prefixes().is_empty());
        assert!(!gated.requires_login("/anything"));
    }
}
