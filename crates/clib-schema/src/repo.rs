//! Repository identity.

/// Owner and name of a hosted repository.
///
/// Used as the endpoint-discovery cache key and for descriptor `repo` strings.
///
/// # Example
///
/// ```
/// use clib_schema::RepoKey;
///
/// let key = RepoKey::parse("stephenmathieson/trim.c", "clibs").unwrap();
/// assert_eq!(key.owner, "stephenmathieson");
/// assert_eq!(key.repo, "trim.c");
/// assert_eq!(key.to_string(), "stephenmathieson/trim.c");
/// ```
#[derive(Debug, Clone, Hash, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RepoKey {
    /// Repository owner (user or organization).
    pub owner: String,
    /// Repository name. May differ from the package name (`thing.c` vs `thing`).
    pub repo: String,
}

impl RepoKey {
    /// Create a new `RepoKey` from an owner and repository name.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Split a descriptor `repo` string into owner and repository name.
    ///
    /// A bare `name` gets `default_owner`. Any `@version` suffix is ignored.
    /// Returns `None` when the name part is empty.
    pub fn parse(repo: &str, default_owner: &str) -> Option<Self> {
        let owner = crate::slug::parse_owner(repo, default_owner)?;
        let name = crate::slug::parse_name(repo)?;
        Some(Self::new(owner, name))
    }
}

impl std::fmt::Display for RepoKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::slug::format_repo(&self.owner, &self.repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_owner() {
        let key = RepoKey::parse("acme/foo.c", "clibs").unwrap();
        assert_eq!(key.owner, "acme");
        assert_eq!(key.repo, "foo.c");
    }

    #[test]
    fn test_parse_bare_name_uses_default_owner() {
        let key = RepoKey::parse("list", "clibs").unwrap();
        assert_eq!(key, RepoKey::new("clibs", "list"));
    }

    #[test]
    fn test_parse_ignores_version_suffix() {
        let key = RepoKey::parse("acme/foo@1.0.0", "clibs").unwrap();
        assert_eq!(key.repo, "foo");
    }

    #[test]
    fn test_parse_empty_name() {
        assert!(RepoKey::parse("acme/", "clibs").is_none());
        assert!(RepoKey::parse("", "clibs").is_none());
    }
}
