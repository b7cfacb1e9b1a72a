//! Slug parsing and URL construction.
//!
//! A slug is the text form `[owner/]name[@version]`. It is the only value
//! handed from the installer to the resolver, so these functions must
//! round-trip: `parse(format_slug(o, n, v))` yields `(o, n, v)` for any parts
//! without `/` or `@`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DEFAULT_OWNER, DEFAULT_VERSION, GITHUB_CONTENT_URL};

/// The version wildcard. Never stored: it always becomes the default branch.
pub const WILDCARD: &str = "*";

/// Errors that can occur when tokenizing a slug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The slug is empty.
    #[error("Invalid slug: empty string")]
    Empty,

    /// The slug has no name segment (`owner/`, `@1.0`, ...).
    #[error("Invalid slug '{0}': missing package name")]
    MissingName(String),

    /// The slug has a `/` with nothing before it.
    #[error("Invalid slug '{0}': missing owner before '/'")]
    MissingOwner(String),
}

/// Fallback values applied when a slug omits its owner or version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Owner used for `name` and `name@version` slugs.
    pub owner: String,
    /// Branch used for slugs without `@version` and for the `*` wildcard.
    pub version: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            owner: DEFAULT_OWNER.to_string(),
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

impl Defaults {
    /// Replace the wildcard (and the empty string) with the default branch.
    pub fn normalize_version(&self, version: &str) -> String {
        if version == WILDCARD || version.is_empty() {
            self.version.clone()
        } else {
            version.to_string()
        }
    }

    /// Whether `version` names the default branch rather than a release.
    pub fn is_default_version(&self, version: &str) -> bool {
        version == self.version
    }
}

/// A fully resolved `owner/name@version` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slug {
    /// Repository owner.
    pub owner: String,
    /// Package (repository) name.
    pub name: String,
    /// Requested version or branch. Never the wildcard.
    pub version: String,
}

impl Slug {
    /// Build a slug from its parts, normalizing a wildcard version.
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        version: &str,
        defaults: &Defaults,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            version: defaults.normalize_version(version),
        }
    }

    /// Tokenize `[owner/]name[@version]`, filling gaps from `defaults`.
    ///
    /// # Errors
    ///
    /// Returns a [`SlugError`] when the text is empty, the name segment is
    /// empty, or a `/` is present with an empty owner.
    pub fn parse(text: &str, defaults: &Defaults) -> Result<Self, SlugError> {
        if text.is_empty() {
            return Err(SlugError::Empty);
        }
        let parts = split(text);
        let owner = match parts.owner {
            Some("") => return Err(SlugError::MissingOwner(text.to_string())),
            Some(owner) => owner,
            None => defaults.owner.as_str(),
        };
        if parts.name.is_empty() {
            return Err(SlugError::MissingName(text.to_string()));
        }
        let version = parts.version.unwrap_or_default();
        Ok(Self::new(owner, parts.name, version, defaults))
    }

    /// The `owner/name` repository string.
    pub fn repo(&self) -> String {
        format_repo(&self.owner, &self.name)
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format_slug(&self.owner, &self.name, &self.version))
    }
}

struct SlugParts<'a> {
    owner: Option<&'a str>,
    name: &'a str,
    version: Option<&'a str>,
}

fn split(text: &str) -> SlugParts<'_> {
    let (path, version) = match text.split_once('@') {
        Some((path, version)) => (path, Some(version)),
        None => (text, None),
    };
    let (owner, name) = match path.split_once('/') {
        Some((owner, name)) => (Some(owner), name),
        None => (None, path),
    };
    SlugParts {
        owner,
        name,
        version,
    }
}

/// Owner part of a slug, or `default_owner` when there is no `owner/` prefix.
///
/// Returns `None` for an empty slug or an empty owner before `/`.
pub fn parse_owner(slug: &str, default_owner: &str) -> Option<String> {
    if slug.is_empty() {
        return None;
    }
    match split(slug).owner {
        Some("") => None,
        Some(owner) => Some(owner.to_string()),
        None => Some(default_owner.to_string()),
    }
}

/// Name part of a slug. Returns `None` when it is empty.
pub fn parse_name(slug: &str) -> Option<String> {
    let name = split(slug).name;
    (!name.is_empty()).then(|| name.to_string())
}

/// Version part of a slug, or `default_version` when absent, empty or `*`.
///
/// Returns `None` only for an empty slug.
pub fn parse_version(slug: &str, default_version: &str) -> Option<String> {
    if slug.is_empty() {
        return None;
    }
    match split(slug).version {
        Some(version) if !version.is_empty() && version != WILDCARD => Some(version.to_string()),
        _ => Some(default_version.to_string()),
    }
}

/// `owner/name@version`
pub fn format_slug(owner: &str, name: &str, version: &str) -> String {
    format!("{owner}/{name}@{version}")
}

/// `owner/name`
pub fn format_repo(owner: &str, name: &str) -> String {
    format!("{owner}/{name}")
}

/// Raw-content base URL for `owner/name` at `version`.
///
/// A `version` that is already an absolute URL is returned unchanged, for
/// packages whose repository string encodes their own source location.
pub fn content_url(owner: &str, name: &str, version: &str) -> String {
    if is_absolute_url(version) {
        return version.to_string();
    }
    format!("{GITHUB_CONTENT_URL}{owner}/{name}/{version}")
}

/// Raw-content base URL for an already canonical `owner/name` string.
pub fn content_url_from_repo(repo: &str, version: &str) -> String {
    format!("{GITHUB_CONTENT_URL}{repo}/{version}")
}

fn is_absolute_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}
