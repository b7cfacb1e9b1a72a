//! Package descriptor (`package.json`) model.
//!
//! A [`Package`] is built once from descriptor text, either fetched from a
//! remote repository or read from disk. Scalar fields are lenient (a missing
//! or non-string value is simply absent); list fields are strict, and one bad
//! entry rejects the whole descriptor.

use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::repo::RepoKey;
use crate::slug::{self, Defaults, SlugError};

/// Errors that can occur when building a package from descriptor text.
#[derive(Error, Debug)]
pub enum PackageError {
    /// An I/O error occurred while reading a descriptor file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The text is not valid JSON.
    #[error("Unable to parse package.json: {0}")]
    Json(#[from] serde_json::Error),

    /// The document root is not an object.
    #[error("Invalid package.json: expected a top-level object")]
    NotAnObject,

    /// An entry of the `src` array is not a string.
    #[error("Invalid package.json: src[{index}] is not a string")]
    InvalidSource {
        /// Position of the offending entry.
        index: usize,
    },

    /// An entry of a dependency map is malformed.
    #[error("Invalid package.json: {section} entry '{name}': {reason}")]
    InvalidDependency {
        /// `dependencies` or `development`.
        section: &'static str,
        /// The offending key.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// A single edge in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    /// Repository owner.
    pub author: String,
    /// Package name.
    pub name: String,
    /// Exact version or branch. Never the wildcard.
    pub version: String,
}

impl Dependency {
    /// Build a dependency from a descriptor entry (`"owner/name": "version"`).
    ///
    /// # Errors
    ///
    /// Returns a [`SlugError`] when `repo` has no usable owner or name.
    pub fn new(repo: &str, version: &str, defaults: &Defaults) -> Result<Self, SlugError> {
        if repo.is_empty() {
            return Err(SlugError::Empty);
        }
        let name = slug::parse_name(repo).ok_or_else(|| SlugError::MissingName(repo.into()))?;
        let author = slug::parse_owner(repo, &defaults.owner)
            .ok_or_else(|| SlugError::MissingOwner(repo.into()))?;
        let dep = Self {
            author,
            name,
            version: defaults.normalize_version(version),
        };
        tracing::trace!("dependency: {}", dep.slug());
        Ok(dep)
    }

    /// `author/name@version`, the form handed to the resolver.
    pub fn slug(&self) -> String {
        slug::format_slug(&self.author, &self.name, &self.version)
    }
}

/// One resolved package version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    /// Package name (`name` field).
    pub name: Option<String>,
    /// Repository owner, derived from `repo` and reconciled during resolution.
    pub author: Option<String>,
    /// Name segment of `repo`; may differ from `name`.
    pub repo_name: Option<String>,
    /// Canonical `author/repo_name` string.
    pub repo: Option<String>,
    /// Version or branch. Never the wildcard.
    pub version: Option<String>,
    /// License identifier.
    pub license: Option<String>,
    /// Human-readable summary.
    pub description: Option<String>,
    /// Install command. Carried for display only; never executed.
    pub install: Option<String>,
    /// Relative path of a makefile to fetch alongside the sources.
    pub makefile: Option<String>,
    /// Descriptor text, persisted verbatim on install.
    pub json: String,
    /// Source files in declaration order.
    pub src: Vec<String>,
    /// Runtime dependencies in declaration order.
    pub dependencies: Vec<Dependency>,
    /// Development-only dependencies, installed on explicit request.
    pub development: Vec<Dependency>,
    /// API base URL this package was resolved through.
    pub api_endpoint: Option<String>,
    /// Raw-content base URL, computed lazily at install time when unset.
    pub content_url: Option<String>,
}

impl Package {
    /// Build a package from descriptor text.
    ///
    /// When `verbose` is set, a missing `repo` field is reported as a warning.
    ///
    /// # Errors
    ///
    /// Returns a [`PackageError`] when the text is not a JSON object or a
    /// `src`, `dependencies` or `development` entry is malformed.
    pub fn from_json(json: &str, verbose: bool, defaults: &Defaults) -> Result<Self, PackageError> {
        let root: Value = serde_json::from_str(json)?;
        let obj = root.as_object().ok_or(PackageError::NotAnObject)?;

        let mut pkg = Package {
            json: json.to_string(),
            name: get_string(obj, "name"),
            repo: get_string(obj, "repo"),
            version: get_string(obj, "version").map(|v| defaults.normalize_version(&v)),
            license: get_string(obj, "license"),
            description: get_string(obj, "description"),
            install: get_string(obj, "install"),
            makefile: get_string(obj, "makefile"),
            ..Package::default()
        };

        tracing::debug!("creating package: {}", pkg.repo.as_deref().unwrap_or("?"));

        match pkg.repo.as_deref().and_then(|r| RepoKey::parse(r, &defaults.owner)) {
            Some(key) => {
                pkg.author = Some(key.owner);
                pkg.repo_name = Some(key.repo);
            }
            None if !verbose => {}
            None => match pkg.repo.as_deref() {
                Some(repo) => tracing::warn!("invalid repo {repo:?} in package.json"),
                None => tracing::warn!("missing repo in package.json"),
            },
        }

        if let Some(src) = obj.get("src").and_then(Value::as_array) {
            pkg.src = src
                .iter()
                .enumerate()
                .map(|(index, file)| {
                    file.as_str()
                        .map(str::to_string)
                        .ok_or(PackageError::InvalidSource { index })
                })
                .collect::<Result<_, _>>()?;
        } else {
            tracing::debug!("no src files listed in package.json");
        }

        pkg.dependencies = parse_dependencies(obj, "dependencies", defaults)?;
        pkg.development = parse_dependencies(obj, "development", defaults)?;

        Ok(pkg)
    }

    /// Load a package from a descriptor file on disk.
    ///
    /// # Errors
    ///
    /// Returns a [`PackageError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path, verbose: bool, defaults: &Defaults) -> Result<Self, PackageError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content, verbose, defaults)
    }

    /// Name for log lines: the package name, else the repo, else `?`.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.repo.as_deref())
            .unwrap_or("?")
    }

    /// Version for log lines and comparisons, falling back to `default`.
    pub fn version_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.version.as_deref().unwrap_or(default)
    }

    /// `author/name@version` when all three parts are known.
    pub fn slug(&self) -> Option<String> {
        Some(slug::format_slug(
            self.author.as_deref()?,
            self.name.as_deref()?,
            self.version.as_deref()?,
        ))
    }
}

impl std::str::FromStr for Package {
    type Err = PackageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s, false, &Defaults::default())
    }
}

fn get_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Read one dependency section. All-or-nothing: any bad entry fails it.
fn parse_dependencies(
    obj: &Map<String, Value>,
    section: &'static str,
    defaults: &Defaults,
) -> Result<Vec<Dependency>, PackageError> {
    let Some(map) = obj.get(section).and_then(Value::as_object) else {
        tracing::debug!("no {section} listed in package.json");
        return Ok(Vec::new());
    };

    map.iter()
        .map(|(name, version)| {
            let version = version
                .as_str()
                .ok_or_else(|| PackageError::InvalidDependency {
                    section,
                    name: name.clone(),
                    reason: "version is not a string".to_string(),
                })?;
            Dependency::new(name, version, defaults).map_err(|e| PackageError::InvalidDependency {
                section,
                name: name.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}
