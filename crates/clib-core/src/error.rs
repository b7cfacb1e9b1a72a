//! Domain-specific errors for resolution, file fetches and installs

use std::fmt;
use std::path::PathBuf;

use clib_schema::{PackageError, SlugError};
use thiserror::Error;

use crate::io::download::DownloadError;

/// The step of remote resolution at which a [`ResolveError`] occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStep {
    /// Tokenizing the slug.
    ParseSlug,
    /// Probing candidate API endpoints.
    Discovery,
    /// Looking up `package.json` through the contents API.
    Metadata,
    /// Downloading the descriptor text.
    Descriptor,
    /// Building the package model from the descriptor.
    Build,
}

impl fmt::Display for ResolveStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            Self::ParseSlug => "parse slug",
            Self::Discovery => "endpoint discovery",
            Self::Metadata => "metadata lookup",
            Self::Descriptor => "descriptor download",
            Self::Build => "package build",
        };
        f.write_str(step)
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Slug(#[from] SlugError),

    #[error("Failed to find api endpoint for {repo}")]
    NoEndpoint { repo: String },

    #[error("Unable to look up {repo}:package.json: {source}")]
    Metadata {
        repo: String,
        source: DownloadError,
    },

    #[error("Unable to fetch {repo}:package.json: {source}")]
    Descriptor {
        repo: String,
        source: DownloadError,
    },

    #[error("Invalid package.json in {repo}: {source}")]
    Build {
        repo: String,
        source: PackageError,
    },
}

impl ResolveError {
    /// Which resolution step failed.
    pub fn step(&self) -> ResolveStep {
        match self {
            Self::Slug(_) => ResolveStep::ParseSlug,
            Self::NoEndpoint { .. } => ResolveStep::Discovery,
            Self::Metadata { .. } => ResolveStep::Metadata,
            Self::Descriptor { .. } => ResolveStep::Descriptor,
            Self::Build { .. } => ResolveStep::Build,
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Cannot fetch {file}: package has no api endpoint")]
    NoEndpoint { file: String },

    #[error("Cannot fetch {file}: package has no author or name")]
    MissingIdentity { file: String },

    #[error("Cannot fetch {file}: not a file path")]
    InvalidPath { file: String },

    #[error("Unable to look up {file}: {source}")]
    Contents {
        file: String,
        source: DownloadError,
    },

    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unable to fetch {file} -> {path}: {source}")]
    Download {
        file: String,
        path: PathBuf,
        source: DownloadError,
    },
}

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Cannot install {package}: {reason}")]
    Invalid { package: String, reason: String },

    #[error("Failed to create {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to fetch makefile: {0}")]
    Makefile(#[source] FetchError),

    #[error("Resolution failed at {step}: {0}", step = .0.step())]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Worker failed: {0}")]
    Worker(String),
}

impl InstallError {
    pub(crate) fn invalid(package: &str, reason: impl fmt::Display) -> Self {
        Self::Invalid {
            package: package.to_string(),
            reason: reason.to_string(),
        }
    }
}
