//! Shared types for clib.
//!
//! Everything in this crate is free of network access: slug tokenizing,
//! repository keys, the package descriptor model and version ordering.
//! Side effects (HTTP, installation) live in `clib-core`.

pub mod package;
pub mod repo;
pub mod slug;
pub mod version;

// Re-exports
pub use package::{Dependency, Package, PackageError};
pub use repo::RepoKey;
pub use slug::{Defaults, Slug, SlugError};

/// Owner assumed when a slug or repository string has no `owner/` prefix.
pub const DEFAULT_OWNER: &str = "clibs";

/// Branch name used when no version is given, and the target of `*`.
pub const DEFAULT_VERSION: &str = "master";

/// Raw-content host used to build package content URLs.
pub const GITHUB_CONTENT_URL: &str = "https://raw.githubusercontent.com/";

/// File name of a package descriptor, both remotely and on disk.
pub const PACKAGE_JSON: &str = "package.json";
