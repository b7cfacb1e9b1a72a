//! Core library for clib.
//!
//! Resolves `owner/name@version` slugs against a code-hosting API, fetches
//! package sources and installs dependency trees into a local `deps/`
//! directory. Progress flows through the [`Reporter`] trait and `tracing`.

pub mod config;
pub mod context;
pub mod discovery;
pub mod error;
pub mod fetch;
pub mod fragment;
pub mod guard;
pub mod install;
pub mod io;
pub mod paths;
pub mod reporter;
pub mod resolver;

pub use config::Config;
pub use context::Context;
pub use error::{FetchError, InstallError, ResolveError, ResolveStep};
pub use install::{InstallOptions, InstallReport, Installer};
pub use paths::*;
pub use reporter::{NullReporter, Reporter};
pub use resolver::Resolver;

/// User Agent string for API and content requests
pub const USER_AGENT: &str = concat!("clib-core/", env!("CARGO_PKG_VERSION"));
