//! clib-install - install C packages from source repositories
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Resolves `owner/name@version` slugs against a code-hosting API and copies
//! each package's declared sources into a local `deps/` tree, together with an
//! automake fragment per package.
//!
//! # Directory Layout
//!
//! ```text
//! ./
//! ├── package.json          # project descriptor (dependencies, development)
//! ├── deps.mk               # one include line per installed package
//! └── deps/
//!     └── <name>/
//!         ├── package.json  # installed descriptor, verbatim
//!         ├── <name>.mk     # deps__a_SOURCES += ...
//!         └── <sources>
//! ```

pub mod cmd;
pub mod ui;

pub use clib_core::paths::*;

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "clib-install")]
#[command(author, version, about = "Install C packages and their dependencies")]
pub struct Cli {
    /// Packages to install: [owner/]name[@version]. Without any, installs the
    /// dependencies of ./package.json
    pub packages: Vec<String>,

    /// Directory packages are installed into
    #[arg(short, long, default_value = "deps")]
    pub out: PathBuf,

    /// Also install the development dependencies of ./package.json
    #[arg(short, long)]
    pub dev: bool,

    /// Configuration file (defaults to $CLIB_HOME/config.json or ~/.clib/config.json)
    #[arg(short, long, env = "CLIB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Candidate API endpoint, probed after the configured ones
    #[arg(long = "api-endpoint", value_name = "URL")]
    pub api_endpoints: Vec<String>,

    /// Fetch source files at the package version instead of the default branch
    #[arg(long)]
    pub pin_file_refs: bool,

    /// Aggregate makefile that includes every package fragment
    #[arg(long, default_value = "deps.mk")]
    pub aggregate: PathBuf,

    /// Show per-file progress
    #[arg(short, long)]
    pub verbose: bool,
}
