//! Automake build fragments.
//!
//! Every installed package with sources gets `<pkg_dir>/<name>.mk` listing
//! them under [`SOURCES_VARIABLE`], and the aggregate `deps.mk` gets exactly
//! one `include` line per package.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::InstallError;
use crate::fetch::KEEP_PATH_PREFIX;

/// Automake variable the fragment appends to.
pub const SOURCES_VARIABLE: &str = "deps__a_SOURCES";

/// Source path as referenced from the project root.
pub fn source_entry(name: &str, file: &str) -> String {
    let file = match file.strip_prefix(KEEP_PATH_PREFIX) {
        Some(kept) => kept.to_string(),
        None => Path::new(file)
            .file_name()
            .map_or_else(|| file.to_string(), |f| f.to_string_lossy().into_owned()),
    };
    format!("deps/{name}/{file}")
}

/// `deps__a_SOURCES += deps/<name>/<file> ...`, one entry per source in order.
pub fn render_fragment(name: &str, src: &[String]) -> String {
    let mut out = format!("{SOURCES_VARIABLE} += ");
    for file in src {
        out.push_str(&source_entry(name, file));
        out.push(' ');
    }
    out.push('\n');
    out
}

/// Write `<pkg_dir>/<name>.mk`, replacing any previous fragment.
///
/// # Errors
///
/// Returns [`InstallError::Write`] if the file cannot be written.
pub async fn write_fragment(
    pkg_dir: &Path,
    name: &str,
    src: &[String],
) -> Result<PathBuf, InstallError> {
    let path = pkg_dir.join(format!("{name}.mk"));
    fs::write(&path, render_fragment(name, src))
        .await
        .map_err(|source| InstallError::Write {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// The aggregate `include` line for `name`.
pub fn include_line(name: &str) -> String {
    format!("include $(top_srcdir)/deps/{name}/{name}.mk")
}

/// Drop every existing include line for `name` from `contents`, then append
/// a fresh one.
pub fn with_include(contents: &str, name: &str) -> String {
    let include = include_line(name);
    let mut out: String = contents
        .lines()
        .filter(|line| line.trim() != include)
        .flat_map(|line| [line, "\n"])
        .collect();
    out.push_str(&include);
    out.push('\n');
    out
}

/// Register the fragment of `name` in the aggregate file at `aggregate`.
///
/// A missing aggregate file is created.
///
/// # Errors
///
/// Returns [`InstallError::Write`] if the file cannot be read or written.
pub async fn register_fragment(aggregate: &Path, name: &str) -> Result<(), InstallError> {
    let write_error = |source| InstallError::Write {
        path: aggregate.to_path_buf(),
        source,
    };

    let contents = match fs::read_to_string(aggregate).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(write_error(e)),
    };
    fs::write(aggregate, with_include(&contents, name))
        .await
        .map_err(write_error)?;
    tracing::debug!("registered {} in {}", include_line(name), aggregate.display());
    Ok(())
}
