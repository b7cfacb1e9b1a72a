//! Single-file fetch through the contents API.
//!
//! A declared source path is looked up as
//! `<api_endpoint>repos/<author>/<name>/contents/<path>?ref=<ref>`, and the
//! `download_url` of that entry is streamed to disk.
//!
//! Paths prefixed with `@` keep their directory structure below the package
//! directory; every other path is flattened to its basename.

use std::path::{Component, Path, PathBuf};

use clib_schema::Package;

use crate::context::Context;
use crate::error::FetchError;
use crate::io::download::{contents_download_url, download_to_file};

/// Prefix marking a source path whose subdirectories are preserved.
pub const KEEP_PATH_PREFIX: char = '@';

/// Contents-API URL for `file` of `owner/name` at `git_ref`.
pub fn contents_url(endpoint: &str, owner: &str, name: &str, file: &str, git_ref: &str) -> String {
    let file = file.strip_prefix(KEEP_PATH_PREFIX).unwrap_or(file);
    format!("{endpoint}repos/{owner}/{name}/contents/{file}?ref={git_ref}")
}

/// Where a declared source path lands below `dest_dir`.
///
/// Returns the directory to create and the file path to write. The directory
/// mirrors the declared path's parent in both modes; only `@` paths write
/// into it.
///
/// # Errors
///
/// Returns [`FetchError::InvalidPath`] for empty, absolute or parent-relative
/// paths and for paths without a file name.
pub fn destination(dest_dir: &Path, file: &str) -> Result<(PathBuf, PathBuf), FetchError> {
    let invalid = || FetchError::InvalidPath {
        file: file.to_string(),
    };

    let (keep, stripped) = match file.strip_prefix(KEEP_PATH_PREFIX) {
        Some(rest) => (true, Path::new(rest)),
        None => (false, Path::new(file)),
    };
    if !stripped
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(invalid());
    }
    let base = stripped.file_name().ok_or_else(invalid)?;

    let dir = match stripped.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => dest_dir.join(parent),
        None => dest_dir.to_path_buf(),
    };
    let path = if keep {
        dest_dir.join(stripped)
    } else {
        dest_dir.join(base)
    };
    Ok((dir, path))
}

/// Fetch one declared `file` of `pkg` into `dest_dir`.
///
/// Nothing is written when the contents lookup fails.
///
/// # Errors
///
/// Returns a [`FetchError`] when the package lacks an endpoint or identity,
/// the path is invalid, or any request or filesystem step fails.
pub async fn fetch_file(
    ctx: &Context,
    pkg: &Package,
    dest_dir: &Path,
    file: &str,
    git_ref: &str,
) -> Result<PathBuf, FetchError> {
    let endpoint = pkg
        .api_endpoint
        .as_deref()
        .ok_or_else(|| FetchError::NoEndpoint {
            file: file.to_string(),
        })?;
    let (Some(author), Some(name)) = (pkg.author.as_deref(), pkg.name.as_deref()) else {
        return Err(FetchError::MissingIdentity {
            file: file.to_string(),
        });
    };
    let (dir, path) = destination(dest_dir, file)?;

    tracing::debug!("fetch file: {}/{file}", pkg.repo.as_deref().unwrap_or(name));
    ctx.reporter.fetching(name, file);

    let _permit = ctx.permit().await;

    let url = contents_url(endpoint, author, name, file, git_ref);
    let download_url = contents_download_url(&ctx.client, &url)
        .await
        .map_err(|source| FetchError::Contents {
            file: file.to_string(),
            source,
        })?;

    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| FetchError::CreateDir {
            path: dir.clone(),
            source,
        })?;

    if ctx.verbose {
        tracing::info!("fetch {download_url} -> {}", path.display());
    }
    download_to_file(&ctx.client, &download_url, &path)
        .await
        .map_err(|source| FetchError::Download {
            file: file.to_string(),
            path: path.clone(),
            source,
        })?;
    if ctx.verbose {
        tracing::info!("save {}", path.display());
    }

    Ok(path)
}
