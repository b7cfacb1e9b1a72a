//! Version conflict guard.
//!
//! Before a package overwrites `<dest>/<name>/package.json`, the version
//! recorded there is compared with the candidate. Equal or older candidates
//! leave the existing install untouched.

use std::io::ErrorKind;
use std::path::Path;

use clib_schema::version::is_upgrade;
use clib_schema::{Defaults, Package};

/// Verdict of [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Nothing installed, or the candidate is newer.
    Proceed,
    /// An equal or newer version is already installed.
    Skip { installed: String },
}

/// Compare the candidate version with the descriptor at `package_json`.
///
/// A descriptor that cannot be read or parsed does not block the install.
pub async fn check(
    package_json: &Path,
    candidate: &str,
    verbose: bool,
    defaults: &Defaults,
) -> Guard {
    let json = match tokio::fs::read_to_string(package_json).await {
        Ok(json) => json,
        Err(e) if e.kind() == ErrorKind::NotFound => return Guard::Proceed,
        Err(e) => {
            tracing::warn!("unable to read {}: {e}", package_json.display());
            return Guard::Proceed;
        }
    };

    let local = match Package::from_json(&json, verbose, defaults) {
        Ok(local) => local,
        Err(e) => {
            tracing::warn!("ignoring installed {}: {e}", package_json.display());
            return Guard::Proceed;
        }
    };

    let installed = local.version_or(&defaults.version);
    if is_upgrade(installed, candidate) {
        tracing::debug!("upgrading {installed} -> {candidate}");
        Guard::Proceed
    } else {
        Guard::Skip {
            installed: installed.to_string(),
        }
    }
}
