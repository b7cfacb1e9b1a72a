//! Version ordering for installed-vs-candidate comparisons.
//!
//! Descriptor versions are loosely formatted (`1.2`, `v0.3.0`, or a branch
//! name such as `master`). Anything [`semver`] cannot read after padding is
//! treated as `0.0.0`, so two branch names compare equal and any real release
//! outranks a branch.

use std::cmp::Ordering;

use semver::Version;

/// Parse a descriptor version, padding missing minor/patch components.
pub fn parse_lenient(text: &str) -> Version {
    let text = text.trim();
    let text = text.strip_prefix('v').unwrap_or(text);

    // Pad only the numeric core; keep any pre-release/build suffix intact.
    let split = text.find(['-', '+']).unwrap_or(text.len());
    let (core, suffix) = text.split_at(split);
    let mut padded = core.to_string();
    for _ in core.split('.').count()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);

    Version::parse(&padded).unwrap_or_else(|_| Version::new(0, 0, 0))
}

/// Compare two descriptor versions.
pub fn compare(a: &str, b: &str) -> Ordering {
    parse_lenient(a).cmp(&parse_lenient(b))
}

/// Whether `candidate` is strictly newer than `installed`.
pub fn is_upgrade(installed: &str, candidate: &str) -> bool {
    compare(candidate, installed) == Ordering::Greater
}
