//! Reporter trait for dependency injection
//!
//! This trait allows core logic to report progress and status without
//! being coupled to a specific terminal implementation.

use crate::install::InstallReport;

pub trait Reporter: Send + Sync {
    /// A slug has been handed to the resolver.
    fn resolving(&self, slug: &str);

    /// A file of `package` is being fetched.
    fn fetching(&self, package: &str, file: &str);

    /// A package finished installing (its dependencies may still follow).
    fn installed(&self, package: &str, version: &str);

    /// A package was left alone because an equal or newer version is installed.
    fn skipped(&self, package: &str, version: &str, installed: &str);

    /// Resolution, fetch or install of `subject` failed.
    fn failed(&self, subject: &str, reason: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display a final summary of a whole install run.
    fn summary(&self, report: &InstallReport, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn resolving(&self, slug: &str) {
        (**self).resolving(slug);
    }
    fn fetching(&self, package: &str, file: &str) {
        (**self).fetching(package, file);
    }
    fn installed(&self, package: &str, version: &str) {
        (**self).installed(package, version);
    }
    fn skipped(&self, package: &str, version: &str, installed: &str) {
        (**self).skipped(package, version, installed);
    }
    fn failed(&self, subject: &str, reason: &str) {
        (**self).failed(subject, reason);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn summary(&self, report: &InstallReport, elapsed_secs: f64) {
        (**self).summary(report, elapsed_secs);
    }
}

/// A no-op reporter for silent operations (e.g., library use, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn resolving(&self, _: &str) {}
    fn fetching(&self, _: &str, _: &str) {}
    fn installed(&self, _: &str, _: &str) {}
    fn skipped(&self, _: &str, _: &str, _: &str) {}
    fn failed(&self, _: &str, _: &str) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: &InstallReport, _: f64) {}
}
