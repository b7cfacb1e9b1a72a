//! Console reporter
//!
//! Prints one styled line per event. Install progress is emitted from many
//! tasks at once, so every event is rendered to a single string first and
//! written with one call while stdout is locked.

use std::io::Write;

use clib_core::Reporter;
use clib_core::install::InstallReport;
use crossterm::style::{StyledContent, Stylize};

/// Width of the right-aligned action column.
const ACTION_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn line(action: StyledContent<String>, detail: &str) {
        let mut out = std::io::stdout().lock();
        // A closed pipe must not abort the install.
        writeln!(out, "{action} {detail}").ok();
    }

    fn err_line(action: StyledContent<String>, detail: &str) {
        let mut out = std::io::stderr().lock();
        writeln!(out, "{action} {detail}").ok();
    }
}

fn action(label: &str) -> String {
    format!("{label:>ACTION_WIDTH$}")
}

impl Reporter for ConsoleReporter {
    fn resolving(&self, slug: &str) {
        if self.verbose {
            Self::line(action("resolve").dark_grey(), slug);
        }
    }

    fn fetching(&self, package: &str, file: &str) {
        if self.verbose {
            Self::line(action("fetch").cyan(), &format!("{package}:{file}"));
        }
    }

    fn installed(&self, package: &str, version: &str) {
        Self::line(
            action("install").green().bold(),
            &format!("{package} {}", version.dark_grey()),
        );
    }

    fn skipped(&self, package: &str, version: &str, installed: &str) {
        Self::line(
            action("skip").yellow(),
            &format!("{package} {version} (installed {installed})"),
        );
    }

    fn failed(&self, subject: &str, reason: &str) {
        Self::err_line(action("error").red().bold(), &format!("{subject}: {reason}"));
    }

    fn warning(&self, msg: &str) {
        Self::err_line(action("warning").yellow().bold(), msg);
    }

    fn summary(&self, report: &InstallReport, elapsed_secs: f64) {
        let counts = format!(
            "{} installed, {} skipped, {} failed in {elapsed_secs:.2}s",
            report.installed.len(),
            report.skipped.len(),
            report.failures.len()
        );
        let label = if report.is_success() {
            action("done").green().bold()
        } else {
            action("done").red().bold()
        };
        Self::line(label, &counts);
    }
}
