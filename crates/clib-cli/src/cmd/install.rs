//! `clib-install` command

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context as _, Result};
use clib_core::install::InstallReport;
use clib_core::{Config, Context, InstallOptions, Installer, Reporter};
use clib_schema::{PACKAGE_JSON, Package};

use crate::Cli;
use crate::ui::ConsoleReporter;

/// Load the configuration named on the command line, else the default one.
///
/// A missing default configuration is not an error; discovery then only
/// sees endpoints passed with `--api-endpoint`.
pub async fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match crate::config_path() {
            Some(path) => Config::load_optional(&path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?
                .unwrap_or_default(),
            None => Config::default(),
        },
    };
    Ok(config.with_endpoints(cli.api_endpoints.iter().cloned()))
}

/// Run an install. Returns whether every package installed cleanly.
pub async fn install(cli: &Cli) -> Result<bool> {
    let reporter = Arc::new(ConsoleReporter::new(cli.verbose));
    let config = load_config(cli).await?;
    if !config.has_endpoints() {
        reporter.warning("no api endpoints configured; every lookup will fail");
    }

    let project = if cli.packages.is_empty() {
        Some(read_project(Path::new(PACKAGE_JSON), cli.verbose, &config)?)
    } else {
        None
    };

    let ctx = Context::new(config, reporter.clone(), cli.verbose)
        .context("Failed to initialize HTTP client")?;
    let options = InstallOptions {
        pin_file_refs: cli.pin_file_refs,
        aggregate_path: cli.aggregate.clone(),
    };
    let installer = Installer::new(ctx, options);

    let start = Instant::now();
    let mut report = InstallReport::default();
    match &project {
        Some(pkg) => {
            report.merge(installer.install_dependencies(pkg, &cli.out).await);
            if cli.dev {
                report.merge(installer.install_development(pkg, &cli.out).await);
            }
        }
        None => {
            for slug in &cli.packages {
                report.merge(installer.install_slug(slug, &cli.out).await);
            }
        }
    }

    reporter.summary(&report, start.elapsed().as_secs_f64());
    Ok(report.is_success())
}

fn read_project(path: &Path, verbose: bool, config: &Config) -> Result<Package> {
    let pkg = Package::from_file(path, verbose, &config.defaults())
        .with_context(|| format!("Failed to read {}", path.display()))?;
    tracing::debug!("installing dependencies of {}", pkg.display_name());
    Ok(pkg)
}
