//! Dependency graph installation.
//!
//! The entry point is [`Installer::install`], which writes one package into
//! `<dest>/<name>/` and then walks its `dependencies` depth-first.
//!
//! Each dependency level runs in two phases: every dependency is resolved
//! concurrently behind one join-all barrier, then the resolved packages are
//! installed one after another in declaration order. Installs are therefore
//! never concurrent with each other, which keeps edits of the aggregate
//! `deps.mk` single-writer. Within one package, source files are fetched
//! concurrently.
//!
//! Nothing short-circuits: a failing sibling never cancels or skips the
//! others. Every outcome ends up in the returned [`InstallReport`].
//!
//! A package without sources gets no `<name>.mk` fragment and no `deps.mk`
//! include line, even when its descriptor carries an explicit empty `src`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use clib_schema::slug::content_url;
use clib_schema::{Dependency, PACKAGE_JSON, Package};
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::task::JoinHandle;

use crate::context::Context;
use crate::error::InstallError;
use crate::fetch::fetch_file;
use crate::fragment::{register_fragment, write_fragment};
use crate::guard::{self, Guard};
use crate::paths::default_aggregate_path;
use crate::resolver::Resolver;

/// Knobs for an install run.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Fetch files at the package version instead of the default branch.
    pub pin_file_refs: bool,
    /// Aggregate makefile that includes every package fragment.
    pub aggregate_path: PathBuf,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            pin_file_refs: false,
            aggregate_path: default_aggregate_path(),
        }
    }
}

/// A package that was written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

/// A package left alone because an equal or newer version is installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub name: String,
    pub version: String,
    pub installed: String,
}

/// Something that could not be resolved, fetched or installed.
#[derive(Debug)]
pub struct Failure {
    /// Slug, package name or `package:file` the failure is about.
    pub subject: String,
    pub error: InstallError,
}

/// Every outcome of an install run, in the order it happened.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub installed: Vec<Installed>,
    pub skipped: Vec<Skipped>,
    pub failures: Vec<Failure>,
}

impl InstallReport {
    /// True when nothing failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty() && self.skipped.is_empty() && self.failures.is_empty()
    }

    /// Append everything from `other`.
    pub fn merge(&mut self, other: InstallReport) {
        self.installed.extend(other.installed);
        self.skipped.extend(other.skipped);
        self.failures.extend(other.failures);
    }

    pub(crate) fn fail(&mut self, ctx: &Context, subject: impl Into<String>, error: InstallError) {
        let subject = subject.into();
        tracing::error!("{subject}: {error}");
        ctx.reporter.failed(&subject, &error.to_string());
        self.failures.push(Failure { subject, error });
    }
}

/// Installs packages and their dependency trees.
#[derive(Debug, Clone)]
pub struct Installer {
    ctx: Context,
    resolver: Resolver,
    options: Arc<InstallOptions>,
}

impl Installer {
    pub fn new(ctx: Context, options: InstallOptions) -> Self {
        Self {
            resolver: Resolver::new(ctx.clone()),
            ctx,
            options: Arc::new(options),
        }
    }

    /// Resolve `slug` and install the result into `dest`.
    ///
    /// Resolution failures are recorded in the report like any other.
    pub async fn install_slug(&self, slug: &str, dest: &Path) -> InstallReport {
        let mut report = InstallReport::default();
        match self.resolver.resolve(slug).await {
            Ok(pkg) => match self.install(pkg, dest).await {
                Ok(installed) => report.merge(installed),
                Err(e) => report.fail(&self.ctx, slug, e),
            },
            Err(e) => report.fail(&self.ctx, slug, e.into()),
        }
        report
    }

    /// Install `pkg` into `<dest>/<name>/`, then its `dependencies`.
    ///
    /// Source-file failures and dependency failures are collected in the
    /// report. The returned error covers this package alone: a directory or
    /// descriptor that cannot be written, or a makefile that cannot be fetched.
    ///
    /// # Errors
    ///
    /// Returns an [`InstallError`] if this package could not be installed.
    pub fn install<'a>(
        &'a self,
        pkg: Package,
        dest: &'a Path,
    ) -> BoxFuture<'a, Result<InstallReport, InstallError>> {
        async move {
            let mut pkg = pkg;
            let name = pkg
                .name
                .clone()
                .ok_or_else(|| InstallError::invalid(pkg.display_name(), "missing name"))?;
            if !is_single_component(&name) {
                return Err(InstallError::invalid(&name, "name is not a plain directory name"));
            }
            let version = pkg.version_or(&self.ctx.defaults().version).to_string();

            let pkg_dir = dest.join(&name);
            tracing::debug!("mkdir -p {}", pkg_dir.display());
            tokio::fs::create_dir_all(&pkg_dir)
                .await
                .map_err(|source| InstallError::CreateDir {
                    path: pkg_dir.clone(),
                    source,
                })?;

            if pkg.content_url.is_none() {
                let (Some(author), Some(repo_name)) = (&pkg.author, &pkg.repo_name) else {
                    return Err(InstallError::invalid(&name, "missing author or repo name"));
                };
                pkg.content_url = Some(content_url(author, repo_name, &version));
            }

            let mut report = InstallReport::default();

            let package_json = pkg_dir.join(PACKAGE_JSON);
            let defaults = self.ctx.defaults();
            if let Guard::Skip { installed } =
                guard::check(&package_json, &version, self.ctx.verbose, defaults).await
            {
                if self.ctx.verbose {
                    tracing::info!(
                        "skipping: new v{version} is equal or lower than installed v{installed} for {}",
                        pkg.repo.as_deref().unwrap_or(&name)
                    );
                }
                self.ctx.reporter.skipped(&name, &version, &installed);
                report.skipped.push(Skipped {
                    name,
                    version,
                    installed,
                });
                return Ok(report);
            }

            tracing::debug!("write: {}", package_json.display());
            tokio::fs::write(&package_json, &pkg.json)
                .await
                .map_err(|source| InstallError::Write {
                    path: package_json.clone(),
                    source,
                })?;

            let git_ref = if self.options.pin_file_refs {
                version.clone()
            } else {
                defaults.version.clone()
            };

            if let Some(makefile) = &pkg.makefile {
                tracing::debug!("fetch: {}/{makefile}", pkg.display_name());
                fetch_file(&self.ctx, &pkg, &pkg_dir, makefile, &git_ref)
                    .await
                    .map_err(InstallError::Makefile)?;
            }

            let pkg = Arc::new(pkg);
            if !pkg.src.is_empty() {
                self.fetch_sources(&pkg, &pkg_dir, &git_ref, &mut report)
                    .await;
                write_fragment(&pkg_dir, &name, &pkg.src).await?;
                register_fragment(&self.options.aggregate_path, &name).await?;
            }

            self.ctx.reporter.installed(&name, &version);
            report.installed.push(Installed {
                name,
                version,
                path: pkg_dir,
            });

            report.merge(self.install_dependencies(&pkg, dest).await);
            Ok(report)
        }
        .boxed()
    }

    /// Install the runtime `dependencies` of `pkg` into `dest`.
    pub async fn install_dependencies(&self, pkg: &Package, dest: &Path) -> InstallReport {
        self.install_packages(&pkg.dependencies, dest).await
    }

    /// Install the `development` dependencies of `pkg` into `dest`.
    ///
    /// Runs the same algorithm as [`Installer::install_dependencies`]; the
    /// runtime dependencies of each development dependency follow as usual.
    pub async fn install_development(&self, pkg: &Package, dest: &Path) -> InstallReport {
        self.install_packages(&pkg.development, dest).await
    }

    async fn install_packages(&self, deps: &[Dependency], dest: &Path) -> InstallReport {
        let mut report = InstallReport::default();
        if deps.is_empty() {
            return report;
        }

        // Phase 1: resolve every dependency of this level.
        let handles: Vec<(String, JoinHandle<_>)> = deps
            .iter()
            .map(|dep| {
                let slug = dep.slug();
                let resolver = self.resolver.clone();
                let task_slug = slug.clone();
                let handle = tokio::spawn(async move { resolver.resolve(&task_slug).await });
                (slug, handle)
            })
            .collect();

        let mut resolved = Vec::with_capacity(handles.len());
        for (slug, handle) in handles {
            match handle.await {
                Ok(Ok(pkg)) => resolved.push((slug, pkg)),
                Ok(Err(e)) => report.fail(&self.ctx, slug, e.into()),
                Err(e) => report.fail(&self.ctx, slug, InstallError::Worker(e.to_string())),
            }
        }

        // Phase 2: install sequentially, depth-first.
        for (slug, pkg) in resolved {
            match self.install(pkg, dest).await {
                Ok(installed) => report.merge(installed),
                Err(e) => report.fail(&self.ctx, slug, e),
            }
        }
        report
    }

    async fn fetch_sources(
        &self,
        pkg: &Arc<Package>,
        pkg_dir: &Path,
        git_ref: &str,
        report: &mut InstallReport,
    ) {
        let handles: Vec<(String, JoinHandle<_>)> = pkg
            .src
            .iter()
            .map(|file| {
                let ctx = self.ctx.clone();
                let pkg = Arc::clone(pkg);
                let pkg_dir = pkg_dir.to_path_buf();
                let git_ref = git_ref.to_string();
                let task_file = file.clone();
                let handle = tokio::spawn(async move {
                    fetch_file(&ctx, &pkg, &pkg_dir, &task_file, &git_ref).await
                });
                (file.clone(), handle)
            })
            .collect();

        let name = pkg.display_name();
        for (file, handle) in handles {
            let subject = format!("{name}:{file}");
            match handle.await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => report.fail(&self.ctx, subject, e.into()),
                Err(e) => report.fail(&self.ctx, subject, InstallError::Worker(e.to_string())),
            }
        }
    }
}

/// True when `name` is exactly one normal path component.
fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use clib_schema::Defaults;
    use mockito::{Matcher, Mock, Server};

    use crate::config::Config;
    use crate::error::FetchError;
    use crate::reporter::NullReporter;

    fn installer(server: &Server, aggregate: &Path) -> Installer {
        let config = Config::default().with_endpoints([format!("{}/", server.url())]);
        let ctx = Context::with_client(
            reqwest::Client::new(),
            config,
            Arc::new(NullReporter),
            false,
        );
        let options = InstallOptions {
            aggregate_path: aggregate.to_path_buf(),
            ..InstallOptions::default()
        };
        Installer::new(ctx, options)
    }

    fn package(server: &Server, json: &str) -> Package {
        let mut pkg = Package::from_json(json, false, &Defaults::default()).unwrap();
        pkg.api_endpoint = Some(format!("{}/", server.url()));
        pkg
    }

    /// Serve `acme/<name>`: endpoint probe, descriptor and every source file.
    async fn serve_package(
        server: &mut Server,
        name: &str,
        json: &str,
        files: &[&str],
    ) -> Vec<Mock> {
        let url = server.url();
        let mut mocks = vec![
            server
                .mock("GET", format!("/repos/acme/{name}").as_str())
                .with_status(200)
                .create_async()
                .await,
            server
                .mock(
                    "GET",
                    Matcher::Regex(format!(r"^/repos/acme/{name}/contents/package\.json")),
                )
                .with_status(200)
                .with_body(format!(
                    r#"{{"download_url": "{url}/raw/acme/{name}/package.json"}}"#
                ))
                .create_async()
                .await,
            server
                .mock("GET", format!("/raw/acme/{name}/package.json").as_str())
                .with_status(200)
                .with_body(json)
                .create_async()
                .await,
        ];
        for file in files {
            mocks.extend(serve_file(server, name, file).await);
        }
        mocks
    }

    async fn serve_file(server: &mut Server, name: &str, file: &str) -> Vec<Mock> {
        let url = server.url();
        vec![
            server
                .mock(
                    "GET",
                    Matcher::Regex(format!(r"^/repos/acme/{name}/contents/{file}")),
                )
                .with_status(200)
                .with_body(format!(
                    r#"{{"download_url": "{url}/raw/acme/{name}/{file}"}}"#
                ))
                .expect(1)
                .create_async()
                .await,
            server
                .mock("GET", format!("/raw/acme/{name}/{file}").as_str())
                .with_status(200)
                .with_body(format!("/* {file} */\n"))
                .expect(1)
                .create_async()
                .await,
        ]
    }

    #[tokio::test]
    async fn test_install_fetches_every_source() {
        let mut server = Server::new_async().await;
        let mut mocks = Vec::new();
        for file in ["a.c", "b.c", "c.h"] {
            mocks.extend(serve_file(&mut server, "foo", file).await);
        }

        let tmp = tempfile::tempdir().unwrap();
        let deps = tmp.path().join("deps");
        let aggregate = tmp.path().join("deps.mk");
        let pkg = package(
            &server,
            r#"{"name": "foo", "repo": "acme/foo", "version": "1.0.0", "src": ["a.c", "b.c", "c.h"]}"#,
        );

        let report = installer(&server, &aggregate)
            .install(pkg, &deps)
            .await
            .unwrap();

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.installed.len(), 1);
        for mock in &mocks {
            mock.assert_async().await;
        }
        for file in ["a.c", "b.c", "c.h"] {
            assert!(deps.join("foo").join(file).exists(), "{file}");
        }
        assert!(deps.join("foo/package.json").exists());
        assert_eq!(
            std::fs::read_to_string(deps.join("foo/foo.mk")).unwrap(),
            "deps__a_SOURCES += deps/foo/a.c deps/foo/b.c deps/foo/c.h \n"
        );
        assert_eq!(
            std::fs::read_to_string(&aggregate).unwrap(),
            "include $(top_srcdir)/deps/foo/foo.mk\n"
        );
    }

    #[tokio::test]
    async fn test_source_failure_is_reported_not_fatal() {
        let mut server = Server::new_async().await;
        let _ok = serve_file(&mut server, "foo", "a.c").await;
        let _missing = server
            .mock("GET", Matcher::Regex(r"^/repos/acme/foo/contents/gone\.c".to_string()))
            .with_status(404)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let deps = tmp.path().join("deps");
        let pkg = package(
            &server,
            r#"{"name": "foo", "repo": "acme/foo", "src": ["a.c", "gone.c"]}"#,
        );

        let report = installer(&server, &tmp.path().join("deps.mk"))
            .install(pkg, &deps)
            .await
            .unwrap();

        assert_eq!(report.installed.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subject, "foo:gone.c");
        assert!(deps.join("foo/a.c").exists());
    }

    #[tokio::test]
    async fn test_makefile_failure_aborts_package() {
        let mut server = Server::new_async().await;
        let _missing = server
            .mock("GET", Matcher::Regex(r"^/repos/acme/foo/contents/Makefile".to_string()))
            .with_status(404)
            .create_async()
            .await;
        let sources = server
            .mock("GET", Matcher::Regex(r"^/repos/acme/foo/contents/a\.c".to_string()))
            .expect(0)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let pkg = package(
            &server,
            r#"{"name": "foo", "repo": "acme/foo", "makefile": "Makefile", "src": ["a.c"]}"#,
        );

        let err = installer(&server, &tmp.path().join("deps.mk"))
            .install(pkg, &tmp.path().join("deps"))
            .await
            .unwrap_err();

        assert!(matches!(err, InstallError::Makefile(FetchError::Contents { .. })));
        sources.assert_async().await;
    }

    #[tokio::test]
    async fn test_installed_version_is_not_downgraded() {
        let mut server = Server::new_async().await;
        let sources = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let deps = tmp.path().join("deps");
        let existing = r#"{"name": "foo", "repo": "acme/foo", "version": "1.2.0"}"#;
        std::fs::create_dir_all(deps.join("foo")).unwrap();
        std::fs::write(deps.join("foo/package.json"), existing).unwrap();

        let pkg = package(
            &server,
            r#"{"name": "foo", "repo": "acme/foo", "version": "1.1.0", "src": ["a.c"]}"#,
        );
        let report = installer(&server, &tmp.path().join("deps.mk"))
            .install(pkg, &deps)
            .await
            .unwrap();

        assert!(report.installed.is_empty());
        assert_eq!(
            report.skipped,
            vec![Skipped {
                name: "foo".into(),
                version: "1.1.0".into(),
                installed: "1.2.0".into(),
            }]
        );
        assert_eq!(
            std::fs::read_to_string(deps.join("foo/package.json")).unwrap(),
            existing
        );
        sources.assert_async().await;
    }

    #[test]
    fn test_single_component_names() {
        assert!(is_single_component("list"));
        assert!(is_single_component("foo.c"));
        for name in ["", ".", "..", "../x", "/abs", "a/b", "./x"] {
            assert!(!is_single_component(name), "{name:?}");
        }
    }

    #[tokio::test]
    async fn test_name_cannot_escape_destination() {
        let server = Server::new_async().await;
        let tmp = tempfile::tempdir().unwrap();
        let deps = tmp.path().join("deps");
        let aggregate = tmp.path().join("deps.mk");

        for name in ["../escaped", "/abs/escaped", "nested/escaped"] {
            let pkg = package(
                &server,
                &format!(r#"{{"name": "{name}", "repo": "acme/foo", "version": "1.0.0"}}"#),
            );
            let err = installer(&server, &aggregate)
                .install(pkg, &deps)
                .await
                .unwrap_err();
            assert!(matches!(err, InstallError::Invalid { .. }), "{name}: {err}");
        }

        assert!(!tmp.path().join("escaped").exists());
        assert!(!deps.exists());
        assert!(!aggregate.exists());
    }

    #[tokio::test]
    async fn test_empty_src_writes_no_fragment() {
        let server = Server::new_async().await;
        let tmp = tempfile::tempdir().unwrap();
        let deps = tmp.path().join("deps");
        let aggregate = tmp.path().join("deps.mk");
        let pkg = package(
            &server,
            r#"{"name": "foo", "repo": "acme/foo", "version": "1.0.0", "src": []}"#,
        );

        let report = installer(&server, &aggregate)
            .install(pkg, &deps)
            .await
            .unwrap();

        assert_eq!(report.installed.len(), 1);
        assert!(deps.join("foo/package.json").exists());
        assert!(!deps.join("foo/foo.mk").exists());
        assert!(!aggregate.exists());
    }

    #[tokio::test]
    async fn test_development_only_package_installs_nothing() {
        let mut server = Server::new_async().await;
        let nothing = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let pkg = package(
            &server,
            r#"{"name": "app", "development": {"acme/tester": "1.0.0"}}"#,
        );
        let report = installer(&server, &tmp.path().join("deps.mk"))
            .install_dependencies(&pkg, &tmp.path().join("deps"))
            .await;

        assert!(report.is_empty());
        nothing.assert_async().await;
    }

    #[tokio::test]
    async fn test_install_development() {
        let mut server = Server::new_async().await;
        let _mocks = serve_package(
            &mut server,
            "tester",
            r#"{"name": "tester", "repo": "acme/tester", "version": "1.0.0", "src": ["tester.h"]}"#,
            &["tester.h"],
        )
        .await;

        let tmp = tempfile::tempdir().unwrap();
        let deps = tmp.path().join("deps");
        let pkg = package(
            &server,
            r#"{"name": "app", "development": {"acme/tester": "1.0.0"}}"#,
        );
        let report = installer(&server, &tmp.path().join("deps.mk"))
            .install_development(&pkg, &deps)
            .await;

        assert!(report.is_success(), "{:?}", report.failures);
        assert_eq!(report.installed.len(), 1);
        assert_eq!(report.installed[0].name, "tester");
        assert_eq!(report.installed[0].version, "1.0.0");
        assert!(deps.join("tester/tester.h").exists());
    }

    #[tokio::test]
    async fn test_failures_do_not_cancel_siblings() {
        let mut server = Server::new_async().await;
        let _mocks = serve_package(
            &mut server,
            "good",
            r#"{"name": "good", "repo": "acme/good", "version": "1.0.0"}"#,
            &[],
        )
        .await;
        let _missing = server
            .mock("GET", "/repos/acme/missing")
            .with_status(404)
            .create_async()
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let deps = tmp.path().join("deps");
        let pkg = package(
            &server,
            r#"{"name": "app", "dependencies": {"acme/missing": "*", "acme/good": "1.0.0"}}"#,
        );
        let report = installer(&server, &tmp.path().join("deps.mk"))
            .install_dependencies(&pkg, &deps)
            .await;

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].subject, "acme/missing@master");
        assert!(matches!(report.failures[0].error, InstallError::Resolve(_)));
        assert_eq!(report.installed.len(), 1);
        assert!(deps.join("good/package.json").exists());
    }

    #[tokio::test]
    async fn test_dependency_cycle_terminates() {
        let mut server = Server::new_async().await;
        let _a = serve_package(
            &mut server,
            "a",
            r#"{"name": "a", "repo": "acme/a", "version": "1.0.0", "dependencies": {"acme/b": "1.0.0"}}"#,
            &[],
        )
        .await;
        let _b = serve_package(
            &mut server,
            "b",
            r#"{"name": "b", "repo": "acme/b", "version": "1.0.0", "dependencies": {"acme/a": "1.0.0"}}"#,
            &[],
        )
        .await;

        let tmp = tempfile::tempdir().unwrap();
        let report = installer(&server, &tmp.path().join("deps.mk"))
            .install_slug("acme/a@1.0.0", &tmp.path().join("deps"))
            .await;

        assert!(report.is_success(), "{:?}", report.failures);
        let installed: Vec<_> = report.installed.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(installed, ["a", "b"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "a");
    }
}
