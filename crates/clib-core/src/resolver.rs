//! Remote package resolution.
//!
//! Turns a slug into a [`Package`] by discovering an API endpoint, looking the
//! descriptor up through the contents API, downloading it and reconciling the
//! requested identity with what the descriptor declares.

use clib_schema::slug::{content_url_from_repo, format_repo};
use clib_schema::{PACKAGE_JSON, Package, Slug};

use crate::context::Context;
use crate::error::ResolveError;
use crate::io::download::{contents_download_url, fetch_text};

/// Resolves slugs against the configured API endpoints.
#[derive(Debug, Clone)]
pub struct Resolver {
    ctx: Context,
}

impl Resolver {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Resolve `slug` (`[owner/]name[@version]`) into a package.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] naming the step that failed. No partially
    /// built package is ever returned.
    pub async fn resolve(&self, slug: &str) -> Result<Package, ResolveError> {
        self.ctx.reporter.resolving(slug);
        let slug = Slug::parse(slug, self.ctx.defaults())?;
        let repo = slug.repo();

        let _permit = self.ctx.permit().await;

        let endpoint = self
            .ctx
            .discovery
            .discover(&slug.owner, &slug.name)
            .await
            .ok_or_else(|| ResolveError::NoEndpoint { repo: repo.clone() })?;

        let metadata_url = format!(
            "{endpoint}repos/{}/{}/contents/{PACKAGE_JSON}?{}",
            slug.owner, slug.name, slug.version
        );
        tracing::debug!("looking up {metadata_url}");
        let download_url = contents_download_url(&self.ctx.client, &metadata_url)
            .await
            .map_err(|source| ResolveError::Metadata {
                repo: repo.clone(),
                source,
            })?;

        let json = fetch_text(&self.ctx.client, &download_url)
            .await
            .map_err(|source| ResolveError::Descriptor {
                repo: repo.clone(),
                source,
            })?;

        let mut pkg = Package::from_json(&json, self.ctx.verbose, self.ctx.defaults())
            .map_err(|source| ResolveError::Build { repo, source })?;
        pkg.api_endpoint = Some(endpoint);

        self.reconcile(&mut pkg, slug);
        tracing::debug!("resolved {}", pkg.slug().unwrap_or_default());
        Ok(pkg)
    }

    /// Merge the requested identity into the descriptor-built package.
    fn reconcile(&self, pkg: &mut Package, slug: Slug) {
        let Slug {
            owner,
            name,
            version,
        } = slug;

        pkg.version = Some(match pkg.version.take() {
            Some(declared) if !self.ctx.defaults().is_default_version(&version) => {
                tracing::debug!("forcing version number: {version} ({declared})");
                version
            }
            Some(declared) => declared,
            None => version,
        });

        let author = pkg.author.get_or_insert(owner).clone();
        let name = pkg.name.get_or_insert(name).clone();

        let canonical = format_repo(&author, &name);
        match pkg.repo.as_deref() {
            Some(declared) if declared != canonical => {
                let version = pkg.version.as_deref().unwrap_or_default();
                pkg.content_url = Some(content_url_from_repo(declared, version));
            }
            Some(_) => {}
            None => {
                pkg.repo = Some(canonical);
                pkg.repo_name.get_or_insert(name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mockito::{Matcher, Mock, Server};

    use crate::config::Config;
    use crate::error::ResolveStep;
    use crate::reporter::NullReporter;

    fn resolver(server: &Server) -> Resolver {
        let config = Config::default().with_endpoints([format!("{}/", server.url())]);
        let ctx = Context::with_client(
            reqwest::Client::new(),
            config,
            Arc::new(NullReporter),
            false,
        );
        Resolver::new(ctx)
    }

    async fn serve_descriptor(
        server: &mut Server,
        owner: &str,
        name: &str,
        json: &str,
    ) -> Vec<Mock> {
        let raw_path = format!("/raw/{owner}/{name}/package.json");
        let entry = format!(
            r#"{{"name": "package.json", "download_url": "{}{raw_path}"}}"#,
            server.url()
        );
        let probe = server
            .mock("GET", format!("/repos/{owner}/{name}").as_str())
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let contents = server
            .mock("GET", Matcher::Regex(format!(r"^/repos/{owner}/{name}/contents/package\.json")))
            .with_status(200)
            .with_body(entry)
            .create_async()
            .await;
        let raw = server
            .mock("GET", raw_path.as_str())
            .with_status(200)
            .with_body(json)
            .create_async()
            .await;
        vec![probe, contents, raw]
    }

    #[tokio::test]
    async fn test_requested_version_wins_over_declared() {
        let mut server = Server::new_async().await;
        let _mocks = serve_descriptor(
            &mut server,
            "acme",
            "foo",
            r#"{"name": "foo", "version": "1.0.0", "repo": "acme/foo"}"#,
        )
        .await;

        let pkg = resolver(&server).resolve("acme/foo@2.0.0").await.unwrap();
        assert_eq!(pkg.version.as_deref(), Some("2.0.0"));
        assert_eq!(pkg.author.as_deref(), Some("acme"));
        assert_eq!(pkg.name.as_deref(), Some("foo"));
        assert_eq!(pkg.api_endpoint, Some(format!("{}/", server.url())));
        assert!(pkg.content_url.is_none());
    }

    #[tokio::test]
    async fn test_declared_version_kept_for_default_branch() {
        let mut server = Server::new_async().await;
        let _mocks = serve_descriptor(
            &mut server,
            "acme",
            "foo",
            r#"{"name": "foo", "version": "1.4.0", "repo": "acme/foo"}"#,
        )
        .await;

        let pkg = resolver(&server).resolve("acme/foo").await.unwrap();
        assert_eq!(pkg.version.as_deref(), Some("1.4.0"));
    }

    #[tokio::test]
    async fn test_missing_fields_taken_from_slug() {
        let mut server = Server::new_async().await;
        let _mocks =
            serve_descriptor(&mut server, "acme", "bar", r#"{"src": ["bar.c", "bar.h"]}"#).await;

        let pkg = resolver(&server).resolve("acme/bar@*").await.unwrap();
        assert_eq!(pkg.version.as_deref(), Some("master"));
        assert_eq!(pkg.author.as_deref(), Some("acme"));
        assert_eq!(pkg.name.as_deref(), Some("bar"));
        assert_eq!(pkg.repo.as_deref(), Some("acme/bar"));
        assert_eq!(pkg.repo_name.as_deref(), Some("bar"));
        assert_eq!(pkg.src, vec!["bar.c", "bar.h"]);
        assert!(pkg.content_url.is_none());
    }

    #[tokio::test]
    async fn test_foreign_repo_gets_content_url() {
        let mut server = Server::new_async().await;
        let _mocks = serve_descriptor(
            &mut server,
            "acme",
            "foo",
            r#"{"name": "foo", "version": "1.0.0", "repo": "upstream/libfoo"}"#,
        )
        .await;

        let pkg = resolver(&server).resolve("acme/foo").await.unwrap();
        // A declared author wins over the slug owner.
        assert_eq!(pkg.author.as_deref(), Some("upstream"));
        assert_eq!(
            pkg.content_url.as_deref(),
            Some("https://raw.githubusercontent.com/upstream/libfoo/1.0.0")
        );
    }

    #[tokio::test]
    async fn test_discovery_failure_skips_content_fetch() {
        let mut server = Server::new_async().await;
        let _probe = server
            .mock("GET", "/repos/acme/foo")
            .with_status(404)
            .create_async()
            .await;
        let contents = server
            .mock("GET", Matcher::Regex(r"^/repos/acme/foo/contents/".to_string()))
            .expect(0)
            .create_async()
            .await;

        let err = resolver(&server).resolve("acme/foo").await.unwrap_err();
        assert_eq!(err.step(), ResolveStep::Discovery);
        contents.assert_async().await;
    }

    #[tokio::test]
    async fn test_metadata_failure() {
        let mut server = Server::new_async().await;
        let _probe = server
            .mock("GET", "/repos/acme/foo")
            .with_status(200)
            .create_async()
            .await;
        let _contents = server
            .mock("GET", Matcher::Regex(r"^/repos/acme/foo/contents/".to_string()))
            .with_status(404)
            .create_async()
            .await;

        let err = resolver(&server).resolve("acme/foo").await.unwrap_err();
        assert_eq!(err.step(), ResolveStep::Metadata);
    }

    #[tokio::test]
    async fn test_invalid_descriptor() {
        let mut server = Server::new_async().await;
        let _mocks = serve_descriptor(&mut server, "acme", "foo", r#"{"src": [1, 2]}"#).await;

        let err = resolver(&server).resolve("acme/foo").await.unwrap_err();
        assert_eq!(err.step(), ResolveStep::Build);
    }

    #[tokio::test]
    async fn test_invalid_slug() {
        let server = Server::new_async().await;
        let err = resolver(&server).resolve("acme/").await.unwrap_err();
        assert_eq!(err.step(), ResolveStep::ParseSlug);
    }
}
