//! Tenant selection: maps an inbound request to a site and a residual path.
//!
//! Four strategies, selected by the runtime configuration. Candidate hosts
//! always include `localhost` and `127.0.0.1` so a single localhost tenant
//! can act as a development fallback across any host.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::locale::{parse_accept_language, preferred_locale};
use crate::application::repos::{ConfigurationRepo, RepoError, SiteRepo};
use crate::domain::{MultisiteStrategy, Site};
use crate::util::regex::path_prefix;

/// Permanent redirect status for canonical default-site URLs.
pub const REDIRECT_PERMANENT: u16 = 301;
/// Temporary redirect status for locale-negotiated sites.
pub const REDIRECT_TEMPORARY: u16 = 302;

/// The pieces of an inbound request tenant selection needs.
#[derive(Debug, Clone, Default)]
pub struct SiteRequest {
    /// Request host with default ports stripped.
    pub host: String,
    /// Effective scheme (`http` or `https`).
    pub scheme: String,
    /// Request URL path.
    pub path: String,
    /// Raw `Accept-Language` header, possibly empty.
    pub accept_language: String,
}

impl SiteRequest {
    pub fn languages(&self) -> Vec<String> {
        parse_accept_language(&self.accept_language)
    }

    fn negotiated_locale(&self, fallback: &str) -> String {
        self.languages()
            .into_iter()
            .next()
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// A resolved tenant plus the residual path to continue routing with.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteMatch {
    pub site: Site,
    pub path: String,
}

#[derive(Debug, Error)]
pub enum SiteResolveError {
    #[error("site not found")]
    NotFound,
    /// Not a failure: a control-flow instruction the HTTP layer translates
    /// into a redirect response.
    #[error("redirect [{status}] {url}")]
    Redirect { status: u16, url: String },
    #[error(transparent)]
    Store(#[from] RepoError),
}

pub struct SiteResolver {
    cfg_repo: Arc<dyn ConfigurationRepo>,
    site_repo: Arc<dyn SiteRepo>,
}

impl SiteResolver {
    pub fn new(cfg_repo: Arc<dyn ConfigurationRepo>, site_repo: Arc<dyn SiteRepo>) -> Self {
        Self {
            cfg_repo,
            site_repo,
        }
    }

    /// Resolve the tenant for `request` using the configured strategy.
    pub async fn retrieve(&self, request: &SiteRequest) -> Result<SiteMatch, SiteResolveError> {
        let cfg = self.cfg_repo.load().await?;
        let fallback = cfg.fallback_locale.as_str();

        let result = match cfg.multisite {
            MultisiteStrategy::Host => self.host(request, fallback).await,
            MultisiteStrategy::HostByLocale => self.host_by_locale(request, fallback).await,
            MultisiteStrategy::HostWithPath => self.host_with_path(request, fallback).await,
            MultisiteStrategy::HostWithPathByLocale => {
                self.host_with_path_by_locale(request, fallback).await
            }
        };

        if let Ok(resolved) = &result {
            debug!(
                target = "varco::site_resolver",
                strategy = cfg.multisite.as_str(),
                site = %resolved.site,
                path = resolved.path,
                "site resolved"
            );
        }
        result
    }

    async fn candidates(&self, request: &SiteRequest) -> Result<Vec<Site>, RepoError> {
        let hosts = candidate_hosts(&request.host);
        self.site_repo
            .find_by_hosts(&hosts, Some(OffsetDateTime::now_utc()))
            .await
    }

    /// Strategy `host`: first non-localhost site, else the first localhost
    /// site. The path passes through untouched.
    async fn host(
        &self,
        request: &SiteRequest,
        fallback: &str,
    ) -> Result<SiteMatch, SiteResolveError> {
        let sites = self.candidates(request).await?;

        let site = sites
            .iter()
            .find(|site| !site.is_localhost())
            .or_else(|| sites.first())
            .cloned()
            .ok_or(SiteResolveError::NotFound)?;

        Ok(SiteMatch {
            site: self.bind(site, request, fallback),
            path: request.path.clone(),
        })
    }

    /// Strategy `host-by-locale`: candidates up to and including the first
    /// localhost entry, then locale negotiation across them.
    async fn host_by_locale(
        &self,
        request: &SiteRequest,
        fallback: &str,
    ) -> Result<SiteMatch, SiteResolveError> {
        let mut sites = self.candidates(request).await?;

        if let Some(index) = sites.iter().position(Site::is_localhost) {
            sites.truncate(index + 1);
        }

        match preferred_site(request, &sites, fallback) {
            Some(site) => Ok(SiteMatch {
                site,
                path: request.path.clone(),
            }),
            None => Err(SiteResolveError::NotFound),
        }
    }

    /// Strategy `host-with-path`: regex-match each candidate's relative path
    /// against the request path; unmatched requests redirect permanently to
    /// the first default site's canonical URL when one exists.
    async fn host_with_path(
        &self,
        request: &SiteRequest,
        fallback: &str,
    ) -> Result<SiteMatch, SiteResolveError> {
        let sites = self.candidates(request).await?;

        let default_site = sites.iter().find(|site| site.is_default);
        if let Some((site, residual)) = match_path(&sites, &request.path) {
            let site = self.bind(site.clone(), request, fallback);
            return Ok(SiteMatch {
                site,
                path: residual,
            });
        }

        if let Some(default_site) = default_site {
            let default_site = default_site
                .clone()
                .with_host(&request.scheme, &request.host);
            return Err(SiteResolveError::Redirect {
                status: REDIRECT_PERMANENT,
                url: default_site.url(),
            });
        }
        Err(SiteResolveError::NotFound)
    }

    /// Strategy `host-with-path-by-locale`: the path-matching loop, but an
    /// unmatched request redirects temporarily to the locale-negotiated site
    /// instead of failing.
    async fn host_with_path_by_locale(
        &self,
        request: &SiteRequest,
        fallback: &str,
    ) -> Result<SiteMatch, SiteResolveError> {
        let sites = self.candidates(request).await?;

        if let Some((site, residual)) = match_path(&sites, &request.path) {
            let site = site.clone().with_host(&request.scheme, &request.host);
            return Ok(SiteMatch {
                site,
                path: residual,
            });
        }

        if !sites.is_empty() {
            if let Some(site) = preferred_site(request, &sites, fallback) {
                return Err(SiteResolveError::Redirect {
                    status: REDIRECT_TEMPORARY,
                    url: site.url(),
                });
            }
        }
        Err(SiteResolveError::NotFound)
    }

    /// Bind the request's scheme/host and fill an empty locale from the
    /// request's language preferences.
    fn bind(&self, site: Site, request: &SiteRequest, fallback: &str) -> Site {
        let mut site = site.with_host(&request.scheme, &request.host);
        if site.locale.is_empty() {
            site.locale = request.negotiated_locale(fallback);
        }
        site
    }
}

pub fn candidate_hosts(host: &str) -> Vec<String> {
    vec![host.to_string(), "localhost".into(), "127.0.0.1".into()]
}

/// First non-localhost site whose relative path matches, else the first
/// localhost match, together with the residual path (`/` when the remainder
/// is empty).
fn match_path<'a>(sites: &'a [Site], path: &str) -> Option<(&'a Site, String)> {
    let mut localhost_match: Option<(&Site, String)> = None;

    for site in sites {
        let Some(re) = path_prefix(&site.relative_path) else {
            continue;
        };
        let Some(caps) = re.captures(path) else {
            continue;
        };
        let residual = match caps.get(2).map(|m| m.as_str()) {
            Some("") | None => "/".to_string(),
            Some(rest) => rest.to_string(),
        };

        if !site.is_localhost() {
            return Some((site, residual));
        }
        if localhost_match.is_none() {
            localhost_match = Some((site, residual));
        }
    }
    localhost_match
}

/// Locale-negotiated site selection across `sites`.
fn preferred_site(request: &SiteRequest, sites: &[Site], fallback: &str) -> Option<Site> {
    let candidates: Vec<String> = sites
        .iter()
        .filter(|site| !site.locale.is_empty())
        .map(|site| site.locale.clone())
        .collect();

    let locale = preferred_locale(&request.languages(), &candidates, fallback);
    let hosts = candidate_hosts(&request.host);

    sites
        .iter()
        .find(|site| site.locale == locale && hosts.contains(&site.host))
        .map(|site| site.clone().with_host(&request.scheme, &request.host))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::domain::Configuration;

    struct FixedConfig(Configuration);

    #[async_trait]
    impl ConfigurationRepo for FixedConfig {
        async fn load(&self) -> Result<Configuration, RepoError> {
            Ok(self.0.clone())
        }

        async fn save(&self, _configuration: &Configuration) -> Result<(), RepoError> {
            Ok(())
        }
    }

    struct FixedSites {
        sites: Vec<Site>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl FixedSites {
        fn new(sites: Vec<Site>) -> Self {
            Self {
                sites,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SiteRepo for FixedSites {
        async fn find_by_id(&self, id: i64) -> Result<Site, RepoError> {
            self.sites
                .iter()
                .find(|s| s.id == id)
                .cloned()
                .ok_or(RepoError::NotFound)
        }

        async fn find_by_hosts(
            &self,
            hosts: &[String],
            _now: Option<OffsetDateTime>,
        ) -> Result<Vec<Site>, RepoError> {
            self.calls.lock().unwrap().push(hosts.to_vec());
            Ok(self
                .sites
                .iter()
                .filter(|s| hosts.contains(&s.host))
                .cloned()
                .collect())
        }

        async fn update(&self, _site: &Site) -> Result<(), RepoError> {
            Ok(())
        }

        async fn delete(&self, _ids: &[i64]) -> Result<(), RepoError> {
            Ok(())
        }
    }

    fn site(id: i64, host: &str) -> Site {
        Site {
            id,
            name: format!("site-{id}"),
            host: host.into(),
            published: Some(datetime!(2024-01-01 00:00:00 UTC)),
            ..Site::default()
        }
    }

    fn resolver(strategy: MultisiteStrategy, sites: Vec<Site>) -> SiteResolver {
        let cfg = Configuration {
            multisite: strategy,
            ..Configuration::default()
        };
        SiteResolver::new(
            Arc::new(FixedConfig(cfg)),
            Arc::new(FixedSites::new(sites)),
        )
    }

    fn request(host: &str, path: &str) -> SiteRequest {
        SiteRequest {
            host: host.into(),
            scheme: "http".into(),
            path: path.into(),
            accept_language: String::new(),
        }
    }

    #[tokio::test]
    async fn host_strategy_returns_matching_site_and_path_unchanged() {
        let resolver = resolver(
            MultisiteStrategy::Host,
            vec![site(1, "example.com")],
        );
        let resolved = resolver
            .retrieve(&request("example.com", "/blog/post"))
            .await
            .expect("resolved");
        assert_eq!(resolved.site.id, 1);
        assert_eq!(resolved.path, "/blog/post");
    }

    #[tokio::test]
    async fn host_strategy_prefers_non_localhost() {
        let resolver = resolver(
            MultisiteStrategy::Host,
            vec![site(1, "localhost"), site(2, "example.com")],
        );
        let resolved = resolver
            .retrieve(&request("example.com", "/"))
            .await
            .expect("resolved");
        assert_eq!(resolved.site.id, 2);
    }

    #[tokio::test]
    async fn host_strategy_falls_back_to_first_localhost() {
        let resolver = resolver(
            MultisiteStrategy::Host,
            vec![site(1, "localhost"), site(2, "127.0.0.1")],
        );
        let resolved = resolver
            .retrieve(&request("unknown.test", "/"))
            .await
            .expect("resolved");
        assert_eq!(resolved.site.id, 1);
    }

    #[tokio::test]
    async fn host_strategy_fills_locale_from_request() {
        let resolver = resolver(MultisiteStrategy::Host, vec![site(1, "example.com")]);
        let mut req = request("example.com", "/");
        req.accept_language = "de-DE,en;q=0.5".into();
        let resolved = resolver.retrieve(&req).await.expect("resolved");
        assert_eq!(resolved.site.locale, "de_DE");
    }

    #[tokio::test]
    async fn candidate_hosts_always_include_development_fallbacks() {
        let sites = Arc::new(FixedSites::new(vec![site(1, "example.com")]));
        let resolver = SiteResolver::new(
            Arc::new(FixedConfig(Configuration::default())),
            sites.clone(),
        );
        resolver
            .retrieve(&request("example.com", "/"))
            .await
            .expect("resolved");
        let calls = sites.calls.lock().unwrap();
        assert_eq!(calls[0], vec!["example.com", "localhost", "127.0.0.1"]);
    }

    #[tokio::test]
    async fn host_by_locale_negotiates_across_candidates() {
        let mut fr = site(1, "example.com");
        fr.locale = "fr_FR".into();
        let mut en = site(2, "example.com");
        en.locale = "en_US".into();

        let resolver = resolver(MultisiteStrategy::HostByLocale, vec![fr, en]);
        let mut req = request("example.com", "/");
        req.accept_language = "fr;q=0.9,en;q=0.5".into();
        let resolved = resolver.retrieve(&req).await.expect("resolved");
        assert_eq!(resolved.site.locale, "fr_FR");
        assert_eq!(resolved.site.id, 1);
    }

    #[tokio::test]
    async fn host_by_locale_truncates_after_first_localhost() {
        let mut en = site(1, "localhost");
        en.locale = "en_US".into();
        let mut fr = site(2, "example.com");
        fr.locale = "fr_FR".into();

        // The fr site sorts after the localhost entry, so negotiation never
        // sees it.
        let resolver = resolver(MultisiteStrategy::HostByLocale, vec![en, fr]);
        let mut req = request("example.com", "/");
        req.accept_language = "fr_FR".into();
        let resolved = resolver.retrieve(&req).await.expect("resolved");
        assert_eq!(resolved.site.id, 1);
    }

    #[tokio::test]
    async fn host_with_path_matches_prefix_and_returns_residual() {
        let mut blog = site(1, "example.com");
        blog.relative_path = "/blog".into();
        let mut root = site(2, "example.com");
        root.relative_path = "/".into();
        root.is_default = true;

        let resolver = resolver(MultisiteStrategy::HostWithPath, vec![blog, root]);
        let resolved = resolver
            .retrieve(&request("example.com", "/blog"))
            .await
            .expect("resolved");
        assert_eq!(resolved.site.id, 1);
        assert_eq!(resolved.path, "/");

        let resolved = resolver
            .retrieve(&request("example.com", "/blog/2024/hello"))
            .await
            .expect("resolved");
        assert_eq!(resolved.path, "/2024/hello");
    }

    #[tokio::test]
    async fn host_with_path_redirects_to_default_site_on_miss() {
        let mut blog = site(1, "example.com");
        blog.relative_path = "/blog".into();
        blog.is_default = true;

        let resolver = resolver(MultisiteStrategy::HostWithPath, vec![blog]);
        let err = resolver
            .retrieve(&request("example.com", "/elsewhere"))
            .await
            .expect_err("redirect");
        match err {
            SiteResolveError::Redirect { status, url } => {
                assert_eq!(status, REDIRECT_PERMANENT);
                assert_eq!(url, "http://example.com/blog");
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn host_with_path_prefers_non_localhost_match() {
        let mut dev = site(1, "localhost");
        dev.relative_path = "/".into();
        let mut prod = site(2, "example.com");
        prod.relative_path = "/".into();

        let resolver = resolver(MultisiteStrategy::HostWithPath, vec![dev, prod]);
        let resolved = resolver
            .retrieve(&request("example.com", "/anything"))
            .await
            .expect("resolved");
        assert_eq!(resolved.site.id, 2);
    }

    #[tokio::test]
    async fn host_with_path_not_found_without_default() {
        let mut blog = site(1, "example.com");
        blog.relative_path = "/blog".into();

        let resolver = resolver(MultisiteStrategy::HostWithPath, vec![blog]);
        let err = resolver
            .retrieve(&request("example.com", "/elsewhere"))
            .await
            .expect_err("not found");
        assert!(matches!(err, SiteResolveError::NotFound));
    }

    #[tokio::test]
    async fn host_with_path_by_locale_redirects_temporarily_on_miss() {
        let mut fr = site(1, "example.com");
        fr.relative_path = "/fr".into();
        fr.locale = "fr_FR".into();

        let resolver = resolver(MultisiteStrategy::HostWithPathByLocale, vec![fr]);
        let mut req = request("example.com", "/elsewhere");
        req.accept_language = "fr".into();
        let err = resolver.retrieve(&req).await.expect_err("redirect");
        match err {
            SiteResolveError::Redirect { status, url } => {
                assert_eq!(status, REDIRECT_TEMPORARY);
                assert_eq!(url, "http://example.com/fr");
            }
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_candidates_is_not_found() {
        let resolver = resolver(MultisiteStrategy::Host, vec![]);
        let err = resolver
            .retrieve(&request("example.com", "/"))
            .await
            .expect_err("not found");
        assert!(matches!(err, SiteResolveError::NotFound));
    }
}
