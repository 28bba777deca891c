//! Page lookup for a resolved site: URL first, route pattern second, and a
//! status-class scan for the error path.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::repos::{PageRepo, RepoError};
use crate::domain::{Configuration, Page};

/// Outcome of a request-time page lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum PageMatch {
    /// A CMS page found under its URL, served directly.
    Cms(Page),
    /// A page bound to the matched route pattern of the current handler.
    Route(Page),
}

impl PageMatch {
    pub fn page(&self) -> &Page {
        match self {
            PageMatch::Cms(page) | PageMatch::Route(page) => page,
        }
    }

    pub fn into_page(self) -> Page {
        match self {
            PageMatch::Cms(page) | PageMatch::Route(page) => page,
        }
    }
}

#[derive(Debug, Error)]
pub enum PageResolveError {
    #[error("page not found")]
    NotFound,
    #[error(transparent)]
    Store(RepoError),
}

impl From<RepoError> for PageResolveError {
    fn from(err: RepoError) -> Self {
        if err.is_not_found() {
            PageResolveError::NotFound
        } else {
            PageResolveError::Store(err)
        }
    }
}

pub struct PageResolver {
    page_repo: Arc<dyn PageRepo>,
}

impl PageResolver {
    pub fn new(page_repo: Arc<dyn PageRepo>) -> Self {
        Self { page_repo }
    }

    /// Resolve the page for `url_path` on `site_id`, falling back to the
    /// matched `route_pattern`. `now: None` bypasses the enablement window
    /// for editing sessions.
    pub async fn resolve(
        &self,
        site_id: i64,
        url_path: &str,
        route_pattern: &str,
        now: Option<OffsetDateTime>,
    ) -> Result<PageMatch, PageResolveError> {
        match self.page_repo.find_by_url(site_id, url_path, now).await {
            Ok(page) if page.is_cms() => {
                debug!(
                    target = "varco::page_resolver",
                    site_id,
                    url = url_path,
                    "cms page resolved by url"
                );
                return Ok(PageMatch::Cms(page));
            }
            Ok(_) => {}
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        let page = self
            .page_repo
            .find_by_pattern(site_id, route_pattern, now)
            .await?;
        debug!(
            target = "varco::page_resolver",
            site_id,
            pattern = route_pattern,
            "page resolved by route pattern"
        );
        Ok(PageMatch::Route(page))
    }

    /// Resolve the configured error page for an HTTP `status`. Scans the
    /// status-class pattern map in its deterministic key order and returns
    /// the first pattern claiming the status.
    pub async fn find_by_status(
        &self,
        cfg: &Configuration,
        site_id: i64,
        status: u16,
        now: Option<OffsetDateTime>,
    ) -> Result<Page, PageResolveError> {
        let pattern = cfg
            .error_pattern_for_status(status)
            .ok_or(PageResolveError::NotFound)?;
        Ok(self.page_repo.find_by_pattern(site_id, pattern, now).await?)
    }

    /// Resolve a page directly under its URL, without the pattern fallback.
    pub async fn find_by_url(
        &self,
        site_id: i64,
        url_path: &str,
        now: Option<OffsetDateTime>,
    ) -> Result<Page, PageResolveError> {
        Ok(self.page_repo.find_by_url(site_id, url_path, now).await?)
    }

    /// Resolve a page by an explicit pattern, e.g. the internal fallback.
    pub async fn find_by_pattern(
        &self,
        site_id: i64,
        pattern: &str,
        now: Option<OffsetDateTime>,
    ) -> Result<Page, PageResolveError> {
        Ok(self.page_repo.find_by_pattern(site_id, pattern, now).await?)
    }
}
