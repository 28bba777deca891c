//! Site and page selector middlewares.
//!
//! Ordering within a request is fixed: the skipper middlewares run first,
//! then `select_site`, then `select_page`, then the hybrid decorator ahead
//! of the route handlers.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::header::{HOST, LOCATION};
use axum::http::{Request, Response, StatusCode};
use axum::middleware::Next;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::page_resolver::{PageMatch, PageResolveError, PageResolver};
use crate::application::repos::ConfigurationRepo;
use crate::application::site_resolver::{SiteRequest, SiteResolveError, SiteResolver};

use super::context::PagesContext;
use super::decorate::BufferPool;
use super::error_handler::{self, PagesError};
use super::handler::{PageRenderer, handle_page};
use super::request::{self, Tls};

#[derive(Clone)]
pub struct PagesState {
    pub cfg_repo: Arc<dyn ConfigurationRepo>,
    pub site_resolver: Arc<SiteResolver>,
    pub page_resolver: Arc<PageResolver>,
    pub renderer: Arc<dyn PageRenderer>,
    pub buffers: Arc<BufferPool>,
}

/// Request host from the Host header, falling back to the URI authority.
pub(super) fn request_host<B>(request: &Request<B>) -> String {
    let authority = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default();
    request::host(&authority)
}

pub(super) fn site_request<B>(request: &Request<B>, path: &str) -> SiteRequest {
    let tls = request
        .extensions()
        .get::<Tls>()
        .copied()
        .unwrap_or_default()
        .0;
    SiteRequest {
        host: request_host(request),
        scheme: request::scheme(request.headers(), tls),
        path: path.to_string(),
        accept_language: request::accept_language(request.headers()),
    }
}

fn route_pattern(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

fn redirect(status: u16, url: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::FOUND))
        .header(LOCATION, url)
        .body(Body::empty())
        .unwrap_or_else(|_| {
            Response::new(Body::empty())
        })
}

pub(super) async fn fail(
    state: &PagesState,
    mut request: Request<Body>,
    ctx: PagesContext,
    err: PagesError,
) -> Response<Body> {
    ctx.store(&mut request);
    // The body is never read on the error path; dropping it keeps the
    // borrowed request `Sync` so the middleware futures stay `Send`.
    let request = request.map(|_| ());
    error_handler::respond(state, &request, err).await
}

/// Evaluate the site-selection skippers and set the context flag.
pub async fn skip_site(
    State(state): State<PagesState>,
    mut request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let mut ctx = PagesContext::of(&request);
    let cfg = match state.cfg_repo.load().await {
        Ok(cfg) => cfg,
        Err(err) => {
            return fail(&state, request, ctx, PagesError::internal(err)).await;
        }
    };
    if cfg.site_skippers.skip(request.uri().path()) {
        ctx.skip_site = true;
        ctx.store(&mut request);
    }
    next.run(request).await
}

/// Evaluate the page-selection skippers and set the context flag.
pub async fn skip_page(
    State(state): State<PagesState>,
    mut request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let mut ctx = PagesContext::of(&request);
    let cfg = match state.cfg_repo.load().await {
        Ok(cfg) => cfg,
        Err(err) => {
            return fail(&state, request, ctx, PagesError::internal(err)).await;
        }
    };
    if cfg.page_skippers.skip(request.uri().path()) {
        ctx.skip_page = true;
        ctx.store(&mut request);
    }
    next.run(request).await
}

/// Resolve the tenant and substitute the residual path into the context.
pub async fn select_site(
    State(state): State<PagesState>,
    mut request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let mut ctx = PagesContext::of(&request);
    if ctx.route_pattern.is_empty() {
        ctx.route_pattern = route_pattern(&request);
    }
    if ctx.path.is_empty() {
        ctx.path = request.uri().path().to_string();
    }

    if ctx.skip_site {
        ctx.store(&mut request);
        return next.run(request).await;
    }

    let cfg = match state.cfg_repo.load().await {
        Ok(cfg) => cfg,
        Err(err) => return fail(&state, request, ctx, PagesError::internal(err)).await,
    };
    ctx.debug = cfg.debug;

    if cfg.ignore_uri(request.uri().path()) {
        ctx.store(&mut request);
        return next.run(request).await;
    }

    let site_request = site_request(&request, &ctx.path);
    match state.site_resolver.retrieve(&site_request).await {
        Ok(resolved) => {
            ctx.site = Some(resolved.site);
            ctx.path = resolved.path;
            ctx.store(&mut request);
            next.run(request).await
        }
        Err(SiteResolveError::Redirect { status, url }) => {
            debug!(target = "varco::http", status, url, "site redirect");
            redirect(status, &url)
        }
        Err(SiteResolveError::NotFound) => {
            fail(&state, request, ctx, PagesError::SiteNotFound).await
        }
        Err(SiteResolveError::Store(err)) => {
            fail(&state, request, ctx, PagesError::internal(err)).await
        }
    }
}

/// Resolve the page for the selected site. Direct CMS hits are rendered
/// immediately; hybrid pages ride along in the context for their route
/// handler and the decorator.
pub async fn select_page(
    State(state): State<PagesState>,
    mut request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let mut ctx = PagesContext::of(&request);
    if ctx.skip_site || ctx.skip_page {
        return next.run(request).await;
    }

    let cfg = match state.cfg_repo.load().await {
        Ok(cfg) => cfg,
        Err(err) => return fail(&state, request, ctx, PagesError::internal(err)).await,
    };

    if cfg.ignore_uri(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(site) = ctx.site.clone() else {
        return fail(&state, request, ctx, PagesError::SiteNotFound).await;
    };

    let now = editor_now(&ctx);

    if cfg.ignore_pattern(&ctx.route_pattern) {
        // Only a direct CMS hit can be served when the route pattern is
        // ignored; everything else passes through.
        match state.page_resolver.find_by_url(site.id, &ctx.path, now).await {
            Ok(page) if page.is_cms() => {
                ctx.page = Some(page);
                return handle_page(state.renderer.as_ref(), &ctx).await;
            }
            Ok(_) | Err(PageResolveError::NotFound) => {
                ctx.store(&mut request);
                return next.run(request).await;
            }
            Err(err) => return fail(&state, request, ctx, PagesError::internal(err)).await,
        }
    }

    match state
        .page_resolver
        .resolve(site.id, &ctx.path, &ctx.route_pattern, now)
        .await
    {
        Ok(PageMatch::Cms(page)) => {
            ctx.page = Some(page);
            handle_page(state.renderer.as_ref(), &ctx).await
        }
        Ok(PageMatch::Route(page)) => {
            ctx.page = Some(page);
            ctx.store(&mut request);
            next.run(request).await
        }
        Err(PageResolveError::NotFound) => {
            fail(&state, request, ctx, PagesError::PageNotFound).await
        }
        Err(err) => fail(&state, request, ctx, PagesError::internal(err)).await,
    }
}

/// `None` bypasses the enablement window for editing sessions.
pub(super) fn editor_now(ctx: &PagesContext) -> Option<OffsetDateTime> {
    if ctx.editor {
        None
    } else {
        Some(OffsetDateTime::now_utc())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_prefers_host_header() {
        let request = Request::builder()
            .uri("http://fallback.test/path")
            .header(HOST, "example.com:443")
            .body(Body::empty())
            .expect("request");
        assert_eq!(request_host(&request), "example.com");
    }

    #[test]
    fn host_falls_back_to_authority() {
        let request = Request::builder()
            .uri("http://fallback.test:8080/path")
            .body(Body::empty())
            .expect("request");
        assert_eq!(request_host(&request), "fallback.test:8080");
    }

    #[test]
    fn editor_bypasses_window() {
        let mut ctx = PagesContext::default();
        assert!(editor_now(&ctx).is_some());
        ctx.editor = true;
        assert!(editor_now(&ctx).is_none());
    }

    #[test]
    fn redirect_carries_location() {
        let response = redirect(301, "http://example.com/blog");
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(LOCATION).map(|v| v.as_bytes()),
            Some(b"http://example.com/blog".as_slice())
        );
    }
}
