//! Error response rendering.
//!
//! Not-found and store failures end up here and are turned into the best
//! available error page: the configured status-class page, the content
//! creation page for editors hitting a 404, or the internal error page.
//! Every step of that chain degrades toward the internal page and finally
//! to a plain-text response, so this handler itself never fails.

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode, header::CONTENT_TYPE};
use serde_json::{Map, Value, json};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::error;

use crate::application::locale::parse_accept_language;
use crate::domain::page::{PAGE_ERROR_INTERNAL, PAGE_INTERNAL_CREATE};
use crate::domain::{Configuration, Page, Site};

use super::context::PagesContext;
use super::handler::{handle_page, plain};
use super::middleware::{PagesState, editor_now, site_request};
use super::request;

#[derive(Debug, Error)]
pub enum PagesError {
    #[error("site not found")]
    SiteNotFound,
    #[error("page not found")]
    PageNotFound,
    #[error("internal server error: {0}")]
    Internal(String),
}

impl PagesError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        PagesError::Internal(err.to_string())
    }

    pub fn status(&self) -> u16 {
        match self {
            PagesError::PageNotFound => 404,
            PagesError::SiteNotFound | PagesError::Internal(_) => 500,
        }
    }

    /// Errors that always route to the internal error page.
    fn is_internal(&self) -> bool {
        matches!(self, PagesError::SiteNotFound | PagesError::Internal(_))
    }
}

fn status_title(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Error")
}

/// Render the error response for `err`. The request is only inspected, never
/// consumed; the resolution context rides in its extensions.
pub async fn respond<B>(
    state: &PagesState,
    request: &Request<B>,
    err: PagesError,
) -> Response<Body> {
    let mut ctx = PagesContext::of(request);
    let status = err.status();
    let title = status_title(status);

    if request.method() == Method::HEAD {
        let mut response = Response::new(Body::empty());
        *response.status_mut() =
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return response;
    }

    if request::accepts_json(request.headers()) {
        return json_error(status, title, &err, ctx.debug);
    }

    let cfg = match state.cfg_repo.load().await {
        Ok(cfg) => cfg,
        Err(load_err) => {
            error!(target = "varco::http", error = %load_err, "configuration load failed in error handler");
            return plain(
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                title,
            );
        }
    };

    let mut data = ctx.data.clone();
    data.insert("err".to_string(), Value::String(err.to_string()));
    data.insert("status".to_string(), Value::from(status));

    let path = request.uri().path().to_string();
    if ctx.skip_site || cfg.ignore_uri(&path) || err.is_internal() {
        return internal(state, request, &ctx, data, &cfg).await;
    }

    if ctx.site.is_none() {
        // The error may have struck before site selection; try once more so
        // the error page renders under the right tenant.
        if let Ok(resolved) = state.site_resolver.retrieve(&site_request(request, &path)).await {
            ctx.site = Some(resolved.site);
            ctx.path = resolved.path;
        }
    }

    if ctx.skip_page || cfg.ignore_pattern(&ctx.route_pattern) {
        return internal(state, request, &ctx, data, &cfg).await;
    }

    if (matches!(err, PagesError::PageNotFound) || status == 404) && ctx.editor {
        return create(state, request, &ctx, data, &cfg).await;
    }

    native(state, request, &ctx, status, data, &cfg).await
}

fn json_error(status: u16, title: &str, err: &PagesError, debug: bool) -> Response<Body> {
    let mut doc = json!({
        "status": status,
        "title": title,
        "detail": err.to_string(),
    });
    if debug {
        if let PagesError::Internal(detail) = err {
            doc["error"] = Value::String(detail.clone());
        }
    }
    Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(doc.to_string()))
        .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"))
}

/// Render the internal error page, synthesizing a fallback site and page
/// when the stores cannot provide them.
async fn internal<B>(
    state: &PagesState,
    request: &Request<B>,
    ctx: &PagesContext,
    data: Map<String, Value>,
    cfg: &Configuration,
) -> Response<Body> {
    let site = ctx
        .site
        .clone()
        .unwrap_or_else(|| internal_site(request, cfg));

    let page = match state
        .page_resolver
        .find_by_pattern(site.id, PAGE_ERROR_INTERNAL, editor_now(ctx))
        .await
    {
        Ok(page) => page,
        Err(_) => fallback_error_page(site.id),
    };

    serve(state, ctx, site, page, data).await
}

/// Route editors hitting a missing page to the content creation page.
async fn create<B>(
    state: &PagesState,
    request: &Request<B>,
    ctx: &PagesContext,
    data: Map<String, Value>,
    cfg: &Configuration,
) -> Response<Body> {
    let Some(site) = ctx.site.clone() else {
        return internal(state, request, ctx, data, cfg).await;
    };

    match state
        .page_resolver
        .find_by_pattern(site.id, PAGE_INTERNAL_CREATE, editor_now(ctx))
        .await
    {
        Ok(page) => serve(state, ctx, site, page, data).await,
        Err(_) => internal(state, request, ctx, data, cfg).await,
    }
}

/// Render the configured error page for the status class.
async fn native<B>(
    state: &PagesState,
    request: &Request<B>,
    ctx: &PagesContext,
    status: u16,
    data: Map<String, Value>,
    cfg: &Configuration,
) -> Response<Body> {
    let Some(site) = ctx.site.clone() else {
        return internal(state, request, ctx, data, cfg).await;
    };

    match state
        .page_resolver
        .find_by_status(cfg, site.id, status, editor_now(ctx))
        .await
    {
        Ok(page) => serve(state, ctx, site, page, data).await,
        Err(_) => internal(state, request, ctx, data, cfg).await,
    }
}

async fn serve(
    state: &PagesState,
    ctx: &PagesContext,
    site: Site,
    mut page: Page,
    data: Map<String, Value>,
) -> Response<Body> {
    if page.title.is_empty() {
        let status = data
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|status| u16::try_from(status).ok())
            .unwrap_or(500);
        page.title = status_title(status).to_string();
    }

    let render_ctx = PagesContext {
        site: Some(site),
        page: Some(page),
        data,
        ..ctx.clone()
    };
    handle_page(state.renderer.as_ref(), &render_ctx).await
}

/// Synthetic tenant for error pages when no site resolved at all.
fn internal_site<B>(request: &Request<B>, cfg: &Configuration) -> Site {
    let fallback = if cfg.fallback_locale.is_empty() {
        "en_US"
    } else {
        cfg.fallback_locale.as_str()
    };
    let locale = parse_accept_language(&request::accept_language(request.headers()))
        .into_iter()
        .next()
        .unwrap_or_else(|| fallback.to_string());

    let now = OffsetDateTime::now_utc();
    let site = Site {
        id: -1,
        name: "Internal".to_string(),
        separator: " - ".to_string(),
        locale,
        created: now,
        updated: now,
        published: Some(now),
        ..Site::default()
    };
    let site_request = site_request(request, request.uri().path());
    site.with_host(&site_request.scheme, &site_request.host)
}

/// Synthetic internal error page used when even the pattern lookup misses.
fn fallback_error_page(site_id: i64) -> Page {
    let mut page = Page {
        site_id,
        name: "Error".to_string(),
        title: "Error Internal".to_string(),
        template: "error/internal".to_string(),
        ..Page::default()
    }
    .with_error("internal");
    page.published = Some(OffsetDateTime::now_utc());
    page
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn statuses_map_to_error_kinds() {
        assert_eq!(PagesError::PageNotFound.status(), 404);
        assert_eq!(PagesError::SiteNotFound.status(), 500);
        assert_eq!(PagesError::internal("boom").status(), 500);
    }

    #[test]
    fn internal_site_negotiates_locale() {
        let mut request = Request::builder()
            .uri("/broken")
            .body(Body::empty())
            .expect("request");
        request.headers_mut().insert(
            "accept-language",
            HeaderValue::from_static("de-DE,en;q=0.5"),
        );
        request
            .headers_mut()
            .insert("host", HeaderValue::from_static("example.com"));

        let site = internal_site(&request, &Configuration::default());
        assert_eq!(site.id, -1);
        assert_eq!(site.name, "Internal");
        assert_eq!(site.locale, "de_DE");
        assert_eq!(site.url(), "http://example.com");
    }

    #[test]
    fn internal_site_falls_back_to_configured_locale() {
        let request = Request::builder()
            .uri("/broken")
            .body(Body::empty())
            .expect("request");
        let cfg = Configuration {
            fallback_locale: "fr_FR".to_string(),
            ..Configuration::default()
        };
        assert_eq!(internal_site(&request, &cfg).locale, "fr_FR");
    }

    #[test]
    fn fallback_page_is_an_error_page() {
        let page = fallback_error_page(3);
        assert_eq!(page.pattern, PAGE_ERROR_INTERNAL);
        assert!(page.is_error());
        assert_eq!(page.site_id, 3);
    }
}
