//! Final page rendering.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response, StatusCode, header::CONTENT_TYPE};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::error;

use crate::domain::{Page, Site};

use super::context::PagesContext;

#[derive(Debug, Error)]
#[error("render error: {0}")]
pub struct RenderError(pub String);

/// Template engine seam. The crate never renders markup itself; embedders
/// plug their engine in here.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(
        &self,
        site: &Site,
        page: &Page,
        data: &Map<String, Value>,
    ) -> Result<String, RenderError>;
}

/// Response status for a page: explicit page override first, then a status
/// the data map carries (the error path sets one), then 200.
pub fn page_status(page: &Page, data: &Map<String, Value>) -> u16 {
    if page.status > 0 {
        return page.status;
    }
    data.get("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
        .unwrap_or(200)
}

/// Render the context's page through `renderer` into a full response,
/// applying the page's content-type override and per-page headers.
pub async fn handle_page(renderer: &dyn PageRenderer, ctx: &PagesContext) -> Response<Body> {
    let Some(site) = ctx.site() else {
        return plain(StatusCode::INTERNAL_SERVER_ERROR, "site not found");
    };
    let Some(page) = ctx.page() else {
        return plain(StatusCode::INTERNAL_SERVER_ERROR, "page not found");
    };

    let status = page_status(page, &ctx.data);
    let body = match renderer.render(site, page, &ctx.data).await {
        Ok(body) => body,
        Err(err) => {
            error!(target = "varco::http", page = %page, error = %err, "page render failed");
            return plain(StatusCode::INTERNAL_SERVER_ERROR, "internal server error");
        }
    };

    let content_type = if page.content_type.is_empty() {
        "text/html; charset=utf-8"
    } else {
        page.content_type.as_str()
    };

    let mut builder = Response::builder()
        .status(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        .header(CONTENT_TYPE, content_type);
    for (name, value) in &page.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::from_str(value),
        ) {
            builder = builder.header(name, value);
        }
    }

    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| plain(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"))
}

pub(super) fn plain(status: StatusCode, message: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(message.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
