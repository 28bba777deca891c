//! Hybrid decorator: capture-then-replay response buffering.
//!
//! A hybrid page with its `decorate` flag set has its route handler's HTML
//! output captured and re-rendered through the page template, with the
//! captured markup exposed to the renderer as `content`. Everything else
//! passes through untouched.

use std::sync::Mutex;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response, StatusCode};
use axum::middleware::Next;
use http_body_util::BodyExt;
use serde_json::Value;
use tracing::debug;

use crate::cache::lock::mutex_lock;

use super::context::PagesContext;
use super::error_handler::PagesError;
use super::handler::handle_page;
use super::middleware::{PagesState, fail};
use super::request;

const SOURCE: &str = "http::decorate";

/// Reusable capture buffers. Each buffer is cleared on acquire and returned
/// exactly once, including on the error exit paths.
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
        }
    }

    pub fn acquire(&self) -> Vec<u8> {
        let mut buffer = mutex_lock(&self.buffers, SOURCE, "acquire")
            .pop()
            .unwrap_or_default();
        buffer.clear();
        buffer
    }

    pub fn release(&self, buffer: Vec<u8>) {
        mutex_lock(&self.buffers, SOURCE, "release").push(buffer);
    }

    /// Idle buffer count, for tests.
    pub fn idle(&self) -> usize {
        mutex_lock(&self.buffers, SOURCE, "idle").len()
    }
}

/// Decorate hybrid page responses. Applies only to hybrid+decorate pages on
/// non-ajax, non-skipped, non-ignored requests; the captured response is
/// replayed verbatim when it is not decorable HTML.
pub async fn decorate_page(
    State(state): State<PagesState>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let mut ctx = PagesContext::of(&request);
    if ctx.skip_site || ctx.skip_page || request::is_ajax(request.headers()) {
        return next.run(request).await;
    }

    let cfg = match state.cfg_repo.load().await {
        Ok(cfg) => cfg,
        Err(err) => return fail(&state, request, ctx, PagesError::internal(err)).await,
    };
    if cfg.ignore_pattern(&ctx.route_pattern) || cfg.ignore_uri(request.uri().path()) {
        return next.run(request).await;
    }

    let Some(page) = ctx.page.clone() else {
        return fail(&state, request, ctx, PagesError::PageNotFound).await;
    };
    let decorate = page.decorate || request::decorate_forced(request.headers());
    if !page.is_hybrid() || !decorate {
        return next.run(request).await;
    }

    // The request head is kept aside so a capture failure can still reach
    // the error handler after the request itself has been consumed.
    let (req_parts, req_body) = request.into_parts();
    let shell = Request::from_parts(req_parts.clone(), Body::empty());

    let response = next.run(Request::from_parts(req_parts, req_body)).await;
    let (parts, body) = response.into_parts();

    let mut buffer = state.buffers.acquire();
    let mut body = body;
    loop {
        match body.frame().await {
            Some(Ok(frame)) => {
                if let Ok(data) = frame.into_data() {
                    buffer.extend_from_slice(&data);
                }
            }
            Some(Err(err)) => {
                state.buffers.release(buffer);
                debug!(target = "varco::http", error = %err, "decorator body capture failed");
                return fail(&state, shell, ctx, PagesError::internal(err)).await;
            }
            None => break,
        }
    }

    if !request::is_text_html(&parts.headers)
        || parts.status != StatusCode::OK
        || request::decorate_suppressed(&parts.headers)
    {
        let bytes = bytes::Bytes::copy_from_slice(&buffer);
        state.buffers.release(buffer);
        return Response::from_parts(parts, Body::from(bytes));
    }

    let content = String::from_utf8_lossy(&buffer).into_owned();
    state.buffers.release(buffer);

    ctx.data.insert("content".to_string(), Value::String(content));
    handle_page(state.renderer.as_ref(), &ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquired_buffers_are_empty() {
        let pool = BufferPool::new();
        let mut buffer = pool.acquire();
        buffer.extend_from_slice(b"leftover");
        pool.release(buffer);

        let buffer = pool.acquire();
        assert!(buffer.is_empty());
        pool.release(buffer);
    }

    #[test]
    fn release_returns_buffer_to_pool() {
        let pool = BufferPool::new();
        assert_eq!(pool.idle(), 0);
        let buffer = pool.acquire();
        assert_eq!(pool.idle(), 0);
        pool.release(buffer);
        assert_eq!(pool.idle(), 1);
    }
}
