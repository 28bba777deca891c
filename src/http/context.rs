//! Request-scoped resolution context.
//!
//! Travels through the middleware chain as a request extension. Each
//! middleware reads a clone, amends it, and reinserts it; handlers only
//! read.

use axum::body::Body;
use axum::http::Request;
use serde_json::{Map, Value};

use crate::domain::{Page, Site};

#[derive(Debug, Clone, Default)]
pub struct PagesContext {
    pub site: Option<Site>,
    pub page: Option<Page>,
    /// Editing session: enablement windows are bypassed and a missing page
    /// routes to the creation flow.
    pub editor: bool,
    pub skip_site: bool,
    pub skip_page: bool,
    pub debug: bool,
    /// Values handed to the renderer; the decorator injects the captured
    /// HTML here under `content`.
    pub data: Map<String, Value>,
    /// Effective URL path, after any tenant relative-path substitution.
    pub path: String,
    /// Matched route template for the current handler.
    pub route_pattern: String,
}

impl PagesContext {
    /// The context attached to `request`, or a default one.
    pub fn of<B>(request: &Request<B>) -> Self {
        request
            .extensions()
            .get::<PagesContext>()
            .cloned()
            .unwrap_or_default()
    }

    pub fn store(self, request: &mut Request<Body>) {
        request.extensions_mut().insert(self);
    }

    pub fn site(&self) -> Option<&Site> {
        self.site.as_ref()
    }

    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }
}
