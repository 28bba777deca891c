//! Axum integration: request introspection, request-scoped context, the
//! site/page selector middlewares, the hybrid decorator and the page and
//! error handlers.

pub mod context;
pub mod decorate;
pub mod error_handler;
pub mod handler;
pub mod middleware;
pub mod request;

pub use context::PagesContext;
pub use decorate::{BufferPool, decorate_page};
pub use error_handler::PagesError;
pub use handler::{PageRenderer, RenderError, handle_page};
pub use middleware::{PagesState, select_page, select_site, skip_page, skip_site};
