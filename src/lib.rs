//! varco: multi-tenant site and page resolution for content platforms.
//!
//! Resolves an inbound HTTP request to a tenant (`Site`) and a content record
//! (`Page`), optionally decorating hybrid pages with a surrounding layout.
//! Repository access is read-through cached with tag-based invalidation so the
//! pipeline stays fast without serving content past its enablement window.
//!
//! The crate is organized in layers:
//!
//! - [`domain`]: entities and pure predicates (enablement windows, page
//!   classification, configuration merge).
//! - [`application`]: the resolvers, locale negotiation, menu tree assembly,
//!   and the repository traits persistence adapters implement.
//! - [`cache`]: a tag-addressable cache and cached wrappers for every
//!   repository trait.
//! - [`http`]: axum middlewares wiring the resolvers into a request pipeline,
//!   plus the hybrid decorator and the error fallback handler.
//! - [`config`]: layered settings loading for embedders.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod http;
pub(crate) mod util;
