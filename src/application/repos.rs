//! Repository traits describing persistence adapters.
//!
//! Persistence itself is an external collaborator; the pipeline only depends
//! on these seams. Lookups taking `now: Option<OffsetDateTime>` apply the
//! enablement window at that instant; `None` bypasses the window so editors
//! keep seeing unpublished and expired content.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::{Configuration, Menu, Node, Page, Site};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("resource not found")]
    NotFound,
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Singleton configuration store.
#[async_trait]
pub trait ConfigurationRepo: Send + Sync {
    async fn load(&self) -> Result<Configuration, RepoError>;
    async fn save(&self, configuration: &Configuration) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SiteRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Site, RepoError>;

    /// All enabled sites matching any candidate host, non-default sites
    /// first.
    async fn find_by_hosts(
        &self,
        hosts: &[String],
        now: Option<OffsetDateTime>,
    ) -> Result<Vec<Site>, RepoError>;

    async fn update(&self, site: &Site) -> Result<(), RepoError>;
    async fn delete(&self, ids: &[i64]) -> Result<(), RepoError>;
}

#[async_trait]
pub trait PageRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Page, RepoError>;

    async fn find_by_url(
        &self,
        site_id: i64,
        url: &str,
        now: Option<OffsetDateTime>,
    ) -> Result<Page, RepoError>;

    async fn find_by_pattern(
        &self,
        site_id: i64,
        pattern: &str,
        now: Option<OffsetDateTime>,
    ) -> Result<Page, RepoError>;

    async fn find_by_alias(
        &self,
        site_id: i64,
        alias: &str,
        now: Option<OffsetDateTime>,
    ) -> Result<Page, RepoError>;

    async fn find_by_parent_id(
        &self,
        parent_id: i64,
        now: Option<OffsetDateTime>,
    ) -> Result<Vec<Page>, RepoError>;

    async fn create(&self, page: &mut Page) -> Result<(), RepoError>;
    async fn update(&self, page: &Page) -> Result<(), RepoError>;
    async fn delete(&self, ids: &[i64]) -> Result<(), RepoError>;
}

#[async_trait]
pub trait NodeRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Node, RepoError>;

    /// The flat subtree rooted at `id`: the node itself plus every
    /// descendant row.
    async fn find_with_children(&self, id: i64) -> Result<Vec<Node>, RepoError>;

    async fn update(&self, node: &Node) -> Result<(), RepoError>;
    async fn delete(&self, ids: &[i64]) -> Result<(), RepoError>;
}

#[async_trait]
pub trait MenuRepo: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Menu, RepoError>;
    async fn find_by_handle(&self, handle: &str) -> Result<Menu, RepoError>;
    async fn update(&self, menu: &Menu) -> Result<(), RepoError>;
    async fn delete(&self, ids: &[i64]) -> Result<(), RepoError>;
}
