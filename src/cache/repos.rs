//! Read-through cached wrappers for the application repository traits.
//!
//! Reads are fail-open: any cache backend or serialization failure is logged
//! and treated as a miss, never surfaced to the caller. Time-windowed hits
//! are re-checked against the enablement window so an entry cached before
//! its expiry never outlives it; a stale hit is proactively evicted.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::application::repos::{
    ConfigurationRepo, MenuRepo, NodeRepo, PageRepo, RepoError, SiteRepo,
};
use crate::domain::{Configuration, Menu, Node, Page, Site};

use super::keys::{
    CONFIGURATION_KEY, EntityKind, id_key, id_tag, menu_handle_key, node_children_key,
    page_alias_key, page_parent_key, page_pattern_key, page_url_key, site_hosts_key,
};
use super::store::TagCache;

const TARGET: &str = "varco::cache";

/// Fetch and decode a cached entry; backend and decode failures degrade to a
/// miss.
async fn read<T: DeserializeOwned>(cache: &dyn TagCache, key: &str) -> Option<T> {
    let bytes = match cache.get(key).await {
        Ok(bytes) => bytes?,
        Err(err) => {
            warn!(target = TARGET, key, error = %err, "cache read failed, treating as miss");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(target = TARGET, key, error = %err, "cache entry undecodable, treating as miss");
            None
        }
    }
}

/// Encode and store an entry; failures are logged and swallowed.
async fn write<T: Serialize>(cache: &dyn TagCache, key: &str, value: &T, tags: &[String]) {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => Bytes::from(bytes),
        Err(err) => {
            warn!(target = TARGET, key, error = %err, "cache encode failed, skipping write");
            return;
        }
    };
    if let Err(err) = cache.set(key, bytes, tags).await {
        warn!(target = TARGET, key, error = %err, "cache write failed");
    }
}

async fn evict_key(cache: &dyn TagCache, key: &str) {
    if let Err(err) = cache.delete_key(key).await {
        warn!(target = TARGET, key, error = %err, "cache key eviction failed");
    }
}

async fn evict_tag(cache: &dyn TagCache, tag: &str) {
    if let Err(err) = cache.delete_tag(tag).await {
        warn!(target = TARGET, tag, error = %err, "cache tag eviction failed");
    } else {
        debug!(target = TARGET, tag, "cache tag evicted");
    }
}

fn page_tags(page: &Page) -> Vec<String> {
    let mut tags = vec![
        id_tag(EntityKind::Page, page.id),
        id_tag(EntityKind::Site, page.site_id),
    ];
    if let Some(parent_id) = page.parent_id {
        tags.push(id_tag(EntityKind::Page, parent_id));
    }
    tags
}

// ============================================================================
// Sites
// ============================================================================

pub struct CachedSiteRepo {
    inner: Arc<dyn SiteRepo>,
    cache: Arc<dyn TagCache>,
}

impl CachedSiteRepo {
    pub fn new(inner: Arc<dyn SiteRepo>, cache: Arc<dyn TagCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl SiteRepo for CachedSiteRepo {
    async fn find_by_id(&self, id: i64) -> Result<Site, RepoError> {
        let key = id_key(EntityKind::Site, id);
        if let Some(site) = read::<Site>(self.cache.as_ref(), &key).await {
            return Ok(site);
        }
        let site = self.inner.find_by_id(id).await?;
        write(
            self.cache.as_ref(),
            &key,
            &site,
            &[id_tag(EntityKind::Site, id)],
        )
        .await;
        Ok(site)
    }

    async fn find_by_hosts(
        &self,
        hosts: &[String],
        now: Option<OffsetDateTime>,
    ) -> Result<Vec<Site>, RepoError> {
        let key = site_hosts_key(hosts);
        if let Some(sites) = read::<Vec<Site>>(self.cache.as_ref(), &key).await {
            match now {
                Some(now) if !sites.iter().all(|site| site.is_enabled(now)) => {
                    evict_key(self.cache.as_ref(), &key).await;
                }
                _ => return Ok(sites),
            }
        }
        let sites = self.inner.find_by_hosts(hosts, now).await?;
        let tags: Vec<String> = sites
            .iter()
            .map(|site| id_tag(EntityKind::Site, site.id))
            .collect();
        write(self.cache.as_ref(), &key, &sites, &tags).await;
        Ok(sites)
    }

    async fn update(&self, site: &Site) -> Result<(), RepoError> {
        let result = self.inner.update(site).await;
        evict_tag(self.cache.as_ref(), &id_tag(EntityKind::Site, site.id)).await;
        result
    }

    async fn delete(&self, ids: &[i64]) -> Result<(), RepoError> {
        let result = self.inner.delete(ids).await;
        for id in ids {
            evict_tag(self.cache.as_ref(), &id_tag(EntityKind::Site, *id)).await;
        }
        result
    }
}

// ============================================================================
// Pages
// ============================================================================

pub struct CachedPageRepo {
    inner: Arc<dyn PageRepo>,
    cache: Arc<dyn TagCache>,
}

impl CachedPageRepo {
    pub fn new(inner: Arc<dyn PageRepo>, cache: Arc<dyn TagCache>) -> Self {
        Self { inner, cache }
    }

    async fn cached_page<F>(
        &self,
        key: String,
        now: Option<OffsetDateTime>,
        fetch: F,
    ) -> Result<Page, RepoError>
    where
        F: std::future::Future<Output = Result<Page, RepoError>>,
    {
        if let Some(page) = read::<Page>(self.cache.as_ref(), &key).await {
            match now {
                Some(now) if !page.is_enabled(now) => {
                    evict_key(self.cache.as_ref(), &key).await;
                }
                _ => return Ok(page),
            }
        }
        let page = fetch.await?;
        write(self.cache.as_ref(), &key, &page, &page_tags(&page)).await;
        Ok(page)
    }
}

#[async_trait]
impl PageRepo for CachedPageRepo {
    async fn find_by_id(&self, id: i64) -> Result<Page, RepoError> {
        let key = id_key(EntityKind::Page, id);
        self.cached_page(key, None, self.inner.find_by_id(id)).await
    }

    async fn find_by_url(
        &self,
        site_id: i64,
        url: &str,
        now: Option<OffsetDateTime>,
    ) -> Result<Page, RepoError> {
        let key = page_url_key(site_id, url);
        self.cached_page(key, now, self.inner.find_by_url(site_id, url, now))
            .await
    }

    async fn find_by_pattern(
        &self,
        site_id: i64,
        pattern: &str,
        now: Option<OffsetDateTime>,
    ) -> Result<Page, RepoError> {
        let key = page_pattern_key(site_id, pattern);
        self.cached_page(key, now, self.inner.find_by_pattern(site_id, pattern, now))
            .await
    }

    async fn find_by_alias(
        &self,
        site_id: i64,
        alias: &str,
        now: Option<OffsetDateTime>,
    ) -> Result<Page, RepoError> {
        let key = page_alias_key(site_id, alias);
        self.cached_page(key, now, self.inner.find_by_alias(site_id, alias, now))
            .await
    }

    async fn find_by_parent_id(
        &self,
        parent_id: i64,
        now: Option<OffsetDateTime>,
    ) -> Result<Vec<Page>, RepoError> {
        let key = page_parent_key(parent_id);
        if let Some(pages) = read::<Vec<Page>>(self.cache.as_ref(), &key).await {
            match now {
                Some(now) if !pages.iter().all(|page| page.is_enabled(now)) => {
                    evict_key(self.cache.as_ref(), &key).await;
                }
                _ => return Ok(pages),
            }
        }
        let pages = self.inner.find_by_parent_id(parent_id, now).await?;
        let mut tags = vec![id_tag(EntityKind::Page, parent_id)];
        for page in &pages {
            tags.push(id_tag(EntityKind::Page, page.id));
        }
        write(self.cache.as_ref(), &key, &pages, &tags).await;
        Ok(pages)
    }

    async fn create(&self, page: &mut Page) -> Result<(), RepoError> {
        self.inner.create(page).await
    }

    async fn update(&self, page: &Page) -> Result<(), RepoError> {
        let result = self.inner.update(page).await;
        evict_tag(self.cache.as_ref(), &id_tag(EntityKind::Page, page.id)).await;
        result
    }

    async fn delete(&self, ids: &[i64]) -> Result<(), RepoError> {
        let result = self.inner.delete(ids).await;
        for id in ids {
            evict_tag(self.cache.as_ref(), &id_tag(EntityKind::Page, *id)).await;
        }
        result
    }
}

// ============================================================================
// Nodes
// ============================================================================

pub struct CachedNodeRepo {
    inner: Arc<dyn NodeRepo>,
    cache: Arc<dyn TagCache>,
}

impl CachedNodeRepo {
    pub fn new(inner: Arc<dyn NodeRepo>, cache: Arc<dyn TagCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl NodeRepo for CachedNodeRepo {
    async fn find_by_id(&self, id: i64) -> Result<Node, RepoError> {
        let key = id_key(EntityKind::Node, id);
        if let Some(node) = read::<Node>(self.cache.as_ref(), &key).await {
            return Ok(node);
        }
        let node = self.inner.find_by_id(id).await?;
        write(
            self.cache.as_ref(),
            &key,
            &node,
            &[id_tag(EntityKind::Node, id)],
        )
        .await;
        Ok(node)
    }

    async fn find_with_children(&self, id: i64) -> Result<Vec<Node>, RepoError> {
        let key = node_children_key(id);
        if let Some(nodes) = read::<Vec<Node>>(self.cache.as_ref(), &key).await {
            return Ok(nodes);
        }
        let nodes = self.inner.find_with_children(id).await?;
        // Tagged by the root and every row so any member update evicts the
        // whole subtree read.
        let mut tags = vec![id_tag(EntityKind::Node, id)];
        for node in &nodes {
            if node.id != id {
                tags.push(id_tag(EntityKind::Node, node.id));
            }
        }
        write(self.cache.as_ref(), &key, &nodes, &tags).await;
        Ok(nodes)
    }

    async fn update(&self, node: &Node) -> Result<(), RepoError> {
        let result = self.inner.update(node).await;
        evict_tag(self.cache.as_ref(), &id_tag(EntityKind::Node, node.id)).await;
        result
    }

    async fn delete(&self, ids: &[i64]) -> Result<(), RepoError> {
        let result = self.inner.delete(ids).await;
        for id in ids {
            evict_tag(self.cache.as_ref(), &id_tag(EntityKind::Node, *id)).await;
        }
        result
    }
}

// ============================================================================
// Menus
// ============================================================================

pub struct CachedMenuRepo {
    inner: Arc<dyn MenuRepo>,
    cache: Arc<dyn TagCache>,
}

impl CachedMenuRepo {
    pub fn new(inner: Arc<dyn MenuRepo>, cache: Arc<dyn TagCache>) -> Self {
        Self { inner, cache }
    }

    fn tags(menu: &Menu) -> Vec<String> {
        let mut tags = vec![id_tag(EntityKind::Menu, menu.id)];
        if let Some(node_id) = menu.node_id {
            tags.push(id_tag(EntityKind::Node, node_id));
        }
        tags
    }
}

#[async_trait]
impl MenuRepo for CachedMenuRepo {
    async fn find_by_id(&self, id: i64) -> Result<Menu, RepoError> {
        let key = id_key(EntityKind::Menu, id);
        if let Some(menu) = read::<Menu>(self.cache.as_ref(), &key).await {
            return Ok(menu);
        }
        let menu = self.inner.find_by_id(id).await?;
        write(self.cache.as_ref(), &key, &menu, &Self::tags(&menu)).await;
        Ok(menu)
    }

    async fn find_by_handle(&self, handle: &str) -> Result<Menu, RepoError> {
        let key = menu_handle_key(handle);
        if let Some(menu) = read::<Menu>(self.cache.as_ref(), &key).await {
            return Ok(menu);
        }
        let menu = self.inner.find_by_handle(handle).await?;
        write(self.cache.as_ref(), &key, &menu, &Self::tags(&menu)).await;
        Ok(menu)
    }

    async fn update(&self, menu: &Menu) -> Result<(), RepoError> {
        let result = self.inner.update(menu).await;
        evict_tag(self.cache.as_ref(), &id_tag(EntityKind::Menu, menu.id)).await;
        result
    }

    async fn delete(&self, ids: &[i64]) -> Result<(), RepoError> {
        let result = self.inner.delete(ids).await;
        for id in ids {
            evict_tag(self.cache.as_ref(), &id_tag(EntityKind::Menu, *id)).await;
        }
        result
    }
}

// ============================================================================
// Configuration singleton
// ============================================================================

pub struct CachedConfigurationRepo {
    inner: Arc<dyn ConfigurationRepo>,
    cache: Arc<dyn TagCache>,
}

impl CachedConfigurationRepo {
    pub fn new(inner: Arc<dyn ConfigurationRepo>, cache: Arc<dyn TagCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl ConfigurationRepo for CachedConfigurationRepo {
    async fn load(&self) -> Result<Configuration, RepoError> {
        if let Some(cfg) = read::<Configuration>(self.cache.as_ref(), CONFIGURATION_KEY).await {
            return Ok(cfg);
        }
        let cfg = self.inner.load().await?;
        write(self.cache.as_ref(), CONFIGURATION_KEY, &cfg, &[]).await;
        Ok(cfg)
    }

    async fn save(&self, configuration: &Configuration) -> Result<(), RepoError> {
        let result = self.inner.save(configuration).await;
        evict_key(self.cache.as_ref(), CONFIGURATION_KEY).await;
        result
    }
}
