//! Content record entity and its pattern-based classification.
//!
//! A page's `pattern` is a routing key. A handful of distinguished values mark
//! pages the platform itself serves: the CMS sentinel for static content, and
//! the internal prefix for error/create flows. Everything else is a hybrid
//! page served by application route-handler code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::window_enabled;

/// Sentinel pattern for pages served by the CMS itself.
pub const PAGE_CMS: &str = "_page_cms";
/// Prefix for stable alternate lookup keys.
pub const PAGE_ALIAS_PREFIX: &str = "_page_alias_";
/// Prefix reserved for internal flows (error pages, page creation).
pub const PAGE_INTERNAL_PREFIX: &str = "_page_internal_";
pub const PAGE_INTERNAL_CREATE: &str = "_page_internal_create";
pub const PAGE_ERROR_PREFIX: &str = "_page_internal_error_";
pub const PAGE_ERROR_INTERNAL: &str = "_page_internal_error_internal";
pub const PAGE_ERROR_4XX: &str = "_page_internal_error_4xx";
pub const PAGE_ERROR_5XX: &str = "_page_internal_error_5xx";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Page {
    pub id: i64,
    pub site_id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub title: String,
    /// Routing key; see the module docs for the distinguished prefixes.
    pub pattern: String,
    pub alias: String,
    pub slug: String,
    /// Materialized path, recomputed from the parent chain for CMS pages.
    pub url: String,
    pub custom_url: String,
    pub javascript: String,
    pub stylesheet: String,
    pub template: String,
    pub decorate: bool,
    pub position: i32,
    /// Response status override; `0` means "use the handler's status".
    pub status: u16,
    pub content_type: String,
    pub headers: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
    pub created: OffsetDateTime,
    pub updated: OffsetDateTime,
    pub published: Option<OffsetDateTime>,
    pub expired: Option<OffsetDateTime>,
    #[serde(skip)]
    pub children: Vec<Page>,
}

impl Default for Page {
    fn default() -> Self {
        let now = OffsetDateTime::UNIX_EPOCH;
        Self {
            id: 0,
            site_id: 0,
            parent_id: None,
            name: String::new(),
            title: String::new(),
            pattern: String::new(),
            alias: String::new(),
            slug: String::new(),
            url: String::new(),
            custom_url: String::new(),
            javascript: String::new(),
            stylesheet: String::new(),
            template: String::new(),
            decorate: false,
            position: 0,
            status: 0,
            content_type: String::new(),
            headers: BTreeMap::new(),
            metadata: BTreeMap::new(),
            created: now,
            updated: now,
            published: None,
            expired: None,
            children: Vec::new(),
        }
    }
}

impl Page {
    pub fn is_cms(&self) -> bool {
        self.pattern == PAGE_CMS
    }

    pub fn is_internal(&self) -> bool {
        self.pattern.starts_with(PAGE_INTERNAL_PREFIX)
    }

    pub fn is_error(&self) -> bool {
        self.pattern.starts_with(PAGE_ERROR_PREFIX)
    }

    /// Served by application route-handler code rather than the CMS.
    pub fn is_hybrid(&self) -> bool {
        !self.is_cms() && !self.is_internal()
    }

    /// Hybrid page whose URL carries a routing placeholder.
    pub fn is_dynamic(&self) -> bool {
        self.is_hybrid() && self.url.contains([':', '{', '*'])
    }

    /// Whether the page is inside its `[published, expired)` window at `now`,
    /// evaluated at minute resolution.
    pub fn is_enabled(&self, now: OffsetDateTime) -> bool {
        window_enabled(self.published, self.expired, now)
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = if alias.starts_with(PAGE_ALIAS_PREFIX) {
            alias.to_string()
        } else {
            format!("{PAGE_ALIAS_PREFIX}{alias}")
        };
        self
    }

    pub fn with_internal(mut self, pattern: &str) -> Self {
        self.pattern = if pattern.starts_with(PAGE_INTERNAL_PREFIX) {
            pattern.to_string()
        } else {
            format!("{PAGE_INTERNAL_PREFIX}{pattern}")
        };
        self
    }

    pub fn with_error(mut self, pattern: &str) -> Self {
        self.pattern = if pattern.starts_with(PAGE_ERROR_PREFIX) {
            pattern.to_string()
        } else {
            format!("{PAGE_ERROR_PREFIX}{pattern}")
        };
        self
    }

    /// Recompute `slug` and `url` for this page and every descendant.
    ///
    /// Internal pages never have a URL. Hybrid pages keep the URL they were
    /// given (it is their route pattern path). CMS pages derive their URL from
    /// the parent chain: custom URL when present, slugified name otherwise.
    pub fn with_fixed_url(self) -> Self {
        self.fix_url(None)
    }

    fn fix_url(mut self, parent_url: Option<&str>) -> Self {
        if self.is_internal() {
            self.url = String::new();
        } else if !self.is_hybrid() {
            match parent_url {
                None => {
                    self.slug = String::new();
                    self.url = format!("/{}", self.custom_url.trim_start_matches('/'));
                }
                Some(parent_url) => {
                    if self.slug.is_empty() {
                        self.slug = slug::slugify(&self.name);
                    }
                    let mut base = parent_url.to_string();
                    if !base.ends_with('/') {
                        base.push('/');
                    }
                    let tail = if self.custom_url.is_empty() {
                        self.slug.as_str()
                    } else {
                        self.custom_url.as_str()
                    };
                    self.url = format!("{base}{}", tail.trim_start_matches('/'));
                }
            }
        }

        let url = self.url.clone();
        self.children = self
            .children
            .into_iter()
            .map(|child| child.fix_url(Some(&url)))
            .collect();
        self
    }
}

impl std::fmt::Display for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            f.write_str("n/a")
        } else {
            f.write_str(&self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn cms_page(name: &str) -> Page {
        Page {
            name: name.into(),
            pattern: PAGE_CMS.into(),
            ..Page::default()
        }
    }

    #[test]
    fn classification_predicates() {
        assert!(cms_page("home").is_cms());

        let internal = Page::default().with_internal("create");
        assert!(internal.is_internal());
        assert!(!internal.is_hybrid());

        let error = Page::default().with_error("4xx");
        assert!(error.is_error());
        assert!(error.is_internal());

        let hybrid = Page {
            pattern: "GET /posts/:slug".into(),
            url: "/posts/:slug".into(),
            ..Page::default()
        };
        assert!(hybrid.is_hybrid());
        assert!(hybrid.is_dynamic());

        let plain_hybrid = Page {
            pattern: "GET /about".into(),
            url: "/about".into(),
            ..Page::default()
        };
        assert!(!plain_hybrid.is_dynamic());
    }

    #[test]
    fn alias_prefix_applied_once() {
        let page = Page::default().with_alias("landing");
        assert_eq!(page.alias, "_page_alias_landing");
        let page = page.with_alias("_page_alias_landing");
        assert_eq!(page.alias, "_page_alias_landing");
    }

    #[test]
    fn fixed_url_for_root_uses_custom_url() {
        let mut root = cms_page("Home");
        root.custom_url = "welcome".into();
        let root = root.with_fixed_url();
        assert_eq!(root.url, "/welcome");
        assert!(root.slug.is_empty());
    }

    #[test]
    fn fixed_url_for_children_joins_parent_chain() {
        let mut root = cms_page("Home");
        root.custom_url = "/".into();
        let mut blog = cms_page("My Blog");
        let mut first = cms_page("First Post");
        first.custom_url = "/first".into();
        blog.children = vec![first];
        root.children = vec![blog];

        let root = root.with_fixed_url();
        assert_eq!(root.url, "/");
        let blog = &root.children[0];
        assert_eq!(blog.slug, "my-blog");
        assert_eq!(blog.url, "/my-blog");
        assert_eq!(blog.children[0].url, "/my-blog/first");
    }

    #[test]
    fn fixed_url_clears_internal_pages() {
        let mut page = Page::default().with_internal("error_4xx");
        page.url = "/stale".into();
        assert!(page.with_fixed_url().url.is_empty());
    }

    #[test]
    fn enablement_window_at_minute_resolution() {
        let mut page = cms_page("home");
        page.published = Some(datetime!(2024-05-01 10:30:00 UTC));
        page.expired = Some(datetime!(2024-05-01 11:00:00 UTC));

        // Published exactly at truncated now.
        assert!(page.is_enabled(datetime!(2024-05-01 10:30:59 UTC)));
        // Expiring exactly at truncated now.
        assert!(!page.is_enabled(datetime!(2024-05-01 11:00:01 UTC)));
        assert!(!page.is_enabled(datetime!(2024-05-01 10:29:59 UTC)));
    }
}
