//! Cache key and tag formatting.
//!
//! Keys address a single lookup (`cms::page:url:3:/blog`); tags group every
//! entry that depends on one entity (`cms::site:tag:7`) so a write can evict
//! all of them at once.

use std::fmt;

/// Entity kinds with a keyed cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Site,
    Page,
    Node,
    Menu,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Site => "cms::site",
            EntityKind::Page => "cms::page",
            EntityKind::Node => "cms::node",
            EntityKind::Menu => "cms::menu",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Singleton key for the runtime configuration document.
pub const CONFIGURATION_KEY: &str = "cms::configuration";

pub fn id_key(kind: EntityKind, id: i64) -> String {
    format!("{}:id:{id}", kind.prefix())
}

/// Tag carried by every entry that depends on the entity with `id`.
pub fn id_tag(kind: EntityKind, id: i64) -> String {
    format!("{}:tag:{id}", kind.prefix())
}

pub fn site_hosts_key(hosts: &[String]) -> String {
    format!("{}:hosts:{}", EntityKind::Site.prefix(), hosts.join("|"))
}

pub fn page_url_key(site_id: i64, url: &str) -> String {
    format!("{}:url:{site_id}:{url}", EntityKind::Page.prefix())
}

pub fn page_pattern_key(site_id: i64, pattern: &str) -> String {
    format!("{}:pattern:{site_id}:{pattern}", EntityKind::Page.prefix())
}

pub fn page_alias_key(site_id: i64, alias: &str) -> String {
    format!("{}:alias:{site_id}:{alias}", EntityKind::Page.prefix())
}

pub fn page_parent_key(parent_id: i64) -> String {
    format!("{}:parent:{parent_id}", EntityKind::Page.prefix())
}

pub fn node_children_key(node_id: i64) -> String {
    format!("{}:children:{node_id}", EntityKind::Node.prefix())
}

pub fn menu_handle_key(handle: &str) -> String {
    format!("{}:handle:{handle}", EntityKind::Menu.prefix())
}
