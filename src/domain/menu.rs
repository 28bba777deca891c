use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::node::Node;

/// A named menu pointing at the root of a node tree.
///
/// A menu without a root node id cannot produce a tree and resolves as
/// "not found".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Menu {
    pub id: i64,
    pub node_id: Option<i64>,
    pub name: String,
    /// URL-safe lookup key, derived from the name when absent.
    pub handle: String,
    pub enabled: bool,
    pub created: OffsetDateTime,
    pub updated: OffsetDateTime,
    /// Assembled tree, attached by the menu service. Never persisted.
    #[serde(skip)]
    pub node: Option<Node>,
}

impl Default for Menu {
    fn default() -> Self {
        let now = OffsetDateTime::UNIX_EPOCH;
        Self {
            id: 0,
            node_id: None,
            name: String::new(),
            handle: String::new(),
            enabled: false,
            created: now,
            updated: now,
            node: None,
        }
    }
}

impl Menu {
    pub fn with_fixed_handle(mut self) -> Self {
        if self.handle.is_empty() {
            self.handle = slug::slugify(&self.name);
        }
        self
    }
}

impl std::fmt::Display for Menu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            f.write_str("n/a")
        } else {
            f.write_str(&self.name)
        }
    }
}
