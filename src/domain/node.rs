//! Hierarchical menu node entity.
//!
//! Tree edges live in the flat `parent_id` relation; the in-memory tree is
//! rebuilt per fetch by [`crate::application::tree::build_tree`]. `path` and
//! `level` are always recomputed from the parent chain, never trusted as
//! independently authoritative input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub id: i64,
    /// Zero marks a root node.
    pub parent_id: i64,
    pub name: String,
    pub label: String,
    pub uri: String,
    /// Slash-joined ancestor ids, ending with this node's id.
    pub path: String,
    pub level: i32,
    /// Sibling order, ascending.
    pub position: i32,
    pub display: bool,
    pub display_children: bool,
    pub attributes: BTreeMap<String, String>,
    pub link_attributes: BTreeMap<String, String>,
    pub children_attributes: BTreeMap<String, String>,
    pub label_attributes: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
    pub created: OffsetDateTime,
    pub updated: OffsetDateTime,
    /// Set by the matcher for the node matching the current request.
    #[serde(skip)]
    pub current: bool,
    /// Set by the matcher for ancestors of the current node.
    #[serde(skip)]
    pub ancestor: bool,
    #[serde(skip)]
    pub children: Vec<Node>,
}

impl Default for Node {
    fn default() -> Self {
        let now = OffsetDateTime::UNIX_EPOCH;
        Self {
            id: 0,
            parent_id: 0,
            name: String::new(),
            label: String::new(),
            uri: String::new(),
            path: String::new(),
            level: 0,
            position: 0,
            display: true,
            display_children: true,
            attributes: BTreeMap::new(),
            link_attributes: BTreeMap::new(),
            children_attributes: BTreeMap::new(),
            label_attributes: BTreeMap::new(),
            metadata: BTreeMap::new(),
            created: now,
            updated: now,
            current: false,
            ancestor: false,
            children: Vec::new(),
        }
    }
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id == 0
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Recompute `path` and `level` from the given parent, or as a root when
    /// there is none.
    pub fn with_fixed_path_and_level(mut self, parent: Option<&Node>) -> Self {
        match parent {
            None => {
                self.parent_id = 0;
                self.level = 0;
                self.path = self.id.to_string();
            }
            Some(parent) => {
                self.level = parent.level + 1;
                self.path = format!("{}/{}", parent.path, self.id);
            }
        }
        self
    }
}

impl std::fmt::Display for Node {
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

    #[test]
    fn root_fixup_resets_parent_and_level() {
        let node = Node {
            id: 7,
            parent_id: 3,
            level: 4,
            path: "stale".into(),
            ..Node::default()
        };
        let node = node.with_fixed_path_and_level(None);
        assert_eq!(node.parent_id, 0);
        assert_eq!(node.level, 0);
        assert_eq!(node.path, "7");
    }

    #[test]
    fn child_fixup_extends_parent_path() {
        let parent = Node {
            id: 1,
            level: 2,
            path: "9/4/1".into(),
            ..Node::default()
        };
        let child = Node {
            id: 5,
            parent_id: 1,
            ..Node::default()
        };
        let child = child.with_fixed_path_and_level(Some(&parent));
        assert_eq!(child.level, 3);
        assert_eq!(child.path, "9/4/1/5");
    }
}
