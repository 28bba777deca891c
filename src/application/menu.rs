//! Menu retrieval: looks up a menu by handle and attaches its node tree.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::application::repos::{MenuRepo, NodeRepo, RepoError};
use crate::application::tree::build_tree;
use crate::domain::Menu;

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("menu not found")]
    NotFound,
    #[error(transparent)]
    Store(RepoError),
}

impl From<RepoError> for MenuError {
    fn from(err: RepoError) -> Self {
        if err.is_not_found() {
            MenuError::NotFound
        } else {
            MenuError::Store(err)
        }
    }
}

pub struct MenuService {
    menu_repo: Arc<dyn MenuRepo>,
    node_repo: Arc<dyn NodeRepo>,
}

impl MenuService {
    pub fn new(menu_repo: Arc<dyn MenuRepo>, node_repo: Arc<dyn NodeRepo>) -> Self {
        Self {
            menu_repo,
            node_repo,
        }
    }

    /// Fetch the menu for `handle` with its node tree attached. A menu
    /// without a root node, or whose root is missing from the node store,
    /// counts as not found.
    pub async fn get(&self, handle: &str) -> Result<Menu, MenuError> {
        let mut menu = self.menu_repo.find_by_handle(handle).await?;
        let root_id = menu.node_id.ok_or(MenuError::NotFound)?;

        let nodes = self.node_repo.find_with_children(root_id).await?;
        menu.node = build_tree(nodes, root_id);
        if menu.node.is_none() {
            return Err(MenuError::NotFound);
        }

        debug!(target = "varco::menu", handle, "menu resolved");
        Ok(menu)
    }
}
