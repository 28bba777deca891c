//! Current-node detection for menu rendering.
//!
//! Voters inspect a node against the request context; the first voter that
//! does not abstain decides whether a node is "current".

use crate::domain::Node;

/// Request-side facts voters compare nodes against.
#[derive(Debug, Clone, Default)]
pub struct MatchContext {
    pub path: String,
}

impl MatchContext {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// A single opinion on whether a node matches the current request.
/// `None` abstains and passes the decision to the next voter.
pub trait Voter: Send + Sync {
    fn match_node(&self, ctx: &MatchContext, node: &Node) -> Option<bool>;
}

/// Votes by exact comparison of the node's URI with the request path.
/// Abstains for nodes without a URI.
#[derive(Debug, Default)]
pub struct UrlVoter;

impl Voter for UrlVoter {
    fn match_node(&self, ctx: &MatchContext, node: &Node) -> Option<bool> {
        if node.uri.is_empty() {
            return None;
        }
        Some(node.uri == ctx.path)
    }
}

pub struct Matcher {
    voters: Vec<Box<dyn Voter>>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(vec![Box::new(UrlVoter)])
    }
}

impl Matcher {
    pub fn new(voters: Vec<Box<dyn Voter>>) -> Self {
        Self { voters }
    }

    /// First non-abstaining voter wins; all-abstain means not current.
    pub fn is_current(&self, ctx: &MatchContext, node: &Node) -> bool {
        for voter in &self.voters {
            if let Some(decision) = voter.match_node(ctx, node) {
                return decision;
            }
        }
        false
    }

    /// A node is an ancestor when any of its descendants is current.
    pub fn is_ancestor(&self, ctx: &MatchContext, node: &Node) -> bool {
        node.children
            .iter()
            .any(|child| self.is_current(ctx, child) || self.is_ancestor(ctx, child))
    }

    /// Stamp the transient `current` and `ancestor` flags through the tree
    /// for template consumption.
    pub fn mark(&self, ctx: &MatchContext, node: &mut Node) {
        node.current = self.is_current(ctx, node);
        let mut ancestor = false;
        for child in &mut node.children {
            self.mark(ctx, child);
            ancestor = ancestor || child.current || child.ancestor;
        }
        node.ancestor = ancestor;
    }
}
