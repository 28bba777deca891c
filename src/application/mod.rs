//! Application services: resolution algorithms and the repository seams they
//! consume.

pub mod locale;
pub mod matcher;
pub mod menu;
pub mod page_resolver;
pub mod repos;
pub mod site_resolver;
pub mod tree;

pub use matcher::{MatchContext, Matcher, UrlVoter, Voter};
pub use menu::{MenuError, MenuService};
pub use page_resolver::{PageMatch, PageResolveError, PageResolver};
pub use repos::{ConfigurationRepo, MenuRepo, NodeRepo, PageRepo, RepoError, SiteRepo};
pub use site_resolver::{SiteMatch, SiteRequest, SiteResolveError, SiteResolver};
pub use tree::build_tree;
