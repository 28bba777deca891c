//! Domain entities and the pure predicates the resolution pipeline relies on.

pub mod configuration;
pub mod menu;
pub mod node;
pub mod page;
pub mod site;

pub use configuration::{Configuration, ConfigurationOverlay, MultisiteStrategy, Skippers};
pub use menu::Menu;
pub use node::Node;
pub use page::Page;
pub use site::Site;

use time::OffsetDateTime;

/// Truncate an instant to whole-minute resolution.
///
/// Enablement windows are evaluated at minute granularity: a record published
/// exactly at the truncated instant is enabled, one expiring exactly then is
/// not.
pub fn truncate_to_minute(now: OffsetDateTime) -> OffsetDateTime {
    let secs = now.unix_timestamp();
    let truncated = secs - secs.rem_euclid(60);
    OffsetDateTime::from_unix_timestamp(truncated).unwrap_or(now)
}

/// Shared enablement-window predicate for sites and pages.
pub(crate) fn window_enabled(
    published: Option<OffsetDateTime>,
    expired: Option<OffsetDateTime>,
    now: OffsetDateTime,
) -> bool {
    let now = truncate_to_minute(now);
    let Some(published) = published else {
        return false;
    };
    published <= now && expired.is_none_or(|expired| expired > now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn truncation_drops_seconds() {
        let now = datetime!(2024-05-01 10:30:59 UTC);
        assert_eq!(truncate_to_minute(now), datetime!(2024-05-01 10:30:00 UTC));
    }

    #[test]
    fn published_exactly_at_truncated_now_is_enabled() {
        let published = datetime!(2024-05-01 10:30:00 UTC);
        let now = datetime!(2024-05-01 10:30:45 UTC);
        assert!(window_enabled(Some(published), None, now));
    }

    #[test]
    fn expired_exactly_at_truncated_now_is_disabled() {
        let published = datetime!(2024-05-01 09:00:00 UTC);
        let expired = datetime!(2024-05-01 10:30:00 UTC);
        let now = datetime!(2024-05-01 10:30:10 UTC);
        assert!(!window_enabled(Some(published), Some(expired), now));
    }

    #[test]
    fn unpublished_is_never_enabled() {
        let now = datetime!(2024-05-01 10:30:00 UTC);
        assert!(!window_enabled(None, None, now));
    }
}
