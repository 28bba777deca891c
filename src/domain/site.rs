//! Tenant entity: an isolated content domain identified by host, and
//! optionally a path prefix and locale.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::window_enabled;

/// Request-effective scheme and host, bound per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostBinding {
    pub scheme: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub separator: String,
    /// Persisted host. Required; `localhost` sites act as a development
    /// fallback for any request host.
    pub host: String,
    pub locale: String,
    /// URL mount prefix, matched via regex rather than literal compare.
    pub relative_path: String,
    pub is_default: bool,
    pub javascript: String,
    pub stylesheet: String,
    pub metadata: BTreeMap<String, String>,
    pub created: OffsetDateTime,
    pub updated: OffsetDateTime,
    pub published: Option<OffsetDateTime>,
    pub expired: Option<OffsetDateTime>,
    /// Per-request binding of the effective scheme/host. Derived, not stored.
    #[serde(skip)]
    pub binding: Option<HostBinding>,
}

impl Default for Site {
    fn default() -> Self {
        let now = OffsetDateTime::UNIX_EPOCH;
        Self {
            id: 0,
            name: String::new(),
            title: String::new(),
            separator: String::new(),
            host: String::new(),
            locale: String::new(),
            relative_path: String::new(),
            is_default: false,
            javascript: String::new(),
            stylesheet: String::new(),
            metadata: BTreeMap::new(),
            created: now,
            updated: now,
            published: None,
            expired: None,
            binding: None,
        }
    }
}

impl Site {
    /// Bind the request's scheme and host to this site.
    ///
    /// The persisted host keeps deciding [`Site::is_localhost`]; the binding
    /// decides what [`Site::url`] renders.
    pub fn with_host(mut self, scheme: impl Into<String>, host: impl Into<String>) -> Self {
        self.binding = Some(HostBinding {
            scheme: scheme.into(),
            host: host.into(),
        });
        self
    }

    /// The host a canonical URL should carry: the request host when bound,
    /// the persisted host otherwise.
    pub fn effective_host(&self) -> &str {
        self.binding.as_ref().map_or(&self.host, |b| b.host.as_str())
    }

    pub fn scheme(&self) -> &str {
        self.binding.as_ref().map_or("http", |b| b.scheme.as_str())
    }

    /// Canonical URL of this site's mount point.
    pub fn url(&self) -> String {
        format!(
            "{}://{}{}",
            self.scheme(),
            self.effective_host(),
            self.relative_path
        )
    }

    pub fn is_localhost(&self) -> bool {
        self.host == "localhost"
    }

    /// Whether the site is inside its `[published, expired)` window at `now`,
    /// evaluated at minute resolution.
    pub fn is_enabled(&self, now: OffsetDateTime) -> bool {
        window_enabled(self.published, self.expired, now)
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.name.is_empty() {
            f.write_str("n/a")
        } else {
            f.write_str(&self.name)
        }
    }
}
