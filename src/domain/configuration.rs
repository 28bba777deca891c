//! Runtime configuration entity: multisite strategy, ignore rules, skip
//! rules, and the status-class error-page tables.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::util::regex::cached;

/// Tenant-selection strategy. A closed set; configuration values outside it
/// fail deserialization, which is a deployment error, never a request-time
/// condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MultisiteStrategy {
    Host,
    HostByLocale,
    HostWithPath,
    HostWithPathByLocale,
}

impl MultisiteStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::HostByLocale => "host-by-locale",
            Self::HostWithPath => "host-with-path",
            Self::HostWithPathByLocale => "host-with-path-by-locale",
        }
    }
}

impl std::fmt::Display for MultisiteStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MultisiteStrategy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "host" => Ok(Self::Host),
            "host-by-locale" => Ok(Self::HostByLocale),
            "host-with-path" => Ok(Self::HostWithPath),
            "host-with-path-by-locale" => Ok(Self::HostWithPathByLocale),
            _ => Err(()),
        }
    }
}

/// Per-concern request skip rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skippers {
    pub equal_paths: Vec<String>,
    pub prefix_paths: Vec<String>,
    pub suffix_paths: Vec<String>,
    /// Regular expressions; invalid entries never match.
    pub expressions: Vec<String>,
}

impl Skippers {
    pub fn is_empty(&self) -> bool {
        self.equal_paths.is_empty()
            && self.prefix_paths.is_empty()
            && self.suffix_paths.is_empty()
            && self.expressions.is_empty()
    }

    pub fn skip(&self, path: &str) -> bool {
        self.equal_paths.iter().any(|p| p == path)
            || self.prefix_paths.iter().any(|p| path.starts_with(p.as_str()))
            || self.suffix_paths.iter().any(|p| path.ends_with(p.as_str()))
            || self
                .expressions
                .iter()
                .any(|expr| cached(expr).is_some_and(|re| re.is_match(path)))
    }

    fn merge(mut self, other: Skippers) -> Skippers {
        self.equal_paths = union(self.equal_paths, other.equal_paths);
        self.prefix_paths = union(self.prefix_paths, other.prefix_paths);
        self.suffix_paths = union(self.suffix_paths, other.suffix_paths);
        self.expressions = union(self.expressions, other.expressions);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub debug: bool,
    pub multisite: MultisiteStrategy,
    pub fallback_locale: String,
    /// Route patterns excluded from page selection and decoration (regex).
    pub ignore_request_patterns: Vec<String>,
    /// Request URIs excluded from the pipeline entirely (regex).
    pub ignore_request_uris: Vec<String>,
    pub site_skippers: Skippers,
    pub page_skippers: Skippers,
    pub logger_skippers: Skippers,
    /// Error-page pattern → HTTP status codes it catches.
    ///
    /// Scanned in key order; when several patterns claim the same status the
    /// lexicographically smallest pattern wins, deterministically.
    pub catch_errors: BTreeMap<String, Vec<u16>>,
    pub additional: BTreeMap<String, String>,
}

impl Default for Configuration {
    fn default() -> Self {
        let mut catch_errors = BTreeMap::new();
        catch_errors.insert(
            super::page::PAGE_ERROR_4XX.to_string(),
            vec![
                400, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413, 414, 415,
                416, 417, 418, 421, 422, 423, 424, 425, 426, 428, 429, 431, 451,
            ],
        );
        catch_errors.insert(
            super::page::PAGE_ERROR_5XX.to_string(),
            vec![500, 501, 502, 503, 504, 505, 506, 507, 508, 510, 511],
        );

        Self {
            debug: false,
            multisite: MultisiteStrategy::Host,
            fallback_locale: "en_US".to_string(),
            ignore_request_patterns: Vec::new(),
            ignore_request_uris: Vec::new(),
            site_skippers: Skippers::default(),
            page_skippers: Skippers::default(),
            logger_skippers: Skippers::default(),
            catch_errors,
            additional: BTreeMap::new(),
        }
    }
}

impl Configuration {
    /// Whether a matched route pattern is excluded from page selection.
    pub fn ignore_pattern(&self, pattern: &str) -> bool {
        if pattern.is_empty() {
            return false;
        }
        self.ignore_request_patterns
            .iter()
            .any(|expr| cached(expr).is_some_and(|re| re.is_match(pattern)))
    }

    /// Whether a request URI is excluded from the pipeline.
    pub fn ignore_uri(&self, uri: &str) -> bool {
        self.ignore_request_uris
            .iter()
            .any(|expr| cached(expr).is_some_and(|re| re.is_match(uri)))
    }

    /// The error-page pattern catching `status`, if any.
    pub fn error_pattern_for_status(&self, status: u16) -> Option<&str> {
        self.catch_errors
            .iter()
            .find(|(_, codes)| codes.contains(&status))
            .map(|(pattern, _)| pattern.as_str())
    }

    /// Overlay a partial configuration onto this one.
    ///
    /// Scalars are replaced when present, list fields unioned and
    /// de-duplicated, map fields shallow-merged.
    pub fn merge(mut self, other: ConfigurationOverlay) -> Configuration {
        if let Some(debug) = other.debug {
            self.debug = debug;
        }
        if let Some(multisite) = other.multisite {
            self.multisite = multisite;
        }
        if let Some(locale) = other.fallback_locale {
            if !locale.is_empty() {
                self.fallback_locale = locale;
            }
        }

        self.ignore_request_patterns =
            union(self.ignore_request_patterns, other.ignore_request_patterns);
        self.ignore_request_uris = union(self.ignore_request_uris, other.ignore_request_uris);

        self.site_skippers = self.site_skippers.merge(other.site_skippers);
        self.page_skippers = self.page_skippers.merge(other.page_skippers);
        self.logger_skippers = self.logger_skippers.merge(other.logger_skippers);

        for (pattern, codes) in other.catch_errors {
            let entry = self.catch_errors.entry(pattern).or_default();
            *entry = union(std::mem::take(entry), codes);
        }
        self.additional.extend(other.additional);

        self
    }
}

/// A partial configuration, overlaid onto a base one via
/// [`Configuration::merge`]. Absent scalars leave the base value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationOverlay {
    pub debug: Option<bool>,
    pub multisite: Option<MultisiteStrategy>,
    pub fallback_locale: Option<String>,
    pub ignore_request_patterns: Vec<String>,
    pub ignore_request_uris: Vec<String>,
    pub site_skippers: Skippers,
    pub page_skippers: Skippers,
    pub logger_skippers: Skippers,
    pub catch_errors: BTreeMap<String, Vec<u16>>,
    pub additional: BTreeMap<String, String>,
}

fn union<T: Ord + Clone>(a: Vec<T>, b: Vec<T>) -> Vec<T> {
    let mut seen = BTreeSet::new();
    a.into_iter()
        .chain(b)
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
