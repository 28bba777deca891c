//! Shared compiled-regex cache.
//!
//! Ignore rules and site path prefixes are matched on every request; compiled
//! expressions are cached process-wide. All expressions compile
//! case-insensitive. An expression that fails to compile never matches, and
//! the failure is logged once.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::warn;

static COMPILED: Lazy<DashMap<String, Option<Regex>>> = Lazy::new(DashMap::new);

/// Compile `expr` case-insensitively, caching the result.
///
/// Returns `None` for invalid expressions.
pub fn cached(expr: &str) -> Option<Regex> {
    if let Some(entry) = COMPILED.get(expr) {
        return entry.clone();
    }

    let compiled = match RegexBuilder::new(expr).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(error) => {
            warn!(
                target = "varco::util::regex",
                expr,
                error = %error,
                "ignoring invalid expression"
            );
            None
        }
    };
    COMPILED.insert(expr.to_string(), compiled.clone());
    compiled
}

/// Regex matching a site's relative path as a URL prefix.
///
/// Captures the prefix in group 1 and the residual path in group 2; an empty
/// or `/` prefix matches every path with an empty group 1.
pub fn path_prefix(relative_path: &str) -> Option<Regex> {
    let expr = if relative_path.is_empty() || relative_path == "/" {
        "^()(/.*|$)".to_string()
    } else {
        format!("^({})(/.*|$)", regex::escape(relative_path))
    };
    cached(&expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_expression_is_none_and_cached() {
        assert!(cached("([unclosed").is_none());
        assert!(cached("([unclosed").is_none());
    }

    #[test]
    fn cached_expressions_are_case_insensitive() {
        let re = cached("^/admin").expect("valid expression");
        assert!(re.is_match("/Admin/users"));
    }

    #[test]
    fn path_prefix_captures_residual() {
        let re = path_prefix("/blog").expect("valid prefix");
        let caps = re.captures("/blog/2024/hello").expect("match");
        assert_eq!(&caps[1], "/blog");
        assert_eq!(&caps[2], "/2024/hello");

        // Bare prefix leaves an empty residual.
        let caps = re.captures("/blog").expect("match");
        assert_eq!(&caps[2], "");

        assert!(!re.is_match("/blogroll"));
    }

    #[test]
    fn empty_prefix_matches_everything() {
        let re = path_prefix("").expect("valid prefix");
        let caps = re.captures("/anything/here").expect("match");
        assert_eq!(&caps[2], "/anything/here");
    }

    #[test]
    fn prefix_is_escaped_not_interpreted() {
        let re = path_prefix("/docs+api").expect("valid prefix");
        assert!(re.is_match("/docs+api/v1"));
        assert!(!re.is_match("/docssapi/v1"));
    }
}
