//! Settings layer for embedders: layered precedence (file → environment).

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::cache::CacheConfig;
use crate::domain::{Configuration, MultisiteStrategy};

const LOCAL_CONFIG_BASENAME: &str = "varco";
const DEFAULT_FALLBACK_LOCALE: &str = "en";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub debug: bool,
    pub multisite: MultisiteStrategy,
    pub fallback_locale: String,
    pub cache: CacheConfig,
}

impl Settings {
    /// Seed the boot-time runtime configuration from these settings.
    pub fn configuration(&self) -> Configuration {
        Configuration {
            debug: self.debug,
            multisite: self.multisite,
            fallback_locale: self.fallback_locale.clone(),
            ..Configuration::default()
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        self.cache.clone()
    }

    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        // Unknown strategy is a deployment error and aborts the load rather
        // than defaulting.
        let multisite = match raw.multisite.as_deref() {
            None => MultisiteStrategy::Host,
            Some(value) => value
                .parse()
                .map_err(|()| LoadError::invalid("multisite", format!("unknown strategy `{value}`")))?,
        };

        let fallback_locale = raw
            .fallback_locale
            .filter(|locale| !locale.is_empty())
            .unwrap_or_else(|| DEFAULT_FALLBACK_LOCALE.to_string());

        Ok(Self {
            debug: raw.debug.unwrap_or(false),
            multisite,
            fallback_locale,
            cache: raw.cache,
        })
    }
}

/// Load settings: optional `varco` file, then `VARCO_*` environment keys.
pub fn load() -> Result<Settings, LoadError> {
    let raw: RawSettings = Config::builder()
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false))
        .add_source(Environment::with_prefix("VARCO").separator("__"))
        .build()?
        .try_deserialize()?;
    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    debug: Option<bool>,
    multisite: Option<String>,
    fallback_locale: Option<String>,
    cache: CacheConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_raw_is_empty() {
        let settings = Settings::from_raw(RawSettings::default()).expect("settings");
        assert!(!settings.debug);
        assert_eq!(settings.multisite, MultisiteStrategy::Host);
        assert_eq!(settings.fallback_locale, "en");
        assert!(settings.cache.enabled);
    }

    #[test]
    fn strategy_parses_kebab_case() {
        let raw = RawSettings {
            multisite: Some("host-with-path-by-locale".to_string()),
            ..RawSettings::default()
        };
        let settings = Settings::from_raw(raw).expect("settings");
        assert_eq!(settings.multisite, MultisiteStrategy::HostWithPathByLocale);
    }

    #[test]
    fn unknown_strategy_aborts_the_load() {
        let raw = RawSettings {
            multisite: Some("round-robin".to_string()),
            ..RawSettings::default()
        };
        let err = Settings::from_raw(raw).expect_err("load error");
        assert!(matches!(err, LoadError::Invalid { key: "multisite", .. }));
    }

    #[test]
    fn empty_fallback_locale_uses_default() {
        let raw = RawSettings {
            fallback_locale: Some(String::new()),
            ..RawSettings::default()
        };
        let settings = Settings::from_raw(raw).expect("settings");
        assert_eq!(settings.fallback_locale, "en");
    }

    #[test]
    fn seeds_runtime_configuration() {
        let raw = RawSettings {
            debug: Some(true),
            multisite: Some("host-by-locale".to_string()),
            fallback_locale: Some("de_DE".to_string()),
            ..RawSettings::default()
        };
        let settings = Settings::from_raw(raw).expect("settings");
        let cfg = settings.configuration();
        assert!(cfg.debug);
        assert_eq!(cfg.multisite, MultisiteStrategy::HostByLocale);
        assert_eq!(cfg.fallback_locale, "de_DE");
        // The rest keeps the runtime defaults.
        assert!(!cfg.catch_errors.is_empty());
    }
}
