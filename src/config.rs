//! Startup configuration: built-in defaults, then `EVENTDESK_*` environment
//! variables, then command-line flags.

use std::{env, fmt, path::PathBuf, time::Duration};

use directories::UserDirs;
use reqwest::Url;

use crate::table::{DEFAULT_BANNER_DURATION, DEFAULT_QUIET_PERIOD};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_PAGE_SIZE: u32 = 10;

pub const BASE_URL_ENV: &str = "EVENTDESK_BASE_URL";
pub const PAGE_SIZE_ENV: &str = "EVENTDESK_PAGE_SIZE";
pub const SEARCH_DEBOUNCE_ENV: &str = "EVENTDESK_SEARCH_DEBOUNCE_MS";
pub const BANNER_ENV: &str = "EVENTDESK_BANNER_MS";
pub const EXPORT_DIR_ENV: &str = "EVENTDESK_EXPORT_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_url: String,
    pub page_size: u32,
    pub search_debounce: Duration,
    pub banner_duration: Duration,
    pub export_dir: PathBuf,
}

/// Values given on the command line. `None` leaves the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub page_size: Option<u32>,
    pub export_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidBaseUrl { value: String, reason: String },
    InvalidPageSize(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidBaseUrl { value, reason } => {
                write!(f, "invalid base URL '{value}': {reason}")
            }
            ConfigError::InvalidPageSize(size) => {
                write!(f, "invalid page size {size}: must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn load(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve(|name| env::var(name).ok(), overrides)
    }

    /// Layer `lookup` (usually the process environment) and `overrides` over
    /// the defaults.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let base_url = overrides
            .base_url
            .or_else(|| lookup(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = validate_base_url(&base_url)?;

        let page_size = match overrides.page_size {
            Some(0) => return Err(ConfigError::InvalidPageSize(0)),
            Some(size) => size,
            None => env_number(&lookup, PAGE_SIZE_ENV)
                .and_then(|size| u32::try_from(size).ok())
                .unwrap_or(DEFAULT_PAGE_SIZE),
        };

        let search_debounce = env_number(&lookup, SEARCH_DEBOUNCE_ENV)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_QUIET_PERIOD);
        let banner_duration = env_number(&lookup, BANNER_ENV)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_BANNER_DURATION);

        let export_dir = overrides
            .export_dir
            .or_else(|| lookup(EXPORT_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(default_export_dir);

        Ok(Self {
            base_url,
            page_size,
            search_debounce,
            banner_duration,
            export_dir,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce: DEFAULT_QUIET_PERIOD,
            banner_duration: DEFAULT_BANNER_DURATION,
            export_dir: default_export_dir(),
        }
    }
}

/// Positive integer from the environment. Anything else is logged and ignored.
fn env_number(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<u64> {
    let raw = lookup(name)?;
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            tracing::warn!(variable = name, value = %raw, "ignoring invalid setting");
            None
        }
    }
}

fn validate_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = Url::parse(trimmed).map_err(|err| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            value: raw.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(trimmed.to_string())
}

pub fn default_export_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(PathBuf::from))
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = Config::resolve(env_of(&[]), ConfigOverrides::default()).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.page_size, 10);
        assert_eq!(config.search_debounce, Duration::from_millis(350));
        assert_eq!(config.banner_duration, Duration::from_secs(4));
    }

    #[test]
    fn environment_then_flags_override_defaults() {
        let lookup = env_of(&[
            (BASE_URL_ENV, "https://eventos.example.com/"),
            (PAGE_SIZE_ENV, "25"),
            (SEARCH_DEBOUNCE_ENV, "500"),
            (EXPORT_DIR_ENV, "/tmp/env-exports"),
        ]);
        let config = Config::resolve(&lookup, ConfigOverrides::default()).unwrap();
        assert_eq!(config.base_url, "https://eventos.example.com");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.search_debounce, Duration::from_millis(500));
        assert_eq!(config.export_dir, PathBuf::from("/tmp/env-exports"));

        let overrides = ConfigOverrides {
            base_url: Some("http://localhost:8080".to_string()),
            page_size: Some(50),
            export_dir: Some(PathBuf::from("/tmp/flag-exports")),
        };
        let config = Config::resolve(&lookup, overrides).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.export_dir, PathBuf::from("/tmp/flag-exports"));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let lookup = env_of(&[(PAGE_SIZE_ENV, "0"), (BANNER_ENV, "soon")]);
        let config = Config::resolve(lookup, ConfigOverrides::default()).unwrap();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.banner_duration, DEFAULT_BANNER_DURATION);
    }

    #[test]
    fn rejects_non_http_base_url() {
        let overrides = ConfigOverrides {
            base_url: Some("ftp://files.example.com".to_string()),
            ..ConfigOverrides::default()
        };
        let err = Config::resolve(env_of(&[]), overrides).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

        let overrides = ConfigOverrides {
            base_url: Some("not a url".to_string()),
            ..ConfigOverrides::default()
        };
        assert!(Config::resolve(env_of(&[]), overrides).is_err());
    }

    #[test]
    fn zero_page_size_flag_is_an_error() {
        let overrides = ConfigOverrides {
            page_size: Some(0),
            ..ConfigOverrides::default()
        };
        assert_eq!(
            Config::resolve(env_of(&[]), overrides).unwrap_err(),
            ConfigError::InvalidPageSize(0)
        );
    }
}
