use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use thiserror::Error;
use tracing::info;

use crate::{data::UserId, visibility::HidePolicy};

/// Settings read from the environment.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Config {
    /// `WHATNEXT_HIDE_POLICY`: `cascade` (default) or `category-only`.
    pub hide_policy: HidePolicy,
    /// `WHATNEXT_PICK_SEED`: makes the sequence of picks reproducible.
    pub pick_seed: Option<u64>,
    /// `WHATNEXT_SEED_FILE`: a JSON fixture to load into the in-memory store.
    pub seed_file: Option<PathBuf>,
    /// `WHATNEXT_USER`: a user to log in as on startup.
    pub user: Option<UserId>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            hide_policy: try_load(&lookup, "WHATNEXT_HIDE_POLICY", "cascade")?,
            pick_seed: try_load_optional(&lookup, "WHATNEXT_PICK_SEED")?,
            seed_file: try_load_optional(&lookup, "WHATNEXT_SEED_FILE")?,
            user: lookup("WHATNEXT_USER").filter(|u| !u.trim().is_empty()).map(UserId::from),
        })
    }
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    lookup(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse::<T>()
        .map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() })
}

fn try_load_optional<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: Display,
{
    lookup(key)
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.trim().parse::<T>())
        .transpose()
        .map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() })
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.hide_policy, HidePolicy::CascadeToActivities);
        assert_eq!(config.pick_seed, None);
        assert_eq!(config.seed_file, None);
        assert_eq!(config.user, None);
    }

    #[test]
    fn reads_values() {
        let config = config(&[
            ("WHATNEXT_HIDE_POLICY", "category-only"),
            ("WHATNEXT_PICK_SEED", " 42 "),
            ("WHATNEXT_SEED_FILE", "catalog.json"),
            ("WHATNEXT_USER", "alice"),
        ])
        .unwrap();
        assert_eq!(config.hide_policy, HidePolicy::CategoryOnly);
        assert_eq!(config.pick_seed, Some(42));
        assert_eq!(config.seed_file, Some(PathBuf::from("catalog.json")));
        assert_eq!(config.user, Some(UserId::from("alice")));
    }

    #[test]
    fn rejects_bad_values() {
        let err = config(&[("WHATNEXT_PICK_SEED", "lots")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "WHATNEXT_PICK_SEED", .. }));
        let err = config(&[("WHATNEXT_HIDE_POLICY", "never")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "WHATNEXT_HIDE_POLICY", .. }));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config(&[("WHATNEXT_PICK_SEED", "  "), ("WHATNEXT_USER", "")]).unwrap();
        assert_eq!(config.pick_seed, None);
        assert_eq!(config.user, None);
    }
}
