use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::clustering::DEFAULT_MIN_CLUSTER_SIZE;
use crate::threads::DEFAULT_THREAD_MINUTES;

pub const DEFAULT_MAX_AGE_HOURS: i64 = 24;

/// Upper bounds for the numeric settings: ten years of posts, one week between
/// posts of a thread
pub const MAX_AGE_HOURS_LIMIT: i64 = 24 * 365 * 10;
pub const THREAD_MINUTES_LIMIT: i64 = 60 * 24 * 7;

#[derive(Debug, Clone)]
pub struct Config {
    pub posts_file: PathBuf,
    pub accounts_file: PathBuf,
    pub output: PathBuf,
    pub dictionary: Option<PathBuf>,
    pub max_age_hours: i64,
    pub thread_minutes: i64,
    pub min_cluster_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            posts_file: PathBuf::from("x_posts.json"),
            accounts_file: PathBuf::from("accounts.txt"),
            output: PathBuf::from("Output.html"),
            dictionary: None,
            max_age_hours: DEFAULT_MAX_AGE_HOURS,
            thread_minutes: DEFAULT_THREAD_MINUTES,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::try_load_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any variable source. Unset or blank variables keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let config = Self {
            posts_file: get("NEWS_DIGEST_POSTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.posts_file),
            accounts_file: get("NEWS_DIGEST_ACCOUNTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.accounts_file),
            output: get("NEWS_DIGEST_OUTPUT")
                .map(PathBuf::from)
                .unwrap_or(defaults.output),
            dictionary: get("NEWS_DIGEST_DICTIONARY").map(PathBuf::from),
            max_age_hours: parse_var(
                "NEWS_DIGEST_MAX_AGE_HOURS",
                get("NEWS_DIGEST_MAX_AGE_HOURS"),
                defaults.max_age_hours,
            )?,
            thread_minutes: parse_var(
                "NEWS_DIGEST_THREAD_MINUTES",
                get("NEWS_DIGEST_THREAD_MINUTES"),
                defaults.thread_minutes,
            )?,
            min_cluster_size: parse_var(
                "NEWS_DIGEST_MIN_CLUSTER_SIZE",
                get("NEWS_DIGEST_MIN_CLUSTER_SIZE"),
                defaults.min_cluster_size,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the numeric settings are in range. Call again after applying
    /// command-line overrides.
    pub fn validate(&self) -> Result<()> {
        check_range("max age hours", self.max_age_hours, MAX_AGE_HOURS_LIMIT)?;
        check_range("thread minutes", self.thread_minutes, THREAD_MINUTES_LIMIT)?;
        Ok(())
    }

    fn try_load_dotenv() {
        // 1. Current directory
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/ai-news-digest/.env
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("ai-news-digest").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }
    }
}

fn parse_var<T>(name: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", name, raw)),
        None => Ok(default),
    }
}

fn check_range(name: &str, value: i64, limit: i64) -> Result<()> {
    if !(0..=limit).contains(&value) {
        anyhow::bail!("{} must be between 0 and {}, got {}", name, limit, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.posts_file, PathBuf::from("x_posts.json"));
        assert_eq!(config.accounts_file, PathBuf::from("accounts.txt"));
        assert_eq!(config.output, PathBuf::from("Output.html"));
        assert_eq!(config.dictionary, None);
        assert_eq!(config.max_age_hours, 24);
        assert_eq!(config.thread_minutes, 10);
        assert_eq!(config.min_cluster_size, 2);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("NEWS_DIGEST_POSTS_FILE", "/tmp/posts.json"),
            ("NEWS_DIGEST_DICTIONARY", "dict.json"),
            ("NEWS_DIGEST_MAX_AGE_HOURS", " 48 "),
            ("NEWS_DIGEST_THREAD_MINUTES", "5"),
            ("NEWS_DIGEST_MIN_CLUSTER_SIZE", "3"),
            ("NEWS_DIGEST_OUTPUT", "  "),
        ]))
        .unwrap();
        assert_eq!(config.posts_file, PathBuf::from("/tmp/posts.json"));
        assert_eq!(config.dictionary, Some(PathBuf::from("dict.json")));
        assert_eq!(config.max_age_hours, 48);
        assert_eq!(config.thread_minutes, 5);
        assert_eq!(config.min_cluster_size, 3);
        assert_eq!(config.output, PathBuf::from("Output.html"));
    }

    #[test]
    fn test_unparseable_number_is_error() {
        let err = Config::from_lookup(lookup(&[("NEWS_DIGEST_THREAD_MINUTES", "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains("NEWS_DIGEST_THREAD_MINUTES"));

        assert!(Config::from_lookup(lookup(&[("NEWS_DIGEST_MIN_CLUSTER_SIZE", "-1")])).is_err());
    }

    #[test]
    fn test_out_of_range_numbers_are_errors() {
        let err = Config::from_lookup(lookup(&[(
            "NEWS_DIGEST_THREAD_MINUTES",
            "9223372036854775807",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("thread minutes must be between 0 and"));

        assert!(Config::from_lookup(lookup(&[("NEWS_DIGEST_THREAD_MINUTES", "-10")])).is_err());
        assert!(Config::from_lookup(lookup(&[("NEWS_DIGEST_MAX_AGE_HOURS", "-1")])).is_err());
        assert!(Config::from_lookup(lookup(&[("NEWS_DIGEST_MAX_AGE_HOURS", "3000000000")])).is_err());
        assert!(Config::from_lookup(lookup(&[("NEWS_DIGEST_MAX_AGE_HOURS", "87600")])).is_ok());
    }

    #[test]
    fn test_validate_catches_overrides() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.thread_minutes = i64::MAX;
        assert!(config.validate().is_err());

        config.thread_minutes = 10;
        config.max_age_hours = -24;
        assert!(config.validate().is_err());
    }
}
