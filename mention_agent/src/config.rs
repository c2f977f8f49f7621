use thiserror::Error;
use url::Url;

use std::path::PathBuf;
use std::time::Duration;

use mention_core::job::DEFAULT_POLL_INTERVAL_SECS;
use mention_core::source::DEFAULT_PAGE_SIZE;
use twitter_client::{SEARCH_API_MAX_COUNT, SEARCH_API_MIN_COUNT};

pub const DEFAULT_STATE_FILE: &str = "data/tweets.json";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing {0} environment variable. Please check your .env file")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Tracked handle, without the leading `@`.
    pub username: String,
    pub api_key: String,
    pub api_secret: String,
    pub generator_url: Url,
    pub generator_api_key: String,
    pub responder_url: Option<Url>,
    pub state_file: PathBuf,
    pub poll_interval: Duration,
    pub page_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &'static str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let parse_url = |key: &'static str, value: String| {
            Url::parse(&value).map_err(|_| ConfigError::Invalid { key, value })
        };

        let username = require("TWITTER_USERNAME")?.trim_start_matches('@').to_string();
        if username.is_empty() {
            return Err(ConfigError::Missing("TWITTER_USERNAME"));
        }

        let responder_url = match get("RESPONDER_URL") {
            Some(value) => Some(parse_url("RESPONDER_URL", value)?),
            None => None,
        };
        let poll_interval = match get("POLL_INTERVAL_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "POLL_INTERVAL_SECS",
                        value,
                    })
                }
            },
            None => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        };
        let page_size = match get("SEARCH_MAX_RESULTS") {
            Some(value) => value
                .parse::<u32>()
                .map(|n| n.clamp(SEARCH_API_MIN_COUNT, SEARCH_API_MAX_COUNT))
                .map_err(|_| ConfigError::Invalid {
                    key: "SEARCH_MAX_RESULTS",
                    value,
                })?,
            None => DEFAULT_PAGE_SIZE,
        };

        Ok(Config {
            username,
            api_key: require("TWITTER_API_KEY")?,
            api_secret: require("TWITTER_API_SECRET")?,
            generator_url: parse_url("GENERATOR_URL", require("GENERATOR_URL")?)?,
            generator_api_key: require("GENERATOR_API_KEY")?,
            responder_url,
            state_file: get("STATE_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_FILE)),
            poll_interval,
            page_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("TWITTER_USERNAME", "@tracked"),
        ("TWITTER_API_KEY", "key"),
        ("TWITTER_API_SECRET", "secret"),
        ("GENERATOR_URL", "http://localhost:8080/generate"),
        ("GENERATOR_API_KEY", "gen-key"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(config.username, "tracked");
        assert_eq!(config.state_file, PathBuf::from(DEFAULT_STATE_FILE));
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.page_size, 10);
        assert!(config.responder_url.is_none());
    }

    #[test]
    fn test_missing_required_values() {
        for (missing, _) in REQUIRED {
            let pairs: Vec<_> = REQUIRED.iter().filter(|(k, _)| k != missing).cloned().collect();
            let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::Missing(key) if key == *missing), "{}", missing);
        }
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[2] = ("TWITTER_API_SECRET", "   ");
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TWITTER_API_SECRET"));
    }

    #[test]
    fn test_optional_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("RESPONDER_URL", "http://localhost:9000/reply"),
            ("STATE_FILE", "/tmp/agent/state.json"),
            ("POLL_INTERVAL_SECS", "15"),
            ("SEARCH_MAX_RESULTS", "500"),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.responder_url.unwrap().path(), "/reply");
        assert_eq!(config.state_file, PathBuf::from("/tmp/agent/state.json"));
        assert_eq!(config.poll_interval, Duration::from_secs(15));
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn test_invalid_values() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POLL_INTERVAL_SECS", "0"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_SECS",
                ..
            })
        ));

        let mut pairs = REQUIRED.to_vec();
        pairs[3] = ("GENERATOR_URL", "not a url");
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(ConfigError::Invalid { key: "GENERATOR_URL", .. })
        ));
    }
}
