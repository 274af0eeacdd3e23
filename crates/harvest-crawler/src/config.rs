use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Extensions of non-document resources that are never fetched.
pub const DEFAULT_REJECTED_EXTENSIONS: [&str; 4] = [".jpg", ".jpeg", ".png", ".webp"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f32,

    /// Delay in seconds between two content page requests
    #[serde(default = "default_delay")]
    pub delay: f32,

    #[serde(default = "default_max_per_host")]
    pub max_per_host: NonZeroUsize,

    #[serde(default)]
    pub retries: u32,

    /// Delay in seconds between two attempts of the same request
    #[serde(default = "default_retry_delay")]
    pub retry_delay: f32,

    #[serde(default)]
    pub dedup: bool,

    #[serde(default)]
    pub follow_nested: bool,

    #[serde(default = "default_rejected_extensions")]
    pub rejected_extensions: Vec<String>,

    #[serde(default = "default_on_sitemap_error")]
    pub on_sitemap_error: OnError,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_timeout(),
            delay: default_delay(),
            max_per_host: default_max_per_host(),
            retries: 0,
            retry_delay: default_retry_delay(),
            dedup: false,
            follow_nested: false,
            rejected_extensions: default_rejected_extensions(),
            on_sitemap_error: default_on_sitemap_error(),
        }
    }
}

impl CrawlerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout = seconds("timeout", self.timeout)?;
        if timeout < Duration::from_secs(1) {
            return Err(ConfigError::Invalid(format!(
                "timeout must be at least 1s, got {}",
                self.timeout
            )));
        }
        seconds("delay", self.delay)?;
        seconds("retry delay", self.retry_delay)?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f32(self.timeout)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs_f32(self.delay)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs_f32(self.retry_delay)
    }
}

fn seconds(name: &str, secs: f32) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f32(secs).map_err(|_| {
        ConfigError::Invalid(format!(
            "{name} must be a positive number of seconds, got {secs}"
        ))
    })
}

fn default_user_agent() -> String {
    String::from("HarvestBot")
}

fn default_timeout() -> f32 {
    10.0
}

fn default_delay() -> f32 {
    0.5
}

fn default_max_per_host() -> NonZeroUsize {
    NonZeroUsize::MIN
}

fn default_retry_delay() -> f32 {
    1.0
}

fn default_rejected_extensions() -> Vec<String> {
    DEFAULT_REJECTED_EXTENSIONS
        .iter()
        .map(|ext| ext.to_string())
        .collect()
}

fn default_on_sitemap_error() -> OnError {
    OnError::SkipAndLog
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ArgEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sequential_polite_crawl() {
        let conf = CrawlerConfig::default();
        assert_eq!(conf.max_per_host.get(), 1);
        assert_eq!(conf.timeout(), Duration::from_secs(10));
        assert_eq!(conf.delay(), Duration::from_millis(500));
        assert_eq!(conf.retries, 0);
        assert!(!conf.dedup);
        assert!(conf.validate().is_ok());
    }

    #[test]
    fn short_timeout_is_rejected() {
        let conf = CrawlerConfig {
            timeout: 0.5,
            ..Default::default()
        };
        assert!(matches!(conf.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unrepresentable_durations_are_rejected() {
        for conf in [
            CrawlerConfig {
                delay: 1e20,
                ..Default::default()
            },
            CrawlerConfig {
                timeout: f32::INFINITY,
                ..Default::default()
            },
            CrawlerConfig {
                retry_delay: f32::NAN,
                ..Default::default()
            },
        ] {
            assert!(matches!(conf.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn negative_delay_is_rejected() {
        let conf = CrawlerConfig {
            delay: -1.0,
            ..Default::default()
        };
        assert!(conf.validate().is_err());
    }
}
