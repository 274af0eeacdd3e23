use std::io;

use harvest_crawler::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("no title selector")]
    NoTitleSelector,
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("couldn't read target: {0}")]
    Io(#[from] io::Error),

    #[error("couldn't parse target: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Crawler(#[from] ConfigError),

    #[error("missing sitemap URL or pattern")]
    MissingSitemap,

    #[error("missing output path")]
    MissingOutput,

    #[error("invalid output keys: {0}")]
    Keys(String),
}
