use std::path::{Path, PathBuf};

use harvest_crawler::{CrawlerConfig, SitemapSource};
use serde::{Deserialize, Serialize};

use crate::error::TargetError;
use crate::extractor::SelectorExtractor;
use crate::strategy::Strategy;
use crate::writer::{JsonBatchWriter, RecordKeys};

/// Everything needed to crawl one site.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub sitemap: Option<SitemapSource>,

    #[serde(default)]
    pub strategy: Strategy,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub crawler: CrawlerConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default)]
    pub keys: RecordKeys,
}

impl TargetConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TargetError> {
        let file = fs_err::File::open(path.as_ref())?;
        Ok(serde_yaml::from_reader(file)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, TargetError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Checks the parts needed to crawl, before any request is made.
    pub fn validate(&self) -> Result<(), TargetError> {
        self.source()?.validate()?;
        self.output_path()?;
        self.output.keys.validate().map_err(TargetError::Keys)?;
        self.crawler.validate()?;
        self.extractor()?;
        Ok(())
    }

    pub fn source(&self) -> Result<&SitemapSource, TargetError> {
        self.sitemap.as_ref().ok_or(TargetError::MissingSitemap)
    }

    pub fn output_path(&self) -> Result<&Path, TargetError> {
        self.output
            .path
            .as_deref()
            .ok_or(TargetError::MissingOutput)
    }

    pub fn extractor(&self) -> Result<SelectorExtractor, TargetError> {
        Ok(SelectorExtractor::new(&self.strategy)?)
    }

    pub fn writer(&self) -> Result<JsonBatchWriter, TargetError> {
        Ok(JsonBatchWriter::new(self.output_path()?, self.output.keys.clone()))
    }
}
