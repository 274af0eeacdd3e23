use serde::{Deserialize, Serialize};

use crate::error::{FetchFailure, WriteError};
use crate::fetcher::Page;

pub const DEFAULT_ERROR_TITLE: &str = "Erro";

/// What is extracted from one crawl candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub url: String,
    pub title: String,
    pub body: String,
    /// False for placeholders standing for a failed candidate
    #[serde(skip, default = "default_ok")]
    pub ok: bool,
}

fn default_ok() -> bool {
    true
}

impl ContentRecord {
    pub fn new(url: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            body: body.into(),
            ok: true,
        }
    }

    pub fn error(url: impl Into<String>, sentinel: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: sentinel.into(),
            body: String::new(),
            ok: false,
        }
    }
}

/// Site specific extraction logic.
///
/// Implementations never fail: missing nodes degrade to fallback values.
pub trait Extractor: Send + Sync {
    fn extract(&self, page: &Page) -> ContentRecord;

    fn failed(&self, failure: &FetchFailure) -> ContentRecord {
        ContentRecord::error(&failure.url, DEFAULT_ERROR_TITLE)
    }
}

/// Durable sink for the records of a whole crawl.
pub trait BatchWriter {
    fn write(&self, batch: &[ContentRecord]) -> Result<(), WriteError>;
}
