mod config;
mod crawler;
mod error;
mod extractor;
mod fetcher;
mod filter;
mod limiter;
mod observer;
mod sitemap;
mod walker;

pub use config::{CrawlerConfig, OnError, DEFAULT_REJECTED_EXTENSIONS};
pub use crawler::{Crawl, Crawler};
pub use error::{ConfigError, CrawlError, FetchCause, FetchFailure, SitemapError, WriteError};
pub use extractor::{BatchWriter, ContentRecord, Extractor, DEFAULT_ERROR_TITLE};
pub use fetcher::{FetchResult, Fetcher, Page};
pub use filter::UrlFilter;
pub use limiter::{Permit, Throttle};
pub use observer::{CrawlEvent, CrawlObserver, CrawlState, NoopObserver};
pub use sitemap::{parse_sitemap, Sitemap, SitemapKind, SitemapReader};
pub use walker::{SitemapSource, SitemapWalker, PAGE_PLACEHOLDER};

pub use tokio_util::sync::CancellationToken;
