use crate::error::SitemapError;
use crate::extractor::ContentRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Idle,
    WalkingSitemaps,
    FetchingPages,
    Done,
}

/// Progress of a crawl, indices are 1-based.
#[derive(Debug)]
pub enum CrawlEvent<'a> {
    StateChanged(CrawlState),
    SitemapRead {
        index: usize,
        url: &'a str,
        found: usize,
        accepted: usize,
    },
    SitemapFailed {
        index: usize,
        error: &'a SitemapError,
    },
    Candidate {
        index: usize,
        total: usize,
        url: &'a str,
    },
    Record {
        index: usize,
        total: usize,
        record: &'a ContentRecord,
    },
}

pub trait CrawlObserver: Send + Sync {
    fn on_event(&self, event: &CrawlEvent<'_>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CrawlObserver for NoopObserver {
    fn on_event(&self, _event: &CrawlEvent<'_>) {}
}
