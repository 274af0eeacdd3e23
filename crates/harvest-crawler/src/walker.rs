use std::collections::{HashSet, VecDeque};

use futures::{stream, Stream};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::OnError;
use crate::error::{ConfigError, SitemapError};
use crate::filter::UrlFilter;
use crate::observer::{CrawlEvent, CrawlObserver};
use crate::sitemap::{SitemapKind, SitemapReader};

/// Replaced by the page number in a paged sitemap pattern.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Where the crawl starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SitemapSource {
    /// Sitemaps numbered from 1 to `pages`, e.g. `https://site/post-sitemap{page}.xml`
    Paged { pattern: String, pages: u32 },
    List { urls: Vec<String> },
}

impl SitemapSource {
    pub fn single(url: impl Into<String>) -> Self {
        Self::List {
            urls: vec![url.into()],
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Paged { pattern, pages } => {
                if !pattern.contains(PAGE_PLACEHOLDER) {
                    return Err(ConfigError::Source(format!(
                        "pattern {pattern:?} has no {PAGE_PLACEHOLDER} placeholder"
                    )));
                }
                if *pages == 0 {
                    return Err(ConfigError::Source("page count must be at least 1".into()));
                }
            }
            Self::List { urls } => {
                if urls.is_empty() {
                    return Err(ConfigError::Source("no sitemap URL".into()));
                }
                if urls.iter().any(|url| url.trim().is_empty()) {
                    return Err(ConfigError::Source("empty sitemap URL".into()));
                }
            }
        }
        Ok(())
    }

    /// The sitemap URLs to read, in order.
    pub fn sitemap_urls(&self) -> Vec<String> {
        match self {
            Self::Paged { pattern, pages } => (1..=*pages)
                .map(|page| pattern.replace(PAGE_PLACEHOLDER, &page.to_string()))
                .collect(),
            Self::List { urls } => urls.iter().map(|url| url.trim().to_string()).collect(),
        }
    }
}

/// Turns sitemaps into a lazy sequence of crawl candidates.
#[derive(Clone, Copy)]
pub struct SitemapWalker<'a> {
    pub(crate) reader: SitemapReader<'a>,
    pub(crate) filter: &'a UrlFilter,
    pub(crate) observer: &'a dyn CrawlObserver,
    pub(crate) cancel: &'a CancellationToken,
    pub(crate) on_error: OnError,
    pub(crate) follow_nested: bool,
    pub(crate) dedup: bool,
}

struct Walk<'a> {
    walker: SitemapWalker<'a>,
    pending: VecDeque<String>,
    ready: VecDeque<String>,
    visited: HashSet<String>,
    seen: HashSet<String>,
    read: usize,
}

impl<'a> SitemapWalker<'a> {
    /// Reads sitemaps one after the other and yields accepted URLs in sitemap
    /// order.
    ///
    /// A sitemap that can't be read or parsed is skipped, unless errors are
    /// configured to fail the walk, in which case the error is the last item.
    pub fn walk(
        self,
        source: &SitemapSource,
    ) -> impl Stream<Item = Result<String, SitemapError>> + 'a {
        let walk = Walk {
            walker: self,
            pending: source.sitemap_urls().into(),
            ready: VecDeque::new(),
            visited: HashSet::new(),
            seen: HashSet::new(),
            read: 0,
        };

        stream::unfold(walk, |mut walk| async move {
            loop {
                if let Some(url) = walk.ready.pop_front() {
                    if walk.walker.dedup && !walk.seen.insert(url.clone()) {
                        log::debug!("Skipping duplicate URL: {url}");
                        continue;
                    }
                    return Some((Ok(url), walk));
                }

                if walk.walker.cancel.is_cancelled() {
                    return None;
                }
                let sitemap_url = walk.pending.pop_front()?;
                if !walk.visited.insert(sitemap_url.clone()) {
                    log::debug!("Skipping already read sitemap: {sitemap_url}");
                    continue;
                }
                walk.read += 1;

                match walk.walker.reader.read(&sitemap_url).await {
                    Ok(sitemap)
                        if walk.walker.follow_nested && sitemap.kind == SitemapKind::Index =>
                    {
                        walk.walker.observer.on_event(&CrawlEvent::SitemapRead {
                            index: walk.read,
                            url: &sitemap_url,
                            found: sitemap.urls.len(),
                            accepted: 0,
                        });
                        for nested in sitemap.urls.into_iter().rev() {
                            walk.pending.push_front(nested);
                        }
                    }
                    Ok(sitemap) => {
                        let found = sitemap.urls.len();
                        let filter = walk.walker.filter;
                        for url in sitemap.urls {
                            if filter.is_crawlable(&url) {
                                walk.ready.push_back(url);
                            } else {
                                log::debug!("Ignoring URL: {url}");
                            }
                        }
                        walk.walker.observer.on_event(&CrawlEvent::SitemapRead {
                            index: walk.read,
                            url: &sitemap_url,
                            found,
                            accepted: walk.ready.len(),
                        });
                    }
                    Err(e) => {
                        walk.walker.observer.on_event(&CrawlEvent::SitemapFailed {
                            index: walk.read,
                            error: &e,
                        });
                        match walk.walker.on_error {
                            OnError::SkipAndLog => {
                                log::warn!("Skipping sitemap: {e}");
                            }
                            OnError::Fail => {
                                walk.pending.clear();
                                return Some((Err(e), walk));
                            }
                        }
                    }
                }
            }
        })
    }
}
