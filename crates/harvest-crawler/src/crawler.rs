use std::sync::Arc;

use futures::{future, stream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::CrawlerConfig;
use crate::error::{ConfigError, CrawlError};
use crate::extractor::{BatchWriter, ContentRecord, Extractor};
use crate::fetcher::Fetcher;
use crate::filter::UrlFilter;
use crate::limiter::Throttle;
use crate::observer::{CrawlEvent, CrawlObserver, CrawlState, NoopObserver};
use crate::sitemap::SitemapReader;
use crate::walker::{SitemapSource, SitemapWalker};

/// The outcome of a crawl: one record per processed candidate, in candidate
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Crawl {
    pub records: Vec<ContentRecord>,
    /// The crawl was interrupted, `records` only covers the first candidates
    pub cancelled: bool,
}

impl Crawl {
    pub fn failures(&self) -> usize {
        self.records.iter().filter(|r| !r.ok).count()
    }
}

pub struct Crawler {
    config: CrawlerConfig,
    fetcher: Fetcher,
    filter: UrlFilter,
    observer: Arc<dyn CrawlObserver>,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(config: CrawlerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let fetcher = Fetcher::new(&config)?;
        let filter = UrlFilter::new(&config.rejected_extensions);

        Ok(Self {
            config,
            fetcher,
            filter,
            observer: Arc::new(NoopObserver),
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn walker(&self) -> SitemapWalker<'_> {
        SitemapWalker {
            reader: SitemapReader::new(&self.fetcher),
            filter: &self.filter,
            observer: &*self.observer,
            cancel: &self.cancel,
            on_error: self.config.on_sitemap_error,
            follow_nested: self.config.follow_nested,
            dedup: self.config.dedup,
        }
    }

    /// Walks every sitemap of `source` and returns the accepted URLs.
    pub async fn candidates(&self, source: &SitemapSource) -> Result<Vec<String>, CrawlError> {
        source.validate()?;
        let candidates = self.walker().walk(source).try_collect().await?;
        Ok(candidates)
    }

    /// Crawls `source`, turning every candidate into exactly one record.
    pub async fn run<E>(&self, source: &SitemapSource, extractor: &E) -> Result<Crawl, CrawlError>
    where
        E: Extractor + ?Sized,
    {
        source.validate()?;

        self.transition(CrawlState::Idle);
        self.transition(CrawlState::WalkingSitemaps);
        let candidates = match self.candidates(source).await {
            Ok(candidates) => candidates,
            Err(e) => {
                self.transition(CrawlState::Done);
                return Err(e);
            }
        };
        log::info!("Found {} URLs to crawl", candidates.len());

        if self.cancel.is_cancelled() {
            self.transition(CrawlState::Done);
            return Ok(Crawl {
                records: vec![],
                cancelled: true,
            });
        }

        self.transition(CrawlState::FetchingPages);
        let records = self.fetch_all(&candidates, extractor).await;
        let cancelled = records.len() < candidates.len();
        if cancelled {
            log::warn!(
                "Crawl interrupted after {}/{} URLs",
                records.len(),
                candidates.len()
            );
        }
        self.transition(CrawlState::Done);

        Ok(Crawl { records, cancelled })
    }

    /// Crawls `source` then hands the whole batch to `writer`.
    ///
    /// An interrupted crawl writes nothing, previous output is left untouched.
    /// Its records are still returned.
    pub async fn run_and_write<E, W>(
        &self,
        source: &SitemapSource,
        extractor: &E,
        writer: &W,
    ) -> Result<Crawl, CrawlError>
    where
        E: Extractor + ?Sized,
        W: BatchWriter + ?Sized,
    {
        let crawl = self.run(source, extractor).await?;
        if crawl.cancelled {
            log::warn!("Crawl interrupted, nothing written");
        } else {
            writer.write(&crawl.records)?;
        }
        Ok(crawl)
    }

    async fn fetch_all<E>(&self, candidates: &[String], extractor: &E) -> Vec<ContentRecord>
    where
        E: Extractor + ?Sized,
    {
        let total = candidates.len();
        let throttle = Throttle::new(self.config.delay(), self.config.max_per_host.get());
        let throttle = &throttle;

        stream::iter(candidates.iter().enumerate())
            .map(|(i, url)| self.process(i + 1, total, url, throttle, extractor))
            .buffered(self.config.max_per_host.get())
            .take_while(|record| future::ready(record.is_some()))
            .filter_map(future::ready)
            .collect()
            .await
    }

    async fn process<E>(
        &self,
        index: usize,
        total: usize,
        url: &str,
        throttle: &Throttle,
        extractor: &E,
    ) -> Option<ContentRecord>
    where
        E: Extractor + ?Sized,
    {
        if self.cancel.is_cancelled() {
            return None;
        }

        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            fetched = async {
                let _permit = throttle.acquire(url).await;
                self.observer.on_event(&CrawlEvent::Candidate { index, total, url });
                self.fetcher.fetch(url).await
            } => fetched,
        };

        let record = match fetched {
            Ok(page) => extractor.extract(&page),
            Err(failure) => {
                log::error!("Couldn't fetch {failure}");
                extractor.failed(&failure)
            }
        };
        self.observer.on_event(&CrawlEvent::Record {
            index,
            total,
            record: &record,
        });

        Some(record)
    }

    fn transition(&self, state: CrawlState) {
        log::debug!("Crawl state: {state:?}");
        self.observer.on_event(&CrawlEvent::StateChanged(state));
    }
}
