use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use harvest_crawler::{
    CancellationToken, CrawlEvent, CrawlObserver, Crawler, Fetcher, OnError, SitemapSource,
    PAGE_PLACEHOLDER,
};
use harvest_extract::{record_to_json, TargetConfig};
use tokio::runtime;

/// Sitemap driven content harvester
#[derive(Debug, Parser)]
#[clap(version)]
pub struct Args {
    #[clap(subcommand)]
    pub cmd: SubCommand,
}

#[derive(Debug, clap::Subcommand)]
pub enum SubCommand {
    #[clap(name = "crawl")]
    Crawl(CrawlArgs),
    #[clap(name = "extract")]
    Extract(ExtractArgs),
    #[clap(hide = true)]
    Completion,
}

/// Crawl the target's sitemaps and write every page content as JSON
#[derive(Debug, clap::Args)]
pub struct CrawlArgs {
    /// Path to the target yaml configuration
    #[clap(parse(from_os_str), long, short)]
    pub target: PathBuf,
    /// Override target's output file
    #[clap(parse(from_os_str), long, short)]
    pub output: Option<PathBuf>,
    /// Override target's sitemap, a pattern when it contains `{page}`
    #[clap(env = "HARVEST_SITEMAP", long)]
    pub sitemap: Option<String>,
    /// Override the number of sitemap pages of a pattern
    #[clap(long)]
    pub pages: Option<u32>,
    /// Override crawler's user agent
    #[clap(long)]
    pub user_agent: Option<String>,
    /// Override crawler's request timeout, in seconds
    #[clap(long)]
    pub timeout: Option<f32>,
    /// Override crawler's delay between two page requests, in seconds
    #[clap(long)]
    pub delay: Option<f32>,
    /// Override crawler's maximum concurrent requests to the same host
    #[clap(long)]
    pub max_per_host: Option<usize>,
    /// Override crawler's retries of transient failures
    #[clap(long)]
    pub retries: Option<u32>,
    /// Skip candidates already seen
    #[clap(long)]
    pub dedup: bool,
    /// Follow sitemap indexes to their nested sitemaps
    #[clap(long)]
    pub follow_nested: bool,
    /// Override crawler's sitemap error handling strategy
    #[clap(arg_enum, long)]
    pub on_sitemap_error: Option<OnError>,
    /// No SIGINT handling, Ctrl-C kills the process right away
    #[clap(long)]
    pub no_sigint: bool,
    /// When quiet no logs are outputted
    #[clap(long, short)]
    pub quiet: bool,
}

impl TryFrom<&CrawlArgs> for TargetConfig {
    type Error = anyhow::Error;

    fn try_from(args: &CrawlArgs) -> Result<Self, Self::Error> {
        let mut target = TargetConfig::from_path(&args.target)?;

        let pages = args.pages.or(match &target.sitemap {
            Some(SitemapSource::Paged { pages, .. }) => Some(*pages),
            _ => None,
        });
        if let Some(sitemap) = &args.sitemap {
            target.sitemap = Some(if sitemap.contains(PAGE_PLACEHOLDER) {
                let pages = pages.ok_or_else(|| {
                    anyhow::anyhow!("`--pages` is required with a sitemap pattern")
                })?;
                SitemapSource::Paged {
                    pattern: sitemap.clone(),
                    pages,
                }
            } else {
                SitemapSource::single(sitemap)
            });
        } else if let (Some(SitemapSource::Paged { pages: p, .. }), Some(pages)) =
            (&mut target.sitemap, args.pages)
        {
            *p = pages;
        }

        if let Some(output) = &args.output {
            target.output.path = Some(output.clone());
        }

        let conf = &mut target.crawler;
        if let Some(user_agent) = &args.user_agent {
            conf.user_agent = user_agent.to_string();
        }
        if let Some(timeout) = args.timeout {
            conf.timeout = timeout;
        }
        if let Some(delay) = args.delay {
            conf.delay = delay;
        }
        if let Some(max_per_host) = args.max_per_host {
            conf.max_per_host = max_per_host
                .try_into()
                .map_err(|_| anyhow::anyhow!("`--max-per-host` must be at least 1"))?;
        }
        if let Some(retries) = args.retries {
            conf.retries = retries;
        }
        if args.dedup {
            conf.dedup = true;
        }
        if args.follow_nested {
            conf.follow_nested = true;
        }
        if let Some(on_sitemap_error) = args.on_sitemap_error {
            conf.on_sitemap_error = on_sitemap_error;
        }

        target.validate()?;
        Ok(target)
    }
}

/// Logs crawl progress, failures are already logged by the crawler.
struct LogObserver;

impl CrawlObserver for LogObserver {
    fn on_event(&self, event: &CrawlEvent<'_>) {
        match event {
            CrawlEvent::SitemapRead {
                index,
                url,
                found,
                accepted,
            } => log::info!("Sitemap {index} {url}: {accepted}/{found} URLs kept"),
            CrawlEvent::Candidate { index, total, url } => {
                log::info!("[{index}/{total}] Fetching {url}")
            }
            CrawlEvent::StateChanged(_)
            | CrawlEvent::SitemapFailed { .. }
            | CrawlEvent::Record { .. } => (),
        }
    }
}

pub fn crawl(args: CrawlArgs) -> anyhow::Result<()> {
    let target: TargetConfig = (&args).try_into()?;
    let source = target.source()?.clone();
    let extractor = target.extractor()?;
    let writer = target.writer()?;

    let rt = runtime::Builder::new_multi_thread().enable_all().build()?;
    let crawl = rt.block_on(async {
        let cancel = CancellationToken::new();
        if !args.no_sigint {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, stopping the crawl");
                    cancel.cancel();
                }
            });
        }

        let crawler = Crawler::new(target.crawler.clone())?
            .with_observer(Arc::new(LogObserver))
            .with_cancellation(cancel);
        anyhow::Ok(crawler.run_and_write(&source, &extractor, &writer).await?)
    })?;

    log::info!(
        "Done: {} records, {} failed",
        crawl.records.len(),
        crawl.failures()
    );
    if crawl.cancelled {
        anyhow::bail!(
            "Crawl interrupted after {} records, {} left untouched",
            crawl.records.len(),
            writer.path().display()
        );
    }
    Ok(())
}

/// Extract a single page and print the resulting record to stdout
#[derive(Debug, clap::Args)]
#[clap(group = clap::ArgGroup::new("page").required(true))]
pub struct ExtractArgs {
    /// Path to the target yaml configuration
    #[clap(parse(from_os_str), long, short)]
    pub target: PathBuf,
    /// A local html page to extract
    #[clap(group = "page", parse(from_os_str), long)]
    pub file: Option<PathBuf>,
    /// A distant html page to extract
    #[clap(group = "page", long)]
    pub url: Option<String>,
    /// Custom user agent to download the page
    #[clap(long, conflicts_with = "file")]
    pub user_agent: Option<String>,
}

pub fn extract(args: ExtractArgs) -> anyhow::Result<()> {
    let mut target = TargetConfig::from_path(&args.target)?;
    if let Some(user_agent) = args.user_agent {
        target.crawler.user_agent = user_agent;
    }
    let extractor = target.extractor()?;

    let record = if let Some(url) = args.url {
        let fetcher = Fetcher::new(&target.crawler)?;
        let rt = runtime::Builder::new_current_thread().enable_all().build()?;
        let page = rt.block_on(fetcher.fetch(&url))?;
        extractor.extract_html(&page.url, &page.body)
    } else if let Some(path) = args.file {
        let page = fs::read_to_string(&path)?;
        extractor.extract_html(&path.to_string_lossy(), &page)
    } else {
        anyhow::bail!("Missing `url` or `file`");
    };

    println!("{}", record_to_json(&target.output.keys, &record)?);
    Ok(())
}

fn init_logger(filters: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filters)).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.cmd {
        SubCommand::Crawl(args) => {
            if !args.quiet {
                init_logger("harvest=info,harvest_crawler=info,harvest_extract=info");
            }
            crawl(args)
        }
        SubCommand::Extract(args) => {
            init_logger("harvest_crawler=warn,harvest_extract=warn");
            extract(args)
        }
        SubCommand::Completion => {
            generate(Shell::Bash, &mut Args::command(), "harvest", &mut io::stdout());
            Ok(())
        }
    }
}
