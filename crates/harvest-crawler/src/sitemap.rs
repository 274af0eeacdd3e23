use std::io::prelude::*;

use flate2::read::GzDecoder;
use lazy_static::lazy_static;
use sxd_document::parser;
use sxd_xpath::{Context, Factory, Value};

use crate::error::SitemapError;
use crate::fetcher::{Download, Fetcher};

lazy_static! {
    static ref XP_FACTORY: Factory = Factory::new();
}

const LOC_XPATH: &str = "//*[local-name()='loc']";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    Index,
    Urlset,
    Other,
}

impl SitemapKind {
    fn from_root_name(name: &str) -> Self {
        match name {
            "sitemapindex" => Self::Index,
            "urlset" => Self::Urlset,
            _ => Self::Other,
        }
    }
}

/// The entries of one sitemap document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sitemap {
    pub kind: SitemapKind,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SitemapReader<'a> {
    fetcher: &'a Fetcher,
}

impl<'a> SitemapReader<'a> {
    pub fn new(fetcher: &'a Fetcher) -> Self {
        Self { fetcher }
    }

    pub async fn read(&self, sitemap_url: &str) -> Result<Sitemap, SitemapError> {
        let download = self
            .fetcher
            .download(sitemap_url)
            .await
            .map_err(|failure| SitemapError::Fetch {
                url: failure.url,
                cause: failure.cause,
            })?;
        let xml = decode(sitemap_url, download)?;
        parse_sitemap(sitemap_url, &xml)
    }
}

fn decode(sitemap_url: &str, download: Download) -> Result<String, SitemapError> {
    let parse_err = |message: String| SitemapError::Parse {
        url: sitemap_url.to_string(),
        message,
    };

    if download.gzip || download.bytes.starts_with(&GZIP_MAGIC) {
        let mut gz = GzDecoder::new(&download.bytes[..]);
        let mut xml = String::new();
        gz.read_to_string(&mut xml)
            .map_err(|e| parse_err(format!("gzip: {e}")))?;
        Ok(xml)
    } else {
        String::from_utf8(download.bytes).map_err(|e| parse_err(e.to_string()))
    }
}

/// Extracts the trimmed, non-empty `loc` entries of a sitemap document.
///
/// Namespaces are ignored, so both `sitemapindex` and `urlset` documents, with
/// or without the sitemaps.org namespace, yield their entries.
pub fn parse_sitemap(sitemap_url: &str, xml: &str) -> Result<Sitemap, SitemapError> {
    let parse_err = |message: String| SitemapError::Parse {
        url: sitemap_url.to_string(),
        message,
    };

    let package =
        parser::parse(xml.trim_start_matches('\u{feff}')).map_err(|e| parse_err(e.to_string()))?;
    let document = package.as_document();

    let kind = document
        .root()
        .children()
        .into_iter()
        .find_map(|child| child.element())
        .map(|root| SitemapKind::from_root_name(root.name().local_part()))
        .ok_or_else(|| parse_err("missing root element".to_string()))?;

    let xpath = XP_FACTORY
        .build(LOC_XPATH)
        .map_err(|e| parse_err(format!("{e:?}")))?
        .ok_or_else(|| parse_err("missing XPath".to_string()))?;
    let context = Context::new();
    let value = xpath
        .evaluate(&context, document.root())
        .map_err(|e| parse_err(format!("{e:?}")))?;

    let urls = match value {
        Value::Nodeset(nodes) => nodes
            .document_order()
            .into_iter()
            .map(|node| node.string_value().trim().to_string())
            .filter(|url| !url.is_empty())
            .collect(),
        _ => vec![],
    };

    Ok(Sitemap { kind, urls })
}
