use harvest_crawler::{ContentRecord, Extractor, FetchFailure, Page};
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::StrategyError;
use crate::strategy::{BodyFallback, Strategy};

/// Elements whose text is never content.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// An [`Extractor`] driven by a [`Strategy`], selectors are compiled once.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    title: TitleSelectors,
    body: BodySelectors,
    error_title: String,
}

#[derive(Debug, Clone)]
struct TitleSelectors {
    selectors: Vec<Selector>,
    follow: Option<Selector>,
    fallback: String,
    missing_anchor: String,
}

#[derive(Debug, Clone)]
struct BodySelectors {
    container: Option<Selector>,
    paragraphs: Selector,
    fallback: BodyFallback,
}

fn compile(selector: &str) -> Result<Selector, StrategyError> {
    Selector::parse(selector).map_err(|e| StrategyError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

impl SelectorExtractor {
    pub fn new(strategy: &Strategy) -> Result<Self, StrategyError> {
        if strategy.title.selectors.is_empty() {
            return Err(StrategyError::NoTitleSelector);
        }

        let title = TitleSelectors {
            selectors: strategy
                .title
                .selectors
                .iter()
                .map(|s| compile(s))
                .collect::<Result<_, _>>()?,
            follow: strategy.title.follow.as_deref().map(compile).transpose()?,
            fallback: strategy.title.fallback.clone(),
            missing_anchor: strategy
                .title
                .missing_anchor
                .clone()
                .unwrap_or_else(|| strategy.title.fallback.clone()),
        };

        let body = BodySelectors {
            container: strategy.body.container.as_deref().map(compile).transpose()?,
            paragraphs: compile(&strategy.body.paragraphs)?,
            fallback: strategy.body.fallback,
        };

        Ok(Self {
            title,
            body,
            error_title: strategy.error_title.clone(),
        })
    }

    /// Extracts a record out of raw HTML.
    pub fn extract_html(&self, url: &str, html: &str) -> ContentRecord {
        let document = Html::parse_document(html);
        ContentRecord::new(url, self.title(&document), self.body(&document))
    }

    fn title(&self, document: &Html) -> String {
        let rule = &self.title;

        if let Some(follow) = &rule.follow {
            let anchor = rule
                .selectors
                .iter()
                .find_map(|selector| document.select(selector).next());
            return match anchor {
                Some(anchor) => following(document, anchor, follow)
                    .map(element_text)
                    .filter(|text| !text.is_empty())
                    .unwrap_or_else(|| rule.fallback.clone()),
                None => rule.missing_anchor.clone(),
            };
        }

        rule.selectors
            .iter()
            .filter_map(|selector| document.select(selector).next())
            .map(element_text)
            .find(|text| !text.is_empty())
            .unwrap_or_else(|| rule.fallback.clone())
    }

    fn body(&self, document: &Html) -> String {
        let rule = &self.body;

        let container = match &rule.container {
            Some(selector) => document.select(selector).next(),
            None => return join_paragraphs(document.select(&rule.paragraphs)),
        };

        match container {
            Some(container) => {
                let mut paragraphs = container.select(&rule.paragraphs).peekable();
                if paragraphs.peek().is_some() {
                    join_paragraphs(paragraphs)
                } else {
                    element_text(container)
                }
            }
            None => match rule.fallback {
                BodyFallback::Paragraphs => join_paragraphs(document.select(&rule.paragraphs)),
                BodyFallback::DocumentText => document_text(document),
            },
        }
    }
}

impl Extractor for SelectorExtractor {
    fn extract(&self, page: &Page) -> ContentRecord {
        self.extract_html(&page.url, &page.body)
    }

    fn failed(&self, failure: &FetchFailure) -> ContentRecord {
        ContentRecord::error(&failure.url, &self.error_title)
    }
}

/// The first element matching `selector` after `anchor` in document order.
fn following<'a>(
    document: &'a Html,
    anchor: ElementRef<'a>,
    selector: &Selector,
) -> Option<ElementRef<'a>> {
    document
        .tree
        .root()
        .descendants()
        .skip_while(|node| node.id() != anchor.id())
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|element| selector.matches(element))
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn join_paragraphs<'a>(paragraphs: impl Iterator<Item = ElementRef<'a>>) -> String {
    paragraphs.map(element_text).collect::<Vec<_>>().join("\n")
}

fn document_text(document: &Html) -> String {
    document
        .tree
        .root()
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let hidden = node
                    .parent()
                    .and_then(|parent| parent.value().as_element())
                    .map(|parent| HIDDEN_ELEMENTS.contains(&parent.name()))
                    .unwrap_or(false);
                (!hidden).then(|| text.trim())
            }
            _ => None,
        })
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
