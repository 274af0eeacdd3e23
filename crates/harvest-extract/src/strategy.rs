//! Declarative description of where a site keeps its content.

use harvest_crawler::DEFAULT_ERROR_TITLE;
use serde::{Deserialize, Serialize};

/// How to read a title and a body out of a page of a given site.
///
/// ```yaml
/// title:
///   selectors: ["h1"]
///   fallback: "Sem título"
/// body:
///   container: ".textos"
///   fallback: documentText
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    #[serde(default)]
    pub title: TitleRule,

    #[serde(default)]
    pub body: BodyRule,

    /// Title of the records standing for pages that couldn't be fetched
    #[serde(default = "default_error_title")]
    pub error_title: String,
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            title: TitleRule::default(),
            body: BodyRule::default(),
            error_title: default_error_title(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleRule {
    /// Tried in order, the first one matching an element with some text wins
    #[serde(default = "default_title_selectors")]
    pub selectors: Vec<String>,

    /// When set, the first match of `selectors` is only an anchor and the
    /// title is the text of the first element matching `follow` after it
    #[serde(default)]
    pub follow: Option<String>,

    #[serde(default = "default_title_fallback")]
    pub fallback: String,

    /// Used instead of `fallback` when the anchor of `follow` is missing
    #[serde(default)]
    pub missing_anchor: Option<String>,
}

impl Default for TitleRule {
    fn default() -> Self {
        Self {
            selectors: default_title_selectors(),
            follow: None,
            fallback: default_title_fallback(),
            missing_anchor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyRule {
    /// Element holding the content, the whole document is used when unset
    #[serde(default)]
    pub container: Option<String>,

    #[serde(default = "default_paragraphs")]
    pub paragraphs: String,

    /// What to read when the container is configured but missing
    #[serde(default)]
    pub fallback: BodyFallback,
}

impl Default for BodyRule {
    fn default() -> Self {
        Self {
            container: None,
            paragraphs: default_paragraphs(),
            fallback: BodyFallback::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BodyFallback {
    /// Paragraphs of the whole document
    #[default]
    Paragraphs,
    /// Every text of the document, one per line
    DocumentText,
}

fn default_error_title() -> String {
    DEFAULT_ERROR_TITLE.to_string()
}

fn default_title_selectors() -> Vec<String> {
    vec![String::from("h1")]
}

fn default_title_fallback() -> String {
    String::from("No title")
}

fn default_paragraphs() -> String {
    String::from("p")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_is_default() {
        let strategy: Strategy = serde_yaml::from_str("{}").unwrap();
        assert_eq!(strategy, Strategy::default());
        assert_eq!(strategy.error_title, "Erro");
        assert_eq!(strategy.title.selectors, vec!["h1"]);
        assert_eq!(strategy.body.paragraphs, "p");
    }

    #[test]
    fn follow_rule_from_yaml() {
        let yaml = r#"
title:
  selectors: ["h1.mz-product-name"]
  follow: div
  fallback: "Nome não encontrado"
  missingAnchor: "Tag h1.mz-product-name não encontrada"
body:
  paragraphs: p
"#;
        let strategy: Strategy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(strategy.title.follow.as_deref(), Some("div"));
        assert_eq!(
            strategy.title.missing_anchor.as_deref(),
            Some("Tag h1.mz-product-name não encontrada")
        );
        assert_eq!(strategy.body.container, None);
        assert_eq!(strategy.body.fallback, BodyFallback::Paragraphs);
    }

    #[test]
    fn document_text_fallback_from_yaml() {
        let yaml = "body: { container: .textos, fallback: documentText }";
        let strategy: Strategy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(strategy.body.container.as_deref(), Some(".textos"));
        assert_eq!(strategy.body.fallback, BodyFallback::DocumentText);
    }
}
