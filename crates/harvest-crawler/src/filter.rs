use crate::config::DEFAULT_REJECTED_EXTENSIONS;

/// Decides which sitemap entries are worth fetching.
///
/// URLs ending with one of the rejected extensions are skipped, the comparison
/// is case-insensitive and made on the whole URL.
#[derive(Debug, Clone)]
pub struct UrlFilter {
    rejected: Vec<String>,
}

impl UrlFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rejected = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim().to_lowercase())
            .filter(|ext| !ext.is_empty() && ext != ".")
            .map(|ext| {
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();
        Self { rejected }
    }

    pub fn is_crawlable(&self, url: &str) -> bool {
        let url = url.to_lowercase();
        !self.rejected.iter().any(|ext| url.ends_with(ext.as_str()))
    }

    pub fn rejected(&self) -> &[String] {
        &self.rejected
    }
}

impl Default for UrlFilter {
    fn default() -> Self {
        Self::new(DEFAULT_REJECTED_EXTENSIONS)
    }
}
