use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, Response};

use crate::config::CrawlerConfig;
use crate::error::{ConfigError, FetchCause, FetchFailure};

/// A fetched content page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// The requested URL, i.e. the crawl candidate
    pub url: String,
    /// The URL after redirects
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

pub type FetchResult = Result<Page, FetchFailure>;

/// Raw sitemap payload, possibly gzip compressed.
#[derive(Debug, Clone)]
pub(crate) struct Download {
    pub bytes: Vec<u8>,
    pub gzip: bool,
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
    retries: u32,
    retry_delay: Duration,
}

impl Fetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = ClientBuilder::new()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .deflate(true)
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout(),
            retries: config.retries,
            retry_delay: config.retry_delay(),
        })
    }

    /// Downloads a content page, every failure is returned as a value.
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let resp = self.send(url).await?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(|e| FetchFailure {
            url: url.to_string(),
            cause: self.cause(e),
        })?;

        Ok(Page {
            url: url.to_string(),
            final_url,
            status,
            body,
        })
    }

    pub(crate) async fn download(&self, url: &str) -> Result<Download, FetchFailure> {
        let resp = self.send(url).await?;
        let gzip = match resp.headers().get(CONTENT_TYPE) {
            Some(c) => c == "application/x-gzip" || c == "application/gzip",
            None => false,
        };
        let bytes = resp.bytes().await.map_err(|e| FetchFailure {
            url: url.to_string(),
            cause: self.cause(e),
        })?;

        Ok(Download {
            bytes: bytes.to_vec(),
            gzip,
        })
    }

    async fn send(&self, url: &str) -> Result<Response, FetchFailure> {
        let mut attempt = 0;
        loop {
            match self.send_once(url).await {
                Err(cause) if attempt < self.retries && cause.is_transient() => {
                    attempt += 1;
                    log::debug!(
                        "Retrying {url} ({attempt}/{}) after: {cause}",
                        self.retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(cause) => {
                    return Err(FetchFailure {
                        url: url.to_string(),
                        cause,
                    })
                }
                Ok(resp) => return Ok(resp),
            }
        }
    }

    async fn send_once(&self, url: &str) -> Result<Response, FetchCause> {
        let resp = self.client.get(url).send().await.map_err(|e| self.cause(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchCause::Status(status.as_u16()));
        }
        Ok(resp)
    }

    fn cause(&self, e: reqwest::Error) -> FetchCause {
        if e.is_timeout() {
            FetchCause::Timeout(self.timeout)
        } else if e.is_body() || e.is_decode() {
            FetchCause::Body(e.to_string())
        } else {
            FetchCause::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(timeout: f32, retries: u32) -> Fetcher {
        let conf = CrawlerConfig {
            timeout,
            retries,
            retry_delay: 0.0,
            ..Default::default()
        };
        Fetcher::new(&conf).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let conf = CrawlerConfig {
            timeout: -1.0,
            ..Default::default()
        };
        assert!(matches!(Fetcher::new(&conf), Err(ConfigError::Invalid(_))));
    }

    #[tokio::test]
    async fn fetch_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<h1>Olá</h1>"))
            .mount(&server)
            .await;

        let url = format!("{}/a", server.uri());
        let page = fetcher(10.0, 0).fetch(&url).await.unwrap();
        assert_eq!(page.url, url);
        assert_eq!(page.final_url, url);
        assert_eq!(page.status, 200);
        assert_eq!(page.body, "<h1>Olá</h1>");
    }

    #[tokio::test]
    async fn status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let failure = fetcher(10.0, 0).fetch(&url).await.unwrap_err();
        assert_eq!(failure.url, url);
        assert_eq!(failure.cause, FetchCause::Status(404));
    }

    #[tokio::test]
    async fn timeout_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let url = format!("{}/slow", server.uri());
        let failure = fetcher(1.0, 0).fetch(&url).await.unwrap_err();
        assert!(matches!(failure.cause, FetchCause::Timeout(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_failure() {
        let failure = fetcher(1.0, 0)
            .fetch("http://127.0.0.1:1/nothing")
            .await
            .unwrap_err();
        assert!(matches!(failure.cause, FetchCause::Transport(_)));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let url = format!("{}/flaky", server.uri());
        let page = fetcher(10.0, 2).fetch(&url).await.unwrap();
        assert_eq!(page.body, "ok");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/forbidden", server.uri());
        let failure = fetcher(10.0, 3).fetch(&url).await.unwrap_err();
        assert_eq!(failure.cause, FetchCause::Status(403));
    }
}
