use std::time::Duration;

use harvest_crawler::{
    BatchWriter, CancellationToken, ContentRecord, Crawler, CrawlerConfig, SitemapSource,
};
use harvest_extract::{BodyFallback, BodyRule, JsonBatchWriter, RecordKeys, SelectorExtractor, Strategy};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn urlset(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|url| format!("<url><loc>{url}</loc></url>"))
        .collect();
    format!(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{entries}</urlset>"#)
}

async fn mount(server: &MockServer, at: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(template)
        .mount(server)
        .await;
}

fn textos() -> Strategy {
    Strategy {
        body: BodyRule {
            container: Some(".textos".into()),
            fallback: BodyFallback::DocumentText,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn two_sitemap_pages_with_a_timeout() {
    let server = MockServer::start().await;
    let base = server.uri();

    let page1 = urlset(&[format!("{base}/a"), format!("{base}/b.jpg")]);
    mount(
        &server,
        "/post-sitemap1.xml",
        ResponseTemplate::new(200).set_body_string(page1),
    )
    .await;
    mount(
        &server,
        "/post-sitemap2.xml",
        ResponseTemplate::new(200).set_body_string(urlset(&[format!("{base}/c")])),
    )
    .await;
    mount(
        &server,
        "/a",
        ResponseTemplate::new(200)
            .set_body_string(r#"<h1>Hello</h1><div class="textos"><p>World</p></div>"#),
    )
    .await;
    mount(
        &server,
        "/c",
        ResponseTemplate::new(200)
            .set_body_string("<h1>Too late</h1>")
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let source = SitemapSource::Paged {
        pattern: format!("{base}/post-sitemap{{page}}.xml"),
        pages: 2,
    };
    let conf = CrawlerConfig {
        timeout: 1.0,
        delay: 0.0,
        ..Default::default()
    };
    let crawler = Crawler::new(conf).unwrap();
    assert_eq!(
        crawler.candidates(&source).await.unwrap(),
        vec![format!("{base}/a"), format!("{base}/c")]
    );

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("posts.json");
    let writer = JsonBatchWriter::new(&out, RecordKeys::default());
    let extractor = SelectorExtractor::new(&textos()).unwrap();
    let crawl = crawler
        .run_and_write(&source, &extractor, &writer)
        .await
        .unwrap();

    assert_eq!(
        crawl.records,
        vec![
            ContentRecord::new(format!("{base}/a"), "Hello", "World"),
            ContentRecord::error(format!("{base}/c"), "Erro"),
        ]
    );

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let expected = serde_json::json!([
        { "url": format!("{base}/a"), "title": "Hello", "content": "World" },
        { "url": format!("{base}/c"), "title": "Erro", "content": "" },
    ]);
    assert_eq!(written, expected);
}

#[tokio::test]
async fn product_pages_with_a_name_after_the_heading() {
    let server = MockServer::start().await;
    let base = server.uri();

    let sitemap = urlset(&[format!("{base}/tenis"), format!("{base}/meia")]);
    mount(
        &server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_string(sitemap),
    )
    .await;
    mount(
        &server,
        "/tenis",
        ResponseTemplate::new(200).set_body_string(
            r#"<h1 class="mz-product-name"></h1><div>Tênis Corrida</div><p>Leve</p>"#,
        ),
    )
    .await;
    mount(
        &server,
        "/meia",
        ResponseTemplate::new(200).set_body_string("<p>Sem nome</p>"),
    )
    .await;

    let strategy: Strategy = serde_yaml::from_str(
        r#"
title:
  selectors: ["h1.mz-product-name"]
  follow: div
  fallback: "Nome não encontrado"
  missingAnchor: "Tag h1.mz-product-name não encontrada"
errorTitle: Erro
"#,
    )
    .unwrap();
    let extractor = SelectorExtractor::new(&strategy).unwrap();
    let conf = CrawlerConfig {
        delay: 0.0,
        ..Default::default()
    };
    let crawl = Crawler::new(conf)
        .unwrap()
        .run(&SitemapSource::single(format!("{base}/sitemap.xml")), &extractor)
        .await
        .unwrap();

    assert_eq!(
        crawl.records,
        vec![
            ContentRecord::new(format!("{base}/tenis"), "Tênis Corrida", "Leve"),
            ContentRecord::new(
                format!("{base}/meia"),
                "Tag h1.mz-product-name não encontrada",
                "Sem nome"
            ),
        ]
    );
}

#[tokio::test]
async fn write_failure_is_surfaced() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount(
        &server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_string(urlset(&[])),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();
    let writer = JsonBatchWriter::new(blocker.join("posts.json"), RecordKeys::default());

    let crawler = Crawler::new(CrawlerConfig::default()).unwrap();
    let extractor = SelectorExtractor::new(&Strategy::default()).unwrap();
    let res = crawler
        .run_and_write(
            &SitemapSource::single(format!("{base}/sitemap.xml")),
            &extractor,
            &writer,
        )
        .await;

    assert!(matches!(res, Err(harvest_crawler::CrawlError::Write(_))));
}

#[tokio::test]
async fn interrupted_crawl_keeps_previous_output() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount(
        &server,
        "/sitemap.xml",
        ResponseTemplate::new(200)
            .set_body_string(urlset(&[format!("{base}/a")]))
            .set_delay(Duration::from_millis(500)),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("posts.json");
    let writer = JsonBatchWriter::new(&out, RecordKeys::default());
    writer
        .write(&[ContentRecord::new("http://site/old", "Old", "Kept")])
        .unwrap();
    let before = std::fs::read_to_string(&out).unwrap();

    let cancel = CancellationToken::new();
    let crawler = Crawler::new(CrawlerConfig::default())
        .unwrap()
        .with_cancellation(cancel.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });
    let extractor = SelectorExtractor::new(&Strategy::default()).unwrap();
    let crawl = crawler
        .run_and_write(
            &SitemapSource::single(format!("{base}/sitemap.xml")),
            &extractor,
            &writer,
        )
        .await
        .unwrap();
    canceller.await.unwrap();

    assert!(crawl.cancelled);
    assert!(crawl.records.is_empty());
    assert_eq!(std::fs::read_to_string(&out).unwrap(), before);
}
