//! Batch orchestration.
//!
//! Each [`SourceRequest`] goes through fetch → extract → normalize →
//! frontmatter → persist, one at a time. A failure in any stage becomes a
//! failed [`ItemReport`] and the batch moves on; nothing from one item is
//! carried into the next.

use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use tracing::{error, info, instrument, warn};

use crate::config::Config;
use crate::error::{ConfigError, PipelineError};
use crate::models::{BatchReport, ItemOutcome, ItemReport, PersistedDocument, SourceRequest, Stage};
use crate::outputs::markdown::Normalizer;
use crate::outputs::{frontmatter, persist};
use crate::scrapers::extractor::Extractor;
use crate::scrapers::fetcher::Fetch;

pub struct Pipeline<F> {
    fetcher: F,
    extractor: Extractor,
    normalizer: Normalizer,
    output_dir: PathBuf,
    default_host: Option<String>,
}

impl<F: Fetch> Pipeline<F> {
    pub fn new(config: &Config, fetcher: F) -> Result<Self, ConfigError> {
        Ok(Self {
            fetcher,
            extractor: Extractor::new(&config.extraction)?,
            normalizer: Normalizer::new(&config.conversion)?,
            output_dir: config.output_dir.clone(),
            default_host: config.default_host.clone(),
        })
    }

    /// Process every request in order and report on each.
    #[instrument(level = "info", skip_all, fields(count = requests.len()))]
    pub async fn run(&self, requests: Vec<SourceRequest>) -> BatchReport {
        let total = requests.len();
        info!(total, output_dir = %self.output_dir.display(), "Starting batch");

        let items: Vec<ItemReport> = stream::iter(requests.into_iter().enumerate())
            .then(|(i, request)| async move {
                info!(index = i + 1, total, url = %request.url, "Processing article");
                let outcome = match self.process(&request).await {
                    Ok(doc) => {
                        let title = frontmatter_title(&doc);
                        info!(
                            url = %request.url,
                            path = %doc.path.display(),
                            body_chars = doc.body.chars().count(),
                            "Article saved"
                        );
                        ItemOutcome::Saved {
                            title,
                            path: doc.path,
                        }
                    }
                    Err((stage, e)) => {
                        match &e {
                            PipelineError::Filesystem { .. } => {
                                error!(url = %request.url, %stage, error = %e, "Article failed")
                            }
                            _ => warn!(url = %request.url, %stage, error = %e, "Article failed"),
                        }
                        ItemOutcome::Failed {
                            stage,
                            error: e.to_string(),
                        }
                    }
                };
                ItemReport {
                    url: request.url,
                    outcome,
                }
            })
            .collect()
            .await;

        let mut report = BatchReport::default();
        for item in items {
            report.push(item);
        }
        info!(
            total = report.total(),
            succeeded = report.succeeded,
            failed = report.failed,
            "Batch complete"
        );
        report
    }

    /// Run a single request through every stage.
    pub async fn process(
        &self,
        request: &SourceRequest,
    ) -> Result<PersistedDocument, (Stage, PipelineError)> {
        let html = self
            .fetcher
            .fetch(&request.url)
            .await
            .map_err(|e| (Stage::Fetch, e))?;

        let extraction = self
            .extractor
            .extract(&html)
            .map_err(|e| (Stage::Extract, e))?;

        let article = self.normalizer.normalize(extraction, &request.url);

        let mut attribution = request.attribution.clone();
        if attribution.host.is_none() {
            attribution.host = self.default_host.clone();
        }
        let fm = frontmatter::build(&article, &attribution, &request.tags);

        let dir = request.output_dir.as_deref().unwrap_or(&self.output_dir);
        persist::persist(dir, &article.title, fm, article.body_markdown)
            .await
            .map_err(|e| (Stage::Persist, e))
    }
}

fn frontmatter_title(doc: &PersistedDocument) -> String {
    match doc.frontmatter.get("title") {
        Some(frontmatter::FieldValue::Text(title)) => title.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attribution;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// Serves canned pages; unknown URLs fail like an unreachable host.
    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    impl StaticFetcher {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.clone()))
                    .collect(),
            }
        }
    }

    impl Fetch for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| PipelineError::network(url, "connection refused"))
        }
    }

    const URL_HELLO: &str = "https://mp.weixin.qq.com/s/hello";
    const URL_EMPTY: &str = "https://mp.weixin.qq.com/s/empty";
    const URL_DOWN: &str = "https://mp.weixin.qq.com/s/down";

    fn paragraph_600() -> String {
        "这是一段用于测试的正文内容。".repeat(43).chars().take(600).collect()
    }

    fn hello_page() -> String {
        format!(
            r#"<!DOCTYPE html><html><head><title>Hello World - 微信公众号</title></head>
            <body>
              <h1 class="rich_media_title">Hello World</h1>
              <em id="publish_time">2024年3月5日</em>
              <div id="js_content" class="rich_media_content">
                <p>{}</p>
                <p>长按二维码关注我们</p>
                <p>See <a href="https://example.com/more">more</a>.</p>
                <script>console.log("x")</script>
              </div>
            </body></html>"#,
            paragraph_600()
        )
    }

    fn pipeline(dir: &TempDir, fetcher: StaticFetcher) -> Pipeline<StaticFetcher> {
        let config = Config {
            output_dir: dir.path().join("blog"),
            ..Config::default()
        };
        Pipeline::new(&config, fetcher).unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_document() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp, StaticFetcher::new(&[(URL_HELLO, hello_page())]));

        let mut request = SourceRequest::new(URL_HELLO);
        request.attribution = Attribution {
            guest: Some("张三".to_string()),
            ..Attribution::default()
        };
        request.tags = vec!["访谈".to_string(), "ai".to_string()];

        let report = pipeline.run(vec![request]).await;
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);

        let path = match &report.items[0].outcome {
            ItemOutcome::Saved { title, path } => {
                assert_eq!(title, "Hello World");
                path.clone()
            }
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(path, tmp.path().join("blog").join("Hello-World.md"));

        let written = std::fs::read_to_string(&path).unwrap();
        let (head, body) = written
            .strip_prefix("---\n")
            .and_then(|rest| rest.split_once("\n---\n\n"))
            .unwrap();
        let lines: Vec<&str> = head.lines().collect();
        assert_eq!(lines[0], "title: \"Hello World\"");
        assert_eq!(lines[1], "date: 2024-03-05");
        assert!(lines[2].starts_with("description: 这是一段用于测试的正文内容。"));
        assert_eq!(lines[3], "guest: 张三");
        assert_eq!(lines[4], r#"tags: ["访谈", "ai"]"#);
        assert_eq!(lines.len(), 5);

        assert!(body.starts_with(&paragraph_600()));
        assert!(body.contains("See [more](https://example.com/more)."));
        assert!(!body.contains("长按"));
        assert!(!body.contains("console.log"));
        assert!(body.ends_with(".\n"));
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let empty_page = "<html><body><div class=\"nav\">menu</div></body></html>".to_string();
        let pipeline = pipeline(
            &tmp,
            StaticFetcher::new(&[(URL_HELLO, hello_page()), (URL_EMPTY, empty_page)]),
        );

        let report = pipeline
            .run(vec![
                SourceRequest::new(URL_DOWN),
                SourceRequest::new(URL_EMPTY),
                SourceRequest::new(URL_HELLO),
            ])
            .await;

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);

        match &report.items[0].outcome {
            ItemOutcome::Failed { stage, error } => {
                assert_eq!(*stage, Stage::Fetch);
                assert!(error.contains("connection refused"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        match &report.items[1].outcome {
            ItemOutcome::Failed { stage, error } => {
                assert_eq!(*stage, Stage::Extract);
                assert_eq!(error, "no article content found");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(report.items[2].is_success());
        assert_eq!(report.items[2].url, URL_HELLO);
    }

    #[tokio::test]
    async fn test_rerun_creates_new_files() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp, StaticFetcher::new(&[(URL_HELLO, hello_page())]));

        let first = pipeline.run(vec![SourceRequest::new(URL_HELLO)]).await;
        let second = pipeline.run(vec![SourceRequest::new(URL_HELLO)]).await;
        assert_eq!(first.succeeded, 1);
        assert_eq!(second.succeeded, 1);

        let path_of = |report: &BatchReport| match &report.items[0].outcome {
            ItemOutcome::Saved { path, .. } => path.clone(),
            other => panic!("unexpected outcome: {other:?}"),
        };
        let (a, b) = (path_of(&first), path_of(&second));
        assert_ne!(a, b);
        assert!(a.exists() && b.exists());
        let dir = tmp.path().join("blog");
        assert_eq!(std::fs::read_dir(dir).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_default_host_and_output_override() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            output_dir: tmp.path().join("blog"),
            default_host: Some("丽泽".to_string()),
            ..Config::default()
        };
        let pipeline =
            Pipeline::new(&config, StaticFetcher::new(&[(URL_HELLO, hello_page())])).unwrap();

        let mut request = SourceRequest::new(URL_HELLO);
        request.output_dir = Some(tmp.path().join("elsewhere"));
        let doc = pipeline.process(&request).await.unwrap();

        assert!(doc.path.starts_with(tmp.path().join("elsewhere")));
        assert_eq!(
            doc.frontmatter.get("host"),
            Some(&frontmatter::FieldValue::Text("丽泽".to_string()))
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let tmp = TempDir::new().unwrap();
        let pipeline = pipeline(&tmp, StaticFetcher::new(&[]));
        let report = pipeline.run(Vec::new()).await;
        assert_eq!(report.total(), 0);
        assert_eq!(report.succeeded, 0);
        assert!(!tmp.path().join("blog").exists());
    }
}
