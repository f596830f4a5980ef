//! HTTP retrieval of article pages.
//!
//! The platform serves a stripped-down page to unfamiliar clients, so every
//! request carries a desktop-browser header set. Each URL gets exactly one
//! attempt bounded by the configured timeout; a failed URL has to be
//! resubmitted by the caller.

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

use crate::config::RequestConfig;
use crate::error::{ConfigError, PipelineError};

/// Anything that can turn a URL into page HTML.
pub trait Fetch {
    async fn fetch(&self, url: &str) -> Result<String, PipelineError>;
}

/// [`Fetch`] implementation backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::Header {
        name,
        message: e.to_string(),
    })
}

impl HttpFetcher {
    pub fn new(config: &RequestConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value("User-Agent", &config.user_agent)?);
        headers.insert(ACCEPT, header_value("Accept", &config.accept)?);
        headers.insert(
            ACCEPT_LANGUAGE,
            header_value("Accept-Language", &config.accept_language)?,
        );

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn fetch(&self, url: &str) -> Result<String, PipelineError> {
        let parsed = Url::parse(url).map_err(|e| PipelineError::network(url, format!("invalid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(PipelineError::network(
                url,
                format!("unsupported scheme {:?}", parsed.scheme()),
            ));
        }

        let response = self.client.get(parsed).send().await.map_err(|e| {
            if e.is_timeout() {
                PipelineError::network(url, format!("timed out after {:?}", self.timeout))
            } else if e.is_connect() {
                PipelineError::network(url, format!("connection failed: {e}"))
            } else {
                PipelineError::network(url, format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::network(url, format!("HTTP {status}")));
        }

        // Pages are UTF-8 regardless of what the headers claim.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::network(url, format!("failed reading body: {e}")))?;
        let html = String::from_utf8_lossy(&bytes).into_owned();

        info!(bytes = html.len(), %status, "Fetched page");
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(timeout_secs: u64) -> HttpFetcher {
        HttpFetcher::new(&RequestConfig {
            timeout_secs,
            ..RequestConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/s/article"))
            .and(header_exists("user-agent"))
            .and(header_exists("accept-language"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>你好</body></html>".as_bytes(), "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let html = fetcher(30)
            .fetch(&format!("{}/s/article", server.uri()))
            .await
            .unwrap();
        assert!(html.contains("你好"));

        let defaults = RequestConfig::default();
        let requests = server.received_requests().await.unwrap();
        let sent = |name: &str| {
            requests[0]
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        assert_eq!(sent("user-agent"), Some(defaults.user_agent));
        assert_eq!(sent("accept"), Some(defaults.accept));
        assert_eq!(sent("accept-language"), Some(defaults.accept_language));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetcher(30)
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        match err {
            PipelineError::Network { message, .. } => assert!(message.contains("404")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let err = fetcher(1)
            .fetch(&format!("{}/slow", server.uri()))
            .await
            .unwrap_err();
        match err {
            PipelineError::Network { message, .. } => assert!(message.contains("timed out")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let err = fetcher(30).fetch("not a url").await.unwrap_err();
        assert!(matches!(err, PipelineError::Network { .. }));

        let err = fetcher(30).fetch("ftp://example.com/a").await.unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_invalid_header_value() {
        let config = RequestConfig {
            user_agent: "bad\nagent".to_string(),
            ..RequestConfig::default()
        };
        assert!(matches!(
            HttpFetcher::new(&config),
            Err(ConfigError::Header { name: "User-Agent", .. })
        ));
    }
}
