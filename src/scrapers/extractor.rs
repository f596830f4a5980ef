//! Title, date and body extraction from article HTML.
//!
//! Each field is located by a cascade of [`Strategy`] objects, ordered from
//! the most platform-specific selector to the most generic fallback. Only a
//! missing body is fatal; title and date fall back to defaults.
//!
//! The body container is cleaned before it is handed on: `script`, `style`,
//! `iframe` and `noscript` subtrees are dropped, along with any element whose
//! class matches the configured noise pattern (QR-code prompts, ads, promos).

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

use crate::config::{ExtractionConfig, compile_pattern};
use crate::error::{ConfigError, PipelineError};
use crate::models::ExtractionResult;
use crate::scrapers::strategy::{
    BodySelector, Cascade, DateSelector, LargeContainer, MetaDate, Strategy, TitleSelector,
    first_match,
};
use crate::utils::truncate_for_log;

/// Title used when no strategy finds one.
pub const UNTITLED: &str = "untitled";

const TITLE_SELECTORS: &[&str] = &["h1#activity-name", "h1.rich_media_title", "h1", "title"];

const DATE_SELECTORS: &[&str] = &[
    "#publish_time",
    ".publish_time",
    "em#publish_time",
    "em.rich_media_meta_text",
    "span#publish_time",
    "div.rich_media_meta_text",
];

const DATE_META_PROPERTY: &str = "article:published_time";

const BODY_SELECTORS: &[&str] = &[
    "#js_content",
    ".rich_media_content",
    r#"div[id*="content"]"#,
    r#"div[class*="content"]"#,
    "article",
    "div.article-content",
];

static STRIPPED_TAGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script, style, iframe, noscript").unwrap());

static ANY_ELEMENT: Lazy<Selector> = Lazy::new(|| Selector::parse("*").unwrap());

pub struct Extractor {
    title: Cascade<String>,
    date: Cascade<NaiveDate>,
    body: Cascade<String>,
    noise_class: Regex,
}

impl Extractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let title: Cascade<String> = TITLE_SELECTORS
            .iter()
            .map(|css| Box::new(TitleSelector::new(css)) as Box<dyn Strategy<String>>)
            .collect();

        let mut date: Cascade<NaiveDate> = DATE_SELECTORS
            .iter()
            .map(|css| Box::new(DateSelector::new(css)) as Box<dyn Strategy<NaiveDate>>)
            .collect();
        date.push(Box::new(MetaDate::new(DATE_META_PROPERTY)));

        let mut body: Cascade<String> = BODY_SELECTORS
            .iter()
            .map(|css| Box::new(BodySelector::new(css)) as Box<dyn Strategy<String>>)
            .collect();
        body.push(Box::new(LargeContainer::new(config.min_container_chars)));

        Ok(Self {
            title,
            date,
            body,
            noise_class: compile_pattern(&config.noise_class_pattern)?,
        })
    }

    /// Locate title, publish date and body in a page.
    #[instrument(level = "info", skip_all, fields(bytes = html.len()))]
    pub fn extract(&self, html: &str) -> Result<ExtractionResult, PipelineError> {
        let document = Html::parse_document(html);

        let title = match first_match(&self.title, &document) {
            Some((strategy, title)) => {
                debug!(strategy, %title, "Found title");
                title
            }
            None => {
                warn!("No title found; using placeholder");
                UNTITLED.to_string()
            }
        };

        let published_date = match first_match(&self.date, &document) {
            Some((strategy, date)) => {
                debug!(strategy, %date, "Found publish date");
                date
            }
            None => {
                let today = Local::now().date_naive();
                debug!(%today, "No publish date found; using today");
                today
            }
        };

        let (strategy, container) =
            first_match(&self.body, &document).ok_or(PipelineError::ContentNotFound)?;
        let body_html = self.clean_body(&container);
        info!(
            strategy,
            %title,
            %published_date,
            body_bytes = body_html.len(),
            "Extracted article"
        );
        debug!(body = %truncate_for_log(&body_html, 300), "Cleaned body");

        Ok(ExtractionResult {
            title,
            published_date,
            body_html,
        })
    }

    /// Drop non-content subtrees from a container's HTML.
    pub fn clean_body(&self, container_html: &str) -> String {
        let mut fragment = Html::parse_fragment(container_html);

        let doomed: Vec<_> = fragment
            .select(&STRIPPED_TAGS)
            .chain(fragment.select(&ANY_ELEMENT).filter(|el| self.is_noise(*el)))
            .map(|el| el.id())
            .collect();
        let removed = doomed.len();

        for id in doomed {
            if let Some(mut node) = fragment.tree.get_mut(id) {
                node.detach();
            }
        }
        if removed > 0 {
            debug!(removed, "Removed non-content elements");
        }

        fragment.root_element().inner_html()
    }

    fn is_noise(&self, el: ElementRef<'_>) -> bool {
        el.value().classes().any(|class| self.noise_class.is_match(class))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        Extractor::new(&ExtractionConfig::default()).unwrap()
    }

    fn filler(n: usize) -> String {
        "正文内容".repeat(n / 4 + 1).chars().take(n).collect()
    }

    #[test]
    fn test_wechat_page() {
        let html = format!(
            r#"<html><head><title>Page Title - 微信公众号</title></head><body>
            <h1 class="rich_media_title" id="activity-name"> Hello World </h1>
            <em id="publish_time">2024年3月5日 12:00</em>
            <div class="rich_media_content" id="js_content"><p>{}</p></div>
            </body></html>"#,
            filler(600)
        );
        let result = extractor().extract(&html).unwrap();
        assert_eq!(result.title, "Hello World");
        assert_eq!(result.published_date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert!(result.body_html.starts_with("<div"));
        assert!(result.body_html.contains("js_content"));
        assert!(result.body_html.contains(&filler(600)));
    }

    #[test]
    fn test_secondary_selectors_used() {
        // No #js_content, no h1#activity-name, no publish_time element.
        let html = r#"<html><head>
            <title>Doc Title | Site</title>
            <meta property="article:published_time" content="2023-07-01T09:00:00+08:00">
            </head><body>
            <div class="rich_media_content"><p>Short but explicit body.</p></div>
            </body></html>"#;
        let result = extractor().extract(html).unwrap();
        assert_eq!(result.title, "Doc Title");
        assert_eq!(result.published_date, NaiveDate::from_ymd_opt(2023, 7, 1).unwrap());
        assert!(result.body_html.contains("Short but explicit body."));
    }

    #[test]
    fn test_title_placeholder_and_date_fallback() {
        let html = r#"<html><body><article><p>Body</p><span class="publish_time">someday</span></article></body></html>"#;
        let result = extractor().extract(html).unwrap();
        assert_eq!(result.title, UNTITLED);
        assert_eq!(result.published_date, Local::now().date_naive());
    }

    #[test]
    fn test_large_container_fallback() {
        let html = format!(
            r#"<html><body>
            <div class="nav"><a href="/">Home</a></div>
            <div class="post"><p>{}</p></div>
            </body></html>"#,
            filler(520)
        );
        let result = extractor().extract(&html).unwrap();
        assert!(result.body_html.starts_with(r#"<div class="post">"#));
    }

    #[test]
    fn test_content_not_found() {
        let html = r#"<html><body><div class="nav">tiny</div></body></html>"#;
        let err = extractor().extract(html).unwrap_err();
        assert!(matches!(err, PipelineError::ContentNotFound));
    }

    #[test]
    fn test_clean_body_removes_noise() {
        let body = r#"<div id="js_content">
            <p>Keep me</p>
            <script>var tracking = 1;</script>
            <style>.x{}</style>
            <iframe src="https://video.example"></iframe>
            <noscript>enable js</noscript>
            <div class="qr_code_pc"><img src="qr.png"><p>扫码关注</p></div>
            <section class="ad-banner">Buy now</section>
            <p class="promotion-tip">Promo</p>
            <p class="header-line">Keep header line</p>
        </div>"#;
        let cleaned = extractor().clean_body(body);
        assert!(cleaned.contains("Keep me"));
        assert!(cleaned.contains("Keep header line"));
        for gone in ["tracking", ".x{}", "iframe", "enable js", "qr.png", "Buy now", "Promo"] {
            assert!(!cleaned.contains(gone), "{gone} should have been removed: {cleaned}");
        }
    }

    #[test]
    fn test_invalid_noise_pattern() {
        let config = ExtractionConfig {
            noise_class_pattern: "(".to_string(),
            ..ExtractionConfig::default()
        };
        assert!(matches!(Extractor::new(&config), Err(ConfigError::Pattern { .. })));
    }
}
