//! Markdown conversion and cleanup of extracted article bodies.
//!
//! The cleaned body HTML is walked element by element and rendered to
//! markdown. Links are kept, resolved against the article URL. Images are
//! kept only when [`ConversionConfig::include_images`] is set; platform-hosted
//! images usually refuse hot-linking, so they are off by default.
//!
//! After conversion the text is post-processed:
//! 1. promotional lines ("long-press to follow", "scan to follow") are removed
//! 2. runs of 3+ newlines collapse to a single blank line
//! 3. leading and trailing whitespace is trimmed
//!
//! A plain-text summary is then derived for the frontmatter `description`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use tracing::{debug, instrument};
use url::Url;

use crate::config::{ConversionConfig, compile_pattern};
use crate::error::ConfigError;
use crate::models::{ExtractionResult, NormalizedArticle};
use crate::utils::normalize_whitespace;

static MULTI_NEWLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static MARKDOWN_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[#*_\[\]()]").unwrap());

static NEWLINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\r?\n)+").unwrap());

const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？'];

const ELLIPSIS: &str = "...";

pub struct Normalizer {
    include_images: bool,
    summary_max_chars: usize,
    boilerplate: Vec<Regex>,
}

struct WalkCtx<'a> {
    base_url: Option<&'a Url>,
    include_images: bool,
}

impl Normalizer {
    pub fn new(config: &ConversionConfig) -> Result<Self, ConfigError> {
        let boilerplate = config
            .boilerplate_patterns
            .iter()
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            include_images: config.include_images,
            summary_max_chars: config.summary_max_chars,
            boilerplate,
        })
    }

    /// Convert an extraction result into a finished article.
    #[instrument(level = "info", skip_all, fields(title = %extraction.title))]
    pub fn normalize(&self, extraction: ExtractionResult, source_url: &str) -> NormalizedArticle {
        let base_url = Url::parse(source_url).ok();
        let markdown = self.html_to_markdown(&extraction.body_html, base_url.as_ref());
        let body_markdown = self.clean_markdown(&markdown);
        let summary = self.summarize(&body_markdown);
        debug!(
            markdown_bytes = body_markdown.len(),
            summary_chars = summary.chars().count(),
            "Normalized article"
        );

        NormalizedArticle {
            title: extraction.title,
            published_date: extraction.published_date,
            body_markdown,
            summary,
        }
    }

    /// Render an HTML fragment as markdown, without post-processing.
    pub fn html_to_markdown(&self, html: &str, base_url: Option<&Url>) -> String {
        let fragment = Html::parse_fragment(html);
        let ctx = WalkCtx {
            base_url,
            include_images: self.include_images,
        };
        walk_children(fragment.root_element(), &ctx)
    }

    /// Strip boilerplate, collapse blank lines, trim.
    pub fn clean_markdown(&self, markdown: &str) -> String {
        let mut text = markdown.replace("\r\n", "\n");
        for re in &self.boilerplate {
            text = re.replace_all(&text, "").into_owned();
        }
        MULTI_NEWLINE_RE
            .replace_all(&text, "\n\n")
            .trim()
            .to_string()
    }

    /// Derive a short plain-text summary from a markdown body.
    ///
    /// When the text is too long, cut after the last sentence terminator
    /// within the limit; with no terminator in range, hard-truncate and
    /// append `...`.
    pub fn summarize(&self, markdown: &str) -> String {
        let text = MARKDOWN_PUNCT_RE.replace_all(markdown, "");
        let text = NEWLINES_RE.replace_all(&text, " ");
        let text = text.trim();

        let max = self.summary_max_chars;
        if text.chars().count() <= max {
            return text.to_string();
        }

        let window: String = text.chars().take(max).collect();
        match window.rfind(SENTENCE_TERMINATORS) {
            Some(idx) => {
                let end = idx + window[idx..].chars().next().map_or(0, char::len_utf8);
                window[..end].to_string()
            }
            None => format!("{}{}", window.trim_end(), ELLIPSIS),
        }
    }
}

// ── DOM tree walker → Markdown ───────────────────────────────────────────────

fn walk_element(el: ElementRef<'_>, ctx: &WalkCtx) -> String {
    let name = el.value().name();

    match name {
        "script" | "style" | "noscript" | "iframe" | "svg" | "button" | "form" => String::new(),

        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let text = normalize_whitespace(&collect_text(el));
            if text.is_empty() {
                return String::new();
            }
            format!("\n\n{} {}\n\n", "#".repeat(level), text)
        }

        "p" | "section" | "div" => {
            let content = walk_children(el, ctx);
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return String::new();
            }
            format!("\n\n{}\n\n", trimmed)
        }

        "br" => "\n".to_string(),
        "hr" => "\n\n---\n\n".to_string(),

        "a" => {
            let content = walk_children(el, ctx);
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return String::new();
            }
            match el.value().attr("href").map(|h| resolve(h, ctx.base_url)) {
                Some(href) if !href.starts_with("javascript:") => format!("[{}]({})", trimmed, href),
                _ => trimmed.to_string(),
            }
        }

        "img" => {
            if !ctx.include_images {
                return String::new();
            }
            let src = el
                .value()
                .attr("data-src")
                .or_else(|| el.value().attr("src"))
                .map(str::trim)
                .filter(|s| !s.is_empty() && !s.starts_with("data:"));
            match src {
                Some(src) => {
                    let alt = el.value().attr("alt").unwrap_or("").trim();
                    format!("![{}]({})", alt, resolve(src, ctx.base_url))
                }
                None => String::new(),
            }
        }

        "ul" => handle_list(el, ctx, false),
        "ol" => handle_list(el, ctx, true),

        "li" => {
            let content = walk_children(el, ctx);
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return String::new();
            }
            format!("- {}\n", trimmed)
        }

        "strong" | "b" => wrap_inline(el, ctx, "**"),
        "em" | "i" => wrap_inline(el, ctx, "*"),

        "blockquote" => {
            let content = walk_children(el, ctx);
            let quoted = content
                .trim()
                .lines()
                .map(|l| format!("> {}", l).trim_end().to_string())
                .collect::<Vec<_>>()
                .join("\n");
            format!("\n\n{}\n\n", quoted)
        }

        "pre" => {
            let text = collect_text(el);
            format!("\n\n```\n{}\n```\n\n", text.trim_end())
        }

        "code" => {
            let text = collect_text(el);
            if text.trim().is_empty() {
                return String::new();
            }
            format!("`{}`", text.trim())
        }

        _ => walk_children(el, ctx),
    }
}

fn walk_children(el: ElementRef<'_>, ctx: &WalkCtx) -> String {
    let mut result = String::new();
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                // Source newlines are layout, not content.
                let collapsed = text.replace(['\n', '\r', '\t'], " ");
                if !(collapsed.trim().is_empty() && result.ends_with(char::is_whitespace)) {
                    result.push_str(&collapsed);
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    result.push_str(&walk_element(child_el, ctx));
                }
            }
            _ => {}
        }
    }
    result
}

fn wrap_inline(el: ElementRef<'_>, ctx: &WalkCtx, marker: &str) -> String {
    let content = walk_children(el, ctx);
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{marker}{trimmed}{marker}")
}

fn handle_list(el: ElementRef<'_>, ctx: &WalkCtx, ordered: bool) -> String {
    let mut result = String::from("\n\n");
    let mut idx = 1usize;

    for child in el.children().filter_map(ElementRef::wrap) {
        if child.value().name() != "li" {
            continue;
        }
        let content = walk_children(child, ctx);
        let item = normalize_whitespace(&content);
        if item.is_empty() {
            continue;
        }
        if ordered {
            result.push_str(&format!("{}. {}\n", idx, item));
            idx += 1;
        } else {
            result.push_str(&format!("- {}\n", item));
        }
    }

    result.push('\n');
    result
}

fn resolve(href: &str, base_url: Option<&Url>) -> String {
    base_url
        .and_then(|base| base.join(href).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| href.to_string())
}

/// Recursively collect all text from an element and its descendants.
fn collect_text(el: ElementRef<'_>) -> String {
    el.text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn normalizer() -> Normalizer {
        Normalizer::new(&ConversionConfig::default()).unwrap()
    }

    fn with_images() -> Normalizer {
        Normalizer::new(&ConversionConfig {
            include_images: true,
            ..ConversionConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_basic_structure() {
        let html = r#"<div>
            <h2>Section</h2>
            <p>First <strong>bold</strong> and <em>soft</em> words.</p>
            <ul><li>one</li><li> two </li></ul>
            <ol><li>a</li><li>b</li></ol>
        </div>"#;
        let md = normalizer().clean_markdown(&normalizer().html_to_markdown(html, None));
        assert_eq!(
            md,
            "## Section\n\nFirst **bold** and *soft* words.\n\n- one\n- two\n\n1. a\n2. b"
        );
    }

    #[test]
    fn test_links_resolved_against_source() {
        let base = Url::parse("https://mp.weixin.qq.com/s/abc").unwrap();
        let html = r#"<p>See <a href="/s/other">the other post</a> and <a href="javascript:void(0)">this</a>.</p>"#;
        let md = normalizer().html_to_markdown(html, Some(&base));
        assert!(md.contains("[the other post](https://mp.weixin.qq.com/s/other)"));
        assert!(md.contains(" this."));
    }

    #[test]
    fn test_images_follow_config() {
        let html = r#"<p><img data-src="https://img.example/a.png" src="data:image/gif;base64,xx" alt="chart"></p>"#;
        assert_eq!(normalizer().html_to_markdown(html, None).trim(), "");
        assert_eq!(
            with_images().html_to_markdown(html, None).trim(),
            "![chart](https://img.example/a.png)"
        );
    }

    #[test]
    fn test_clean_markdown_strips_boilerplate() {
        let md = "Intro paragraph.\r\n\r\n长按二维码关注我们\r\n\r\n\r\n\r\nBody text.\n\n扫码 关注 公众号\nEnd.\n\n\n";
        assert_eq!(
            normalizer().clean_markdown(md),
            "Intro paragraph.\n\nBody text.\n\nEnd."
        );
    }

    #[test]
    fn test_summary_short_text_kept() {
        assert_eq!(normalizer().summarize("# Title\n\n**Hello** [world](x)"), "Title Hello worldx");
    }

    #[test]
    fn test_summary_backtracks_to_sentence() {
        let first = "这是第一句话。".repeat(10); // 70 chars
        let text = format!("{}{}", first, "没有句号的长内容".repeat(20));
        let summary = normalizer().summarize(&text);
        assert_eq!(summary, first);
        assert!(summary.chars().count() <= 150);
    }

    #[test]
    fn test_summary_hard_truncates() {
        let text = "word ".repeat(100);
        let summary = normalizer().summarize(&text);
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() <= 153);
        assert!(summary.starts_with("word word"));
    }

    #[test]
    fn test_normalize_end_to_end() {
        let extraction = ExtractionResult {
            title: "Hello World".to_string(),
            published_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            body_html: "<div><p>第一段。</p><p>长按识别二维码关注</p><p>第二段！</p></div>".to_string(),
        };
        let article = normalizer().normalize(extraction, "https://mp.weixin.qq.com/s/abc");
        assert_eq!(article.title, "Hello World");
        assert_eq!(article.body_markdown, "第一段。\n\n第二段！");
        assert_eq!(article.summary, "第一段。 第二段！");
    }

    #[test]
    fn test_invalid_boilerplate_pattern() {
        let config = ConversionConfig {
            boilerplate_patterns: vec!["[".to_string()],
            ..ConversionConfig::default()
        };
        assert!(Normalizer::new(&config).is_err());
    }
}
