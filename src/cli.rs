//! Command-line interface definitions for Article Fetch.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Flags override values from the optional YAML config file.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::models::{Attribution, SourceRequest};
use crate::utils::parse_tags;

/// Command-line arguments for the Article Fetch application.
///
/// # Examples
///
/// ```sh
/// # A couple of articles into the default blog directory
/// article_fetch https://mp.weixin.qq.com/s/abc https://mp.weixin.qq.com/s/def
///
/// # A list file, with attribution and tags
/// article_fetch -f urls.txt -g "张三" --host "丽泽" -t "访谈,AI"
///
/// # Custom output directory and a JSON report
/// article_fetch -o ./posts --report ./report.json https://mp.weixin.qq.com/s/abc
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Article URLs to fetch
    pub urls: Vec<String>,

    /// Read URLs from a file, one per line (blank lines and `#` comments skipped)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Guest name for the frontmatter
    #[arg(short, long)]
    pub guest: Option<String>,

    /// Host name for the frontmatter (falls back to `default_host` in the config)
    #[arg(long)]
    pub host: Option<String>,

    /// Slide deck URL for the frontmatter
    #[arg(long)]
    pub slide_url: Option<String>,

    /// Comma-separated tags
    #[arg(short, long, default_value = "")]
    pub tags: String,

    /// Output directory (default: src/content/blog)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "ARTICLE_FETCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Keep image links in the converted markdown
    #[arg(long)]
    pub include_images: Option<bool>,

    /// Also write the batch report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl Cli {
    /// Apply flag overrides on top of a loaded config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(include_images) = self.include_images {
            config.conversion.include_images = include_images;
        }
    }

    /// Build one request per URL, all sharing this invocation's attribution and tags.
    pub fn requests(&self, urls: Vec<String>) -> Vec<SourceRequest> {
        let attribution = Attribution {
            guest: self.guest.clone(),
            host: self.host.clone(),
            slide_url: self.slide_url.clone(),
        };
        let tags = parse_tags(&self.tags);
        urls.into_iter()
            .map(|url| SourceRequest {
                attribution: attribution.clone(),
                tags: tags.clone(),
                ..SourceRequest::new(url)
            })
            .collect()
    }
}
