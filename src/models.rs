//! Data models flowing through the acquisition pipeline.
//!
//! Each value is built fresh for one URL and dropped once its document has
//! been written:
//! - [`SourceRequest`]: what to fetch and how to attribute it
//! - [`ExtractionResult`]: raw fields located in the page
//! - [`NormalizedArticle`]: markdown body plus derived summary
//! - [`PersistedDocument`]: what was written, and where
//!
//! [`ItemReport`] and [`BatchReport`] describe the outcome of a batch run.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::outputs::frontmatter::Frontmatter;

/// Optional people and links credited in the frontmatter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribution {
    pub guest: Option<String>,
    pub host: Option<String>,
    pub slide_url: Option<String>,
}

/// Input for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    pub url: String,
    pub attribution: Attribution,
    pub tags: Vec<String>,
    /// Overrides the configured output directory for this article only.
    pub output_dir: Option<PathBuf>,
}

impl SourceRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            attribution: Attribution::default(),
            tags: Vec::new(),
            output_dir: None,
        }
    }
}

/// Fields located in a fetched page, before conversion.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    /// Never empty; falls back to [`crate::scrapers::extractor::UNTITLED`].
    pub title: String,
    /// Falls back to today's local date when the page does not say.
    pub published_date: NaiveDate,
    /// Outer HTML of the chosen body container with noise removed.
    pub body_html: String,
}

/// A converted article ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedArticle {
    pub title: String,
    pub published_date: NaiveDate,
    pub body_markdown: String,
    pub summary: String,
}

/// A document that has been written to disk.
#[derive(Debug, Clone)]
pub struct PersistedDocument {
    pub path: PathBuf,
    pub frontmatter: Frontmatter,
    pub body: String,
}

/// Pipeline stage an item failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Extract,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Fetch => "fetch",
            Stage::Extract => "extract",
            Stage::Persist => "persist",
        };
        f.write_str(s)
    }
}

/// Outcome of one URL in a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemOutcome {
    Saved { title: String, path: PathBuf },
    Failed { stage: Stage, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub url: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

impl ItemReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Saved { .. })
    }
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn push(&mut self, item: ItemReport) {
        if item.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.items.push(item);
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            match &item.outcome {
                ItemOutcome::Saved { title, path } => {
                    writeln!(f, "[{}/{}] ok     {}", i + 1, self.total(), item.url)?;
                    writeln!(f, "         {} -> {}", title, path.display())?;
                }
                ItemOutcome::Failed { stage, error } => {
                    writeln!(f, "[{}/{}] failed {}", i + 1, self.total(), item.url)?;
                    writeln!(f, "         {} stage: {}", stage, error)?;
                }
            }
        }
        write!(
            f,
            "Done: {} succeeded, {} failed, {} total",
            self.succeeded,
            self.failed,
            self.total()
        )
    }
}
