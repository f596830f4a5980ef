//! Utility functions for input parsing, string handling, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - Reading URL lists and tag arguments
//! - Whitespace normalization and truncation for logging
//! - File system validation for output directories

use itertools::Itertools;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::PipelineError;

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the characters left out.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"文".repeat(20), 10), "文文文文文文文文文文…(+10 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Collapse runs of whitespace to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Parse URLs from the contents of a list file.
///
/// One URL per line. Blank lines and lines starting with `#` are ignored.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a URL list file, see [`parse_url_list`].
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn read_url_file(path: impl AsRef<Path>) -> Result<Vec<String>, PipelineError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .await
        .map_err(|e| PipelineError::filesystem(path, e))?;
    let urls = parse_url_list(&contents);
    info!(count = urls.len(), "Read URL list");
    Ok(urls)
}

/// Split a comma-separated tag argument.
///
/// Items are trimmed; empty items and repeats are dropped, first occurrence wins.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unique()
        .map(str::to_string)
        .collect()
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then creates and immediately
/// deletes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| PipelineError::filesystem(path, e))?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            debug!(probe = %probe_path.display(), "Probe write succeeded");
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(PipelineError::filesystem(probe_path, e)),
    }
}
