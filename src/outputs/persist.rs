//! Collision-safe document writing.
//!
//! File names are derived from the article title. When the name is taken,
//! a timestamp and then a counter are appended until a free name is found.
//! Files are opened with create-new semantics, so an existing document is
//! never overwritten even if another writer claims a name between the
//! existence check and the write.

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::error::PipelineError;
use crate::models::PersistedDocument;
use crate::outputs::frontmatter::Frontmatter;

/// Longest file stem, in UTF-8 bytes. Leaves room for the
/// `_YYYYmmdd_HHMMSS_N.md` suffix under the 255-byte name limit.
pub const MAX_STEM_BYTES: usize = 200;

const FALLBACK_STEM: &str = "article";

const EXTENSION: &str = "md";

static ILLEGAL_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Turn a title into a file stem safe on every common filesystem.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(sanitize_filename("Hello, World!"), "Hello-World");
/// assert_eq!(sanitize_filename("丽泽 对话: 第1期"), "丽泽-对话-第1期");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    let cleaned = ILLEGAL_CHARS_RE.replace_all(title, "");
    let dashed = WHITESPACE_RE.replace_all(cleaned.trim(), "-");
    let stem = truncate_to_bytes(&dashed, MAX_STEM_BYTES).trim_end_matches('-');
    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Longest prefix of `s` within `max` bytes, cut on a char boundary.
fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Candidate paths for a stem, in the order they are tried.
///
/// `stem.md`, then `stem_<stamp>.md`, then `stem_<stamp>_1.md`, `stem_<stamp>_2.md`, ...
pub fn candidate_paths<'a>(
    dir: &'a Path,
    stem: &'a str,
    now: DateTime<Local>,
) -> impl Iterator<Item = PathBuf> + 'a {
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();
    let plain = std::iter::once(format!("{stem}.{EXTENSION}"));
    let stamped = std::iter::once(format!("{stem}_{stamp}.{EXTENSION}"));
    let counted = (1u64..).map(move |n| format!("{stem}_{stamp}_{n}.{EXTENSION}"));
    plain
        .chain(stamped)
        .chain(counted)
        .map(move |name| dir.join(name))
}

/// Combine frontmatter and body into file contents.
pub fn render_document(frontmatter: &Frontmatter, body: &str) -> String {
    format!("{}\n\n{}\n", frontmatter.render(), body.trim_end())
}

/// Write a document under `dir`, never replacing an existing file.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %title))]
pub async fn persist(
    dir: &Path,
    title: &str,
    frontmatter: Frontmatter,
    body: String,
) -> Result<PersistedDocument, PipelineError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| PipelineError::filesystem(dir, e))?;

    let stem = sanitize_filename(title);
    let contents = render_document(&frontmatter, &body);

    for path in candidate_paths(dir, &stem, Local::now()) {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "Name taken; trying next");
                continue;
            }
            Err(e) => return Err(PipelineError::filesystem(path, e)),
        };

        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| PipelineError::filesystem(&path, e))?;
        file.flush()
            .await
            .map_err(|e| PipelineError::filesystem(&path, e))?;

        info!(path = %path.display(), bytes = contents.len(), "Wrote article");
        return Ok(PersistedDocument {
            path,
            frontmatter,
            body,
        });
    }

    Err(PipelineError::filesystem(
        dir,
        std::io::Error::other("no free file name"),
    ))
}
