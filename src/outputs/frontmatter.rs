//! Frontmatter generation.
//!
//! A [`Frontmatter`] is an ordered list of unique keys. It renders as a
//! YAML-compatible block between `---` marker lines:
//!
//! ```text
//! ---
//! title: "Hello World"
//! date: 2024-03-05
//! description: "A short summary."
//! host: 丽泽
//! tags: ["ai", "interview"]
//! ---
//! ```
//!
//! Text values are quoted whenever a YAML reader could misread them, so
//! parsing the block back always yields the original strings.

use chrono::NaiveDate;

use crate::models::{Attribution, NormalizedArticle};

/// Marker line opening and closing the block.
pub const DELIMITER: &str = "---";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    List(Vec<String>),
}

impl FieldValue {
    fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Date(_) => false,
            FieldValue::List(items) => items.is_empty(),
        }
    }

    fn render(&self) -> String {
        match self {
            FieldValue::Text(s) => format_scalar(s),
            FieldValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            FieldValue::List(items) => {
                let inner = items.iter().map(|i| quote(i)).collect::<Vec<_>>().join(", ");
                format!("[{inner}]")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontmatter {
    fields: Vec<(String, FieldValue)>,
}

impl Frontmatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Empty values are skipped; an existing key keeps its
    /// position and takes the new value.
    pub fn insert(&mut self, key: &str, value: FieldValue) -> &mut Self {
        if value.is_empty() {
            return self;
        }
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key.to_string(), value)),
        }
        self
    }

    /// Set a text field when a value is present.
    pub fn insert_text(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.insert(key, FieldValue::Text(v.to_string())),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Render the block, delimiters included, without a trailing newline.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.fields.len() + 2);
        lines.push(DELIMITER.to_string());
        for (key, value) in &self.fields {
            lines.push(format!("{}: {}", key, value.render()));
        }
        lines.push(DELIMITER.to_string());
        lines.join("\n")
    }
}

/// Build the frontmatter for an article.
///
/// Field order is fixed: `title`, `date`, `description`, `guest`, `host`,
/// `slideUrl`, `tags`.
pub fn build(article: &NormalizedArticle, attribution: &Attribution, tags: &[String]) -> Frontmatter {
    let mut fm = Frontmatter::new();
    fm.insert("title", FieldValue::Text(article.title.clone()))
        .insert("date", FieldValue::Date(article.published_date))
        .insert("description", FieldValue::Text(article.summary.clone()))
        .insert_text("guest", attribution.guest.as_deref())
        .insert_text("host", attribution.host.as_deref())
        .insert_text("slideUrl", attribution.slide_url.as_deref())
        .insert("tags", FieldValue::List(tags.to_vec()));
    fm
}

/// Render a text value, quoting it only when needed.
pub fn format_scalar(value: &str) -> String {
    if needs_quotes(value) {
        quote(value)
    } else {
        value.to_string()
    }
}

/// Double-quote a value, escaping backslashes, quotes and control characters.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn needs_quotes(value: &str) -> bool {
    const INDICATORS: &[char] = &[
        '-', '?', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '%', '@', '`', '\\',
    ];
    const RESERVED: &[&str] = &["true", "false", "yes", "no", "on", "off", "null", "~", "y", "n"];

    const FLOAT_SPECIALS: &[&str] = &[".inf", ".nan"];

    let lower = value.to_ascii_lowercase();
    value.is_empty()
        || value.chars().any(|c| c.is_whitespace() || c.is_control() || matches!(c, ':' | '"' | '\'' | '#'))
        || value.starts_with(INDICATORS)
        || RESERVED.contains(&lower.as_str())
        || FLOAT_SPECIALS.contains(&lower.trim_start_matches(['+', '-']))
        || value.parse::<f64>().is_ok()
        || value.starts_with(|c: char| c.is_ascii_digit())
}
