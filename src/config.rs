//! Runtime configuration.
//!
//! A single [`Config`] value is built once at startup (defaults, then an
//! optional YAML file, then CLI overrides) and handed to each component.
//! Nothing reads configuration from global state.
//!
//! # Example file
//!
//! ```yaml
//! output_dir: src/content/blog
//! default_host: "丽泽"
//! request:
//!   timeout_secs: 30
//! extraction:
//!   min_container_chars: 500
//! conversion:
//!   include_images: false
//!   summary_max_chars: 150
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Default directory articles are written to, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "src/content/blog";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    /// Host attribution used when a request does not name one.
    pub default_host: Option<String>,
    pub request: RequestConfig,
    pub extraction: ExtractionConfig,
    pub conversion: ConversionConfig,
}

/// HTTP settings for the fetcher.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum text length, in characters, for the container-size fallback.
    pub min_container_chars: usize,
    /// Regex matched against each class of an element inside the body;
    /// matching elements are removed before conversion.
    pub noise_class_pattern: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Keep `![alt](src)` image links in the markdown body.
    pub include_images: bool,
    pub summary_max_chars: usize,
    /// Regexes for promotional lines removed from the markdown body.
    pub boilerplate_patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            default_host: None,
            request: RequestConfig::default(),
            extraction: ExtractionConfig::default(),
            conversion: ConversionConfig::default(),
        }
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
            accept_language: "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_container_chars: 500,
            noise_class_pattern: r"(?i)(qr|advert|promotion|(^|[-_])ad($|[-_]))".to_string(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            include_images: false,
            summary_max_chars: 150,
            boilerplate_patterns: vec![
                r"(?i)长按[^\n]*关注[^\n]*\n?".to_string(),
                r"(?i)扫码[^\n]*关注[^\n]*\n?".to_string(),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a YAML file. Missing keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(output_dir = %config.output_dir.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to unit, not a mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }
}

/// Compile a configured pattern, reporting which one failed.
pub fn compile_pattern(pattern: &str) -> Result<regex::Regex, ConfigError> {
    regex::Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}
