use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::articles::SourceKind;
use crate::ConfigError;

const DEFAULT_MIN_CONTENT_LEN: usize = 200;

/// CSS selectors driving the HTML scrape adapter.
///
/// `content_selectors` are tried in order; the first whose text reaches
/// `min_content_len` characters wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtmlSelectors {
    pub link_selector: String,
    #[serde(default)]
    pub content_selectors: Vec<String>,
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,
}

fn default_min_content_len() -> usize {
    DEFAULT_MIN_CONTENT_LEN
}

/// Payload shape of a source, selected by configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceFormat {
    /// Typed JSON news API.
    JsonApi,
    /// RSS 2.0 or Atom document.
    Feed,
    /// Listing page whose links are followed and scraped.
    Html(HtmlSelectors),
}

impl SourceFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::JsonApi => "json_api",
            SourceFormat::Feed => "feed",
            SourceFormat::Html(_) => "html",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    pub url: String,
    pub format: SourceFormat,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

impl SourcesFile {
    /// Sources with `enabled: true`, in file order.
    #[must_use]
    pub fn enabled(&self) -> Vec<SourceConfig> {
        self.sources.iter().filter(|s| s.enabled).cloned().collect()
    }
}

/// Load and validate the source catalogue from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources_file: SourcesFile = serde_yaml::from_str(&content)?;
    validate_sources(&sources_file)?;

    Ok(sources_file)
}

/// Validate a parsed source catalogue.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] describing the first problem found.
pub fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for source in &sources_file.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(source.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source name: '{}'",
                source.name
            )));
        }

        if !(source.url.starts_with("http://") || source.url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "source '{}' has non-http url '{}'",
                source.name, source.url
            )));
        }

        if let SourceFormat::Html(selectors) = &source.format {
            if selectors.link_selector.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "html source '{}' needs a link_selector",
                    source.name
                )));
            }
            if selectors.content_selectors.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "html source '{}' needs at least one content selector",
                    source.name
                )));
            }
        }
    }

    Ok(())
}
