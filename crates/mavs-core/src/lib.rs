//! Shared types and configuration for the Mavs news pipeline.
//!
//! Every other crate in the workspace speaks in terms of [`ArticleInput`],
//! [`SourceKind`] and [`TranslationKind`], and reads its settings from
//! [`AppConfig`] and the YAML source catalogue.

pub mod app_config;
pub mod articles;
pub mod config;
pub mod sources;

pub use app_config::{AppConfig, Environment, TranslationSettings};
pub use articles::{parse_published_at, ArticleInput, SourceKind, TranslationKind};
pub use config::{load_app_config, load_app_config_from_env};
pub use sources::{load_sources, validate_sources, HtmlSelectors, SourceConfig, SourceFormat, SourcesFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read sources file {path}: {source}")]
    SourcesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sources file: {0}")]
    SourcesFileParse(#[from] serde_yaml::Error),

    #[error("sources validation failed: {0}")]
    Validation(String),
}
