use thiserror::Error;

/// Source-level failure: the whole source contributes nothing to this run.
///
/// Item-level problems never surface as a `SourceError`; adapters skip the
/// offending item and keep going.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid CSS selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },

    #[error("unrecognized payload from {context}: {reason}")]
    Payload { context: String, reason: String },
}
