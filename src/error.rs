use std::path::PathBuf;

use thiserror::Error;

/// Fatal error type for catalog loading and document testing.
///
/// Problems found *inside* a citation scheme are not errors; they are reported as
/// [`Warning`](crate::warning::Warning)s next to the per-level results.
#[derive(Error, Debug)]
pub enum CtsError {
    #[error("IO error: {path} - {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML parsing error: {path} - {source}")]
    XmlParse {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Malformed catalog: {details}")]
    MalformedCatalog { details: String },

    #[error("Title not found for language '{lang}' (nor for the default 'en')")]
    TitleNotFound { lang: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CtsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CtsError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn xml(path: impl Into<PathBuf>, source: roxmltree::Error) -> Self {
        CtsError::XmlParse {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(details: impl Into<String>) -> Self {
        CtsError::MalformedCatalog {
            details: details.into(),
        }
    }
}

impl From<crate::config::ConfigError> for CtsError {
    fn from(err: crate::config::ConfigError) -> Self {
        CtsError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CtsError>;
