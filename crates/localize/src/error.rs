use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum I18nError {
    #[error("no provider has been registered for locale `{locale}`")]
    NoProvider { locale: String },

    #[error("no locale has been assigned and no fallback locale has been configured")]
    NoLocale,

    #[error("failed to load strings for locale `{locale}`")]
    Load {
        locale: String,
        #[source]
        source: SourceError,
    },

    #[error("string source for locale `{locale}` panicked while loading")]
    LoadPanicked { locale: String },

    #[error("provider for locale `{locale}` is no longer running")]
    ProviderClosed { locale: String },

    #[error("no tokio runtime available; create the registry from within a runtime")]
    NoRuntime,
}

impl I18nError {
    /// Whether this error is a configuration mistake rather than a data problem.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoProvider { .. } | Self::NoLocale | Self::NoRuntime)
    }
}

/// Failure reported by a [`crate::StringSource`] while producing its strings.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{origin}`: {message}")]
    Parse { origin: String, message: String },

    #[error("invalid entry `{key}` in `{origin}`: {reason}")]
    InvalidEntry {
        origin: String,
        key: String,
        reason: String,
    },

    #[error("unsupported catalog `{}` (expected .json, .yaml or .yml)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to fetch `{url}`: {message}")]
    Fetch { url: String, message: String },

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
