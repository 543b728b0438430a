//! CLI error types.

use mermark_config::ConfigError;
use mermark_export::ExportError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Export(#[from] ExportError),

    #[error("file watch failed: {0}")]
    Watch(#[from] notify::Error),

    /// The document could not be read from its source.
    #[error("cannot read {source_name}: {message}")]
    Input {
        source_name: String,
        message: String,
    },

    #[error("{0}")]
    Validation(String),
}
