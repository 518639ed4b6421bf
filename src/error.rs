//! Error types for the diagram exporter

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for exporter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while exporting diagrams
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch the browser or open a tab
    #[error("Browser initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load the diagrams page
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Page script evaluation failed or the scripting API is missing
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// A wait on the page did not finish in time
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// The page returned view data that could not be understood
    #[error("Invalid view data: {0}")]
    InvalidViews(String),

    /// An image payload could not be decoded
    #[error("Failed to decode image payload: {0}")]
    DecodeError(String),

    /// Writing an exported image failed
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}
