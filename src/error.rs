//! Error types for Drishti

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Drishti error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Malformed replay line
    #[error("Replay error at line {line}: {message}")]
    Replay {
        /// 1-based line number in the replay file
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Image decode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Light classifier failure
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Detector node input or output channel is gone
    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
