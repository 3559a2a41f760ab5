use thiserror::Error;

/// Main error type for devops-report
#[derive(Error, Debug)]
pub enum ReportError {
    /// Missing or expired session with an external tool
    #[error("Authentication error: {0}\nHint: run 'az login' to refresh your session")]
    Auth(String),

    /// Transient fetch failure (network, timeout, non-zero CLI exit)
    #[error("Network error: {0}")]
    Network(String),

    /// Unexpected response shape from an external service
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration errors (invalid date range, unknown project, bad flag combo)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP/API errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Git-related errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// TOML parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias for devops-report operations
pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Create a new authentication error
    pub fn auth<S: Into<String>>(msg: S) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Fatal errors abort the run; the rest degrade the affected source
    /// to an empty contribution plus a warning.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Config(_))
    }
}
