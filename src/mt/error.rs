use thiserror::Error;

/// Error types for the translation backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MtError {
    /// Missing credentials or invalid provider settings
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// The backend refused the credentials (DeepL HTTP 403)
    #[error("Credentials rejected: {0}")]
    Unauthorized(String),
    /// Locale code that the backend cannot accept
    #[error("Invalid locale: {0}")]
    InvalidLocale(String),
    /// Transport failure before a response was received
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Backend asked us to slow down (HTTP 429)
    #[error("Rate limited by translation backend")]
    RateLimited,
    /// Character quota of the account is used up (DeepL HTTP 456)
    #[error("Translation quota exceeded")]
    QuotaExceeded,
    /// Backend answered but the translation could not be obtained
    #[error("Translation error: {0}")]
    TranslationError(String),
    /// General error with context
    #[error("{0}")]
    Other(String),
}

impl MtError {
    /// Whether this error points at setup rather than at the request content
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            MtError::ConfigError(_) | MtError::Unauthorized(_) | MtError::InvalidLocale(_)
        )
    }

    /// Whether every later call in this run would fail the same way,
    /// whatever text it carries
    pub fn disables_backend(&self) -> bool {
        matches!(self, MtError::Unauthorized(_) | MtError::InvalidLocale(_))
    }
}

impl From<reqwest::Error> for MtError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MtError::NetworkError(format!("request timed out: {}", err))
        } else {
            MtError::NetworkError(err.to_string())
        }
    }
}

/// Result type for backend operations
pub type MtResult<T> = Result<T, MtError>;
