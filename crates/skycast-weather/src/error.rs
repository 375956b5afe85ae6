//! Weather service error taxonomy.
//!
//! Every failure the fetch pipeline can produce is one of these
//! variants; the pipeline itself never panics and never aborts the
//! caller. HTTP failures carry status and body separately rather than
//! string-encoding them together.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    /// The API credential is missing or blank after trimming. Detected
    /// before any network call; never retried automatically.
    #[error("weather API credential is missing or blank")]
    MissingCredential,

    /// Transport-level failure: timeout, DNS, connection reset.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response from the provider.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// 2xx response with an empty or undecodable body.
    #[error("invalid response body: {0}")]
    Data(String),

    /// Local forecast store failure.
    #[error("forecast store error: {0}")]
    Store(String),
}

impl WeatherError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCredential => "Weather API key is not configured. Check settings.",
            Self::Network(_) => "Network error. Check your connection.",
            Self::Http { status: 401, .. } => {
                "The weather provider rejected the API key. Check your credential."
            }
            Self::Http { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            Self::Http { .. } => "Weather request failed. Please try again.",
            Self::Data(_) => "Received an unexpected response from the weather service.",
            Self::Store(_) => "Local forecast cache error.",
        }
    }

    /// Whether a later attempt could plausibly succeed without a
    /// configuration change.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Data(_) => true,
            Self::Http { status, .. } => *status >= 500,
            Self::MissingCredential | Self::Store(_) => false,
        }
    }
}
