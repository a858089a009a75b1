//! Errors at the bridge HTTP boundary

/// Result type alias for raw bridge requests
pub type Result<T> = std::result::Result<T, SmartGlassError>;

#[derive(Debug, thiserror::Error)]
pub enum SmartGlassError {
    /// Endpoint could not be joined onto the base URL
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Connection failure, TLS failure, timeout
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Bridge answered with something other than 200
    #[error("Invalid status code {status} from url {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    /// Body was not JSON
    #[error("Unable to parse JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
