#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ListingError {
    #[error("HTTP request failed: {0}")]
    FetchFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Listing site responded with status {status} for `{url}`.")]
    UnexpectedStatus { status: u16, url: String },

    #[error("Failed to parse listing markup: {message}")]
    ParseFailure { message: String },

    #[error("The URL `{url}` is not supported.")]
    UnsupportedUrl { url: String },
}

impl ListingError {
    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::ParseFailure {
            message: message.into(),
        }
    }

    /// Whether the failure came from the network rather than from the content.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            ListingError::FetchFailure(_) | ListingError::UnexpectedStatus { .. }
        )
    }
}

impl From<reqwest::Error> for ListingError {
    fn from(e: reqwest::Error) -> Self {
        ListingError::FetchFailure(Box::new(e))
    }
}
