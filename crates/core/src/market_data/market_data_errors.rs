use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Lookup of {0} timed out")]
    Timeout(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid quote: {0}")]
    InvalidQuote(String),

    #[error("No data for {0}")]
    NotFound(String),
}
