use thiserror::Error;

/// Errors returned by a ledger API round trip.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Connection, timeout or other transport failure
    #[error("network error: {0}")]
    Network(String),
    /// The ledger node answered with a non-2xx status
    #[error("HTTP error: {0}")]
    Status(u16),
    /// The response was missing expected fields or could not be decoded
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl LedgerError {
    /// Returns true for failures that happened before a well-formed reply arrived.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Status(_))
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Protocol(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
