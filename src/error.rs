use thiserror::Error;

/// Failures of an external feed call.
///
/// None of these are fatal: a collector logs or drops them and the next
/// refresh cycle simply tries again.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The listing call (changed ids or bulk submissions) failed.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("failed to fetch item {id}: {reason}")]
    ItemFetchFailed { id: u64, reason: String },

    /// The API answered, but has no item under this id.
    #[error("item {0} does not exist")]
    ItemMissing(u64),

    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Unavailable(err.to_string())
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("Search parameter was not given")]
    EmptyQuery,
}
