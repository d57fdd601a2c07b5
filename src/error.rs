use thiserror::Error;

#[derive(Error, Debug)]
pub enum RqdocError {
    #[error("bad options: {0}")]
    BadOptions(String),

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("the maximum number of attempts to redirect to the leader is reached")]
    TooManyRedirects,

    #[error("redirect without a usable location header")]
    BadRedirect,

    #[error("discovery service: no more nodes to query")]
    NoMoreNodes,

    #[error("cannot request the discovery service (status {0})")]
    CannotReachDiscovery(u16),

    #[error("discovery service returned invalid JSON")]
    InvalidJson,

    #[error("discovery service returned an invalid nodes array")]
    InvalidNodesArray,

    #[error("statement error: {0}")]
    Sql(String),

    #[error("row {index} holds invalid JSON: {cause}")]
    BadRow { index: usize, cause: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl RqdocError {
    /// Whether the discovery failover loop may retry this error on the
    /// next node. Only transport-level failures qualify; every other
    /// error is terminal for the current routing attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RqdocError::Timeout | RqdocError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, RqdocError>;
