use thiserror::Error;

/// Transient vs permanent classification for RPC failures (see `rpc::middleware`).
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("request timed out")]
    Timeout,
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String, retry_after: Option<u64> },
    #[error("block '{0}' not found")]
    BlockNotFound(String),
    #[error("transaction '{0}' not found")]
    TransactionNotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RpcError {
    /// Connection resets, timeouts, redirect loops and 5xx/429 are transient; everything
    /// else (permanent node-side failures) is not retried by the backoff middleware.
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Connection(_) | RpcError::Timeout | RpcError::TooManyRedirects => true,
            RpcError::Http { status, .. } => *status == 429 || *status >= 500,
            RpcError::BlockNotFound(_) | RpcError::TransactionNotFound(_) | RpcError::Other(_) => false,
        }
    }
}

/// Entity repository failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unique constraint violated, retry via re-select")]
    UniqueViolation,
    #[error("token decimals {0} exceed MAX_DECIMAL_PLACES")]
    DecimalsOutOfRange(u32),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Fatal and non-fatal indexer conditions.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("log entry has removed=true, cannot safely index")]
    LogRemoved,
    #[error("pair '{0}' was not visible within the configured deadline")]
    PairVisibilityTimeout(String),
    #[error("event '{0}' has no registered handler")]
    UnknownEvent(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Commit coordinator fatal conditions.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("reorder buffer exceeded MAX_RESULT_STORAGE_SIZE ({0}), a job result was lost")]
    ReorderBufferOverflow(usize),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Processor stage fatal conditions.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("pair '{0}' already has a transition bundle that disagrees with the recomputed one")]
    TransitionBundleMismatch(String),
    #[error("aggregate went negative: {0}")]
    NegativeAggregate(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
