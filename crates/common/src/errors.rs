use thiserror::Error;

/// Error taxonomy surfaced to callers of the trading API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    /// Bad call parameters. Raised before any network access and never retried.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The token, its curve account or its pool could not be found or decoded.
    #[error("Lookup error: {0}")]
    LookupError(String),

    /// The provider connection failed or has been closed.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The transaction could not be built, was rejected, or failed on-chain.
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

/// Errors raised by a ledger provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Transport or RPC level failure.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// The provider was closed and no longer accepts calls.
    #[error("provider closed")]
    Closed,

    /// The transaction was rejected at submission time.
    #[error("Submission error: {0}")]
    SubmissionError(String),

    /// The transaction landed but its execution failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// The transaction was not confirmed within the polling budget.
    #[error("Transaction {0} was not confirmed")]
    Unconfirmed(String),
}

impl From<ProviderError> for TradeError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RpcError(_) | ProviderError::Closed => {
                TradeError::NetworkError(err.to_string())
            }
            ProviderError::SubmissionError(_)
            | ProviderError::TransactionFailed(_)
            | ProviderError::Unconfirmed(_) => TradeError::ExecutionError(err.to_string()),
        }
    }
}
