use crate::stack::StackError;

/// Domain-specific error types for the marketplace library.
///
/// Every variant is a local, synchronous contract violation surfaced
/// directly to the caller; nothing here is retried internally.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error("Seller {0:?} does not belong to this marketplace")]
    ForeignSeller(String),

    #[error("Buyer {0:?} does not belong to this marketplace")]
    ForeignBuyer(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience type alias.
pub type MarketResult<T> = Result<T, MarketError>;
