use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the collection core.
///
/// Cell-level coercion failures are not represented here: a cell that cannot
/// become a number is skipped by the mapper without aborting its row. A
/// per-spec failure is logged by the engine and the spec contributes nothing
/// to that scrape.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The pool is absent or unhealthy; no query was attempted.
    #[error("database connection pool is not available")]
    ConnectionUnavailable,

    /// Opening or validating a new pool failed.
    #[error("connection pool initialization failed: {0}")]
    PoolInit(#[source] sqlx::Error),

    /// The query ran and failed, possibly after one reconnect-retry.
    #[error("query execution failed: {0}")]
    QueryExecution(#[source] sqlx::Error),

    /// The query did not complete within its timeout.
    #[error("query timed out after {0:?}")]
    QueryTimeout(Duration),
}
