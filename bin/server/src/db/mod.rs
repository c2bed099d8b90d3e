//! PostgreSQL repositories for the Greek study tool.
//!
//! This module provides data access for:
//! - Users, keyed by the provider's subject (`idp_id`)
//! - Analyses, always filtered by owning user

pub mod analysis;
pub mod user;

pub use analysis::PgAnalysisRepository;
pub use user::PgUserRepository;

use greek_study_core::StoreError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Pause before retrying a transient failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Returns true for failures worth one more attempt: the connection dropped
/// or the pool had nothing free.
fn is_transient(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

/// Which attempt of [`with_retry_attempt`] produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
    First,
    Retry,
}

/// Runs a single-statement query, retrying once after a short pause when
/// the failure is transient.
///
/// Only use this for statements that are atomic on their own; a retried
/// statement must be safe to run twice.
pub(crate) async fn with_retry<T, F, Fut>(operation: &'static str, run: F) -> Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    with_retry_attempt(operation, run).await.map(|(value, _)| value)
}

/// Like [`with_retry`], but also reports whether the result came from the
/// retry. A transient failure may hide a statement that committed, so a
/// retry can observe the first attempt's effect.
pub(crate) async fn with_retry_attempt<T, F, Fut>(
    operation: &'static str,
    run: F,
) -> Result<(T, Attempt), sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    match run().await {
        Err(e) if is_transient(&e) => {
            warn!(operation, error = %e, "transient database error, retrying once");
            tokio::time::sleep(RETRY_BACKOFF).await;
            run().await.map(|value| (value, Attempt::Retry))
        }
        other => other.map(|value| (value, Attempt::First)),
    }
}

/// Classifies a database failure.
pub(crate) fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err
        && (db.is_unique_violation() || db.is_foreign_key_violation())
    {
        return StoreError::Conflict {
            details: db.message().to_string(),
        };
    }
    StoreError::Database {
        details: err.to_string(),
    }
}
