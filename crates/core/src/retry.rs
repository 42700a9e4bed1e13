//! Bounded retry policy for optimistic-concurrency conflicts.

use tracing::warn;

use crate::error::EngineError;
use crate::store::{StoreError, StoreTx};

/// Attempts per mutating operation: the original attempt plus one internal
/// retry. Deliberately small — this is livelock avoidance, and exhaustion
/// must surface as a distinct, user-actionable error.
pub(crate) const MAX_WRITE_ATTEMPTS: u32 = 2;

/// Outcome of one optimistic attempt.
pub(crate) enum Attempt<T> {
    /// The attempt committed.
    Done(T),
    /// The commit lost a version race; the caller may re-run the attempt
    /// from scratch (fresh reads included).
    Conflict,
}

/// Commits the transaction, separating version conflicts from hard
/// failures.
pub(crate) async fn commit_staged(tx: Box<dyn StoreTx>) -> Result<Attempt<()>, EngineError> {
    match tx.commit().await {
        Ok(()) => Ok(Attempt::Done(())),
        Err(StoreError::VersionConflict { entity, id }) => {
            warn!(entity, %id, "optimistic lock conflict at commit");
            Ok(Attempt::Conflict)
        }
        Err(other) => Err(other.into()),
    }
}
