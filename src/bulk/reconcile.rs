use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::models::{ExistingOverride, OverridePayload, OverrideRequest, QuizTarget};
use crate::store::{OverrideContext, OverrideStore, StoreError};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Applied {
    Created,
    Updated,
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Builds the save payload: the existing override's id when there is one, none otherwise.
pub fn payload_for(
    target: &QuizTarget,
    request: &OverrideRequest,
    existing: Option<&ExistingOverride>,
) -> OverridePayload {
    OverridePayload {
        id: existing.map(|o| o.id),
        user_id: request.user_id,
        quiz_id: target.id,
        timelimit: request.timelimit,
    }
}

/// Makes exactly one save call for an eligible quiz. No retries.
pub async fn reconcile(
    store: &dyn OverrideStore,
    context: &OverrideContext,
    target: &QuizTarget,
    request: &OverrideRequest,
    existing: Option<&ExistingOverride>,
    limit: Duration,
) -> Result<Applied, ReconcileError> {
    let payload = payload_for(target, request, existing);
    let applied = match payload.id {
        Some(_) => Applied::Updated,
        None => Applied::Created,
    };

    let id = bounded(limit, store.save_override(target.id, context, &payload)).await?;
    tracing::debug!(quiz_id = %target.id, override_id = %id, ?applied, "override saved");
    Ok(applied)
}

/// Runs one collaborator call under `limit`, turning an elapsed timer into an error.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, ReconcileError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(res) => res.map_err(ReconcileError::from),
        Err(_) => Err(ReconcileError::TimedOut(limit)),
    }
}
