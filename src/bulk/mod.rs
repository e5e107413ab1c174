//! Bulk override run: apply one time-limit override to every quiz in a course.
//!
//! Each quiz is classified independently (created, updated, skipped or errored) and the
//! outcomes are folded into a [`BatchReport`]. Saves are committed per quiz; a failure on
//! one quiz never undoes or blocks the others.

pub mod eligibility;
pub mod reconcile;
pub mod report;
pub mod targets;

use futures::stream::{self, StreamExt};
use std::time::Duration;

use crate::models::{OverrideRequest, QuizTarget};
use crate::store::{OverrideContext, OverrideStore, QuizDirectory, StoreError};

pub use eligibility::{Decision, SkipReason};
pub use reconcile::{Applied, ReconcileError};
pub use report::{BatchReport, Detail, Outcome, OutcomeKind, OutcomeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkSettings {
    /// Quizzes processed at once.
    pub concurrency: usize,
    /// Bound on each lookup and save call.
    pub call_timeout: Duration,
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            call_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    NoQuizzes,
    Completed {
        outcomes: Vec<OutcomeRecord>,
        report: BatchReport,
    },
}

impl BulkOutcome {
    pub fn message(&self) -> String {
        match self {
            BulkOutcome::NoQuizzes => report::NO_QUIZZES_MESSAGE.to_string(),
            BulkOutcome::Completed { report, .. } => report.render_text(),
        }
    }

    pub fn outcomes(&self) -> &[OutcomeRecord] {
        match self {
            BulkOutcome::NoQuizzes => &[],
            BulkOutcome::Completed { outcomes, .. } => outcomes,
        }
    }
}

/// Enumerates the course's quizzes and settles each one against `request`.
///
/// Only enumeration failure is fatal. Everything that goes wrong for a single quiz ends up
/// as that quiz's `Errored` outcome.
pub async fn run_bulk_override(
    quizzes: &dyn QuizDirectory,
    overrides: &dyn OverrideStore,
    context: OverrideContext,
    request: &OverrideRequest,
    settings: &BulkSettings,
) -> Result<BulkOutcome, StoreError> {
    let targets = targets::enumerate(quizzes, context.course_id, context.acting_user).await?;
    if targets.is_empty() {
        tracing::info!(course_id = %context.course_id, "bulk override: course has no quizzes");
        return Ok(BulkOutcome::NoQuizzes);
    }

    let expected = targets.len();
    let ctx = &context;
    // `buffered` hands results back in enumeration order whatever the completion order.
    let outcomes: Vec<OutcomeRecord> = stream::iter(targets)
        .map(|target| async move { settle(overrides, ctx, &target, request, settings).await })
        .buffered(settings.concurrency.max(1))
        .collect()
        .await;
    debug_assert_eq!(outcomes.len(), expected);

    let report = BatchReport::from_outcomes(&outcomes);
    tracing::info!(
        course_id = %context.course_id,
        user_id = %request.user_id,
        created = report.created,
        updated = report.updated,
        skipped = report.skipped.len(),
        errored = report.errors.len(),
        "bulk override finished"
    );
    Ok(BulkOutcome::Completed { outcomes, report })
}

async fn settle(
    overrides: &dyn OverrideStore,
    context: &OverrideContext,
    target: &QuizTarget,
    request: &OverrideRequest,
    settings: &BulkSettings,
) -> OutcomeRecord {
    if let Some(reason) = eligibility::access_skip(target) {
        tracing::debug!(quiz_id = %target.id, ?reason, "quiz skipped");
        return OutcomeRecord::skipped(target, reason);
    }

    let lookup = overrides.find_existing_override(target.id, request.user_id);
    let existing = match reconcile::bounded(settings.call_timeout, lookup).await {
        Ok(existing) => existing,
        Err(e) => {
            tracing::warn!(quiz_id = %target.id, error = %e, "existing override lookup failed");
            return OutcomeRecord::errored(target, e.to_string());
        }
    };

    match eligibility::evaluate(target, request, existing.as_ref()) {
        Decision::Skip(reason) => {
            tracing::debug!(quiz_id = %target.id, ?reason, "quiz skipped");
            OutcomeRecord::skipped(target, reason)
        }
        Decision::Proceed => {
            let saved = reconcile::reconcile(
                overrides,
                context,
                target,
                request,
                existing.as_ref(),
                settings.call_timeout,
            )
            .await;
            match saved {
                Ok(applied) => OutcomeRecord::applied(target, applied),
                Err(e) => {
                    tracing::warn!(quiz_id = %target.id, error = %e, "override save failed");
                    OutcomeRecord::errored(target, e.to_string())
                }
            }
        }
    }
}
