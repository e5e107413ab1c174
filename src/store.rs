//! Ports to the LMS data the bulk override run reads and writes.
//!
//! The bulk pipeline only ever talks to these traits; `db::PgStore` is the production
//! implementation.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ExistingOverride, OverridePayload, QuizOverride, QuizTarget};
use crate::timelimit::InvalidTimeLimit;

/// Capability a principal needs to manage quiz overrides.
pub const MANAGE_OVERRIDES: &str = "mod/quiz:manageoverrides";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    InvalidTimeLimit(#[from] InvalidTimeLimit),
    #[error("override {0} not found")]
    OverrideNotFound(Uuid),
    #[error("{0}")]
    Rejected(String),
}

/// Who is saving an override, and on behalf of which course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverrideContext {
    pub course_id: Uuid,
    pub acting_user: Uuid,
}

#[async_trait]
pub trait QuizDirectory: Send + Sync {
    async fn course_exists(&self, course_id: Uuid) -> Result<bool, StoreError>;

    /// Course-level check that gates the whole batch.
    async fn can_manage_course_overrides(
        &self,
        course_id: Uuid,
        principal: Uuid,
    ) -> Result<bool, StoreError>;

    /// Every quiz in the course, with visibility and the principal's quiz-level capability.
    async fn course_quizzes(
        &self,
        course_id: Uuid,
        principal: Uuid,
    ) -> Result<Vec<QuizTarget>, StoreError>;
}

#[async_trait]
pub trait OverrideStore: Send + Sync {
    async fn find_existing_override(
        &self,
        quiz_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ExistingOverride>, StoreError>;

    /// Creates the override when `payload.id` is `None`, updates it otherwise.
    /// Returns the id of the saved row.
    async fn save_override(
        &self,
        quiz_id: Uuid,
        context: &OverrideContext,
        payload: &OverridePayload,
    ) -> Result<Uuid, StoreError>;

    async fn course_overrides(&self, course_id: Uuid) -> Result<Vec<QuizOverride>, StoreError>;
}
