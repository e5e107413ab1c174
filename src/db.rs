use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::models::{
    ExistingOverride, ExistingOverrideRow, OverridePayload, QuizOverride, QuizTarget,
    QuizTargetRow,
};
use crate::store::{
    OverrideContext, OverrideStore, QuizDirectory, StoreError, MANAGE_OVERRIDES,
};

pub type Db = Pool<Postgres>;

pub async fn connect(url: &str) -> Result<Db> {
    Ok(Pool::<Postgres>::connect(url).await?)
}

/// Postgres-backed quiz directory and override store.
#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QuizDirectory for PgStore {
    async fn course_exists(&self, course_id: Uuid) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM courses WHERE id = $1)")
            .bind(course_id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    async fn can_manage_course_overrides(
        &self,
        course_id: Uuid,
        principal: Uuid,
    ) -> Result<bool, StoreError> {
        // A course-level prohibit beats any allow.
        let allowed: bool = sqlx::query_scalar(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM capability_assignments
                        WHERE principal_id = $1 AND context_level = 'course' AND context_id = $2
                          AND capability = $3 AND permission = 'allow')
                AND NOT EXISTS (SELECT 1 FROM capability_assignments
                        WHERE principal_id = $1 AND context_level = 'course' AND context_id = $2
                          AND capability = $3 AND permission = 'prohibit')
            "#,
        )
        .bind(principal)
        .bind(course_id)
        .bind(MANAGE_OVERRIDES)
        .fetch_one(&self.db)
        .await?;
        Ok(allowed)
    }

    async fn course_quizzes(
        &self,
        course_id: Uuid,
        principal: Uuid,
    ) -> Result<Vec<QuizTarget>, StoreError> {
        // Quiz context inherits the course grant unless the quiz prohibits it.
        let rows = sqlx::query_as::<_, QuizTargetRow>(
            r#"
            SELECT q.id, q.name, q.timelimit, q.visible,
                   NOT EXISTS (SELECT 1 FROM capability_assignments ca
                               WHERE ca.principal_id = $2 AND ca.context_level = 'quiz'
                                 AND ca.context_id = q.id AND ca.capability = $3
                                 AND ca.permission = 'prohibit') AS can_manage_overrides
            FROM quizzes q
            WHERE q.course_id = $1
            ORDER BY lower(q.name) ASC, q.id ASC
            "#,
        )
        .bind(course_id)
        .bind(principal)
        .bind(MANAGE_OVERRIDES)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter()
            .map(|row| QuizTarget::try_from(row).map_err(StoreError::from))
            .collect()
    }
}

#[async_trait]
impl OverrideStore for PgStore {
    async fn find_existing_override(
        &self,
        quiz_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ExistingOverride>, StoreError> {
        let row = sqlx::query_as::<_, ExistingOverrideRow>(
            r#"
            SELECT id, timelimit, timeopen, timeclose, attempts
            FROM quiz_overrides
            WHERE quiz_id = $1 AND user_id = $2
            "#,
        )
        .bind(quiz_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(ExistingOverride::try_from).transpose()?)
    }

    async fn save_override(
        &self,
        quiz_id: Uuid,
        context: &OverrideContext,
        payload: &OverridePayload,
    ) -> Result<Uuid, StoreError> {
        if payload.quiz_id != quiz_id {
            return Err(StoreError::Rejected(format!(
                "override payload is for quiz {}, not {}",
                payload.quiz_id, quiz_id
            )));
        }

        match payload.id {
            Some(id) => {
                let done = sqlx::query(
                    r#"
                    UPDATE quiz_overrides
                    SET timelimit = $1, modified_by = $2, updated_at = now()
                    WHERE id = $3 AND quiz_id = $4 AND user_id = $5
                    "#,
                )
                .bind(payload.timelimit.to_db())
                .bind(context.acting_user)
                .bind(id)
                .bind(quiz_id)
                .bind(payload.user_id)
                .execute(&self.db)
                .await?;

                if done.rows_affected() == 0 {
                    return Err(StoreError::OverrideNotFound(id));
                }
                Ok(id)
            }
            None => {
                let id: Uuid = sqlx::query_scalar(
                    r#"
                    INSERT INTO quiz_overrides (id, quiz_id, user_id, timelimit, modified_by)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(quiz_id)
                .bind(payload.user_id)
                .bind(payload.timelimit.to_db())
                .bind(context.acting_user)
                .fetch_one(&self.db)
                .await?;
                Ok(id)
            }
        }
    }

    async fn course_overrides(&self, course_id: Uuid) -> Result<Vec<QuizOverride>, StoreError> {
        let rows = sqlx::query_as::<_, QuizOverride>(
            r#"
            SELECT o.id, o.quiz_id, q.name AS quiz_name, o.user_id, o.timeopen, o.timeclose,
                   o.attempts, o.timelimit, o.modified_by, o.created_at, o.updated_at
            FROM quiz_overrides o
            JOIN quizzes q ON q.id = o.quiz_id
            WHERE q.course_id = $1
            ORDER BY q.name ASC, o.user_id ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}
