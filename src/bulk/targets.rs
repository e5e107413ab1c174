use uuid::Uuid;

use crate::models::QuizTarget;
use crate::store::{QuizDirectory, StoreError};

/// Lists every quiz in the course, ordered by name ignoring case, then by id.
///
/// Hidden quizzes and quizzes the principal may not manage are still returned so that each
/// of them gets an explicit skip outcome instead of vanishing from the report.
pub async fn enumerate(
    quizzes: &dyn QuizDirectory,
    course_id: Uuid,
    principal: Uuid,
) -> Result<Vec<QuizTarget>, StoreError> {
    let mut targets = quizzes.course_quizzes(course_id, principal).await?;
    targets.sort_by_cached_key(|t| (t.name.to_lowercase(), t.id));
    Ok(targets)
}
