#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use quiz_overrides::models::{ExistingOverride, OverridePayload, QuizOverride, QuizTarget};
use quiz_overrides::store::{OverrideContext, OverrideStore, QuizDirectory, StoreError};
use quiz_overrides::timelimit::TimeLimit;

#[derive(Debug, Clone)]
pub struct StoredQuiz {
    pub course_id: Uuid,
    pub target: QuizTarget,
}

#[derive(Debug, Clone)]
pub struct SaveCall {
    pub quiz_id: Uuid,
    pub payload: OverridePayload,
    pub context: OverrideContext,
}

/// In-memory stand-in for the LMS tables behind both ports.
#[derive(Default)]
pub struct MemoryLms {
    pub courses: Mutex<HashSet<Uuid>>,
    pub managers: Mutex<HashSet<(Uuid, Uuid)>>,
    pub quizzes: Mutex<Vec<StoredQuiz>>,
    pub overrides: Mutex<HashMap<(Uuid, Uuid), QuizOverride>>,
    pub saves: Mutex<Vec<SaveCall>>,
    pub failing_saves: Mutex<HashSet<Uuid>>,
    pub failing_lookups: Mutex<HashSet<Uuid>>,
    pub slow_saves: Mutex<HashMap<Uuid, Duration>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MemoryLms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_course(&self, manager: Uuid) -> Uuid {
        let course_id = Uuid::new_v4();
        self.courses.lock().unwrap().insert(course_id);
        self.managers.lock().unwrap().insert((course_id, manager));
        course_id
    }

    pub fn add_quiz(&self, course_id: Uuid, name: &str, timelimit: TimeLimit) -> Uuid {
        self.add_quiz_with(course_id, name, timelimit, true, true)
    }

    pub fn add_quiz_with(
        &self,
        course_id: Uuid,
        name: &str,
        timelimit: TimeLimit,
        visible: bool,
        can_manage_overrides: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.quizzes.lock().unwrap().push(StoredQuiz {
            course_id,
            target: QuizTarget {
                id,
                name: name.to_string(),
                timelimit,
                visible,
                can_manage_overrides,
            },
        });
        id
    }

    pub fn add_override(&self, quiz_id: Uuid, user_id: Uuid, timelimit: Option<TimeLimit>) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let quiz_name = self.quiz_name(quiz_id);
        self.overrides.lock().unwrap().insert(
            (quiz_id, user_id),
            QuizOverride {
                id,
                quiz_id,
                quiz_name,
                user_id,
                timeopen: None,
                timeclose: None,
                attempts: Some(3),
                timelimit: timelimit.map(TimeLimit::to_db),
                modified_by: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn fail_saves_for(&self, quiz_id: Uuid) {
        self.failing_saves.lock().unwrap().insert(quiz_id);
    }

    pub fn fail_lookups_for(&self, quiz_id: Uuid) {
        self.failing_lookups.lock().unwrap().insert(quiz_id);
    }

    pub fn slow_saves_for(&self, quiz_id: Uuid, delay: Duration) {
        self.slow_saves.lock().unwrap().insert(quiz_id, delay);
    }

    pub fn save_calls(&self) -> Vec<SaveCall> {
        self.saves.lock().unwrap().clone()
    }

    pub fn override_for(&self, quiz_id: Uuid, user_id: Uuid) -> Option<QuizOverride> {
        self.overrides.lock().unwrap().get(&(quiz_id, user_id)).cloned()
    }

    pub fn override_count(&self) -> usize {
        self.overrides.lock().unwrap().len()
    }

    fn quiz_name(&self, quiz_id: Uuid) -> String {
        self.quizzes
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.target.id == quiz_id)
            .map(|q| q.target.name.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QuizDirectory for MemoryLms {
    async fn course_exists(&self, course_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.courses.lock().unwrap().contains(&course_id))
    }

    async fn can_manage_course_overrides(
        &self,
        course_id: Uuid,
        principal: Uuid,
    ) -> Result<bool, StoreError> {
        Ok(self.managers.lock().unwrap().contains(&(course_id, principal)))
    }

    async fn course_quizzes(
        &self,
        course_id: Uuid,
        _principal: Uuid,
    ) -> Result<Vec<QuizTarget>, StoreError> {
        Ok(self
            .quizzes
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.course_id == course_id)
            .map(|q| q.target.clone())
            .collect())
    }
}

#[async_trait]
impl OverrideStore for MemoryLms {
    async fn find_existing_override(
        &self,
        quiz_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ExistingOverride>, StoreError> {
        if self.failing_lookups.lock().unwrap().contains(&quiz_id) {
            return Err(StoreError::Rejected("lookup unavailable".into()));
        }
        let found = self.override_for(quiz_id, user_id);
        Ok(found.map(|o| ExistingOverride {
            id: o.id,
            timelimit: o.timelimit.map(|t| TimeLimit::from_db(t).unwrap()),
            timeopen: o.timeopen,
            timeclose: o.timeclose,
            attempts: o.attempts,
        }))
    }

    async fn save_override(
        &self,
        quiz_id: Uuid,
        context: &OverrideContext,
        payload: &OverridePayload,
    ) -> Result<Uuid, StoreError> {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        let delay = self.slow_saves.lock().unwrap().get(&quiz_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.saves.lock().unwrap().push(SaveCall {
            quiz_id,
            payload: payload.clone(),
            context: *context,
        });

        if self.failing_saves.lock().unwrap().contains(&quiz_id) {
            return Err(StoreError::Rejected("write refused".into()));
        }

        let quiz_name = self.quiz_name(quiz_id);
        let mut overrides = self.overrides.lock().unwrap();
        let key = (quiz_id, payload.user_id);
        match payload.id {
            Some(id) => match overrides.get_mut(&key) {
                Some(row) if row.id == id => {
                    row.timelimit = Some(payload.timelimit.to_db());
                    row.modified_by = Some(context.acting_user);
                    row.updated_at = Utc::now();
                    Ok(id)
                }
                _ => Err(StoreError::OverrideNotFound(id)),
            },
            None => {
                // Mirrors the UNIQUE (quiz_id, user_id) constraint.
                if overrides.contains_key(&key) {
                    return Err(StoreError::Rejected("duplicate override".into()));
                }
                let id = Uuid::new_v4();
                let now = Utc::now();
                overrides.insert(
                    key,
                    QuizOverride {
                        id,
                        quiz_id,
                        quiz_name,
                        user_id: payload.user_id,
                        timeopen: None,
                        timeclose: None,
                        attempts: None,
                        timelimit: Some(payload.timelimit.to_db()),
                        modified_by: Some(context.acting_user),
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(id)
            }
        }
    }

    async fn course_overrides(&self, course_id: Uuid) -> Result<Vec<QuizOverride>, StoreError> {
        let quiz_ids: HashSet<Uuid> = self
            .quizzes
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.course_id == course_id)
            .map(|q| q.target.id)
            .collect();
        let mut rows: Vec<QuizOverride> = self
            .overrides
            .lock()
            .unwrap()
            .values()
            .filter(|o| quiz_ids.contains(&o.quiz_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.quiz_name.cmp(&b.quiz_name));
        Ok(rows)
    }
}
