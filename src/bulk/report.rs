use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::bulk::eligibility::SkipReason;
use crate::bulk::reconcile::Applied;
use crate::models::QuizTarget;

pub const NO_QUIZZES_MESSAGE: &str = "There are no quizzes in this course.";
pub const NOTHING_APPLIED_MESSAGE: &str = "Failed to create any overrides.";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Created,
    Updated,
    Skipped,
    Errored,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Created,
    Updated,
    Skipped(SkipReason),
    Errored(String),
}

/// Terminal classification of one quiz in a batch.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub quiz_id: Uuid,
    pub quiz_name: String,
    pub outcome: Outcome,
}

impl OutcomeRecord {
    fn new(target: &QuizTarget, outcome: Outcome) -> Self {
        Self {
            quiz_id: target.id,
            quiz_name: target.name.clone(),
            outcome,
        }
    }

    pub fn skipped(target: &QuizTarget, reason: SkipReason) -> Self {
        Self::new(target, Outcome::Skipped(reason))
    }

    pub fn applied(target: &QuizTarget, applied: Applied) -> Self {
        Self::new(
            target,
            match applied {
                Applied::Created => Outcome::Created,
                Applied::Updated => Outcome::Updated,
            },
        )
    }

    pub fn errored(target: &QuizTarget, message: impl Into<String>) -> Self {
        Self::new(target, Outcome::Errored(message.into()))
    }

    pub fn kind(&self) -> OutcomeKind {
        match self.outcome {
            Outcome::Created => OutcomeKind::Created,
            Outcome::Updated => OutcomeKind::Updated,
            Outcome::Skipped(_) => OutcomeKind::Skipped,
            Outcome::Errored(_) => OutcomeKind::Errored,
        }
    }

    pub fn reason(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Skipped(reason) => Some(reason.to_string()),
            Outcome::Errored(message) => Some(message.clone()),
            Outcome::Created | Outcome::Updated => None,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub quiz_name: String,
    pub reason: String,
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.quiz_name, self.reason)
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: Vec<Detail>,
    pub errors: Vec<Detail>,
}

impl BatchReport {
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a OutcomeRecord>) -> Self {
        outcomes
            .into_iter()
            .fold(BatchReport::default(), |mut report, record| {
                match &record.outcome {
                    Outcome::Created => report.created += 1,
                    Outcome::Updated => report.updated += 1,
                    Outcome::Skipped(reason) => report.skipped.push(Detail {
                        quiz_name: record.quiz_name.clone(),
                        reason: reason.to_string(),
                    }),
                    Outcome::Errored(message) => report.errors.push(Detail {
                        quiz_name: record.quiz_name.clone(),
                        reason: message.clone(),
                    }),
                }
                report
            })
    }

    pub fn failures(&self) -> usize {
        self.skipped.len() + self.errors.len()
    }

    pub fn is_success(&self) -> bool {
        self.created + self.updated > 0
    }

    pub fn headline(&self) -> String {
        match (self.created, self.updated) {
            (0, 0) => NOTHING_APPLIED_MESSAGE.to_string(),
            (c, 0) => format!("Created {}.", overrides(c)),
            (0, u) => format!("Updated {}.", overrides(u)),
            (c, u) => format!("Created {} and updated {}.", overrides(c), overrides(u)),
        }
    }

    /// Headline followed by the skip and error breakdowns, one quiz per line.
    pub fn render_text(&self) -> String {
        let mut out = self.headline();
        for (title, details) in [("Skipped", &self.skipped), ("Errors", &self.errors)] {
            if details.is_empty() {
                continue;
            }
            out.push_str("\n\n");
            out.push_str(title);
            out.push(':');
            for detail in details {
                out.push_str("\n- ");
                out.push_str(&detail.to_string());
            }
        }
        out
    }
}

fn overrides(n: usize) -> String {
    if n == 1 {
        "1 override".to_string()
    } else {
        format!("{n} overrides")
    }
}
