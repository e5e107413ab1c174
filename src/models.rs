use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use uuid::Uuid;

use crate::timelimit::{InvalidTimeLimit, TimeLimit};

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct QuizOverride {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub quiz_name: String,
    pub user_id: Uuid,
    pub timeopen: Option<DateTime<Utc>>,
    pub timeclose: Option<DateTime<Utc>>,
    pub attempts: Option<i32>,
    pub timelimit: Option<i64>,
    pub modified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One quiz of the course as seen by the acting principal.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct QuizTarget {
    pub id: Uuid,
    pub name: String,
    pub timelimit: TimeLimit,
    pub visible: bool,
    /// Override-management capability in the quiz's own context.
    pub can_manage_overrides: bool,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct QuizTargetRow {
    pub id: Uuid,
    pub name: String,
    pub timelimit: i64,
    pub visible: bool,
    pub can_manage_overrides: bool,
}

impl TryFrom<QuizTargetRow> for QuizTarget {
    type Error = InvalidTimeLimit;

    fn try_from(row: QuizTargetRow) -> Result<Self, Self::Error> {
        Ok(QuizTarget {
            id: row.id,
            name: row.name,
            timelimit: TimeLimit::from_db(row.timelimit)?,
            visible: row.visible,
            can_manage_overrides: row.can_manage_overrides,
        })
    }
}

/// The override a user already has on a quiz. Only `timelimit` is ever rewritten by a bulk run.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExistingOverride {
    pub id: Uuid,
    pub timelimit: Option<TimeLimit>,
    pub timeopen: Option<DateTime<Utc>>,
    pub timeclose: Option<DateTime<Utc>>,
    pub attempts: Option<i32>,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct ExistingOverrideRow {
    pub id: Uuid,
    pub timelimit: Option<i64>,
    pub timeopen: Option<DateTime<Utc>>,
    pub timeclose: Option<DateTime<Utc>>,
    pub attempts: Option<i32>,
}

impl TryFrom<ExistingOverrideRow> for ExistingOverride {
    type Error = InvalidTimeLimit;

    fn try_from(row: ExistingOverrideRow) -> Result<Self, Self::Error> {
        Ok(ExistingOverride {
            id: row.id,
            timelimit: row.timelimit.map(TimeLimit::from_db).transpose()?,
            timeopen: row.timeopen,
            timeclose: row.timeclose,
            attempts: row.attempts,
        })
    }
}

/// A single override applied across every quiz in a course.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OverrideRequest {
    pub user_id: Uuid,
    pub timelimit: TimeLimit,
    #[serde(default)]
    pub update_existing: bool,
}

/// What gets handed to `OverrideStore::save_override`. `id` present means update.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OverridePayload {
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub timelimit: TimeLimit,
}

/// Form posted by the bulk override page.
#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct BulkOverrideForm {
    pub userid: Uuid,
    #[serde_as(as = "DisplayFromStr")]
    pub timelimit: TimeLimit,
    #[serde(default, deserialize_with = "checkbox")]
    pub updateexisting: bool,
}

impl From<BulkOverrideForm> for OverrideRequest {
    fn from(form: BulkOverrideForm) -> Self {
        OverrideRequest {
            user_id: form.userid,
            timelimit: form.timelimit,
            update_existing: form.updateexisting,
        }
    }
}

fn checkbox<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(de)?;
    Ok(matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "on" | "true" | "yes"
    ))
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct NoticeQuery {
    pub notice: Option<String>,
    pub level: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CourseOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub overrides: Vec<QuizOverride>,
}
