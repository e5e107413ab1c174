use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    response::Redirect,
    routing::{get, post},
    Form, Json, Router,
};
use http::{request::Parts, StatusCode};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::bulk::{self, BatchReport, BulkOutcome, BulkSettings, OutcomeRecord};
use crate::models::*;
use crate::store::{OverrideContext, OverrideStore, QuizDirectory};

#[derive(Clone)]
pub struct AppState {
    pub quizzes: Arc<dyn QuizDirectory>,
    pub overrides: Arc<dyn OverrideStore>,
    pub bulk: BulkSettings,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/courses/:course_id/overrides", get(list_overrides))
        .route("/courses/:course_id/overrides/bulk", post(bulk_override_form))
        .route("/api/courses/:course_id/overrides/bulk", post(bulk_override_json))
        .with_state(state)
}

/// The acting user, taken from the `x-user-id` header set by the auth proxy.
#[derive(Debug, Clone, Copy)]
pub struct Principal(pub Uuid);

pub const PRINCIPAL_HEADER: &str = "x-user-id";

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Principal {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(Principal)
            .ok_or_else(|| e401("missing or invalid x-user-id header"))
    }
}

async fn list_overrides(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Principal(principal): Principal,
    Query(q): Query<NoticeQuery>,
) -> Result<Json<CourseOverrides>, (StatusCode, String)> {
    authorize(&state, course_id, principal).await?;

    let overrides = state.overrides.course_overrides(course_id).await.map_err(e500)?;
    Ok(Json(CourseOverrides {
        notice: q.notice,
        level: q.level,
        overrides,
    }))
}

async fn bulk_override_form(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Principal(principal): Principal,
    Form(form): Form<BulkOverrideForm>,
) -> Result<Redirect, (StatusCode, String)> {
    let outcome = run(&state, course_id, principal, form.into()).await?;

    let level = match &outcome {
        BulkOutcome::NoQuizzes => "info",
        BulkOutcome::Completed { report, .. } if report.is_success() => "success",
        BulkOutcome::Completed { .. } => "error",
    };
    let location = format!(
        "/courses/{}/overrides?level={}&notice={}",
        course_id,
        level,
        utf8_percent_encode(&outcome.message(), NON_ALPHANUMERIC)
    );
    Ok(Redirect::to(&location))
}

#[derive(Serialize, Debug)]
struct BulkResponse {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<BatchReport>,
    outcomes: Vec<OutcomeRecord>,
}

async fn bulk_override_json(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
    Principal(principal): Principal,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<BulkResponse>, (StatusCode, String)> {
    let outcome = run(&state, course_id, principal, req).await?;
    let message = outcome.message();

    let body = match outcome {
        BulkOutcome::NoQuizzes => BulkResponse {
            status: "no_quizzes",
            message,
            report: None,
            outcomes: Vec::new(),
        },
        BulkOutcome::Completed { outcomes, report } => BulkResponse {
            status: "completed",
            message,
            report: Some(report),
            outcomes,
        },
    };
    Ok(Json(body))
}

async fn run(
    state: &AppState,
    course_id: Uuid,
    principal: Uuid,
    request: OverrideRequest,
) -> Result<BulkOutcome, (StatusCode, String)> {
    authorize(state, course_id, principal).await?;

    tracing::info!(
        %course_id,
        %principal,
        user_id = %request.user_id,
        timelimit = request.timelimit.as_secs(),
        update_existing = request.update_existing,
        "bulk override requested"
    );
    let context = OverrideContext {
        course_id,
        acting_user: principal,
    };
    bulk::run_bulk_override(
        state.quizzes.as_ref(),
        state.overrides.as_ref(),
        context,
        &request,
        &state.bulk,
    )
    .await
    .map_err(e500)
}

// Course must exist and the principal must hold the capability at course level.
async fn authorize(
    state: &AppState,
    course_id: Uuid,
    principal: Uuid,
) -> Result<(), (StatusCode, String)> {
    if !state.quizzes.course_exists(course_id).await.map_err(e500)? {
        return Err(e404("course not found"));
    }
    if !state
        .quizzes
        .can_manage_course_overrides(course_id, principal)
        .await
        .map_err(e500)?
    {
        return Err(e403("not allowed to manage quiz overrides in this course"));
    }
    Ok(())
}

// --- helpers ---
fn e401<T: Into<String>>(msg: T) -> (StatusCode, String) {
    (StatusCode::UNAUTHORIZED, msg.into())
}

fn e403<T: Into<String>>(msg: T) -> (StatusCode, String) {
    (StatusCode::FORBIDDEN, msg.into())
}

fn e404<T: Into<String>>(msg: T) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, msg.into())
}

fn e500<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    tracing::error!(error=%e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
