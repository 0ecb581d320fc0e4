use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    CleaningTaskDefinition, NewCleaningTask, PersistenceError, PlanReport, RecurrenceRequest,
    ScheduleError, ScheduleOptions, SchedulePlanner, ScheduleReport, ScheduledOccurrence, TaskId,
};

#[derive(Clone)]
pub struct AppState {
    planner: Arc<SchedulePlanner>,
}

impl AppState {
    pub fn new(planner: SchedulePlanner) -> Self {
        Self {
            planner: Arc::new(planner),
        }
    }

    fn planner(&self) -> Arc<SchedulePlanner> {
        self.planner.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    committed: Option<usize>,
    /// Set when a timed-out write may still have stored rows.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    committed_unknown: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    requested: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    completed_task_ids: Option<Vec<TaskId>>,
}

impl ErrorBody {
    fn plain(error: &'static str, message: String) -> Self {
        Self {
            error,
            message,
            field: None,
            task_id: None,
            committed: None,
            committed_unknown: false,
            requested: None,
            completed_task_ids: None,
        }
    }
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Invalid {
        message: String,
        field: Option<&'static str>,
    },
    Timeout(String),
    WriteFailed {
        message: String,
        task_id: TaskId,
        committed: Option<usize>,
        requested: usize,
    },
    /// A zone plan stopped part-way; answered with the status of `failure`.
    PlanStopped {
        message: String,
        completed_task_ids: Vec<TaskId>,
        failure: Box<ApiError>,
    },
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid {
            message: message.into(),
            field: None,
        }
    }

    fn into_parts(self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, ErrorBody::plain("not_found", message))
            }
            ApiError::Invalid { message, field } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    field,
                    ..ErrorBody::plain("invalid_request", message)
                },
            ),
            ApiError::Timeout(message) => {
                (StatusCode::GATEWAY_TIMEOUT, ErrorBody::plain("timeout", message))
            }
            ApiError::WriteFailed {
                message,
                task_id,
                committed,
                requested,
            } => (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    task_id: Some(task_id),
                    committed,
                    committed_unknown: committed.is_none(),
                    requested: Some(requested),
                    ..ErrorBody::plain("write_failed", message)
                },
            ),
            ApiError::PlanStopped {
                message,
                completed_task_ids,
                failure,
            } => {
                let (status, body) = failure.into_parts();
                (
                    status,
                    ErrorBody {
                        message,
                        completed_task_ids: Some(completed_task_ids),
                        ..body
                    },
                )
            }
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::plain("internal_error", message),
            ),
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        let message = value.to_string();
        match value {
            ScheduleError::Recurrence(err) => ApiError::Invalid {
                message,
                field: Some(err.field()),
            },
            ScheduleError::Task(_) | ScheduleError::Generation(_) => ApiError::invalid(message),
            ScheduleError::UnknownTask(_) | ScheduleError::UnknownZone(_) => {
                ApiError::NotFound(message)
            }
            ScheduleError::Store(PersistenceError::Timeout(_)) => ApiError::Timeout(message),
            ScheduleError::Store(_) => ApiError::Internal(message),
            ScheduleError::Write(failure) => ApiError::WriteFailed {
                message,
                task_id: failure.task_id,
                committed: failure.committed,
                requested: failure.requested,
            },
            ScheduleError::Plan {
                completed, failure, ..
            } => ApiError::PlanStopped {
                message,
                completed_task_ids: completed.iter().map(|report| report.task_id).collect(),
                failure: Box::new(ApiError::from(*failure)),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.into_parts();
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Serialize)]
struct PreviewResponse {
    dates: Vec<NaiveDate>,
}

/// Body of `POST /tasks/:id/occurrences`.
#[derive(Debug, Deserialize)]
struct SchedulePayload {
    recurrence: RecurrenceRequest,
    #[serde(flatten)]
    options: ScheduleOptions,
}

/// Body of `POST /tasks`. Without `recurrence` only the definition is created.
#[derive(Debug, Deserialize)]
struct CreateTaskPayload {
    #[serde(flatten)]
    task: NewCleaningTask,
    #[serde(default)]
    recurrence: Option<RecurrenceRequest>,
    #[serde(default)]
    options: ScheduleOptions,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum CreateTaskResponse {
    Defined(CleaningTaskDefinition),
    Scheduled(ScheduleReport),
}

#[derive(Debug, Deserialize)]
struct PlanPayload {
    zone: String,
    start_date: NaiveDate,
    horizon_days: u32,
    #[serde(flatten)]
    options: ScheduleOptions,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/preview", post(preview))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/:id", get(get_task))
        .route(
            "/tasks/:id/occurrences",
            get(list_occurrences).post(schedule_task),
        )
        .route("/plans", post(plan_zone))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, planner: SchedulePlanner) -> std::io::Result<()> {
    let state = AppState::new(planner);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn preview(
    State(state): State<AppState>,
    Json(request): Json<RecurrenceRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let dates = state.planner().preview_request(request)?;
    Ok(Json(PreviewResponse { dates }))
}

async fn list_tasks(
    State(state): State<AppState>,
) -> Result<Json<Vec<CleaningTaskDefinition>>, ApiError> {
    Ok(Json(state.planner().tasks().await?))
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<CleaningTaskDefinition>, ApiError> {
    Ok(Json(state.planner().task(task_id).await?))
}

async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<(StatusCode, Json<CreateTaskResponse>), ApiError> {
    let planner = state.planner();
    let response = match payload.recurrence {
        None => CreateTaskResponse::Defined(planner.define_task(payload.task).await?),
        Some(request) => {
            let spec = request.into_spec().map_err(ScheduleError::from)?;
            let report = planner
                .define_and_schedule(payload.task, &spec, &payload.options)
                .await?;
            CreateTaskResponse::Scheduled(report)
        }
    };
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_occurrences(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Vec<ScheduledOccurrence>>, ApiError> {
    let planner = state.planner();
    planner.task(task_id).await?;
    Ok(Json(planner.occurrences(task_id).await?))
}

async fn schedule_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(payload): Json<SchedulePayload>,
) -> Result<(StatusCode, Json<ScheduleReport>), ApiError> {
    let spec = payload
        .recurrence
        .into_spec()
        .map_err(ScheduleError::from)?;
    let report = state
        .planner()
        .schedule_task(task_id, &spec, &payload.options)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn plan_zone(
    State(state): State<AppState>,
    Json(payload): Json<PlanPayload>,
) -> Result<(StatusCode, Json<PlanReport>), ApiError> {
    if payload.zone.trim().is_empty() {
        return Err(ApiError::invalid("zone must not be empty"));
    }
    let report = state
        .planner()
        .plan_zone(
            payload.zone.trim(),
            payload.start_date,
            payload.horizon_days,
            &payload.options,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}
