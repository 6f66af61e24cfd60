use super::error::ApiError;
use super::payload::{
    ExamplesResponse, LessonRequest, LessonResponse, RebuildResponse, StatusResponse,
    SubjectQuery, SubjectSummary, SubjectsResponse,
};
use super::AppState;
use crate::curriculum::{capitalize, Subject};
use crate::error::TutorError;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

fn resolve_subject(state: &AppState, requested: Option<&str>) -> Result<Subject, ApiError> {
    let requested = requested.map(capitalize);
    state
        .orchestrator
        .catalog()
        .resolve(requested.as_deref())
        .cloned()
        .map_err(|e| match e {
            TutorError::UnknownSubject { name } => {
                ApiError::NotFound(format!("Unknown subject: {}", name))
            }
            other => {
                tracing::error!("Subject lookup failed: {}", other);
                ApiError::Internal("Subject lookup failed".to_string())
            }
        })
}

async fn subject_status(state: &AppState, subject: &Subject) -> Result<StatusResponse, ApiError> {
    let status = state.orchestrator.registry().cache().status(subject)?;
    let ready = state.orchestrator.registry().is_ready(subject).await;
    Ok(StatusResponse::new(status, ready))
}

/// Liveness probe
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok", "app": "sss-tutor"})))
}

pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let subject = resolve_subject(&state, query.subject.as_deref())?;
    Ok(Json(subject_status(&state, &subject).await?))
}

pub async fn rebuild(
    State(state): State<AppState>,
    Query(query): Query<SubjectQuery>,
) -> Result<Json<RebuildResponse>, ApiError> {
    let subject = resolve_subject(&state, query.subject.as_deref())?;
    info!("Rebuild requested for {}", subject.name);

    let ready = state.orchestrator.registry().rebuild(&subject).await?;
    let message = format!(
        "{} index rebuilt from {} ({} chunks).",
        subject.name,
        subject.source_label(),
        ready.index.chunk_count()
    );

    Ok(Json(RebuildResponse {
        message,
        status: "success",
        metadata: subject_status(&state, &subject).await?,
    }))
}

pub async fn lesson(
    State(state): State<AppState>,
    payload: Result<Json<LessonRequest>, JsonRejection>,
) -> Result<Json<LessonResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::Unprocessable(rejection.body_text()))?;

    if request.topic.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Topic must not be empty".to_string()));
    }

    info!(
        "Lesson request: '{}' ({}, {} pace)",
        request.topic.trim(),
        request.sss_level,
        request.learning_pace
    );

    let subject = request.subject.as_deref().map(capitalize);
    let lesson = state
        .orchestrator
        .generate(
            subject.as_deref(),
            &request.topic,
            request.sss_level,
            request.learning_pace,
        )
        .await?;

    Ok(Json(LessonResponse::from(lesson)))
}

pub async fn examples() -> Json<ExamplesResponse> {
    Json(ExamplesResponse::builtin())
}

pub async fn subjects(State(state): State<AppState>) -> Json<SubjectsResponse> {
    let catalog = state.orchestrator.catalog();
    let registry = state.orchestrator.registry();

    let mut subjects = Vec::with_capacity(catalog.len());
    for subject in catalog.iter() {
        subjects.push(SubjectSummary {
            name: subject.name.clone(),
            source_file: subject.source_label(),
            ready: registry.is_ready(subject).await,
        });
    }

    Json(SubjectsResponse {
        subjects,
        default_subject: catalog.default_subject_name().to_string(),
    })
}
