use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::Stream;
use serde::Serialize;
use tokio_stream::{wrappers::WatchStream, StreamExt};

use crate::controller::{run_generation, StoryState};
use crate::errors::AppError;
use crate::export::export_story;
use crate::generation::{IllustrationReport, SourceFile};
use crate::layout::{layout_story, DocumentLayout};
use crate::state::AppState;
use crate::story::PageSlot;

#[derive(Serialize)]
pub struct StoryStateResponse {
    #[serde(flatten)]
    pub state: StoryState,
    /// Slots that currently have an illustration.
    pub illustrations: Vec<PageSlot>,
}

async fn state_response(state: &AppState) -> StoryStateResponse {
    StoryStateResponse {
        state: state.controller.snapshot(),
        illustrations: state.controller.illustrated_slots().await,
    }
}

fn parse_slot(index: usize) -> Result<PageSlot, AppError> {
    PageSlot::from_index(index)
        .ok_or_else(|| AppError::NotFound(format!("Illustration slot {index} does not exist")))
}

/// GET /api/v1/story
pub async fn handle_get_story(State(state): State<AppState>) -> Json<StoryStateResponse> {
    Json(state_response(&state).await)
}

/// POST /api/v1/story
/// Multipart form: `topic` (text) and `file` (image, PDF or plain text).
pub async fn handle_submit_story(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<StoryStateResponse>), AppError> {
    let mut topic = String::new();
    let mut file: Option<SourceFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("topic") => topic = field.text().await?,
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                file = SourceFile::from_upload(file_name, content_type.as_deref(), bytes)?;
            }
            _ => {}
        }
    }

    let generation_id = state.controller.submit(&topic, file.as_ref())?;
    if let Some(file) = file {
        run_generation(
            state.controller.clone(),
            state.generator.clone(),
            generation_id,
            topic.trim().to_string(),
            file,
        );
    }

    Ok((StatusCode::ACCEPTED, Json(state_response(&state).await)))
}

/// POST /api/v1/story/reset
pub async fn handle_reset_story(
    State(state): State<AppState>,
) -> Result<Json<StoryStateResponse>, AppError> {
    state.controller.reset().await?;
    Ok(Json(state_response(&state).await))
}

/// POST /api/v1/story/illustrations
/// Generates every illustration that is still missing.
pub async fn handle_generate_illustrations(
    State(state): State<AppState>,
) -> Result<Json<IllustrationReport>, AppError> {
    let report = state
        .controller
        .illustrate(state.generator.as_ref(), None, &state.illustration_policy)
        .await?;
    Ok(Json(report))
}

/// POST /api/v1/story/illustrations/:slot
/// Generates (or regenerates) a single illustration.
pub async fn handle_generate_illustration(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Json<IllustrationReport>, AppError> {
    let slot = parse_slot(index)?;
    let report = state
        .controller
        .illustrate(
            state.generator.as_ref(),
            Some(vec![slot]),
            &state.illustration_policy,
        )
        .await?;

    if !report.skipped.is_empty() {
        return Err(AppError::Validation(format!(
            "The story has nothing to illustrate for {slot}"
        )));
    }
    if !report.in_progress.is_empty() {
        return Err(AppError::Conflict(format!(
            "An illustration for {slot} is already being generated"
        )));
    }
    if !report.failed.is_empty() {
        return Err(AppError::Generation(format!("Illustration for {slot} failed")));
    }
    Ok(Json(report))
}

/// GET /api/v1/story/illustrations/:slot
pub async fn handle_get_illustration(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> Result<Response, AppError> {
    let slot = parse_slot(index)?;
    let payload = state
        .controller
        .image(slot)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No illustration for {slot}")))?;

    Ok(([(header::CONTENT_TYPE, payload.mime_type)], payload.bytes).into_response())
}

/// GET /api/v1/story/layout
pub async fn handle_get_layout(
    State(state): State<AppState>,
) -> Result<Json<DocumentLayout>, AppError> {
    let (_, story) = state.controller.reading_story("view the layout")?;
    let images = state.controller.images_snapshot().await;
    let config = state.page_config.clone();

    // CPU-bound; run off the async executor.
    let layout = tokio::task::spawn_blocking(move || layout_story(&story, &images, &config))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in layout: {e}")))?;

    Ok(Json(layout))
}

/// GET /api/v1/story/export
pub async fn handle_export_story(State(state): State<AppState>) -> Result<Response, AppError> {
    let (_, story) = state.controller.reading_story("export")?;
    let images = state.controller.images_snapshot().await;
    let config = state.page_config.clone();

    let exported = tokio::task::spawn_blocking(move || export_story(&story, &images, &config))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in export: {e}")))??;

    let disposition = format!("attachment; filename=\"{}\"", exported.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(exported.bytes),
    )
        .into_response())
}

/// GET /api/v1/story/events
/// Server-sent events: one `state` event with the current snapshot, then one per transition.
pub async fn handle_story_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = WatchStream::new(state.controller.subscribe())
        .map(|snapshot| Event::default().event("state").json_data(snapshot));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
