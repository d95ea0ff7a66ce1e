use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::layout::assign::{assign_to_pages, PageSet};
use crate::layout::blocks::{decompose, Block};
use crate::layout::height::{
    resolve_heights, BlockHeight, HeightStrategy, MeasureContext, ResolvedHeights,
};
use crate::layout::preview::{CommittedLayout, PreviewSession};
use crate::layout::template::TemplateConfig;
use crate::layout::validate::{validate, ValidationReport, ValidationRules};
use crate::layout::{paginate, LayoutOutcome};
use crate::models::document::ResumeDocument;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DecomposeRequest {
    pub document: ResumeDocument,
    pub template: Option<TemplateConfig>,
}

#[derive(Deserialize)]
pub struct HeightsRequest {
    pub blocks: Vec<Block>,
    pub template: Option<TemplateConfig>,
    #[serde(default)]
    pub strategy: HeightStrategy,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub blocks: Vec<Block>,
    pub heights: Vec<BlockHeight>,
    /// Defaults to the capacity of the default template.
    pub capacity: Option<f32>,
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub pages: PageSet,
    pub rules: Option<ValidationRules>,
}

#[derive(Deserialize)]
pub struct PaginateRequest {
    pub document: ResumeDocument,
    pub template: Option<TemplateConfig>,
    #[serde(default)]
    pub strategy: HeightStrategy,
}

#[derive(Deserialize)]
pub struct SubmitDocumentRequest {
    pub document: ResumeDocument,
    pub template: Option<TemplateConfig>,
}

#[derive(Serialize)]
pub struct PreviewCreatedResponse {
    pub session_id: Uuid,
}

#[derive(Serialize)]
pub struct SubmitAcceptedResponse {
    pub session_id: Uuid,
    pub generation: u64,
}

#[derive(Serialize)]
pub struct PreviewStateResponse {
    pub session_id: Uuid,
    pub latest_generation: u64,
    /// Null until the first pass after the debounce window has committed.
    pub layout: Option<CommittedLayout>,
}

fn template_or_default(state: &AppState, template: Option<TemplateConfig>) -> TemplateConfig {
    template.unwrap_or_else(|| state.default_template.clone())
}

async fn find_session(state: &AppState, id: Uuid) -> Result<PreviewSession, AppError> {
    state
        .previews
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Preview session {id} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Stateless engine endpoints
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/layout/decompose
pub async fn handle_decompose(
    State(state): State<AppState>,
    Json(req): Json<DecomposeRequest>,
) -> Result<Json<Vec<Block>>, AppError> {
    let template = template_or_default(&state, req.template);
    Ok(Json(decompose(&req.document, &template)))
}

/// POST /api/v1/layout/heights
pub async fn handle_heights(
    State(state): State<AppState>,
    Json(req): Json<HeightsRequest>,
) -> Result<Json<ResolvedHeights>, AppError> {
    let template = template_or_default(&state, req.template);
    let typography = template.typography_context();
    let heights = resolve_heights(
        &req.blocks,
        req.strategy,
        &MeasureContext {
            typography: &typography,
            surface: Some(state.surface.as_ref()),
        },
    )?;
    Ok(Json(heights))
}

/// POST /api/v1/layout/assign
pub async fn handle_assign(
    State(state): State<AppState>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<PageSet>, AppError> {
    let capacity = req
        .capacity
        .unwrap_or_else(|| state.default_template.capacity());
    Ok(Json(assign_to_pages(&req.blocks, &req.heights, capacity)?))
}

/// POST /api/v1/layout/validate
pub async fn handle_validate(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Json<ValidationReport> {
    let rules = req.rules.unwrap_or_else(|| state.rules.clone());
    Json(validate(&req.pages, &rules))
}

/// POST /api/v1/layout/paginate
///
/// Full pipeline. The measured pass is CPU-bound, so it runs on the blocking pool.
pub async fn handle_paginate(
    State(state): State<AppState>,
    Json(req): Json<PaginateRequest>,
) -> Result<Json<LayoutOutcome>, AppError> {
    let template = template_or_default(&state, req.template);
    let rules = state.rules.clone();
    let surface = state.surface.clone();

    let outcome = tokio::task::spawn_blocking(move || {
        paginate(
            &req.document,
            &template,
            req.strategy,
            Some(surface.as_ref()),
            &rules,
        )
    })
    .await
    .map_err(|e| anyhow::anyhow!("Layout task failed: {e}"))??;

    Ok(Json(outcome))
}

// ────────────────────────────────────────────────────────────────────────────
// Preview sessions
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/previews
pub async fn handle_create_preview(
    State(state): State<AppState>,
) -> (StatusCode, Json<PreviewCreatedResponse>) {
    let session = state.previews.create().await;
    (
        StatusCode::CREATED,
        Json(PreviewCreatedResponse {
            session_id: session.id(),
        }),
    )
}

/// PUT /api/v1/previews/:id/document
///
/// Accepts a snapshot and returns immediately; the layout is committed after the
/// debounce window.
pub async fn handle_submit_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitDocumentRequest>,
) -> Result<(StatusCode, Json<SubmitAcceptedResponse>), AppError> {
    let session = find_session(&state, id).await?;
    let template = template_or_default(&state, req.template);
    let generation = session.submit(req.document, template)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitAcceptedResponse {
            session_id: id,
            generation,
        }),
    ))
}

/// GET /api/v1/previews/:id
pub async fn handle_get_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PreviewStateResponse>, AppError> {
    let session = find_session(&state, id).await?;
    Ok(Json(PreviewStateResponse {
        session_id: id,
        latest_generation: session.latest_generation(),
        layout: session.current().map(|layout| layout.as_ref().clone()),
    }))
}

/// GET /api/v1/previews/:id/events
///
/// Server-sent page-count notifications ("N pages detected"). The current count, if
/// any, is sent first.
pub async fn handle_preview_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let mut rx = session.subscribe_page_counts();
    let initial = session.current().map(|layout| layout.page_count_event());

    let stream = async_stream::stream! {
        let mut pending = initial;
        loop {
            let event = match pending.take() {
                Some(event) => event,
                None => match rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(session = %id, skipped, "Page count subscriber lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };
            match Event::default().event("page_count").json_data(&event) {
                Ok(sse) => {
                    yield Ok::<_, Infallible>(sse);
                }
                Err(e) => {
                    warn!(session = %id, "Failed to encode page count event: {e}");
                }
            }
        }
    };

    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::new())
        .into_response())
}

/// GET /api/v1/previews/:id/export
///
/// The committed rendered document as HTML: the same markup the preview shows. Refused
/// while only a provisional (estimate-based) layout exists.
pub async fn handle_export_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = find_session(&state, id).await?;
    let layout = session
        .current()
        .ok_or_else(|| AppError::Conflict("No layout has been committed yet".to_string()))?;
    if layout.provisional {
        return Err(AppError::Conflict(
            "Layout is provisional; measured heights are not ready yet".to_string(),
        ));
    }

    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        layout.outcome.rendered.to_html(),
    )
        .into_response())
}

/// DELETE /api/v1/previews/:id
pub async fn handle_delete_preview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.previews.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Preview session {id} not found")))
    }
}
