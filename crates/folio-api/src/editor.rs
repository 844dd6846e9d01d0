use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use folio_db::convert::timestamp;
use folio_editor::EditorSession;
use folio_types::api::{
    AddPageResponse, ElementResponse, FlipRequest, LayoutResponse, OpenSessionRequest,
    PositionRequest, ResizeRequest, SaveLayoutRequest, SelectRequest, SessionResponse,
    UpdateElementRequest,
};
use folio_types::layout::{Element, Page};

use crate::error::ApiError;
use crate::magazines::load_magazine;
use crate::middleware::Claims;
use crate::state::AppState;

fn describe(session: &EditorSession) -> SessionResponse {
    SessionResponse {
        id: session.id(),
        magazine_id: session.magazine_id(),
        pages: session.pages().to_vec(),
        selected_page: session.selected_page(),
        selected_element: session.selected_element_id(),
    }
}

fn element_response(page: usize, element: &Element) -> Json<ElementResponse> {
    Json(ElementResponse {
        page,
        element: element.clone(),
    })
}

/// Stored layout of a magazine, or no pages if it was never saved.
async fn load_layout(state: &AppState, magazine_id: Uuid) -> Result<Vec<Page>, ApiError> {
    load_magazine(state, magazine_id).await?;

    let mid = magazine_id.to_string();
    let Some(row) = state.blocking(move |db| db.get_layout(&mid)).await? else {
        return Ok(Vec::new());
    };
    serde_json::from_str(&row.pages).map_err(|e| {
        ApiError::Store(anyhow::anyhow!("corrupt layout for {}: {}", row.magazine_id, e))
    })
}

pub async fn get_layout(
    State(state): State<AppState>,
    Path(magazine_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pages = load_layout(&state, magazine_id).await?;
    Ok(Json(LayoutResponse { magazine_id, pages }))
}

// -- Session lifecycle --

pub async fn open_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = match req.magazine_id {
        Some(magazine_id) => {
            let pages = load_layout(&state, magazine_id).await?;
            EditorSession::with_pages(claims.sub, Some(magazine_id), pages)
        }
        None => EditorSession::new(claims.sub),
    };

    let response = describe(&session);
    state.editors.open(session).await;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.editors.with_session(session_id, claims.sub, describe).await?;
    Ok(Json(response))
}

pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state.editors.close(session_id, claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Persist the page sequence as the magazine's layout (whole-document
/// overwrite).
pub async fn save(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SaveLayoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (magazine_id, pages) = state
        .editors
        .with_session_mut(session_id, claims.sub, |s| {
            if let Some(magazine_id) = req.magazine_id {
                s.set_magazine(magazine_id);
            }
            Ok((s.magazine_id(), s.pages().to_vec()))
        })
        .await?;
    let magazine_id = magazine_id
        .ok_or_else(|| ApiError::invalid("Choose a magazine to save this layout to."))?;

    let pages_json = serde_json::to_string(&pages)
        .map_err(|e| ApiError::Store(anyhow::anyhow!("layout serialization failed: {}", e)))?;
    let mid = magazine_id.to_string();
    let now = timestamp(chrono::Utc::now());
    if !state.blocking(move |db| db.save_layout(&mid, &pages_json, &now)).await? {
        return Err(ApiError::NotFound("magazine"));
    }

    info!("{} saved {} pages to magazine {}", claims.username, pages.len(), magazine_id);
    Ok(Json(LayoutResponse { magazine_id, pages }))
}

// -- Pages --

pub async fn add_page(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .editors
        .with_session_mut(session_id, claims.sub, |s| {
            let index = s.add_page();
            Ok(AddPageResponse {
                index,
                page_count: s.pages().len(),
            })
        })
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn flip(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<FlipRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .editors
        .with_session_mut(session_id, claims.sub, |s| {
            s.flip_to(req.page)?;
            Ok(describe(s))
        })
        .await?;
    Ok(Json(response))
}

// -- Elements --

pub async fn add_text(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .editors
        .with_session_mut(session_id, claims.sub, |s| {
            let page = s.selected_page();
            Ok(element_response(page, s.add_text()))
        })
        .await?;
    Ok((StatusCode::CREATED, response))
}

/// Body is the raw image; its Content-Type must be `image/*`.
pub async fn add_image(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !content_type.starts_with("image/") {
        return Err(ApiError::invalid("Only image files can be added."));
    }

    let response = state
        .editors
        .with_session_mut(session_id, claims.sub, |s| {
            let page = s.selected_page();
            let element = s.add_image(body, &content_type)?;
            Ok(element_response(page, element))
        })
        .await?;
    Ok((StatusCode::CREATED, response))
}

pub async fn update_element(
    State(state): State<AppState>,
    Path((session_id, element_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateElementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.is_none() && req.style.is_none() {
        return Err(ApiError::invalid("Nothing to update."));
    }

    let response = state
        .editors
        .with_session_mut(session_id, claims.sub, |s| {
            if let Some(style) = req.style {
                s.update_style(element_id, style)?;
            }
            if let Some(content) = req.content {
                s.update_content(element_id, content)?;
            }
            let page = s.selected_page();
            let element = s
                .pages()[page]
                .element(element_id)
                .ok_or(folio_editor::EditorError::ElementNotFound(element_id))?;
            Ok(element_response(page, element))
        })
        .await?;
    Ok(response)
}

/// Drag-stop callback.
pub async fn move_element(
    State(state): State<AppState>,
    Path((session_id, element_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PositionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .editors
        .with_session_mut(session_id, claims.sub, |s| {
            let page = s.selected_page();
            Ok(element_response(page, s.update_position(element_id, req.x, req.y)?))
        })
        .await?;
    Ok(response)
}

/// Resize-stop callback.
pub async fn resize_element(
    State(state): State<AppState>,
    Path((session_id, element_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ResizeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .editors
        .with_session_mut(session_id, claims.sub, |s| {
            let page = s.selected_page();
            Ok(element_response(page, s.resize(element_id, req.width, req.height)?))
        })
        .await?;
    Ok(response)
}

pub async fn remove_element(
    State(state): State<AppState>,
    Path((session_id, element_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .editors
        .with_session_mut(session_id, claims.sub, |s| s.remove_element(element_id).map(|_| ()))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn select(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SelectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let properties = state
        .editors
        .with_session_mut(session_id, claims.sub, |s| {
            s.select(req.element_id)?;
            Ok(s.properties())
        })
        .await?;
    Ok(Json(properties))
}

/// Properties panel for the current selection; `null` when nothing is selected.
pub async fn properties(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let properties = state
        .editors
        .with_session(session_id, claims.sub, |s| s.properties())
        .await?;
    Ok(Json(properties))
}

/// Serve a transient image while its session is open.
pub async fn get_object(
    State(state): State<AppState>,
    Path((session_id, object_id)): Path<(Uuid, Uuid)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let object = state
        .editors
        .with_session(session_id, claims.sub, |s| s.object(object_id).cloned())
        .await?
        .ok_or(ApiError::NotFound("image"))?;

    Ok(([(header::CONTENT_TYPE, object.content_type)], object.data))
}
