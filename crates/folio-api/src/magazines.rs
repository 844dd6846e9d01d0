use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use folio_db::convert::timestamp;
use folio_db::models::NewMagazine;
use folio_types::api::{LikeResponse, PublishMagazineRequest};
use folio_types::events::Topic;
use folio_types::models::Magazine;

use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::AppState;

const PLACEHOLDER_COVER_BASE: &str = "https://placehold.co/600x800/6366f1/ffffff";

/// Generated cover used when a magazine is published without one.
pub fn placeholder_cover(title: &str) -> String {
    match reqwest::Url::parse_with_params(PLACEHOLDER_COVER_BASE, &[("text", title)]) {
        Ok(url) => url.into(),
        Err(e) => {
            warn!("Could not build placeholder cover for '{}': {}", title, e);
            PLACEHOLDER_COVER_BASE.to_string()
        }
    }
}

pub async fn list_magazines(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.blocking(|db| db.list_magazines()).await?;
    let magazines: Vec<Magazine> = rows.into_iter().map(Magazine::from).collect();
    Ok(Json(magazines))
}

pub async fn get_magazine(
    State(state): State<AppState>,
    Path(magazine_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(load_magazine(&state, magazine_id).await?))
}

pub async fn publish_magazine(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PublishMagazineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req.title.trim().to_string();
    if title.is_empty() || req.content.trim().is_empty() {
        return Err(ApiError::invalid("Title and Content are required."));
    }

    let cover_image_url = match req.cover_image_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => placeholder_cover(&title),
    };

    let magazine = Magazine {
        id: Uuid::new_v4(),
        title,
        description: req.description.unwrap_or_default(),
        cover_image_url,
        content: req.content,
        views: 0,
        likes: Vec::new(),
        created_at: chrono::Utc::now(),
    };

    let stored = magazine.clone();
    state
        .blocking(move |db| {
            db.insert_magazine(&NewMagazine {
                id: &stored.id.to_string(),
                title: &stored.title,
                description: &stored.description,
                cover_image_url: &stored.cover_image_url,
                content: &stored.content,
                created_at: &timestamp(stored.created_at),
            })
        })
        .await?;

    info!("{} published magazine '{}' ({})", claims.username, magazine.title, magazine.id);
    state.dispatcher.notify(Topic::Magazines);

    Ok((StatusCode::CREATED, Json(magazine)))
}

/// Open a magazine for reading. The view is counted in the background so
/// the reader never waits on it.
pub async fn open_magazine(
    State(state): State<AppState>,
    Path(magazine_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let magazine = load_magazine(&state, magazine_id).await?;
    tokio::spawn(record_view(state.clone(), magazine_id));
    Ok(Json(magazine))
}

/// Count one view. Failures are logged, never surfaced.
pub async fn record_view(state: AppState, magazine_id: Uuid) {
    let id = magazine_id.to_string();
    match state.blocking(move |db| db.increment_views(&id)).await {
        Ok(Some(_)) => state.dispatcher.notify_all(Topic::for_magazine(magazine_id)),
        Ok(None) => warn!("View for vanished magazine {}", magazine_id),
        Err(e) => error!("Error updating view count for {}: {:?}", magazine_id, e),
    }
}

pub async fn toggle_like(
    State(state): State<AppState>,
    Path(magazine_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let mid = magazine_id.to_string();
    let uid = claims.sub.to_string();
    let now = timestamp(chrono::Utc::now());
    let (liked, like_count) = state
        .blocking(move |db| db.toggle_like(&mid, &uid, &now))
        .await?
        .ok_or(ApiError::NotFound("magazine"))?;

    state.dispatcher.notify_all(Topic::for_magazine(magazine_id));
    Ok(Json(LikeResponse { liked, like_count }))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// Irreversible: takes comments, likes and the saved layout with it.
pub async fn delete_magazine(
    State(state): State<AppState>,
    Path(magazine_id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if !query.confirm {
        return Err(ApiError::ConfirmationRequired);
    }

    let mid = magazine_id.to_string();
    if !state.blocking(move |db| db.delete_magazine(&mid)).await? {
        return Err(ApiError::NotFound("magazine"));
    }

    info!("{} deleted magazine {}", claims.username, magazine_id);
    state.dispatcher.notify_all(Topic::for_magazine(magazine_id));
    state.dispatcher.notify(Topic::Comments(magazine_id));
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn load_magazine(state: &AppState, magazine_id: Uuid) -> Result<Magazine, ApiError> {
    let mid = magazine_id.to_string();
    state
        .blocking(move |db| db.get_magazine(&mid))
        .await?
        .map(Magazine::from)
        .ok_or(ApiError::NotFound("magazine"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_cover_encodes_title() {
        assert_eq!(
            placeholder_cover("Issue 1"),
            "https://placehold.co/600x800/6366f1/ffffff?text=Issue+1"
        );
        assert_eq!(
            placeholder_cover("Art & Design"),
            "https://placehold.co/600x800/6366f1/ffffff?text=Art+%26+Design"
        );
    }
}
