use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use folio_db::convert::timestamp;
use folio_db::models::CommentRow;
use folio_types::api::PostCommentRequest;
use folio_types::events::Topic;
use folio_types::models::{Comment, sort_comments};

use crate::error::ApiError;
use crate::magazines::load_magazine;
use crate::middleware::Claims;
use crate::state::AppState;

/// Comments of a magazine, oldest first.
pub async fn get_comments(
    State(state): State<AppState>,
    Path(magazine_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    load_magazine(&state, magazine_id).await?;

    let mid = magazine_id.to_string();
    let rows = state.blocking(move |db| db.get_comments(&mid)).await?;
    let mut comments: Vec<Comment> = rows.into_iter().map(Comment::from).collect();
    sort_comments(&mut comments);
    Ok(Json(comments))
}

pub async fn post_comment(
    State(state): State<AppState>,
    Path(magazine_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let body = req.body.trim().to_string();
    if body.is_empty() {
        return Err(ApiError::invalid("Comment cannot be empty."));
    }

    let comment = Comment {
        id: Uuid::new_v4(),
        magazine_id,
        author_id: claims.sub,
        author_name: claims.username.clone(),
        body,
        created_at: chrono::Utc::now(),
    };

    let row = CommentRow {
        id: comment.id.to_string(),
        magazine_id: magazine_id.to_string(),
        author_id: comment.author_id.to_string(),
        author_name: comment.author_name.clone(),
        body: comment.body.clone(),
        created_at: timestamp(comment.created_at),
    };
    if !state.blocking(move |db| db.insert_comment(&row)).await? {
        return Err(ApiError::NotFound("magazine"));
    }

    state.dispatcher.notify(Topic::Comments(magazine_id));
    Ok((StatusCode::CREATED, Json(comment)))
}
