use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use folio_db::convert::timestamp;
use folio_db::models::FeedbackRow;
use folio_types::api::SubmitFeedbackRequest;
use folio_types::events::Topic;
use folio_types::models::{Feedback, sort_feedback};

use crate::error::ApiError;
use crate::middleware::Claims;
use crate::state::AppState;

pub async fn submit_feedback(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubmitFeedbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestion = req.suggestion.trim().to_string();
    if suggestion.is_empty() {
        return Err(ApiError::invalid("Feedback cannot be empty."));
    }

    let feedback = Feedback {
        id: Uuid::new_v4(),
        author_id: claims.sub,
        suggestion,
        created_at: chrono::Utc::now(),
    };

    let row = FeedbackRow {
        id: feedback.id.to_string(),
        author_id: feedback.author_id.to_string(),
        suggestion: feedback.suggestion.clone(),
        created_at: timestamp(feedback.created_at),
    };
    state.blocking(move |db| db.insert_feedback(&row)).await?;

    info!("Feedback {} received from {}", feedback.id, claims.sub);
    state.dispatcher.notify(Topic::Feedback);
    Ok((StatusCode::CREATED, Json(feedback)))
}

/// Admin view: newest first.
pub async fn list_feedback(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.blocking(|db| db.get_feedback()).await?;
    let mut feedback: Vec<Feedback> = rows.into_iter().map(Feedback::from).collect();
    sort_feedback(&mut feedback);
    Ok(Json(feedback))
}
