use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A published magazine. `likes` holds each reader id at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Magazine {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cover_image_url: String,
    pub content: String,
    pub views: u64,
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Comments are never edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub magazine_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: Uuid,
    pub author_id: Uuid,
    pub suggestion: String,
    pub created_at: DateTime<Utc>,
}

/// Newest first, the order the magazine list is shown in.
pub fn sort_magazines(magazines: &mut [Magazine]) {
    magazines.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Oldest first: comments read top to bottom as a conversation.
pub fn sort_comments(comments: &mut [Comment]) {
    comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}

/// Newest first.
pub fn sort_feedback(feedback: &mut [Feedback]) {
    feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
