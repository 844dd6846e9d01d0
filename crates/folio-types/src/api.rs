use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::layout::{Element, Page, StylePatch};

// -- JWT Claims --

/// JWT claims shared by folio-api (REST middleware) and folio-gateway
/// (WebSocket identify).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    #[serde(default)]
    pub admin: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub admin: bool,
    pub token: String,
}

// -- Magazines --

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishMagazineRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub like_count: usize,
}

// -- Comments & feedback --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostCommentRequest {
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubmitFeedbackRequest {
    pub suggestion: String,
}

// -- Editor --

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenSessionRequest {
    #[serde(default)]
    pub magazine_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub magazine_id: Option<Uuid>,
    pub pages: Vec<Page>,
    pub selected_page: usize,
    pub selected_element: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddPageResponse {
    pub index: usize,
    pub page_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ElementResponse {
    pub page: usize,
    pub element: Element,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlipRequest {
    pub page: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateElementRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub style: Option<StylePatch>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PositionRequest {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeRequest {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectRequest {
    pub element_id: Option<Uuid>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveLayoutRequest {
    /// Attach the session to this magazine before saving.
    #[serde(default)]
    pub magazine_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub magazine_id: Uuid,
    pub pages: Vec<Page>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
