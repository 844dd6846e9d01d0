pub mod auth;
pub mod comments;
pub mod editor;
pub mod error;
pub mod feedback;
pub mod magazines;
pub mod middleware;
pub mod state;


use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::middleware::{require_admin, require_auth};
use crate::state::AppState;

/// All REST routes. The WebSocket gateway is mounted by the server.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/anonymous", post(auth::anonymous));

    let reader_routes = Router::new()
        .route("/magazines", get(magazines::list_magazines))
        .route("/magazines/{magazine_id}", get(magazines::get_magazine))
        .route("/magazines/{magazine_id}/open", post(magazines::open_magazine))
        .route("/magazines/{magazine_id}/like", post(magazines::toggle_like))
        .route("/magazines/{magazine_id}/comments", get(comments::get_comments))
        .route("/magazines/{magazine_id}/comments", post(comments::post_comment))
        .route("/magazines/{magazine_id}/layout", get(editor::get_layout))
        .route("/feedback", post(feedback::submit_feedback))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/magazines", post(magazines::publish_magazine))
        .route("/magazines/{magazine_id}", axum::routing::delete(magazines::delete_magazine))
        .route("/feedback", get(feedback::list_feedback))
        .route("/editor/sessions", post(editor::open_session))
        .route("/editor/sessions/{session_id}", get(editor::get_session).delete(editor::close_session))
        .route("/editor/sessions/{session_id}/pages", post(editor::add_page))
        .route("/editor/sessions/{session_id}/flip", post(editor::flip))
        .route("/editor/sessions/{session_id}/select", post(editor::select))
        .route("/editor/sessions/{session_id}/properties", get(editor::properties))
        .route("/editor/sessions/{session_id}/save", post(editor::save))
        .route("/editor/sessions/{session_id}/elements/text", post(editor::add_text))
        .route(
            "/editor/sessions/{session_id}/elements/image",
            post(editor::add_image).layer(DefaultBodyLimit::max(state.max_image_bytes)),
        )
        .route(
            "/editor/sessions/{session_id}/elements/{element_id}",
            axum::routing::patch(editor::update_element).delete(editor::remove_element),
        )
        .route("/editor/sessions/{session_id}/elements/{element_id}/position", post(editor::move_element))
        .route("/editor/sessions/{session_id}/elements/{element_id}/resize", post(editor::resize_element))
        .route("/editor/sessions/{session_id}/objects/{object_id}", get(editor::get_object))
        .layer(from_fn(require_admin))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(reader_routes)
        .merge(admin_routes)
        .with_state(state)
}
