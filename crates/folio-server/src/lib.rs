pub mod config;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use folio_api::state::{AppState, AppStateInner};
use folio_db::Database;
use folio_editor::EditorSessions;
use folio_gateway::connection;
use folio_gateway::dispatcher::Dispatcher;

use crate::config::Config;

/// Shared state for a configured server around an opened store.
pub fn state(config: &Config, db: Database) -> AppState {
    Arc::new(AppStateInner {
        db: Arc::new(db),
        jwt_secret: config.jwt_secret.clone(),
        dispatcher: Dispatcher::new(),
        editors: EditorSessions::new(),
        admins: config.admins.clone(),
        max_image_bytes: config.max_image_bytes,
    })
}

/// REST routes plus the `/gateway` WebSocket.
pub fn app(state: AppState) -> Router {
    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(state.clone());

    Router::new()
        .merge(folio_api::router(state))
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        connection::handle_connection(
            socket,
            state.dispatcher.clone(),
            state.db.clone(),
            state.jwt_secret.clone(),
        )
    })
}
