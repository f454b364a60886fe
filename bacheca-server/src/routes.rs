use axum::{routing::get, Extension, Router};
use bacheca_core::protocol::{realtime::WEBSOCKET_PATH, rest::table_path};
use std::sync::Arc;

use crate::{controllers, health_with_pool, realtime, AppState, TABLE};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(|Extension(state): Extension<Arc<AppState>>| async move {
            health_with_pool(&state.pool).await
        }))
        .route(
            &table_path(TABLE),
            get(controllers::list_messages)
                .post(controllers::insert_messages)
                .patch(controllers::update_messages),
        )
        .route(WEBSOCKET_PATH, get(realtime::ws_handler))
        .layer(Extension(state))
}
