mod handlers;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::workspace::Workspace;

pub fn create_router(workspace: Workspace) -> Router {
    let api = Router::new()
        // Outline
        .route("/nodes", get(handlers::list_nodes).post(handlers::create_node))
        .route(
            "/nodes/{id}",
            get(handlers::get_node).delete(handlers::delete_node),
        )
        .route("/nodes/{id}/name", put(handlers::rename_node))
        .route("/nodes/{id}/content", put(handlers::update_content))
        .route("/nodes/{id}/metadata", patch(handlers::update_metadata))
        .route("/nodes/{id}/progress", get(handlers::get_progress))
        .route("/nodes/{id}/document", get(handlers::download_document))
        .route("/reorder", post(handlers::reorder))
        // Snapshots
        .route("/export", get(handlers::export))
        .route("/import", post(handlers::import))
        .route("/snapshot", delete(handlers::clear))
        // Health
        .route("/health", get(handlers::health));

    Router::new().nest("/api/v1", api).with_state(workspace).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}
