//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/` and require an API key, except
//! `/health`. Middleware: CORS, tracing.

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Game plugin
        .route("/game/command", post(handlers::game::run_command))
        .route("/game/complete", get(handlers::game::complete))
        .route("/game/{uuid}/quit", post(handlers::game::player_quit))
        .route(
            "/game/{uuid}/placeholder/{identifier}",
            get(handlers::game::placeholder),
        )
        // Chat bot
        .route("/chat/command", post(handlers::chat::run_command))
        // Identities
        .route(
            "/identities/{platform}/{id}",
            get(handlers::identity::get_identity),
        )
        .route(
            "/identities/{platform}/{id}/link",
            put(handlers::identity::link_identity),
        )
        // Records
        .route(
            "/identities/{platform}/{id}/pronouns",
            get(handlers::preference::get_pronouns)
                .put(handlers::preference::set_pronouns)
                .delete(handlers::preference::clear_pronouns),
        )
        .route(
            "/identities/{platform}/{id}/pronouns/history",
            get(handlers::preference::get_history),
        )
        // Predefined sets
        .route("/sets", get(handlers::sets::list_sets));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint (no auth required).
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
