pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::ranking::handlers as ranking;
use crate::screening::handlers as screening;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Screening API
        .route(
            "/api/v1/candidates/:id/analysis",
            post(screening::handle_analyze).get(screening::handle_get_analysis),
        )
        .route(
            "/api/v1/jobs/:id/directives",
            put(screening::handle_update_directives),
        )
        // Ranking API
        .route(
            "/api/v1/jobs/:id/ranking",
            post(ranking::handle_rank_job).get(ranking::handle_get_ranking),
        )
        .with_state(state)
}
