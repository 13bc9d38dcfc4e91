use axum::Router;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;

use quarry_llm::LlmProvider;

use super::handlers::{analyze_handler, health_handler};
use super::server::AppState;

pub(crate) fn build_router<P: LlmProvider + 'static>(
    state: AppState<P>,
    max_body_size: usize,
) -> Router {
    let analyze: Router<AppState<P>> = Router::new()
        .route("/analyze", post(analyze_handler::<P>))
        .layer(RequestBodyLimitLayer::new(max_body_size));

    Router::new()
        .route("/health", get(health_handler::<P>))
        .merge(analyze)
        .with_state(state)
}
