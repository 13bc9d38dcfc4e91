use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use quarry_core::{AnalyzeError, AnalyzeRequest, AnalyzeResponse};
use quarry_github::FetchError;
use quarry_llm::LlmProvider;

use super::server::AppState;

#[derive(Serialize)]
struct OkBody {
    ok: bool,
    #[serde(flatten)]
    payload: AnalyzeResponse,
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

pub(crate) async fn analyze_handler<P: LlmProvider + 'static>(
    State(state): State<AppState<P>>,
    request: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(json) => json,
        Err(rejection) => {
            return error_response(&AnalyzeError::Validation(rejection.body_text()));
        }
    };

    match tokio::time::timeout(state.request_timeout, state.analyzer.analyze(request)).await {
        Ok(Ok(payload)) => Json(OkBody { ok: true, payload }).into_response(),
        Ok(Err(err)) => error_response(&err),
        // Deadline expired: the in-flight pipeline future is dropped and any
        // partial progress discarded.
        Err(_) => error_response(&AnalyzeError::Timeout),
    }
}

pub(crate) async fn health_handler<P: LlmProvider + 'static>(
    State(state): State<AppState<P>>,
) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

fn error_response(err: &AnalyzeError) -> Response {
    if let AnalyzeError::Internal(detail) = err {
        tracing::error!("analyze failed internally: {detail}");
    }
    (
        status_for(err),
        Json(ErrorBody {
            ok: false,
            error: err.to_string(),
        }),
    )
        .into_response()
}

fn status_for(err: &AnalyzeError) -> StatusCode {
    match err {
        AnalyzeError::Validation(_)
        | AnalyzeError::Fetch(FetchError::NotFound | FetchError::AccessDenied) => {
            StatusCode::BAD_REQUEST
        }
        AnalyzeError::Fetch(_) | AnalyzeError::Embedding(_) => StatusCode::BAD_GATEWAY,
        AnalyzeError::Timeout => StatusCode::REQUEST_TIMEOUT,
        AnalyzeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
