use axum::response::IntoResponse;
use axum::{Json, Router, extract::State, routing::post};
use tracing::Instrument;

use mindsearch_stream::transport::ChannelTransport;

use crate::error::AppError;
use crate::sse::{frame_stream, sse_response};
use crate::state::AppState;
use crate::types::SolveRequest;

/// Frames buffered between the controller and a slow client.
const FRAME_BUFFER: usize = 32;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/solve", post(solve))
        .with_state(state)
}

/// Stream the agent's reasoning tree for one query as SSE frames.
///
/// Request errors are answered before the stream opens. Once it is open,
/// failures arrive as an error frame followed by `[DONE]`.
async fn solve(
    State(state): State<AppState>,
    Json(req): Json<SolveRequest>,
) -> Result<impl IntoResponse, AppError> {
    let input = req.agent_input()?;
    let agent = state.build_agent(&req.agent_cfg)?;
    let (mut transport, rx) = ChannelTransport::channel(FRAME_BUFFER);

    let controller = state.controller.clone();
    let span = tracing::info_span!("solve", agent = agent.name());
    tokio::spawn(
        async move {
            match controller.run(agent, input, &mut transport).await {
                Ok(report) => tracing::info!(
                    run_id = %report.run_id,
                    state = ?report.state,
                    snapshots = report.snapshots,
                    "solve finished"
                ),
                Err(err) => tracing::warn!(error = %err, "client went away before the run finished"),
            }
        }
        .instrument(span),
    );

    Ok(sse_response(frame_stream(rx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::ServerConfig;

    fn app() -> Router {
        let mut config = ServerConfig::default();
        config.demo_delay = std::time::Duration::ZERO;
        routes(AppState::new(&config))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/solve")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn solve_opens_event_stream() {
        let resp = app()
            .oneshot(post_json(r#"{"inputs": "what is rust?"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/event-stream"));
    }

    #[tokio::test]
    async fn empty_query_is_bad_request() {
        let resp = app().oneshot(post_json(r#"{"inputs": ""}"#)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_inputs_is_rejected() {
        let resp = app().oneshot(post_json(r#"{"agent_cfg": {}}"#)).await.unwrap();
        assert!(resp.status().is_client_error());
    }
}
