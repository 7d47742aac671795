use super::router::AppState;
use crate::error::AppError;
use crate::relay::conversation::Message;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    messages: Vec<Message>,
}

/// `POST /api/chat`: raw text fragments streamed as they are produced.
pub async fn handle_chat(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let request: ChatRequest = serde_json::from_slice(&body)?;
    if request.messages.is_empty() {
        return Err(AppError::BadRequest("messages must be a non-empty array".into()));
    }

    log::info!("Chat request with {} messages", request.messages.len());
    let session = state.relay.open(request.messages).await?;
    let tokens_in = session.tokens_in();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("X-Tokens-In", tokens_in.to_string())
        // Headers are sent before the body; the final output count is logged instead.
        .header("X-Tokens-Out", "0")
        .body(Body::from_stream(session.spawn()))
        .map_err(|e| AppError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::super::router::create_router;
    use super::super::router::test_support::*;
    use crate::config::UpstreamConfig;
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn upstream(base_url: String) -> UpstreamConfig {
        UpstreamConfig {
            base_url,
            api_key: Some("sk-test".into()),
            model: "test-model".into(),
        }
    }

    #[tokio::test]
    async fn streams_fragments_with_token_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "data: {\"choices\":[{\"delta\":{\"content\":\"Olá\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"!\"}}]}\n\ndata: [DONE]\n\n",
                "text/event-stream",
            ))
            .mount(&server)
            .await;
        let app = create_router(state(upstream(server.uri())).await);

        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"messages": [{"role": "user", "content": "hello world"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], "text/event-stream");
        assert_eq!(resp.headers()["x-tokens-in"], "8");
        assert_eq!(resp.headers()["x-tokens-out"], "0");
        assert_eq!(body_bytes(resp).await, "Olá!".as_bytes());
    }

    #[tokio::test]
    async fn empty_messages_is_bad_request() {
        let app = create_router(state(upstream("http://127.0.0.1:9".into())).await);
        let resp = app
            .oneshot(json_request("POST", "/api/chat", json!({"messages": []})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_api_key_is_reported() {
        let app = create_router(state(UpstreamConfig::default()).await);
        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"messages": [{"role": "user", "content": "oi"}]}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"]["message"], "OPENAI_API_KEY não está configurada");
    }

    #[tokio::test]
    async fn upstream_rejection_keeps_its_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429).set_body_json(json!({"error": {"message": "Rate limit"}})),
            )
            .mount(&server)
            .await;
        let app = create_router(state(upstream(server.uri())).await);

        let resp = app
            .oneshot(json_request(
                "POST",
                "/api/chat",
                json!({"messages": [{"role": "user", "content": "oi"}]}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(resp).await;
        assert!(body["error"]["message"].as_str().unwrap().contains("Rate limit"));
    }
}
