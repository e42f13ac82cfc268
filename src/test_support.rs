// Test helpers: throwaway model endpoints bound to 127.0.0.1:0

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

/// Ollama-style `/api/chat`. Rejects requests that ask for streaming or the wrong temperature.
pub async fn local_chat_stub(content: &str) -> String {
    let content = content.to_string();
    let router = Router::new().route(
        "/api/chat",
        post(move |Json(body): Json<Value>| {
            let content = content.clone();
            async move {
                if body["stream"] != json!(false) || body["options"]["temperature"] != json!(0.3) {
                    return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad request"})));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "model": body["model"],
                        "message": {"role": "assistant", "content": content},
                        "done": true
                    })),
                )
            }
        }),
    );
    serve(router).await
}

/// `/v1/chat/completions`. Rejects requests that do not ask for a JSON object.
pub async fn openai_stub(content: &str) -> String {
    let content = content.to_string();
    let router = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| {
            let content = content.clone();
            async move {
                if body["response_format"]["type"] != json!("json_object") {
                    return (StatusCode::BAD_REQUEST, Json(json!({"error": "bad request"})));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
                    })),
                )
            }
        }),
    );
    serve(router).await
}

/// `/api/chat` that answers after `delay`. The counter reports finished replies.
pub async fn slow_local_chat_stub(content: &str, delay: Duration) -> (String, Arc<AtomicUsize>) {
    let content = content.to_string();
    let answered = Arc::new(AtomicUsize::new(0));
    let counter = answered.clone();
    let router = Router::new().route(
        "/api/chat",
        post(move || {
            let content = content.clone();
            let counter = counter.clone();
            async move {
                tokio::time::sleep(delay).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Json(json!({
                    "message": {"role": "assistant", "content": content},
                    "done": true
                }))
            }
        }),
    );
    (serve(router).await, answered)
}

pub async fn status_stub(status: u16, body: &str) -> String {
    let body = body.to_string();
    let status = StatusCode::from_u16(status).expect("valid status");
    let handler = move || {
        let body = body.clone();
        async move { (status, body) }
    };
    let router = Router::new()
        .route("/api/chat", post(handler.clone()))
        .route("/v1/chat/completions", post(handler));
    serve(router).await
}

/// Base URL of a port that was just released, so connections are refused.
pub async fn refused_base() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind scratch listener");
    let addr = listener.local_addr().expect("scratch address");
    drop(listener);
    format!("http://{}", addr)
}
