// Real `GeminiClient` against a local mock of the Gemini REST surface.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::Path;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use futures_util::StreamExt;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use briefcast_backend::config::Config;
use briefcast_backend::lexicon::Lexicon;
use briefcast_backend::quote::fetch_quote;
use briefcast_backend::state::AppState;
use briefcast_backend::upstream::{GeminiClient, TextGenerator, UpstreamError};

const KEY: &str = "test-key";

fn envelope(text: &str) -> Value {
    json!({ "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }] })
}

async fn mock_gemini(Path(call): Path<String>, headers: HeaderMap) -> Response {
    if headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()) != Some(KEY) {
        return (StatusCode::FORBIDDEN, "API key not valid").into_response();
    }

    if call.ends_with(":streamGenerateContent") {
        let events = [
            format!("data: {}\n\n", envelope("든든한 보장,")),
            ": keep-alive\n\n".to_string(),
            "data: {broken\n\n".to_string(),
            format!("data: {}\n\n", envelope(" 오늘 시작하세요")),
        ];
        let chunks = futures_util::stream::iter(
            events
                .into_iter()
                .map(|e| Ok::<_, std::io::Error>(e.into_bytes())),
        )
        .then(|chunk| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            chunk
        });
        return Response::builder()
            .header("content-type", "text/event-stream")
            .body(Body::from_stream(chunks))
            .unwrap();
    }

    if call.ends_with(":generateContent") {
        let table = r#"{"product":"실손의료비보험","company":"한빛손해보험","items":[{"name":"질병 입원","amount":"5,000만원","premium":"9,800원"}],"total":"9,800원"}"#;
        return axum::Json(envelope(table)).into_response();
    }

    StatusCode::NOT_FOUND.into_response()
}

/// Serve the mock on an ephemeral port and return its base URL.
async fn spawn_mock() -> String {
    let router = Router::new().route("/models/{call}", post(mock_gemini));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str, key: Option<&str>) -> GeminiClient {
    GeminiClient::new(
        reqwest::Client::new(),
        base_url,
        "gemini-test",
        key.map(str::to_string),
    )
    .with_request_timeout(Duration::from_secs(5))
}

fn app_for(generator: GeminiClient) -> Router {
    let generator: Arc<dyn TextGenerator> = Arc::new(generator);
    let config = Config {
        idle_timeout: Duration::from_secs(5),
        ..Config::default()
    };
    let state = AppState::with_generators(config, Lexicon::default(), generator.clone(), generator);
    briefcast_backend::create_router(state)
}

async fn stream_lines(router: Router) -> Vec<Value> {
    let request = Request::builder()
        .method("POST")
        .uri("/api/generate/full")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "target": "40대 아빠", "insuranceType": "실손보험" }).to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    std::str::from_utf8(&bytes)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn client_streams_raw_sse_bytes() {
    let base = spawn_mock().await;
    let mut stream = client(&base, Some(KEY)).stream_generate("p").await.unwrap();

    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk.unwrap());
    }
    let text = String::from_utf8(body).unwrap();
    assert_eq!(text.matches("data:").count(), 3);
    assert!(text.contains("오늘 시작하세요"));
}

#[tokio::test]
async fn client_reports_rejected_key_as_status() {
    let base = spawn_mock().await;
    let err = client(&base, Some("wrong")).stream_generate("p").await.err().unwrap();

    match err {
        UpstreamError::Status { status, body } => {
            assert_eq!(status, 403);
            assert!(body.contains("API key not valid"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn client_without_key_fails_before_any_request() {
    let err = client("http://127.0.0.1:1", None).generate("p").await.unwrap_err();
    assert!(matches!(err, UpstreamError::MissingCredential));
}

#[tokio::test]
async fn quote_round_trip_through_client() {
    let base = spawn_mock().await;
    let table = fetch_quote(&client(&base, Some(KEY)), "p").await.unwrap();

    assert_eq!(table.company, "한빛손해보험");
    assert_eq!(table.items[0].name, "질병 입원");
}

#[tokio::test]
async fn relay_end_to_end_skips_comments_and_malformed_lines() {
    let base = spawn_mock().await;
    let lines = stream_lines(app_for(client(&base, Some(KEY)))).await;

    let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["status", "status", "content", "content", "done"]);
    assert_eq!(lines[2]["data"], "든든한 보장,");
    assert_eq!(lines[3]["data"], " 오늘 시작하세요");
}

#[tokio::test]
async fn relay_with_unreachable_upstream_is_status_status_done() {
    let lines = stream_lines(app_for(client("http://127.0.0.1:1", Some(KEY)))).await;

    let types: Vec<&str> = lines.iter().map(|l| l["type"].as_str().unwrap()).collect();
    assert_eq!(types, ["status", "status", "done"]);
}
