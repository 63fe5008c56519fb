//! HTTP Server & Routing Integration Tests
//!
//! Drives the router with `oneshot` against stub services.

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use helpers::{outcome_failed, outcome_ok, services, test_state, StubCompletion, StubSearch, StubSpeech};
use http_body_util::BodyExt;
use intel_synth::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn queries_json(queries: &[&str]) -> String {
    let entries: Vec<Value> = queries
        .iter()
        .map(|q| json!({"query": q, "intent": format!("track {}", q)}))
        .collect();
    json!({ "queries": entries }).to_string()
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    read(response).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    read(response).await
}

async fn read(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn search_results() -> Value {
    serde_json::to_value(vec![
        outcome_ok("tool X pricing", "Tool X raised prices."),
        outcome_failed("company Y launch"),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_health_reports_credentials() {
    let state = test_state(services(Some(StubCompletion::empty()), None, None));
    let (status, body) = get(build_router(state), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["module"], "intel-synth");
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["credentials"]["completion"], true);
    assert_eq!(body["credentials"]["search"], false);
    assert_eq!(body["credentials"]["speech"], false);
    assert!(body["gitHash"].is_string());
    assert!(body.get("lastError").is_none());
}

#[tokio::test]
async fn test_pipeline_run_returns_full_payload() {
    let completion = StubCompletion::replying(&queries_json(&["a", "b", "c"]));
    let search = StubSearch::echo();
    let state = test_state(services(Some(completion), Some(search), None));

    let (status, body) = post_json(
        build_router(state),
        "/pipeline/run",
        json!({"transcript": "we discussed a, b and c", "queryCount": 3, "searchTimeframe": "month"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["runId"].is_string());
    assert_eq!(body["usedFallback"], false);
    assert!(body.get("fallbackReason").is_none());
    assert_eq!(body["extractedQueries"].as_array().unwrap().len(), 3);
    assert_eq!(body["extractedQueries"][0]["query"], "a");
    assert_eq!(body["searchResults"].as_array().unwrap().len(), 3);
    assert_eq!(body["reportData"]["successfulSearches"], 3);
    assert_eq!(body["reportData"]["totalSearches"], 3);
    assert_eq!(body["reportData"]["successRatio"], 1.0);
    assert!(body["reportData"]["combinedResults"]
        .as_str()
        .unwrap()
        .contains("QUERY: a"));
    assert_eq!(body["settings"]["searchTimeframe"], "month");
    assert_eq!(body["settings"]["searchContext"], "medium");
    assert_eq!(body["settings"]["reportStyle"], "executive");
    assert_eq!(body["usage"]["totalTokens"], 600);
    assert!(body["performance"]["totalDurationMs"].is_u64());
}

#[tokio::test]
async fn test_pipeline_run_reports_fallback_reason() {
    let completion = StubCompletion::replying("No structured output today.");
    let state = test_state(services(Some(completion), Some(StubSearch::echo()), None));

    let (status, body) = post_json(
        build_router(state),
        "/pipeline/run",
        json!({"transcript": "pricing news for tool X"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["usedFallback"], true);
    assert_eq!(body["fallbackReason"], "no JSON object in model output");
    assert_eq!(body["extractedQueries"][0]["query"], "pricing news for tool X");
}

#[tokio::test]
async fn test_pipeline_run_without_credentials_is_503() {
    let state = test_state(services(None, None, None));
    let app = build_router(state.clone());

    let (status, body) = post_json(app, "/pipeline/run", json!({"transcript": "hello"})).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "CONFIGURATION_ERROR");

    let (_, health) = get(build_router(state), "/health").await;
    assert!(health["lastError"].as_str().unwrap().contains("API key not configured"));
}

#[tokio::test]
async fn test_pipeline_run_missing_transcript_is_400() {
    let completion = StubCompletion::replying(&queries_json(&["a"]));
    let search = StubSearch::echo();
    let state = test_state(services(Some(completion.clone()), Some(search.clone()), None));

    let (status, body) = post_json(build_router(state), "/pipeline/run", json!({"queryCount": 2})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert_eq!(completion.calls(), 0);
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn test_pipeline_run_extraction_failure_is_502() {
    let completion = StubCompletion::failing(intel_synth::clients::ClientError::Transport(
        "connection reset".into(),
    ));
    let state = test_state(services(Some(completion), Some(StubSearch::echo()), None));

    let (status, body) =
        post_json(build_router(state), "/pipeline/run", json!({"transcript": "hello"})).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_FAILURE");
}

#[tokio::test]
async fn test_malformed_body_is_400() {
    let state = test_state(services(Some(StubCompletion::empty()), Some(StubSearch::echo()), None));
    let response = build_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pipeline/format/brief")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = read(response).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_format_brief() {
    let completion = StubCompletion::replying("## Key Developments\n- Tool X raised prices.");
    let state = test_state(services(Some(completion), None, None));

    let (status, body) = post_json(
        build_router(state),
        "/pipeline/format/brief",
        json!({"searchResults": search_results(), "reportStyle": "technical"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["brief"]["content"].as_str().unwrap().contains("Tool X"));
    assert_eq!(body["performance"]["successfulSearches"], 1);
    assert_eq!(body["performance"]["totalSearches"], 2);
    assert_eq!(body["usage"]["totalTokens"], 150);
}

#[tokio::test]
async fn test_format_email_has_subject() {
    let completion = StubCompletion::replying("Hi Sam,\nTool X raised prices.");
    let state = test_state(services(Some(completion), None, None));

    let (status, body) = post_json(
        build_router(state),
        "/pipeline/format/email",
        json!({"searchResults": search_results(), "recipient": "Sam"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["email"]["content"].as_str().unwrap().starts_with("Subject:"));
}

#[tokio::test]
async fn test_format_report_placeholder() {
    let state = test_state(services(Some(StubCompletion::empty()), None, None));

    let (status, body) = post_json(
        build_router(state),
        "/pipeline/format/report",
        json!({"searchResults": search_results()}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["placeholder"], true);
    assert_eq!(
        body["report"]["content"],
        "[No content returned by the completion service]"
    );
}

#[tokio::test]
async fn test_format_without_completion_credential_is_503() {
    let state = test_state(services(None, None, None));

    let (status, body) = post_json(
        build_router(state),
        "/pipeline/format/brief",
        json!({"searchResults": search_results()}),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "CONFIGURATION_ERROR");
}

#[tokio::test]
async fn test_format_podcast() {
    let completion = StubCompletion::replying("Analyst: Tool X raised prices.\nCommentator: Indeed.");
    let speech = StubSpeech::speaking("");
    let state = test_state(services(Some(completion), None, Some(speech.clone())));

    let (status, body) = post_json(
        build_router(state),
        "/pipeline/format/podcast",
        json!({
            "searchResults": search_results(),
            "wordCount": 400,
            "hostRoles": ["Ana", "Cole"],
            "styleTags": ["calm"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let podcast = &body["podcast"];
    assert_eq!(podcast["audioFormat"], "mp3");
    assert_eq!(podcast["audio"], "SUQzZmFrZS1hdWRpbw==");
    assert_eq!(podcast["transcript"], podcast["script"]);
    assert!(podcast["wordCount"].as_u64().unwrap() > 0);

    let request = &speech.requests()[0];
    assert_eq!(request.roles, vec!["Ana", "Cole"]);
    assert_eq!(request.word_count, 400);
}

#[tokio::test]
async fn test_format_podcast_empty_input_is_400() {
    let completion = StubCompletion::replying("Analyst: hi");
    let speech = StubSpeech::speaking("");
    let state = test_state(services(Some(completion.clone()), None, Some(speech.clone())));

    let (status, body) = post_json(
        build_router(state),
        "/pipeline/format/podcast",
        json!({"searchResults": [serde_json::to_value(outcome_failed("a")).unwrap()]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "EMPTY_INPUT");
    assert_eq!(completion.calls(), 0);
    assert_eq!(speech.calls(), 0);
}
