//! Integration tests for the API and browser runners using wiremock HTTP
//! mocks.

use std::sync::Arc;

use aivo_core::{PricingTable, RunnerConfig};
use aivo_runners::{Runner, RunnerContext, RunnerRegistry};
use wiremock::matchers::{body_partial_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context() -> RunnerContext {
    RunnerContext {
        pricing: Arc::new(PricingTable::builtin()),
        request_timeout_secs: 10,
    }
}

fn api_config(api_url: &str) -> RunnerConfig {
    serde_json::from_value(serde_json::json!({
        "name": "openai-main",
        "plugin": "api",
        "options": {
            "provider": "openai",
            "model": "gpt-4o",
            "api_key": "test-key",
            "api_url": api_url,
        },
    }))
    .unwrap()
}

fn browser_config(bridge_url: &str) -> RunnerConfig {
    serde_json::from_value(serde_json::json!({
        "name": "perplexity-web",
        "plugin": "browser",
        "options": {
            "provider": "perplexity",
            "bridge_url": bridge_url,
            "cost_per_query_usd": 0.02,
        },
    }))
    .unwrap()
}

#[tokio::test]
async fn api_runner_parses_openai_response_and_prices_it() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "choices": [
            { "message": { "role": "assistant", "content": "1. HubSpot\n2. Salesforce" } }
        ],
        "usage": { "prompt_tokens": 1000, "completion_tokens": 2000 }
    });

    Mock::given(method("POST"))
        .and(body_partial_json(serde_json::json!({ "model": "gpt-4o" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let registry = RunnerRegistry::with_builtins();
    let runner = registry
        .create(&api_config(&server.uri()), &context())
        .expect("runner should build");

    let result = runner.run_intent("best CRM tools").await.expect("success");
    assert_eq!(result.provider, "openai");
    assert_eq!(result.answer_text, "1. HubSpot\n2. Salesforce");
    assert_eq!(result.tokens_in, 1000);
    assert_eq!(result.tokens_out, 2000);
    // gpt-4o builtin pricing: 1k in × 0.0025 + 2k out × 0.01
    assert!((result.cost_usd - 0.0225).abs() < 1e-9);
    assert!(result.screenshot_path.is_none());
}

#[tokio::test]
async fn api_runner_maps_unauthorized_to_permanent_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let registry = RunnerRegistry::with_builtins();
    let runner = registry
        .create(&api_config(&server.uri()), &context())
        .unwrap();

    let err = runner.run_intent("best CRM tools").await.unwrap_err();
    assert!(!err.is_transient(), "auth failures must not be retried");
}

#[tokio::test]
async fn api_runner_maps_429_to_transient_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let registry = RunnerRegistry::with_builtins();
    let runner = registry
        .create(&api_config(&server.uri()), &context())
        .unwrap();

    let err = runner.run_intent("best CRM tools").await.unwrap_err();
    assert!(err.is_transient(), "rate limits should be retried");
}

#[tokio::test]
async fn api_runner_sends_bearer_auth() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "choices": [ { "message": { "content": "ok" } } ],
        "usage": { "prompt_tokens": 1, "completion_tokens": 1 }
    });

    Mock::given(method("POST"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let registry = RunnerRegistry::with_builtins();
    let runner = registry
        .create(&api_config(&server.uri()), &context())
        .unwrap();
    runner.run_intent("hello").await.expect("success");
}

#[tokio::test]
async fn browser_runner_returns_artifacts_and_flat_cost() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "answer_text": "HubSpot is the most recommended option.",
        "screenshot_path": "/tmp/shots/run-1.png",
        "session_id": "sess-42"
    });

    Mock::given(method("POST"))
        .and(path("/v1/run"))
        .and(body_partial_json(
            serde_json::json!({ "provider": "perplexity" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let registry = RunnerRegistry::with_builtins();
    let runner = registry
        .create(&browser_config(&server.uri()), &context())
        .unwrap();

    let result = runner.run_intent("best CRM tools").await.expect("success");
    assert_eq!(result.provider, "perplexity");
    assert_eq!(result.model, "web");
    assert_eq!(result.screenshot_path.as_deref(), Some("/tmp/shots/run-1.png"));
    assert_eq!(result.session_id.as_deref(), Some("sess-42"));
    assert!((result.cost_usd - 0.02).abs() < 1e-9);
    assert_eq!(result.tokens_in, 0);
}

#[tokio::test]
async fn browser_runner_rejects_empty_answer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/run"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "answer_text": "   " })),
        )
        .mount(&server)
        .await;

    let registry = RunnerRegistry::with_builtins();
    let runner = registry
        .create(&browser_config(&server.uri()), &context())
        .unwrap();

    let err = runner.run_intent("best CRM tools").await.unwrap_err();
    assert!(!err.is_transient());
}
