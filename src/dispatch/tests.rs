use super::*;
use crate::config::IdentityProviderConfig;
use crate::dynamic::StaticDefaults;
use crate::store::StoreHandle;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mcp_for(server: &MockServer, max_retries: u32) -> McpConfig {
    McpConfig {
        endpoint: format!("{}/query", server.uri()),
        timeout_ms: 2_000,
        max_retries,
        retry_delay_ms: 0,
        ..McpConfig::default()
    }
}

fn client_with(mcp: McpConfig, breaker: CircuitBreakerConfig) -> DispatchClient {
    let defaults = StaticDefaults {
        mcp,
        ..StaticDefaults::default()
    };
    let settings = Arc::new(DynamicConfigManager::new(StoreHandle::memory(), defaults));
    DispatchClient::new(settings, Arc::new(CircuitBreaker::new(breaker)))
}

fn breaker_config(threshold: u32) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        enabled: true,
        failure_threshold: threshold,
        timeout_seconds: 60,
    }
}

fn answer(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"response": text, "confidence": 0.9}))
}

#[tokio::test]
async fn test_first_try_success_reports_zero_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"query": "opening hours?"})))
        .respond_with(answer("9 to 5"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with(mcp_for(&server, 3), breaker_config(5));
    let result = client
        .dispatch(&DispatchRequest::from_query("opening hours?"))
        .await;

    assert_eq!(result.status, DispatchStatus::Ok);
    assert_eq!(result.response, "9 to 5");
    assert_eq!(result.retry_count, 0);
    assert_eq!(result.confidence, Some(0.9));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_retry_budget_makes_n_plus_one_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let client = client_with(mcp_for(&server, 3), breaker_config(5));
    let result = client.dispatch(&DispatchRequest::from_query("q")).await;

    assert_eq!(result.status, DispatchStatus::Error);
    assert_eq!(result.retry_count, 3);
    assert_eq!(result.latency_ms, 0);
    assert_eq!(result.response, EXHAUSTED_MESSAGE);
    assert!(result.error.unwrap().contains("503"));
    assert_eq!(client.breaker().failure_count(), 1);
}

#[tokio::test]
async fn test_success_after_failures_counts_failed_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(answer("third time lucky"))
        .mount(&server)
        .await;

    let client = client_with(mcp_for(&server, 3), breaker_config(5));
    let result = client.dispatch(&DispatchRequest::from_query("q")).await;

    assert!(result.status.is_success());
    assert_eq!(result.retry_count, 2);
    assert_eq!(result.response, "third time lucky");
}

#[tokio::test]
async fn test_invalid_body_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_with(mcp_for(&server, 1), breaker_config(5));
    let result = client.dispatch(&DispatchRequest::from_query("q")).await;

    assert_eq!(result.status, DispatchStatus::Error);
    assert_eq!(result.retry_count, 1);
}

#[tokio::test]
async fn test_timeout_counts_as_failed_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(answer("late").set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&server)
        .await;

    let mcp = McpConfig {
        timeout_ms: 50,
        ..mcp_for(&server, 1)
    };
    let client = client_with(mcp, breaker_config(5));
    let result = client.dispatch(&DispatchRequest::from_query("q")).await;

    assert_eq!(result.status, DispatchStatus::Error);
    assert_eq!(result.retry_count, 1);
    assert!(result.error.unwrap().contains("timeout"));
}

#[tokio::test]
async fn test_slow_success_is_reported_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"query": "fast"})))
        .respond_with(answer("quick").set_delay(Duration::from_millis(20)))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"query": "slow"})))
        .respond_with(answer("eventually").set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let client = client_with(mcp_for(&server, 0), breaker_config(5))
        .with_degraded_threshold(Duration::from_millis(200));

    let fast = client.dispatch(&DispatchRequest::from_query("fast")).await;
    assert_eq!(fast.status, DispatchStatus::Ok);

    let slow = client.dispatch(&DispatchRequest::from_query("slow")).await;
    assert_eq!(slow.status, DispatchStatus::Degraded);
    assert_eq!(slow.response, "eventually");
    assert!(slow.latency_ms >= 300);
    assert!(slow.status.is_success());
}

#[tokio::test]
async fn test_retry_delay_counts_toward_degraded_latency() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(answer("second time"))
        .mount(&server)
        .await;

    let mcp = McpConfig {
        retry_delay_ms: 300,
        ..mcp_for(&server, 1)
    };
    let client = client_with(mcp, breaker_config(5))
        .with_degraded_threshold(Duration::from_millis(200));
    let result = client.dispatch(&DispatchRequest::from_query("q")).await;

    assert_eq!(result.status, DispatchStatus::Degraded);
    assert_eq!(result.retry_count, 1);
    assert!(result.latency_ms >= 300);
}

#[tokio::test]
async fn test_breaker_trips_after_threshold_dispatches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_with(mcp_for(&server, 0), breaker_config(3));
    for _ in 0..3 {
        let result = client.dispatch(&DispatchRequest::from_query("q")).await;
        assert_eq!(result.status, DispatchStatus::Error);
    }
    assert!(client.breaker().is_open());

    // Short-circuits without contacting the server; `.expect(3)` verifies on drop
    let rejected = client.dispatch(&DispatchRequest::from_query("q")).await;
    assert_eq!(rejected.status, DispatchStatus::Error);
    assert_eq!(rejected.retry_count, 0);
    assert_eq!(rejected.latency_ms, 0);
    assert_eq!(rejected.response, CIRCUIT_OPEN_MESSAGE);
}

#[tokio::test]
async fn test_call_after_cooldown_is_attempted_and_closes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(answer("back"))
        .mount(&server)
        .await;

    let breaker = CircuitBreakerConfig {
        enabled: true,
        failure_threshold: 1,
        timeout_seconds: 1,
    };
    let client = client_with(mcp_for(&server, 0), breaker);

    client.dispatch(&DispatchRequest::from_query("q")).await;
    assert!(client.breaker().is_open());

    let early = client.dispatch(&DispatchRequest::from_query("q")).await;
    assert_eq!(early.response, CIRCUIT_OPEN_MESSAGE);

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let result = client.dispatch(&DispatchRequest::from_query("q")).await;
    assert_eq!(result.status, DispatchStatus::Ok);
    assert!(!client.breaker().is_open());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_success_resets_breaker_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(body_partial_json(json!({"query": "good"})))
        .respond_with(answer("fine"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_with(mcp_for(&server, 0), breaker_config(3));
    for _ in 0..2 {
        client.dispatch(&DispatchRequest::from_query("bad")).await;
    }
    assert_eq!(client.breaker().failure_count(), 2);

    client.dispatch(&DispatchRequest::from_query("good")).await;
    assert_eq!(client.breaker().failure_count(), 0);

    for _ in 0..2 {
        client.dispatch(&DispatchRequest::from_query("bad")).await;
    }
    assert!(!client.breaker().is_open());
    client.dispatch(&DispatchRequest::from_query("bad")).await;
    assert!(client.breaker().is_open());
}

#[tokio::test]
async fn test_disabled_breaker_keeps_dispatching() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .expect(5)
        .mount(&server)
        .await;

    let breaker = CircuitBreakerConfig {
        enabled: false,
        failure_threshold: 1,
        timeout_seconds: 60,
    };
    let client = client_with(mcp_for(&server, 0), breaker);
    for _ in 0..5 {
        let result = client.dispatch(&DispatchRequest::from_query("q")).await;
        assert_eq!(result.response, EXHAUSTED_MESSAGE);
    }
}

#[tokio::test]
async fn test_auth_and_context_are_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("authorization", "Bearer t0ken"))
        .and(body_partial_json(json!({
            "query": "q",
            "context": {
                "channel": "email",
                "ai_service_key": "ai-key",
                "identity_provider": {"realm": "support"}
            }
        })))
        .respond_with(answer("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let mcp = McpConfig {
        auth_token: Some("t0ken".to_string()),
        ai_service_key: Some("ai-key".to_string()),
        identity_provider: Some(IdentityProviderConfig {
            realm: "support".to_string(),
            ..Default::default()
        }),
        ..mcp_for(&server, 0)
    };
    let client = client_with(mcp, breaker_config(5));

    let mut context = Map::new();
    context.insert("channel".to_string(), json!("email"));
    let result = client.dispatch(&DispatchRequest::new("q", context)).await;
    assert_eq!(result.status, DispatchStatus::Ok);
}

#[test]
fn test_caller_context_wins_over_configured_credentials() {
    let mcp = McpConfig {
        ai_service_key: Some("configured".to_string()),
        ..McpConfig::default()
    };
    let mut request_context = Map::new();
    request_context.insert("ai_service_key".to_string(), json!("caller"));

    let merged = outbound_context(&request_context, &mcp);
    assert_eq!(merged["ai_service_key"], json!("caller"));
    assert!(!merged.contains_key("identity_provider"));
}

#[tokio::test]
async fn test_live_config_change_applies_to_next_dispatch() {
    let old = MockServer::start().await;
    let new = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(answer("old"))
        .mount(&old)
        .await;
    Mock::given(method("POST"))
        .respond_with(answer("new"))
        .mount(&new)
        .await;

    let store = StoreHandle::memory();
    let settings = Arc::new(DynamicConfigManager::new(
        store.clone(),
        StaticDefaults {
            mcp: mcp_for(&old, 0),
            ..StaticDefaults::default()
        },
    ));
    let client = DispatchClient::new(
        settings.clone(),
        Arc::new(CircuitBreaker::new(breaker_config(5))),
    );

    let first = client.dispatch(&DispatchRequest::from_query("q")).await;
    assert_eq!(first.response, "old");

    settings
        .update_mcp_config(&mcp_for(&new, 0))
        .await
        .unwrap();
    let second = client.dispatch(&DispatchRequest::from_query("q")).await;
    assert_eq!(second.response, "new");
}

#[tokio::test]
async fn test_health_probe() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_with(mcp_for(&server, 0), breaker_config(1));
    assert!(client.health_probe().await);
    assert!(!client.breaker().is_open());
}

#[tokio::test]
async fn test_health_probe_unhealthy_does_not_trip_breaker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_with(mcp_for(&server, 0), breaker_config(1));
    assert!(!client.health_probe().await);
    assert_eq!(client.breaker().failure_count(), 0);
}

#[test]
fn test_health_endpoint_derivation() {
    assert_eq!(
        health_endpoint("http://answers:8081/query?x=1").as_deref(),
        Some("http://answers:8081/health")
    );
    assert_eq!(
        health_endpoint("https://answers.example/api/v2/query").as_deref(),
        Some("https://answers.example/health")
    );
    assert!(health_endpoint("not a url").is_none());
}
