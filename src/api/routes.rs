//! API route definitions.

use super::state::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/status/history", get(status_history))
        .route("/status/refresh", post(status_refresh))
}

fn envelope<T: Serialize>(data: T, meta: Value) -> Json<Value> {
    let mut meta = meta;
    if let Value::Object(map) = &mut meta {
        map.insert(
            "timestamp".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        map.insert(
            "version".to_string(),
            Value::String(env!("CARGO_PKG_VERSION").to_string()),
        );
    }
    Json(json!({ "data": data, "meta": meta }))
}

/// Liveness of the monitor itself, not the monitored API.
async fn health() -> Json<Value> {
    envelope(json!({ "status": "ok" }), json!({}))
}

async fn status(State(state): State<AppState>) -> Json<Value> {
    let data = state.service.get_status_data();
    envelope(data, json!({ "target": state.service.target() }))
}

async fn status_history(State(state): State<AppState>) -> Json<Value> {
    let history = state.service.history();
    let total = history.len();
    envelope(history, json!({ "total": total }))
}

/// Manual refresh: runs (or joins) one check, then returns the fresh snapshot.
async fn status_refresh(State(state): State<AppState>) -> Json<Value> {
    let outcome = state.service.check_api_health().await;
    tracing::info!(
        healthy = outcome.is_healthy(),
        response_time_ms = outcome.response_time_ms(),
        "manual health check"
    );
    envelope(
        state.service.get_status_data(),
        json!({ "target": state.service.target() }),
    )
}

#[cfg(test)]
mod tests {
    use crate::api::{router, state::AppState};
    use crate::config::MonitorConfig;
    use crate::probes::{HealthCheckOutcome, HealthProbe};
    use crate::status::StatusService;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct DownProbe;

    #[async_trait::async_trait]
    impl HealthProbe for DownProbe {
        async fn check(&self, _target: &str, timeout: Duration) -> HealthCheckOutcome {
            HealthCheckOutcome::unhealthy(
                chrono::Utc::now(),
                crate::probes::duration_millis(timeout),
                "connection failed: connection refused",
            )
        }
    }

    fn app() -> (axum::Router, Arc<StatusService>) {
        let service = Arc::new(
            StatusService::with_probe(&MonitorConfig::default(), Arc::new(DownProbe)).unwrap(),
        );
        let app = router(AppState {
            service: Arc::clone(&service),
        });
        (app, service)
    }

    async fn call(app: axum::Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health_route() {
        let (app, _) = app();
        let (status, body) = call(app, "GET", "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["meta"]["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_status_route_before_any_check() {
        let (app, _) = app();
        let (status, body) = call(app, "GET", "/api/v1/status").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["currentStatus"]["state"], "pending");
        assert_eq!(body["data"]["uptime"], 100.0);
        assert_eq!(body["meta"]["target"], "http://127.0.0.1:8888/api/health");
    }

    #[tokio::test]
    async fn test_refresh_records_and_reports() {
        let (app, service) = app();
        let (status, body) = call(app.clone(), "POST", "/api/v1/status/refresh").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["currentStatus"]["isHealthy"], false);
        assert_eq!(body["data"]["currentStatus"]["state"], "offline");
        assert_eq!(
            body["data"]["currentStatus"]["error"],
            "connection failed: connection refused"
        );
        assert_eq!(body["data"]["uptime"], 0.0);
        assert_eq!(service.history().len(), 1);

        let (_, body) = call(app, "GET", "/api/v1/status/history").await;
        assert_eq!(body["meta"]["total"], 1);
        assert_eq!(body["data"][0]["responseTimeMs"], 5_000);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (app, _) = app();
        let (status, _) = call(app, "GET", "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
