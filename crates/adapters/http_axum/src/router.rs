//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use plughub_app::ports::{ConfigStore, RemoteStateClient};

use crate::auth::require_api_key;
use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests API routes under `/api`, behind the API key gate when one is
/// configured; `/health` stays open. Includes a [`TraceLayer`] that logs each
/// HTTP request/response at the `DEBUG` level using the `tracing` ecosystem.
pub fn build<C, R>(state: AppState<C, R>) -> Router
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    let mut api = crate::api::routes::<C, R>();
    if let Some(gate) = state.auth.clone() {
        api = api.route_layer(axum::middleware::from_fn_with_state(gate, require_api_key));
    }

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use plughub_app::rule_scheduler::{RuleScheduler, SchedulerConfig};
    use plughub_app::services::GatewayService;
    use plughub_app::state_cache::{CacheConfig, StateCache};
    use plughub_domain::device::Device;
    use plughub_domain::error::{PlugHubError, RemoteError};
    use plughub_domain::rule::Rule;
    use plughub_domain::state::{DeviceState, StateSnapshot};
    use serde_json::{Value, json};
    use std::future::Future;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    #[derive(Default)]
    struct InMemoryStore {
        devices: Mutex<Vec<Device>>,
        rules: Mutex<Vec<Rule>>,
    }

    impl ConfigStore for InMemoryStore {
        fn get_devices(&self) -> impl Future<Output = Result<Vec<Device>, PlugHubError>> + Send {
            let devices = self.devices.lock().unwrap().clone();
            async move { Ok(devices) }
        }

        fn set_devices(
            &self,
            devices: Vec<Device>,
        ) -> impl Future<Output = Result<(), PlugHubError>> + Send {
            *self.devices.lock().unwrap() = devices;
            async { Ok(()) }
        }

        fn get_rules(&self) -> impl Future<Output = Result<Vec<Rule>, PlugHubError>> + Send {
            let rules = self.rules.lock().unwrap().clone();
            async move { Ok(rules) }
        }

        fn set_rules(
            &self,
            rules: Vec<Rule>,
        ) -> impl Future<Output = Result<(), PlugHubError>> + Send {
            *self.rules.lock().unwrap() = rules;
            async { Ok(()) }
        }
    }

    struct StubRemote {
        state: Mutex<StateSnapshot>,
        accept_writes: bool,
    }

    impl RemoteStateClient for StubRemote {
        fn get_state(&self) -> impl Future<Output = Result<String, RemoteError>> + Send {
            let json = serde_json::to_string(&*self.state.lock().unwrap()).unwrap();
            async move { Ok(json) }
        }

        fn set_state(
            &self,
            state_json: String,
        ) -> impl Future<Output = Result<bool, RemoteError>> + Send {
            if self.accept_writes {
                let target: StateSnapshot = serde_json::from_str(&state_json).unwrap();
                let mut state = self.state.lock().unwrap();
                for (id, value) in target.iter() {
                    state.insert(id.clone(), value);
                }
            }
            let accepted = self.accept_writes;
            async move { Ok(accepted) }
        }
    }

    type TestState = AppState<Arc<InMemoryStore>, Arc<StubRemote>>;

    async fn test_state(accept_writes: bool) -> TestState {
        let store = Arc::new(InMemoryStore::default());
        *store.devices.lock().unwrap() = vec![Device::new("d1", "Lamp", "outlet")];
        let remote = Arc::new(StubRemote {
            state: Mutex::new(StateSnapshot::new().with("d1", DeviceState::OFF)),
            accept_writes,
        });
        let cache = Arc::new(StateCache::new(remote, CacheConfig::default()));
        cache.refresh().await;
        let scheduler = Arc::new(
            RuleScheduler::load(Arc::clone(&store), Arc::clone(&cache), SchedulerConfig::default())
                .await
                .unwrap(),
        );
        AppState::new(Arc::new(GatewayService::new(store, cache, scheduler)))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn should_return_ok_when_health_check_called() {
        let app = build(test_state(true).await);

        let (status, body) = send(app, get("/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn should_return_snapshot_and_refresh_status() {
        let app = build(test_state(true).await);

        let (status, body) = send_json(app, get("/api/state")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], json!({"d1": 0}));
        assert_eq!(body["status"]["ok"], json!(true));
        assert_eq!(body["status"]["message"], json!("OK"));
    }

    #[tokio::test]
    async fn should_apply_state_and_reply_ok() {
        let state = test_state(true).await;

        let (status, body) = send(
            build(state.clone()),
            post("/api/state", &json!({"state": {"d1": 1}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");

        let (_, body) = send_json(build(state), get("/api/state")).await;
        assert_eq!(body["state"], json!({"d1": 1}));
    }

    #[tokio::test]
    async fn should_return_bad_request_when_device_is_unknown() {
        let app = build(test_state(true).await);

        let (status, body) =
            send_json(app, post("/api/state", &json!({"state": {"ghost": 1}}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("unknown target device ghost"));
    }

    #[tokio::test]
    async fn should_return_bad_gateway_when_remote_refuses() {
        let app = build(test_state(false).await);

        let (status, body) = send_json(app, post("/api/state", &json!({"state": {"d1": 1}}))).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().starts_with("remote rejected"));
    }

    #[tokio::test]
    async fn should_normalize_rule_times_to_utc() {
        let state = test_state(true).await;
        let rules = json!({"rules": [{
            "name": "evening",
            "targetState": {"d1": 1},
            "triggerTime": "2030-01-01T18:00:00+02:00",
            "repeatSecs": 86400
        }]});

        let (status, _) = send(build(state.clone()), post("/api/rules", &rules)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send_json(build(state), get("/api/rules")).await;
        let rule = &body["rules"][0];
        assert_eq!(rule["triggerTime"], json!("2030-01-01T16:00:00Z"));
        assert_eq!(rule["repeatSecs"], json!(86400));
        assert_eq!(rule["enabled"], json!(true));
    }

    #[tokio::test]
    async fn should_return_bad_request_when_repeat_is_too_short() {
        let app = build(test_state(true).await);
        let rules = json!({"rules": [{
            "name": "spam",
            "targetState": {"d1": 1},
            "triggerTime": "2030-01-01T18:00:00Z",
            "repeatSecs": 60
        }]});

        let (status, _) = send(app, post("/api/rules", &rules)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_return_bad_request_when_repeat_is_too_long() {
        let state = test_state(true).await;
        let rules = json!({"rules": [{
            "name": "forever",
            "targetState": {"d1": 1},
            "triggerTime": "2030-01-01T18:00:00Z",
            "repeatSecs": 10_000_000_000_000_u64
        }]});

        let (status, body) = send_json(build(state.clone()), post("/api/rules", &rules)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("above the maximum"));
        let (_, body) = send_json(build(state), get("/api/rules")).await;
        assert_eq!(body["rules"], json!([]));
    }

    #[tokio::test]
    async fn should_aggregate_status() {
        let app = build(test_state(true).await);

        let (status, body) = send_json(app, get("/api/status")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], json!({"d1": 0}));
        assert_eq!(body["updateOk"], json!(true));
        assert_eq!(body["updateStatus"], json!("OK"));
        assert!(body["updateTime"].as_i64().unwrap() > 0);
        assert_eq!(body["rules"], json!([]));
        assert_eq!(
            body["devices"],
            json!([{"id": "d1", "name": "Lamp", "type": "outlet"}])
        );
    }

    #[tokio::test]
    async fn should_list_devices() {
        let app = build(test_state(true).await);

        let (status, body) = send_json(app, get("/api/devices")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], json!("d1"));
    }

    #[tokio::test]
    async fn should_require_api_key_on_api_routes_when_configured() {
        let state = test_state(true).await.with_api_key("secret");

        let (status, _) = send(build(state.clone()), get("/api/state")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(build(state.clone()), get("/health")).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::builder()
            .uri("/api/state")
            .header("x-api-key", "wrong")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(build(state.clone()), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/state")
            .header("x-api-key", "secret")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(build(state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);

        let request = Request::builder()
            .uri("/api/state")
            .header("authorization", "Bearer secret")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(build(state), request).await;
        assert_eq!(status, StatusCode::OK);
    }
}
