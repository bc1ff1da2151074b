//! HTTP API Server
//!
//! Starts and manages the axum-based HTTP server.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use cep_browser::RegionResolver;
use cep_core::{FileSink, LocalityStore};

use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<RegionResolver>,
    pub store: Option<Arc<Mutex<LocalityStore>>>,
    pub sink: Option<Arc<FileSink>>,
}

impl AppState {
    pub fn new(resolver: RegionResolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
            store: None,
            sink: None,
        }
    }

    pub fn with_store(mut self, store: LocalityStore) -> Self {
        self.store = Some(Arc::new(Mutex::new(store)));
        self
    }

    pub fn with_sink(mut self, sink: FileSink) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }
}

/// Build the application router with its middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP API server, serving until `shutdown` resolves
pub async fn start_server(
    port: u16,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("HTTP API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use cep_browser::fixture::{FixtureDriverFactory, FixtureSite, results_page};
    use cep_core::{FailurePolicy, Region, RegionResult, ScraperConfig};
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::handlers::FAILED_REGIONS_HEADER;

    fn site(name: &str, range: &str) -> FixtureSite {
        FixtureSite::new(vec![results_page(&[(name, range)], false, false)])
    }

    fn factory() -> FixtureDriverFactory {
        FixtureDriverFactory::new()
            .with_site(Region::AC, site("Xapuri", "69930-000 a 69931-999"))
            .with_site(Region::SP, site("Santos", "11000-001 a 11099-999"))
            .with_site(Region::RJ, site("Niterói", "24000-001 a 24399-999").failing("timed out"))
    }

    fn resolver(factory: FixtureDriverFactory) -> RegionResolver {
        let config = ScraperConfig {
            target_url: "http://fixture.local/buscaFaixaCep.cfm".into(),
            element_timeout_secs: 1,
            settle_delay_ms: 0,
            poll_interval_ms: 5,
            ..Default::default()
        };
        RegionResolver::new(Arc::new(factory), &config)
    }

    fn app() -> Router {
        build_router(AppState::new(resolver(factory())))
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = get(app(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"OK");
    }

    #[tokio::test]
    async fn test_invalid_region_is_not_found() {
        let response = get(app(), "/v1/localities/JI").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "invalid_region");
        assert_eq!(body["error"]["message"], "Invalid region: \"JI\"");
    }

    #[tokio::test]
    async fn test_too_many_regions_is_bad_request() {
        let factory = factory();
        let app = build_router(AppState::new(resolver(factory.clone())));

        let response = get(app, "/v1/localities/AC,AL,AP,AM,BA,CE").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "too_many_regions");
        assert_eq!(factory.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_batch_lookup_trims_and_keeps_order() {
        let response = get(app(), "/v1/localities/%20SP%20,%20AC").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(FAILED_REGIONS_HEADER).is_none());

        let body = body_json(response).await;
        let regions: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["region"].as_str().unwrap())
            .collect();
        assert_eq!(regions, ["SP", "AC"]);
        assert_eq!(body[0]["localities"][0]["locality_name"], "Santos");
        assert_eq!(body[1]["localities"][0]["cep_range"], "69930-000 a 69931-999");
    }

    #[tokio::test]
    async fn test_automation_failure_is_server_error() {
        let response = get(app(), "/v1/localities/AC,RJ").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["code"], "automation_failed");
    }

    #[tokio::test]
    async fn test_collect_errors_reports_failed_regions() {
        let resolver = resolver(factory()).with_policy(FailurePolicy::CollectErrors);
        let app = build_router(AppState::new(resolver));

        let response = get(app, "/v1/localities/AC,RJ,SP").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[FAILED_REGIONS_HEADER], "RJ");

        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[1]["region"], "SP");
    }

    #[tokio::test]
    async fn test_single_region_returns_flat_list() {
        let response = get(app(), "/v1/locality/AC").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(
            body,
            serde_json::json!([{ "locality_name": "Xapuri", "cep_range": "69930-000 a 69931-999" }])
        );

        let response = get(app(), "/v1/locality/XX").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stored_lookup_requires_store() {
        let response = get(app(), "/v1/stored/AC").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"]["code"], "store_disabled");
    }

    #[tokio::test]
    async fn test_stored_lookup() {
        let store = LocalityStore::in_memory().unwrap();
        store
            .save(&RegionResult::new(
                Region::AC,
                vec![cep_core::LocalityRecord::new("Xapuri", "69930-000 a 69931-999")],
            ))
            .unwrap();
        let app = build_router(AppState::new(resolver(factory())).with_store(store));

        let response = get(app.clone(), "/v1/stored/AC").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["localities"][0]["locality_name"], "Xapuri");

        let response = get(app.clone(), "/v1/stored/SP").await;
        assert_eq!(body_json(response).await, serde_json::json!([]));

        let response = get(app, "/v1/stored/JI").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_lookup_is_persisted_in_background() {
        let state = AppState::new(resolver(factory())).with_store(LocalityStore::in_memory().unwrap());
        let store = state.store.clone().unwrap();
        let app = build_router(state);

        let response = get(app, "/v1/localities/SP").await;
        assert_eq!(response.status(), StatusCode::OK);

        let mut stored = 0;
        for _ in 0..50 {
            stored = store.lock().unwrap().count().unwrap();
            if stored > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(stored, 1);
    }

    #[tokio::test]
    async fn test_lookup_writes_result_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("result.jsonl"), dir.path().join("result.json"));
        let app = build_router(AppState::new(resolver(factory())).with_sink(sink));

        let response = get(app, "/v1/localities/AC,SP").await;
        assert_eq!(response.status(), StatusCode::OK);

        let jsonl = std::fs::read_to_string(dir.path().join("result.jsonl")).unwrap();
        assert_eq!(jsonl.lines().count(), 2);

        let json: Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("result.json")).unwrap())
                .unwrap();
        assert_eq!(json[0]["region"], "AC");
    }
}
