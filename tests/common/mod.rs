use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::get};
use npm_advisory::api::{AppState, create_api_router};
use npm_advisory::config::Config;
use npm_advisory::importer::Importer;
use npm_advisory::registry::RegistryClient;
use npm_advisory::store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa_rapidoc::RapiDoc;

type ManifestMap = Arc<Mutex<HashMap<String, serde_json::Value>>>;

#[derive(Clone)]
struct MockRegistryState {
    hits: Arc<AtomicUsize>,
    manifests: ManifestMap,
}

/// A fake NPM registry on an ephemeral local port, counting every request.
pub struct MockRegistry {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    manifests: ManifestMap,
}

impl MockRegistry {
    pub async fn start() -> Self {
        let state = MockRegistryState {
            hits: Arc::new(AtomicUsize::new(0)),
            manifests: Arc::new(Mutex::new(HashMap::new())),
        };

        let app = Router::new()
            .route("/{*name}", get(serve_manifest))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            hits: state.hits,
            manifests: state.manifests,
        }
    }

    pub fn add_manifest(&self, name: &str, manifest: serde_json::Value) {
        self.manifests
            .lock()
            .unwrap()
            .insert(name.to_string(), manifest);
    }

    /// Number of manifest requests served so far (including 404s).
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve_manifest(
    State(state): State<MockRegistryState>,
    Path(name): Path<String>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    match state.manifests.lock().unwrap().get(&name) {
        Some(manifest) => Json(manifest.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub registry: MockRegistry,
    pub store: Store,
}

pub async fn setup_test_app() -> TestApp {
    let registry_server = MockRegistry::start().await;

    let store = Store::connect_in_memory().await.unwrap();
    store.migrate().await.unwrap();

    let mut config = Config::default();
    config.registry.base_url = registry_server.base_url.clone();

    let registry = RegistryClient::new(&config.registry).unwrap();
    let importer = Importer::new(store.clone(), registry);

    let state = Arc::new(AppState {
        importer,
        store: store.clone(),
    });

    // Build API routes
    let (api_router, api_doc) = create_api_router(state).split_for_parts();

    // Build documentation routes
    let doc_routes = Router::new()
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", api_doc).path("/api-docs"));

    let router = Router::new()
        .nest("/api", api_router)
        .merge(doc_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    TestApp {
        router,
        registry: registry_server,
        store,
    }
}

/// Manifest with two versions; 2.0.0 is tagged latest and has keywords.
pub fn sample_manifest(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "versions": {
            "1.0.0": {
                "version": "1.0.0",
                "description": "first release",
                "license": "MIT",
                "dependencies": { "a": "^1.0.0" },
                "devDependencies": { "b": "^2.0.0" }
            },
            "2.0.0": {
                "version": "2.0.0",
                "description": "second release",
                "license": "MIT",
                "dependencies": { "a": "^1.5.0", "c": "~3.0.0" },
                "keywords": ["padding", "string"]
            }
        },
        "dist-tags": { "latest": "2.0.0" },
        "time": {
            "created": "2020-01-01T00:00:00.000Z",
            "modified": "2021-06-01T00:00:00.000Z",
            "1.0.0": "2020-01-02T00:00:00.000Z",
            "2.0.0": "2021-06-01T00:00:00.000Z"
        },
        "readme": "# Sample\nDoes things."
    })
}
