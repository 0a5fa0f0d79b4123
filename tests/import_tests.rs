use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::util::ServiceExt;

mod common;
use common::{sample_manifest, setup_test_app};

async fn get_json(
    app: &axum::Router,
    uri: &str,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn cache_miss_imports_from_registry() {
    let app = setup_test_app().await;
    app.registry.add_manifest("left-pad", sample_manifest("left-pad"));

    let (status, record) = get_json(&app.router, "/api/packages/left-pad").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.registry.hits(), 1);
    assert_eq!(record["name"], "left-pad");

    // One Version row per key in the manifest's versions map
    let versions = record["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);

    // Ordered by release date descending
    assert_eq!(versions[0]["version"], "2.0.0");
    assert_eq!(versions[1]["version"], "1.0.0");
}

#[tokio::test]
async fn cache_hit_performs_zero_upstream_requests() {
    let app = setup_test_app().await;
    app.registry.add_manifest("left-pad", sample_manifest("left-pad"));

    let (status, first) = get_json(&app.router, "/api/packages/left-pad").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.registry.hits(), 1);

    let (status, second) = get_json(&app.router, "/api/packages/left-pad").await;
    assert_eq!(status, StatusCode::OK);

    // No further upstream fetch, record returned verbatim
    assert_eq!(app.registry.hits(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn import_creates_exactly_one_package_row() {
    let app = setup_test_app().await;
    app.registry.add_manifest("left-pad", sample_manifest("left-pad"));

    let (status, _) = get_json(&app.router, "/api/packages/left-pad").await;
    assert_eq!(status, StatusCode::OK);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM packages WHERE name = ?")
        .bind("left-pad")
        .fetch_one(app.store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn dependency_flags_follow_their_source_field() {
    let app = setup_test_app().await;
    app.registry.add_manifest("left-pad", sample_manifest("left-pad"));

    let (_, record) = get_json(&app.router, "/api/packages/left-pad").await;

    // 1.0.0 is the older version (second in the list)
    let v1 = &record["versions"][1];
    let deps = v1["dependencies"].as_array().unwrap();
    assert_eq!(deps.len(), 2);

    let runtime = deps.iter().find(|d| d["name"] == "a").unwrap();
    assert_eq!(runtime["is_dev"], false);
    assert_eq!(runtime["version_range"], "^1.0.0");

    let dev = deps.iter().find(|d| d["name"] == "b").unwrap();
    assert_eq!(dev["is_dev"], true);
    assert_eq!(dev["version_range"], "^2.0.0");
}

#[tokio::test]
async fn readme_attaches_only_to_the_latest_version() {
    let app = setup_test_app().await;
    app.registry.add_manifest("left-pad", sample_manifest("left-pad"));

    let (_, record) = get_json(&app.router, "/api/packages/left-pad").await;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readmes")
        .fetch_one(app.store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    // dist-tags.latest is 2.0.0, first in the ordered list
    let latest = &record["versions"][0];
    assert_eq!(latest["version"], "2.0.0");
    assert_eq!(
        latest["readmes"][0]["content"],
        "# Sample\nDoes things."
    );
    assert!(record["versions"][1]["readmes"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn keywords_are_imported_per_version() {
    let app = setup_test_app().await;
    app.registry.add_manifest("left-pad", sample_manifest("left-pad"));

    let (_, record) = get_json(&app.router, "/api/packages/left-pad").await;

    let latest = &record["versions"][0];
    let keywords: Vec<&str> = latest["keywords"]
        .as_array()
        .unwrap()
        .iter()
        .map(|k| k["value"].as_str().unwrap())
        .collect();
    assert_eq!(keywords, vec!["padding", "string"]);

    assert!(record["versions"][1]["keywords"].as_array().unwrap().is_empty());
}

// The single-version scenario from the product requirements, end to end.
#[tokio::test]
async fn single_version_manifest_scenario() {
    let app = setup_test_app().await;
    app.registry.add_manifest(
        "tiny",
        serde_json::json!({
            "name": "tiny",
            "versions": {
                "1.0.0": {
                    "dependencies": { "a": "^1.0.0" },
                    "devDependencies": { "b": "^2.0.0" }
                }
            },
            "dist-tags": { "latest": "1.0.0" },
            "time": {
                "created": "2020-01-01T00:00:00.000Z",
                "modified": "2020-01-02T00:00:00.000Z",
                "1.0.0": "2020-01-02T00:00:00.000Z"
            },
            "readme": "# Hi"
        }),
    );

    let (status, record) = get_json(&app.router, "/api/packages/tiny").await;
    assert_eq!(status, StatusCode::OK);

    let versions = record["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 1);
    let version = &versions[0];
    assert_eq!(version["version"], "1.0.0");

    let deps = version["dependencies"].as_array().unwrap();
    assert_eq!(deps.len(), 2);
    let a = deps.iter().find(|d| d["name"] == "a").unwrap();
    let b = deps.iter().find(|d| d["name"] == "b").unwrap();
    assert_eq!(a["is_dev"], false);
    assert_eq!(b["is_dev"], true);

    assert_eq!(version["readmes"].as_array().unwrap().len(), 1);
    assert_eq!(version["readmes"][0]["content"], "# Hi");
}

#[tokio::test]
async fn unknown_upstream_package_returns_not_found() {
    let app = setup_test_app().await;

    let (status, body) = get_json(&app.router, "/api/packages/no-such-package").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.registry.hits(), 1);
    assert!(body["error"].as_str().unwrap().contains("no-such-package"));

    // The failed import must not leave a package row behind
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM packages")
        .fetch_one(app.store.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn scoped_package_names_resolve() {
    let app = setup_test_app().await;
    app.registry
        .add_manifest("@types/node", sample_manifest("@types/node"));

    let (status, record) = get_json(&app.router, "/api/packages/@types/node").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["name"], "@types/node");
}

#[tokio::test]
async fn invalid_package_name_is_rejected_before_upstream() {
    let app = setup_test_app().await;

    let (status, _) = get_json(&app.router, "/api/packages/..%2Fetc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.registry.hits(), 0);
}
