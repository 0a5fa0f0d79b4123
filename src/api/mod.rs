use crate::error::Result;
use crate::importer::Importer;
use crate::models::{PackageListQuery, PackageRecord, PackageSummary};
use crate::store::Store;
use axum::{
    Json,
    extract::{Path as AxumPath, Query, State},
    routing::get,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

const DEFAULT_PER_PAGE: i64 = 50;
const MAX_PER_PAGE: i64 = 200;

pub struct AppState {
    pub importer: Importer,
    pub store: Store,
}

/// List stored packages, sorted by name
///
/// Reads the store directly; never triggers an import.
#[utoipa::path(
    get,
    path = "/packages",
    params(
        ("page" = Option<i64>, Query, description = "Page number, 1-indexed"),
        ("per_page" = Option<i64>, Query, description = "Packages per page (max 200)")
    ),
    responses(
        (status = 200, description = "One page of packages", body = Vec<PackageSummary>),
        (status = 500, description = "Internal server error")
    ),
    tag = "packages"
)]
pub async fn list_packages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PackageListQuery>,
) -> Result<Json<Vec<PackageSummary>>> {
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PER_PAGE)
        .clamp(1, MAX_PER_PAGE);
    let page = query.page.unwrap_or(1).max(1);
    // Saturate: page is client-supplied and can be up to i64::MAX
    let offset = page.saturating_sub(1).saturating_mul(per_page);

    let packages = state.store.list_packages(per_page, offset).await?;

    Ok(Json(packages))
}

/// Fetch a package with all versions, dependencies, keywords and readme
///
/// Imports the package from the NPM registry on first access.
#[utoipa::path(
    get,
    path = "/packages/{name}",
    params(
        ("name" = String, Path, description = "Package name; scoped names (@scope/name) allowed")
    ),
    responses(
        (status = 200, description = "Package record", body = PackageRecord),
        (status = 400, description = "Invalid package name"),
        (status = 404, description = "Package not found upstream"),
        (status = 502, description = "Upstream registry failure"),
        (status = 500, description = "Internal server error")
    ),
    tag = "packages"
)]
pub async fn get_package(
    State(state): State<Arc<AppState>>,
    AxumPath(name): AxumPath<String>,
) -> Result<Json<PackageRecord>> {
    let record = state.importer.get_package(&name).await?;

    Ok(Json(record))
}

#[derive(OpenApi)]
#[openapi(
    paths(get_package),
    components(
        schemas(PackageRecord, PackageSummary, PackageListQuery)
    ),
    tags(
        (name = "packages", description = "Package metadata endpoints")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(state: Arc<AppState>) -> OpenApiRouter {
    // get_package is registered with a wildcard segment (not via routes!)
    // so scoped names containing a slash resolve; its OpenAPI entry comes
    // from ApiDoc::paths above.
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(list_packages))
        .route("/packages/{*name}", get(get_package))
        .with_state(state)
}
