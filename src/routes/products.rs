use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::products::CreateProductRequest,
    error::AppResult,
    models::ProductView,
    response::{Page, StatusResponse},
    routes::params::ProductListQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_products))
        .route("/{id}", get(get_product))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created with nested variants", body = StatusResponse),
        (status = 400, description = "Duplicate product/variant name or bad active_time", body = StatusResponse),
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<StatusResponse>)> {
    let response = product_service::create_product(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("created_at_gte" = Option<String>, Query, description = "Inclusive creation-day lower bound, DD-MM-YYYY"),
        ("created_at_lte" = Option<String>, Query, description = "Inclusive creation-day upper bound, DD-MM-YYYY"),
        ("cursor" = Option<String>, Query, description = "Opaque pagination cursor"),
    ),
    responses(
        (status = 200, description = "Cursor-paginated products, newest first", body = Page<ProductView>),
        (status = 400, description = "Malformed cursor", body = StatusResponse),
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<Page<ProductView>>> {
    let page = product_service::list_products(&state, query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product with all of its variants", body = ProductView),
        (status = 404, description = "Product not found", body = StatusResponse),
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProductView>> {
    let product = product_service::get_product(&state, id).await?;
    Ok(Json(product))
}
