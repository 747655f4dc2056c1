use axum::Json;

use crate::response::StatusResponse;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "OK", body = StatusResponse),
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<StatusResponse> {
    Json(StatusResponse::success("ok"))
}
