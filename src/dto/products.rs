use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVariantRequest {
    pub name: String,
    pub height: f64,
    pub stock: i32,
    pub price: i64,
    pub weight: f64,
    /// `YYYY-MM-DDTHH:MM[:SS]`, interpreted in the reference zone. A
    /// trailing `Z` is accepted and ignored.
    pub active_time: String,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub is_active: Option<bool>,
    pub variants: Vec<CreateVariantRequest>,
}
