use serde::Serialize;
use utoipa::ToSchema;

use crate::{entity, timezone::ReferenceZone};

/// Variant as rendered in API responses. Timestamps are ISO strings in the
/// reference zone.
#[derive(Debug, Serialize, ToSchema)]
pub struct VariantView {
    pub name: String,
    pub height: f64,
    pub stock: i32,
    pub price: i64,
    pub weight: f64,
    pub active_time: String,
    pub created_at: String,
    pub is_active: bool,
}

impl VariantView {
    pub fn from_model(model: entity::variants::Model, zone: &ReferenceZone) -> Self {
        let offset = zone.offset();
        Self {
            name: model.name,
            height: model.height,
            stock: model.stock,
            price: model.price,
            weight: model.weight,
            active_time: model.active_time.with_timezone(&offset).to_rfc3339(),
            created_at: model.created_at.with_timezone(&offset).to_rfc3339(),
            is_active: model.is_active,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductView {
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: String,
    pub variants: Vec<VariantView>,
}

impl ProductView {
    pub fn from_models(
        product: entity::products::Model,
        variants: Vec<entity::variants::Model>,
        zone: &ReferenceZone,
    ) -> Self {
        Self {
            name: product.name,
            description: product.description,
            is_active: product.is_active,
            created_at: product.created_at.with_timezone(&zone.offset()).to_rfc3339(),
            variants: variants
                .into_iter()
                .map(|variant| VariantView::from_model(variant, zone))
                .collect(),
        }
    }
}
