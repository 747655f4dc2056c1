use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiSpec;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::products::{CreateProductRequest, CreateVariantRequest},
    models::{ProductView, VariantView},
    response::{Page, StatusResponse},
    routes::{health, params, products},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::create_product,
        products::get_product,
    ),
    components(
        schemas(
            CreateProductRequest,
            CreateVariantRequest,
            ProductView,
            VariantView,
            StatusResponse,
            params::ProductListQuery,
            Page<ProductView>,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "products", description = "Product catalog endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
