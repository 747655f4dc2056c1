use std::collections::HashSet;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, LoaderTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, CreateVariantRequest},
    entity::{
        Products, Variants,
        products::{ActiveModel as ProductActive, Column as ProductCol, Model as ProductModel},
        variants::{ActiveModel as VariantActive, Column as VariantCol},
    },
    error::{AppError, AppResult, ValidationError},
    models::ProductView,
    response::{Page, StatusResponse},
    routes::params::{CursorDirection, PageCursor, ProductListQuery},
    state::AppState,
};

/// Creates a product with its nested variants in one transaction.
///
/// Variants whose `active_time` is now-or-past come out active immediately;
/// the rest get a scheduler entry written on the same transaction, so the
/// catalog rows and their activation entries commit or roll back together.
pub async fn create_product(
    state: &AppState,
    payload: CreateProductRequest,
) -> AppResult<StatusResponse> {
    ensure_unique_variant_names(&payload.variants)?;
    ensure_non_negative_magnitudes(&payload.variants)?;

    // Resolve every active_time before touching storage.
    let mut active_times = Vec::with_capacity(payload.variants.len());
    for variant in &payload.variants {
        let active_time = state
            .zone
            .parse_active_time(&variant.active_time)
            .map_err(|_| ValidationError::InvalidActiveTime {
                raw: variant.active_time.clone(),
            })?;
        active_times.push(active_time);
    }

    let now = state.zone.now();
    let txn = state.orm.begin().await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.clone()),
        description: Set(payload.description),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: NotSet,
    }
    .insert(&txn)
    .await;

    let product = match product {
        Ok(model) => model,
        Err(err) => {
            return Err(match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    ValidationError::DuplicateProductName { name: payload.name }.into()
                }
                _ => err.into(),
            });
        }
    };

    let variant_count = payload.variants.len();
    let mut deferred = Vec::new();
    let mut actives = Vec::with_capacity(variant_count);

    for (request, active_time) in payload.variants.into_iter().zip(active_times) {
        let variant_id = Uuid::new_v4();
        // Whole-second comparison: sub-second precision is discarded on
        // purpose, so an active_time equal to "now" counts as due.
        let due = active_time.timestamp() <= now.timestamp();
        let is_active = if due {
            true
        } else {
            request.is_active.unwrap_or(false)
        };
        if !due {
            deferred.push((variant_id, active_time));
        }

        actives.push(VariantActive {
            id: Set(variant_id),
            product_id: Set(product.id),
            name: Set(request.name),
            height: Set(request.height),
            stock: Set(request.stock),
            price: Set(request.price),
            weight: Set(request.weight),
            active_time: Set(active_time),
            is_active: Set(is_active),
            created_at: NotSet,
        });
    }

    let batch = state.settings.variant_insert_batch.max(1);
    let mut pending = actives.into_iter().peekable();
    while pending.peek().is_some() {
        let chunk: Vec<_> = pending.by_ref().take(batch).collect();
        Variants::insert_many(chunk).exec(&txn).await?;
    }

    // Variants are persisted above, so every scheduled id references a row
    // that exists once this transaction commits.
    for (variant_id, fire_at) in deferred {
        state.scheduler.schedule(&txn, variant_id, fire_at).await?;
    }

    txn.commit().await?;

    tracing::info!(product_id = %product.id, variant_count, "product created");
    Ok(StatusResponse::success(creation_message(variant_count)))
}

/// Lists products newest-first with optional creation-day bounds and cursor
/// pagination. Malformed date filters degrade to an empty page; a malformed
/// cursor is a 400.
pub async fn list_products(
    state: &AppState,
    query: ProductListQuery,
) -> AppResult<Page<ProductView>> {
    let mut condition = Condition::all();

    if let Some(raw) = query.created_at_gte.as_deref() {
        match state.zone.day_start(raw) {
            Ok(bound) => condition = condition.add(ProductCol::CreatedAt.gte(bound)),
            Err(_) => return Ok(Page::empty()),
        }
    }

    if let Some(raw) = query.created_at_lte.as_deref() {
        match state.zone.day_end(raw) {
            Ok(bound) => condition = condition.add(ProductCol::CreatedAt.lte(bound)),
            Err(_) => return Ok(Page::empty()),
        }
    }

    let cursor = match query.cursor.as_deref() {
        Some(raw) => Some(
            PageCursor::decode(raw).map_err(|err| AppError::BadRequest(err.to_string()))?,
        ),
        None => None,
    };

    let page_size = state.settings.page_size.max(1) as usize;
    let fetch = page_size as u64 + 1;
    let base = Products::find().filter(condition);

    let (rows, has_extra, direction) = match &cursor {
        None => {
            let mut rows = base
                .order_by_desc(ProductCol::CreatedAt)
                .order_by_desc(ProductCol::Id)
                .limit(fetch)
                .all(&state.orm)
                .await?;
            let extra = rows.len() > page_size;
            rows.truncate(page_size);
            (rows, extra, None)
        }
        Some(anchor) if anchor.direction == CursorDirection::Next => {
            let mut rows = base
                .filter(older_than(anchor))
                .order_by_desc(ProductCol::CreatedAt)
                .order_by_desc(ProductCol::Id)
                .limit(fetch)
                .all(&state.orm)
                .await?;
            let extra = rows.len() > page_size;
            rows.truncate(page_size);
            (rows, extra, Some(CursorDirection::Next))
        }
        Some(anchor) => {
            // Walking backwards: scan ascending from the anchor, then flip
            // back to the display order.
            let mut rows = base
                .filter(newer_than(anchor))
                .order_by_asc(ProductCol::CreatedAt)
                .order_by_asc(ProductCol::Id)
                .limit(fetch)
                .all(&state.orm)
                .await?;
            let extra = rows.len() > page_size;
            rows.truncate(page_size);
            rows.reverse();
            (rows, extra, Some(CursorDirection::Previous))
        }
    };

    let next = match direction {
        Some(CursorDirection::Previous) => rows.last().map(edge_cursor_next),
        _ => {
            if has_extra {
                rows.last().map(edge_cursor_next)
            } else {
                None
            }
        }
    };
    let previous = match direction {
        Some(CursorDirection::Next) => rows.first().map(edge_cursor_previous),
        Some(CursorDirection::Previous) => {
            if has_extra {
                rows.first().map(edge_cursor_previous)
            } else {
                None
            }
        }
        None => None,
    };

    let variants = rows
        .load_many(
            Variants::find()
                .order_by_asc(VariantCol::CreatedAt)
                .order_by_asc(VariantCol::Id),
            &state.orm,
        )
        .await?;
    let cap = state.settings.variant_display_limit;
    let results = rows
        .into_iter()
        .zip(variants)
        .map(|(product, mut product_variants)| {
            // Display truncation only; the stored variant set is untouched.
            product_variants.truncate(cap);
            ProductView::from_models(product, product_variants, &state.zone)
        })
        .collect();

    Ok(Page {
        next,
        previous,
        results,
    })
}

/// Fetches one product with every variant, regardless of the list display cap.
pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ProductView> {
    let Some(product) = Products::find_by_id(id).one(&state.orm).await? else {
        return Err(AppError::NotFound);
    };

    let variants = product
        .find_related(Variants)
        .order_by_asc(VariantCol::CreatedAt)
        .order_by_asc(VariantCol::Id)
        .all(&state.orm)
        .await?;

    Ok(ProductView::from_models(product, variants, &state.zone))
}

fn ensure_unique_variant_names(variants: &[CreateVariantRequest]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(variants.len());
    for variant in variants {
        if !seen.insert(variant.name.as_str()) {
            return Err(ValidationError::DuplicateVariantName {
                name: variant.name.clone(),
            });
        }
    }
    Ok(())
}

/// The storage CHECK constraints back this up, but a negative magnitude is
/// a client error and must come back as a 400, not a constraint 500.
fn ensure_non_negative_magnitudes(
    variants: &[CreateVariantRequest],
) -> Result<(), ValidationError> {
    for variant in variants {
        let field = if variant.height < 0.0 {
            Some("height")
        } else if variant.stock < 0 {
            Some("stock")
        } else if variant.price < 0 {
            Some("price")
        } else if variant.weight < 0.0 {
            Some("weight")
        } else {
            None
        };
        if let Some(field) = field {
            return Err(ValidationError::NegativeVariantField {
                name: variant.name.clone(),
                field,
            });
        }
    }
    Ok(())
}

fn creation_message(variant_count: usize) -> String {
    let noun = if variant_count <= 1 {
        "variant"
    } else {
        "variants"
    };
    format!("success create 1 product with {variant_count} {noun}")
}

/// `(created_at, id)` strictly older than the anchor, in display order.
fn older_than(anchor: &PageCursor) -> Condition {
    Condition::any()
        .add(ProductCol::CreatedAt.lt(anchor.created_at))
        .add(
            Condition::all()
                .add(ProductCol::CreatedAt.eq(anchor.created_at))
                .add(ProductCol::Id.lt(anchor.id)),
        )
}

/// `(created_at, id)` strictly newer than the anchor.
fn newer_than(anchor: &PageCursor) -> Condition {
    Condition::any()
        .add(ProductCol::CreatedAt.gt(anchor.created_at))
        .add(
            Condition::all()
                .add(ProductCol::CreatedAt.eq(anchor.created_at))
                .add(ProductCol::Id.gt(anchor.id)),
        )
}

fn edge_cursor_next(row: &ProductModel) -> String {
    PageCursor::new(row.created_at, row.id, CursorDirection::Next).encode()
}

fn edge_cursor_previous(row: &ProductModel) -> String {
    PageCursor::new(row.created_at, row.id, CursorDirection::Previous).encode()
}
