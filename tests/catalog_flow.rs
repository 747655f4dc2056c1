use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_api::{
    config::CatalogSettings,
    db::{OrmConn, create_orm_conn, run_migrations},
    dto::products::{CreateProductRequest, CreateVariantRequest},
    entity::{
        Products, ScheduledActivations, Variants,
        products::{ActiveModel as ProductActive, Column as ProductCol},
        scheduled_activations::{ActiveModel as ActivationActive, Column as ActivationCol},
        variants::Column as VariantCol,
    },
    error::{AppError, ValidationError},
    routes::params::ProductListQuery,
    scheduler::{
        DbScheduler, STATUS_DEAD, STATUS_DONE, STATUS_PENDING, Scheduler, activate_variant,
        worker::{claim_and_fire, record_failure},
    },
    services::product_service,
    state::AppState,
    timezone::ReferenceZone,
};
use chrono::{DateTime, Duration, FixedOffset};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

/// Test double that records schedule calls instead of persisting them,
/// standing in for the broker the same way the source project mocked its
/// task queue.
#[derive(Default)]
struct RecordingScheduler {
    calls: Mutex<Vec<(Uuid, DateTime<FixedOffset>)>>,
}

impl RecordingScheduler {
    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn schedule(
        &self,
        _txn: &DatabaseTransaction,
        variant_id: Uuid,
        fire_at: DateTime<FixedOffset>,
    ) -> Result<(), DbErr> {
        self.calls.lock().unwrap().push((variant_id, fire_at));
        Ok(())
    }
}

// End-to-end catalog flow: creation validation, immediate vs deferred
// activation, worker firing, filtering, pagination and display capping.
#[tokio::test]
async fn product_catalog_core_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(());
            }
        };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    reset_tables(&orm).await?;

    let zone = ReferenceZone::east_hours(7)?;
    let settings = CatalogSettings::default();
    let state = AppState {
        orm: orm.clone(),
        scheduler: Arc::new(DbScheduler),
        zone,
        settings: settings.clone(),
    };
    let recording = Arc::new(RecordingScheduler::default());
    let recording_state = AppState {
        orm: orm.clone(),
        scheduler: recording.clone(),
        zone,
        settings: settings.clone(),
    };

    // --- creation with past active_time: immediate activation, no scheduling
    let response = product_service::create_product(
        &recording_state,
        request(
            "Sample Product",
            vec![
                variant("Variant 1", "2023-08-16T12:00:00Z"),
                variant("Variant 2", "2023-08-16T14:00:00Z"),
            ],
        ),
    )
    .await?;
    assert_eq!(response.status, "success");
    assert_eq!(response.message, "success create 1 product with 2 variants");
    assert_eq!(recording.call_count(), 0);

    let product_id = product_id_by_name(&orm, "Sample Product").await?;
    let variants = Variants::find()
        .filter(VariantCol::ProductId.eq(product_id))
        .all(&orm)
        .await?;
    assert_eq!(variants.len(), 2);
    assert!(variants.iter().all(|v| v.is_active));

    // --- singular message
    let response = product_service::create_product(
        &recording_state,
        request(
            "Single Variant Product",
            vec![variant("Single Variant", "2023-08-16T10:00:00Z")],
        ),
    )
    .await?;
    assert_eq!(response.message, "success create 1 product with 1 variant");

    // --- duplicate product name -> validation error, nothing extra persisted
    let err = product_service::create_product(
        &state,
        request(
            "Sample Product",
            vec![variant("Variant 3", "2023-08-16T12:00:00Z")],
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::DuplicateProductName { .. })
    ));
    let count = Products::find()
        .filter(ProductCol::Name.eq("Sample Product"))
        .count(&orm)
        .await?;
    assert_eq!(count, 1);

    // --- duplicate variant name within one request -> rejected atomically
    let err = product_service::create_product(
        &state,
        request(
            "Product with Duplicate Variants",
            vec![
                variant("Variant 1", "2023-08-16T12:00:00Z"),
                variant("Variant 1", "2023-08-16T14:00:00Z"),
            ],
        ),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::DuplicateVariantName { .. })
    ));
    let count = Products::find()
        .filter(ProductCol::Name.eq("Product with Duplicate Variants"))
        .count(&orm)
        .await?;
    assert_eq!(count, 0);

    // --- malformed active_time -> rejected before any write
    let err = product_service::create_product(
        &state,
        request("Bad Time Product", vec![variant("Whenever", "not-a-time")]),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::InvalidActiveTime { .. })
    ));

    // --- negative magnitude -> validation error, nothing persisted
    let mut negative = variant("Negative Stock", "2023-08-16T12:00:00Z");
    negative.stock = -5;
    let err = product_service::create_product(
        &state,
        request("Negative Stock Product", vec![negative]),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::NegativeVariantField { .. })
    ));
    let count = Products::find()
        .filter(ProductCol::Name.eq("Negative Stock Product"))
        .count(&orm)
        .await?;
    assert_eq!(count, 0);

    // --- active_time == now (whole-second boundary) activates immediately
    let now_string = zone.now().format("%Y-%m-%dT%H:%M:%S").to_string();
    product_service::create_product(
        &recording_state,
        request("Boundary Product", vec![variant("Boundary", &now_string)]),
    )
    .await?;
    assert_eq!(recording.call_count(), 0);
    let boundary_product = product_id_by_name(&orm, "Boundary Product").await?;
    let boundary_variant = Variants::find()
        .filter(VariantCol::ProductId.eq(boundary_product))
        .one(&orm)
        .await?
        .expect("boundary variant");
    assert!(boundary_variant.is_active);

    // --- future active_time: inactive now, exactly one pending entry
    let ahead = (zone.now() + Duration::minutes(10))
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string();
    product_service::create_product(
        &state,
        request("Future Active Variant Product", vec![variant("Future Variant", &ahead)]),
    )
    .await?;
    let future_product = product_id_by_name(&orm, "Future Active Variant Product").await?;
    let future_variant = Variants::find()
        .filter(VariantCol::ProductId.eq(future_product))
        .one(&orm)
        .await?
        .expect("future variant");
    assert!(!future_variant.is_active);

    let pending = ScheduledActivations::find()
        .filter(ActivationCol::VariantId.eq(future_variant.id))
        .filter(ActivationCol::Status.eq(STATUS_PENDING))
        .all(&orm)
        .await?;
    assert_eq!(pending.len(), 1);

    // Not due yet: a poll claims nothing and the variant stays inactive.
    assert!(!claim_and_fire(&orm, zone, settings.activation_max_attempts).await?);

    // Bring the timer into the past and poll again: the variant flips.
    let entry = pending.into_iter().next().expect("pending entry");
    let entry_id = entry.id;
    let mut due: ActivationActive = entry.into();
    due.fire_at = Set(zone.now() - Duration::minutes(1));
    due.update(&orm).await?;

    assert!(claim_and_fire(&orm, zone, settings.activation_max_attempts).await?);
    let fired = Variants::find_by_id(future_variant.id)
        .one(&orm)
        .await?
        .expect("fired variant");
    assert!(fired.is_active);
    let completed = ScheduledActivations::find_by_id(entry_id)
        .one(&orm)
        .await?
        .expect("completed entry");
    assert_eq!(completed.status, STATUS_DONE);

    // --- activation is idempotent: a second delivery is a no-op
    activate_variant(&orm, future_variant.id).await?;
    let still_active = Variants::find_by_id(future_variant.id)
        .one(&orm)
        .await?
        .expect("variant");
    assert!(still_active.is_active);

    // --- missing variant: the entry completes with a logged not-found
    let orphan_id = Uuid::new_v4();
    let txn = orm.begin().await?;
    DbScheduler
        .schedule(&txn, orphan_id, zone.now() - Duration::minutes(1))
        .await?;
    txn.commit().await?;
    let stale_orphan = ScheduledActivations::find()
        .filter(ActivationCol::VariantId.eq(orphan_id))
        .one(&orm)
        .await?
        .expect("orphan entry");
    assert!(claim_and_fire(&orm, zone, settings.activation_max_attempts).await?);
    let orphan_entries = ScheduledActivations::find()
        .filter(ActivationCol::VariantId.eq(orphan_id))
        .all(&orm)
        .await?;
    assert_eq!(orphan_entries.len(), 1);
    assert_eq!(orphan_entries[0].status, STATUS_DONE);

    // --- a failure report built from a pre-claim snapshot must not touch
    // an entry that has since completed
    record_failure(
        &orm,
        &stale_orphan,
        &AppError::Internal(anyhow::anyhow!("simulated write failure")),
        1,
    )
    .await?;
    let untouched = ScheduledActivations::find_by_id(stale_orphan.id)
        .one(&orm)
        .await?
        .expect("completed entry");
    assert_eq!(untouched.status, STATUS_DONE);
    assert_eq!(untouched.attempts, 0);
    assert!(untouched.last_error.is_none());

    // --- failures accrue attempts, then dead-letter once retries run out
    let doomed_id = Uuid::new_v4();
    let txn = orm.begin().await?;
    DbScheduler
        .schedule(&txn, doomed_id, zone.now() - Duration::minutes(1))
        .await?;
    txn.commit().await?;
    let entry = ScheduledActivations::find()
        .filter(ActivationCol::VariantId.eq(doomed_id))
        .one(&orm)
        .await?
        .expect("doomed entry");
    let failure = AppError::Internal(anyhow::anyhow!("simulated write failure"));

    record_failure(&orm, &entry, &failure, 2).await?;
    let after_first = ScheduledActivations::find_by_id(entry.id)
        .one(&orm)
        .await?
        .expect("retried entry");
    assert_eq!(after_first.status, STATUS_PENDING);
    assert_eq!(after_first.attempts, 1);
    assert!(after_first.last_error.is_some());

    record_failure(&orm, &after_first, &failure, 2).await?;
    let dead = ScheduledActivations::find_by_id(entry.id)
        .one(&orm)
        .await?
        .expect("dead entry");
    assert_eq!(dead.status, STATUS_DEAD);
    assert_eq!(dead.attempts, 2);
    assert!(dead.last_error.is_some());

    // A dead-lettered entry is never claimed again.
    assert!(!claim_and_fire(&orm, zone, 2).await?);

    // --- an aborted transaction leaves no activation entry behind
    let rolled_back_id = Uuid::new_v4();
    let txn = orm.begin().await?;
    DbScheduler
        .schedule(&txn, rolled_back_id, zone.now() + Duration::minutes(5))
        .await?;
    txn.rollback().await?;
    let leftover = ScheduledActivations::find()
        .filter(ActivationCol::VariantId.eq(rolled_back_id))
        .count(&orm)
        .await?;
    assert_eq!(leftover, 0);

    // --- date-range filtering
    reset_tables(&orm).await?;
    let older = zone.normalize("2001-01-10T12:00:00", "%Y-%m-%dT%H:%M:%S")?;
    let newer = zone.normalize("2001-01-12T12:00:00", "%Y-%m-%dT%H:%M:%S")?;
    seed_product(&orm, "Older Product", older).await?;
    seed_product(&orm, "Newer Product", newer).await?;

    let page = product_service::list_products(
        &state,
        list_query(Some("11-01-2001"), None, None),
    )
    .await?;
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].name, "Newer Product");

    let page = product_service::list_products(
        &state,
        list_query(None, Some("11-01-2001"), None),
    )
    .await?;
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].name, "Older Product");

    // Lenient policy: an unparsable bound yields an empty 200 page.
    let page = product_service::list_products(
        &state,
        list_query(Some("2001-01-10"), None, None),
    )
    .await?;
    assert!(page.results.is_empty());
    assert!(page.next.is_none());
    assert!(page.previous.is_none());

    // A malformed cursor is a client error, not a silent empty page.
    let err = product_service::list_products(
        &state,
        list_query(None, None, Some("!!not-a-cursor!!")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // --- cursor pagination over 12 products, default page size 10
    reset_tables(&orm).await?;
    for i in 0..12i64 {
        let created_at = zone.normalize("2002-03-01T00:00:00", "%Y-%m-%dT%H:%M:%S")?
            + Duration::hours(i);
        seed_product(&orm, &format!("Paged Product {i:02}"), created_at).await?;
    }

    let first = product_service::list_products(&state, list_query(None, None, None)).await?;
    assert_eq!(first.results.len(), 10);
    assert_eq!(first.results[0].name, "Paged Product 11");
    assert!(first.next.is_some());
    assert!(first.previous.is_none());

    let second = product_service::list_products(
        &state,
        list_query(None, None, first.next.as_deref()),
    )
    .await?;
    assert_eq!(second.results.len(), 2);
    assert_eq!(second.results[0].name, "Paged Product 01");
    assert!(second.next.is_none());
    assert!(second.previous.is_some());

    let back = product_service::list_products(
        &state,
        list_query(None, None, second.previous.as_deref()),
    )
    .await?;
    assert_eq!(back.results.len(), 10);
    assert_eq!(back.results[0].name, "Paged Product 11");

    // --- variant display cap in list vs full fetch
    reset_tables(&orm).await?;
    product_service::create_product(
        &state,
        request(
            "Capped Product",
            vec![
                variant("Cap 1", "2023-08-16T12:00:00Z"),
                variant("Cap 2", "2023-08-16T12:00:00Z"),
                variant("Cap 3", "2023-08-16T12:00:00Z"),
            ],
        ),
    )
    .await?;

    let page = product_service::list_products(&state, list_query(None, None, None)).await?;
    assert_eq!(page.results.len(), 1);
    let listed: Vec<&str> = page.results[0]
        .variants
        .iter()
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(listed.len(), settings.variant_display_limit);

    let capped_id = product_id_by_name(&orm, "Capped Product").await?;
    let full = product_service::get_product(&state, capped_id).await?;
    assert_eq!(full.variants.len(), 3);
    // The list shows a deterministic prefix of the full ordering, not an
    // arbitrary subset.
    let full_names: Vec<&str> = full.variants.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(listed, full_names[..settings.variant_display_limit]);

    Ok(())
}

fn variant(name: &str, active_time: &str) -> CreateVariantRequest {
    CreateVariantRequest {
        name: name.to_string(),
        height: 10.0,
        stock: 100,
        price: 10,
        weight: 0.5,
        active_time: active_time.to_string(),
        is_active: None,
    }
}

fn request(name: &str, variants: Vec<CreateVariantRequest>) -> CreateProductRequest {
    CreateProductRequest {
        name: name.to_string(),
        description: "integration flow product".to_string(),
        is_active: None,
        variants,
    }
}

fn list_query(
    gte: Option<&str>,
    lte: Option<&str>,
    cursor: Option<&str>,
) -> ProductListQuery {
    ProductListQuery {
        created_at_gte: gte.map(str::to_string),
        created_at_lte: lte.map(str::to_string),
        cursor: cursor.map(str::to_string),
    }
}

async fn product_id_by_name(orm: &OrmConn, name: &str) -> anyhow::Result<Uuid> {
    let product = Products::find()
        .filter(ProductCol::Name.eq(name))
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product '{name}' not found"))?;
    Ok(product.id)
}

async fn seed_product(
    orm: &OrmConn,
    name: &str,
    created_at: DateTime<FixedOffset>,
) -> anyhow::Result<()> {
    ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set("seeded".to_string()),
        is_active: Set(true),
        created_at: Set(created_at),
    }
    .insert(orm)
    .await?;
    Ok(())
}

async fn reset_tables(orm: &OrmConn) -> anyhow::Result<()> {
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE scheduled_activations, variants, products CASCADE".to_string(),
    ))
    .await?;
    Ok(())
}
