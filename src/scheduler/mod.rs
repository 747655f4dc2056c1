use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseTransaction, DbErr, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    entity::{scheduled_activations, variants, Variants},
    error::{AppError, AppResult},
};

pub mod worker;

pub use worker::{WorkerSettings, record_failure, spawn_activation_workers};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_DONE: &str = "done";
pub const STATUS_DEAD: &str = "dead";

/// Deferred-activation capability injected into the creation workflow.
///
/// Implementations persist exactly one entry per call; a worker pool picks
/// entries up once their `fire_at` has passed. Callers must not schedule a
/// `fire_at` that is now-or-past: they set the variant active synchronously
/// instead, so no redundant task races the request.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Registers a one-shot activation of `variant_id` at `fire_at`.
    ///
    /// Runs on the caller's transaction: the entry commits or rolls back
    /// together with the variant rows it references, so a failed enqueue
    /// can never silently lose an activation.
    async fn schedule(
        &self,
        txn: &DatabaseTransaction,
        variant_id: Uuid,
        fire_at: DateTime<FixedOffset>,
    ) -> Result<(), DbErr>;
}

/// Production scheduler backed by the `scheduled_activations` table.
#[derive(Debug, Clone, Copy, Default)]
pub struct DbScheduler;

#[async_trait]
impl Scheduler for DbScheduler {
    async fn schedule(
        &self,
        txn: &DatabaseTransaction,
        variant_id: Uuid,
        fire_at: DateTime<FixedOffset>,
    ) -> Result<(), DbErr> {
        scheduled_activations::ActiveModel {
            id: Set(Uuid::new_v4()),
            variant_id: Set(variant_id),
            fire_at: Set(fire_at),
            status: Set(STATUS_PENDING.to_string()),
            attempts: Set(0),
            last_error: Set(None),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;

        tracing::debug!(%variant_id, %fire_at, "activation scheduled");
        Ok(())
    }
}

/// Flips a variant to active. Idempotent: an already-active variant is a
/// no-op, so at-least-once delivery of activation entries is harmless.
pub async fn activate_variant<C: ConnectionTrait>(conn: &C, variant_id: Uuid) -> AppResult<()> {
    let Some(variant) = Variants::find_by_id(variant_id).one(conn).await? else {
        return Err(AppError::NotFound);
    };

    if variant.is_active {
        tracing::debug!(%variant_id, "variant already active, skipping write");
        return Ok(());
    }

    let name = variant.name.clone();
    let mut active: variants::ActiveModel = variant.into();
    active.is_active = Set(true);
    active.update(conn).await?;

    tracing::info!(%variant_id, variant_name = %name, "variant activated");
    Ok(())
}
