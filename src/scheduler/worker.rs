use std::time::Duration;

use sea_orm::sea_query::{Expr, LockBehavior, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};

use crate::{
    db::OrmConn,
    entity::{
        ScheduledActivations,
        scheduled_activations::{ActiveModel, Column, Model},
    },
    error::AppError,
    scheduler::{STATUS_DEAD, STATUS_DONE, STATUS_PENDING, activate_variant},
    timezone::ReferenceZone,
};

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub workers: usize,
    pub poll_interval: Duration,
    pub max_attempts: i32,
}

/// Spawns the activation worker pool. Workers run for the lifetime of the
/// process, independently of request handling.
pub fn spawn_activation_workers(conn: OrmConn, zone: ReferenceZone, settings: WorkerSettings) {
    for worker in 0..settings.workers.max(1) {
        let conn = conn.clone();
        tokio::spawn(async move {
            tracing::info!(worker, "activation worker started");
            run_worker(conn, zone, settings, worker).await;
        });
    }
}

async fn run_worker(conn: OrmConn, zone: ReferenceZone, settings: WorkerSettings, worker: usize) {
    loop {
        match claim_and_fire(&conn, zone, settings.max_attempts).await {
            // Keep draining while entries are due.
            Ok(true) => {}
            Ok(false) => tokio::time::sleep(settings.poll_interval).await,
            Err(err) => {
                tracing::error!(worker, error = %err, "activation poll failed");
                tokio::time::sleep(settings.poll_interval).await;
            }
        }
    }
}

/// Claims the oldest due pending entry and runs its activation. Returns
/// `Ok(false)` when nothing is due.
///
/// The claim uses `FOR UPDATE SKIP LOCKED` so concurrent workers never
/// contend on the same entry. Variant update and entry completion share the
/// claim transaction: a crash before commit leaves the entry pending and it
/// is re-delivered, which the idempotent activation tolerates.
pub async fn claim_and_fire(
    conn: &OrmConn,
    zone: ReferenceZone,
    max_attempts: i32,
) -> Result<bool, DbErr> {
    let txn = conn.begin().await?;

    let entry = ScheduledActivations::find()
        .filter(Column::Status.eq(STATUS_PENDING))
        .filter(Column::FireAt.lte(zone.now()))
        .order_by_asc(Column::FireAt)
        .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
        .one(&txn)
        .await?;

    let Some(entry) = entry else {
        txn.commit().await?;
        return Ok(false);
    };

    let entry_id = entry.id;
    let variant_id = entry.variant_id;

    match activate_variant(&txn, variant_id).await {
        Ok(()) => {
            complete(entry, &txn).await?;
            txn.commit().await?;
        }
        Err(AppError::NotFound) => {
            // The variant was deleted before the timer fired. Retrying
            // cannot help, so the entry is completed with a log line.
            tracing::warn!(%entry_id, %variant_id, "variant missing at activation");
            complete(entry, &txn).await?;
            txn.commit().await?;
        }
        Err(err) => {
            // The transaction may be aborted; record the failure outside it.
            txn.rollback().await?;
            record_failure(conn, &entry, &err, max_attempts).await?;
        }
    }

    Ok(true)
}

async fn complete(entry: Model, txn: &sea_orm::DatabaseTransaction) -> Result<(), DbErr> {
    let mut active: ActiveModel = entry.into();
    active.status = Set(STATUS_DONE.to_string());
    active.update(txn).await?;
    Ok(())
}

/// Bumps the attempt counter on a pending entry, dead-lettering it once the
/// retries are exhausted.
///
/// The write is guarded on `status = 'pending'`: between the rollback and
/// this update another worker may have re-claimed the entry and completed
/// it, and a stale write must not resurrect its bookkeeping.
pub async fn record_failure(
    conn: &OrmConn,
    entry: &Model,
    err: &AppError,
    max_attempts: i32,
) -> Result<(), DbErr> {
    let entry_id = entry.id;
    let variant_id = entry.variant_id;
    let attempts = entry.attempts + 1;
    let dead = attempts >= max_attempts;

    let mut update = ScheduledActivations::update_many()
        .col_expr(Column::Attempts, Expr::value(attempts))
        .col_expr(Column::LastError, Expr::value(Some(err.to_string())));
    if dead {
        update = update.col_expr(Column::Status, Expr::value(STATUS_DEAD));
    }
    let result = update
        .filter(Column::Id.eq(entry_id))
        .filter(Column::Status.eq(STATUS_PENDING))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        tracing::debug!(%entry_id, %variant_id, "entry left pending state, failure not recorded");
        return Ok(());
    }

    if dead {
        tracing::error!(
            %entry_id,
            %variant_id,
            attempts,
            error = %err,
            "activation dead-lettered after exhausting retries"
        );
    } else {
        tracing::warn!(%entry_id, %variant_id, attempts, error = %err, "activation failed, will retry");
    }
    Ok(())
}
