//! Maintains the per-collection floor price time series.

use crate::util::{now_millis, now_seconds};
use anyhow::{Context, Result};
use database::{
    collection_floor_price::{self, FloorPrice},
    indexed_status, Tables,
};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// How often stale time series points are deleted.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(86_400);
/// Only deployments of this project maintain floor snapshots; every other
/// project runs the prune alone.
pub const FLOOR_PROJECT: &str = "orderbook_dex";

pub struct FloorPriceMaintainer {
    pool: PgPool,
    tables: Tables,
    project: String,
    chain_id: i64,
    refresh_interval: Duration,
    retention: Duration,
    batch_size: usize,
    shutdown: CancellationToken,
}

impl FloorPriceMaintainer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        tables: Tables,
        project: String,
        chain_id: i64,
        refresh_interval: Duration,
        retention: Duration,
        batch_size: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            tables,
            project,
            chain_id,
            refresh_interval,
            retention,
            batch_size,
            shutdown,
        }
    }

    /// Runs until cancelled. Fails fast when the floor change cursor row is
    /// missing, mirroring the tailer's operator seeding contract.
    pub async fn run(self) -> Result<()> {
        {
            let mut ex = self.pool.acquire().await.context("acquire db connection")?;
            indexed_status::fetch(
                &mut ex,
                &self.tables.indexed_status,
                self.chain_id,
                indexed_status::FLOOR_CHANGE_INDEX,
            )
            .await
            .context("failed to fetch floor change cursor")?
            .context("floor change cursor is not seeded for this chain")?;
        }

        // Tickers fire after their first full period, not at startup.
        let mut prune = time::interval_at(Instant::now() + PRUNE_INTERVAL, PRUNE_INTERVAL);
        prune.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut refresh =
            time::interval_at(Instant::now() + self.refresh_interval, self.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("floor price maintenance stopped");
                    return Ok(());
                }
                _ = prune.tick() => {
                    if let Err(err) = self.prune().await {
                        tracing::error!(?err, "failed to prune expired floor prices");
                    }
                }
                _ = refresh.tick() => {
                    if self.project != FLOOR_PROJECT {
                        continue;
                    }
                    if let Err(err) = self.refresh().await {
                        tracing::error!(?err, "failed to refresh collection floor prices");
                    }
                }
            }
        }
    }

    async fn prune(&self) -> Result<()> {
        let retention = i64::try_from(self.retention.as_secs()).unwrap_or(i64::MAX);
        let cutoff = now_seconds().saturating_sub(retention);
        let mut ex = self.pool.acquire().await.context("acquire db connection")?;
        let deleted = collection_floor_price::delete_before(
            &mut ex,
            &self.tables.collection_floor_price,
            cutoff,
        )
        .await?;
        Metrics::get().pruned_points.inc_by(deleted);
        tracing::debug!(deleted, cutoff, "pruned expired floor price points");
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        let event_time = now_seconds();
        let written_at = now_millis();
        let mut ex = self.pool.acquire().await.context("acquire db connection")?;
        let floors = collection_floor_price::snapshot(
            &mut ex,
            &self.tables.orders,
            &self.tables.items,
            event_time,
        )
        .await?;
        let rows: Vec<_> = floors
            .into_iter()
            .map(|floor| FloorPrice {
                collection_address: floor.collection_address,
                price: floor.price,
                event_time,
                create_time: written_at,
                update_time: written_at,
            })
            .collect();
        for chunk in rows.chunks(self.batch_size.max(1)) {
            collection_floor_price::upsert_batch(
                &mut ex,
                &self.tables.collection_floor_price,
                chunk,
            )
            .await?;
        }
        Metrics::get().refreshes.inc();
        tracing::debug!(collections = rows.len(), "refreshed collection floor prices");
        Ok(())
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "floor_price")]
struct Metrics {
    /// Number of completed floor snapshot refreshes.
    refreshes: prometheus::IntCounter,
    /// Number of time series points removed by the daily prune.
    pruned_points: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }
}
