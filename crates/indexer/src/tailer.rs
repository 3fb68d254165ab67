//! Tails the chain for orderbook contract logs in fixed size block batches.

use crate::{chain::ChainClient, events, projector::Projector};
use alloy_primitives::Address;
use anyhow::{Context, Result};
use database::{indexed_status, Tables};
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// Inclusive size of one log fetch window.
pub const SYNC_BLOCK_PERIOD: u64 = 10;
/// Backoff applied on any recoverable error and while caught up with the
/// chain head.
pub const SLEEP_INTERVAL: Duration = Duration::from_secs(50);

/// Blocks behind head considered final enough to index. There is no reorg
/// handling beyond this lag.
pub fn confirmation_depth(chain: &str) -> u64 {
    match chain {
        "eth" | "starknet" => 1,
        "optimism" | "arbitrum" | "base" | "zksync-era" => 2,
        _ => 2,
    }
}

pub struct Tailer {
    pool: PgPool,
    tables: Tables,
    chain_client: Arc<dyn ChainClient>,
    projector: Projector,
    chain_id: i64,
    chain: String,
    dex_address: Address,
    shutdown: CancellationToken,
}

impl Tailer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        tables: Tables,
        chain_client: Arc<dyn ChainClient>,
        projector: Projector,
        chain_id: i64,
        chain: String,
        dex_address: Address,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            tables,
            chain_client,
            projector,
            chain_id,
            chain,
            dex_address,
            shutdown,
        }
    }

    /// Runs until cancelled. Returns an error only for conditions under which
    /// continuing would be unsafe: a missing cursor at startup or a cursor
    /// that can no longer be persisted.
    pub async fn run(self) -> Result<()> {
        let mut last_sync_block = self.startup_cursor().await?;
        let depth = confirmation_depth(&self.chain);
        tracing::info!(
            chain = %self.chain,
            start_block = last_sync_block,
            confirmation_depth = depth,
            "starting orderbook event sync"
        );

        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!("orderbook event sync stopped");
                return Ok(());
            }

            let head = match self.chain_client.block_number().await {
                Ok(head) => head,
                Err(err) => {
                    tracing::error!(?err, "failed to get current block number");
                    self.sleep().await;
                    continue;
                }
            };
            let Some((start, end)) = batch_range(last_sync_block, head, depth) else {
                // Caught up; let the chain produce new final blocks.
                self.sleep().await;
                continue;
            };

            let logs = match self
                .chain_client
                .filter_logs(start, end, self.dex_address)
                .await
            {
                Ok(logs) => logs,
                Err(err) => {
                    tracing::error!(?err, start, end, "failed to fetch logs");
                    self.sleep().await;
                    continue;
                }
            };

            let mut ex = match self.pool.acquire().await {
                Ok(ex) => ex,
                Err(err) => {
                    tracing::error!(?err, "failed to acquire db connection");
                    self.sleep().await;
                    continue;
                }
            };
            // Logs arrive in (block number, log index) order and are applied
            // in that order; per-event failures are logged inside the
            // projector and never stall the batch.
            for log in &logs {
                match events::decode(log) {
                    Ok(Some((meta, event))) => self.projector.apply(&mut ex, &meta, &event).await,
                    Ok(None) => (),
                    Err(err) => tracing::warn!(?err, "skipping undecodable log"),
                }
            }

            // The cursor advances once per batch, even when it was empty.
            // Failing to persist it would make the next restart silently
            // rewind, so that is fatal.
            let next_block = end + 1;
            indexed_status::update_last_indexed_block(
                &mut ex,
                &self.tables.indexed_status,
                self.chain_id,
                indexed_status::EVENT_INDEX,
                i64::try_from(next_block).context("cursor exceeds i64")?,
            )
            .await
            .context("failed to persist event index cursor")?;
            last_sync_block = next_block;

            let metrics = Metrics::get();
            metrics.synced_batches.inc();
            metrics.indexed_logs.inc_by(logs.len() as u64);
            tracing::info!(
                start_block = start,
                end_block = end,
                logs = logs.len(),
                "synced orderbook events"
            );
        }
    }

    async fn startup_cursor(&self) -> Result<u64> {
        let mut ex = self.pool.acquire().await.context("acquire db connection")?;
        let status = indexed_status::fetch(
            &mut ex,
            &self.tables.indexed_status,
            self.chain_id,
            indexed_status::EVENT_INDEX,
        )
        .await
        .context("failed to fetch event index cursor")?
        .context("event index cursor is not seeded; insert the starting block for this chain")?;
        u64::try_from(status.last_indexed_block).context("negative event index cursor")
    }

    async fn sleep(&self) {
        tokio::select! {
            _ = self.shutdown.cancelled() => (),
            _ = tokio::time::sleep(SLEEP_INTERVAL) => (),
        }
    }
}

/// The next inclusive block window to fetch, or `None` while the cursor has
/// caught up with the safe head.
fn batch_range(last_sync_block: u64, head: u64, confirmation_depth: u64) -> Option<(u64, u64)> {
    let safe_head = head.saturating_sub(confirmation_depth);
    if last_sync_block > safe_head {
        return None;
    }
    let end = (last_sync_block + SYNC_BLOCK_PERIOD).min(safe_head);
    Some((last_sync_block, end))
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "event_tailer")]
struct Metrics {
    /// Number of block batches successfully synced.
    synced_batches: prometheus::IntCounter,
    /// Number of contract logs fetched and dispatched.
    indexed_logs: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }
}
