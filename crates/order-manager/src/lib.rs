//! Producer side of the order manager boundary.
//!
//! The order manager is a separate service that recomputes collection level
//! prices (expiry sweeps, best bid/ask). The indexer only feeds its queues and
//! never waits for it: core table writes are authoritative regardless of
//! whether a downstream enqueue succeeds.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use redis::{aio::ConnectionManager, AsyncCommands};
use serde::{Deserialize, Serialize};

/// Summary of a freshly indexed order, queued so the order manager can track
/// its expiry and the collection's listing structure.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub collection_address: String,
    pub token_id: String,
    /// Unit price in wei.
    pub price: BigDecimal,
    pub maker: String,
    pub expire_time: i64,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeEventKind {
    Buy,
    Cancel,
}

/// Notifies the order manager that an order left the book, so dependent
/// collection prices can be recomputed.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TradeEvent {
    pub order_id: String,
    pub collection_address: String,
    pub token_id: String,
    /// Previous and new owner for sales; empty for cancellations.
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub event_type: TradeEventKind,
}

#[async_trait]
pub trait OrderManaging: Send + Sync {
    async fn enqueue_order(&self, order: OrderSummary) -> Result<()>;
    async fn enqueue_trade_event(&self, event: TradeEvent) -> Result<()>;
}

/// Redis list backed queue producer. Payloads are JSON, one entry per list
/// element, consumed by the order manager with blocking pops.
pub struct RedisOrderManager {
    connection: ConnectionManager,
    orders_queue: String,
    trade_events_queue: String,
}

impl RedisOrderManager {
    pub async fn connect(url: &str, chain: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("connect redis")?;
        Ok(Self {
            connection,
            orders_queue: orders_queue(chain),
            trade_events_queue: trade_events_queue(chain),
        })
    }
}

pub fn orders_queue(chain: &str) -> String {
    format!("orderbook:manager:orders:{chain}")
}

pub fn trade_events_queue(chain: &str) -> String {
    format!("orderbook:manager:trade-events:{chain}")
}

#[async_trait]
impl OrderManaging for RedisOrderManager {
    async fn enqueue_order(&self, order: OrderSummary) -> Result<()> {
        let payload = serde_json::to_string(&order).context("serialize order summary")?;
        // ConnectionManager clones share the multiplexed connection.
        let mut connection = self.connection.clone();
        let _: i64 = connection
            .rpush(&self.orders_queue, payload)
            .await
            .context("rpush order summary")?;
        Ok(())
    }

    async fn enqueue_trade_event(&self, event: TradeEvent) -> Result<()> {
        let payload = serde_json::to_string(&event).context("serialize trade event")?;
        let mut connection = self.connection.clone();
        let _: i64 = connection
            .rpush(&self.trade_events_queue, payload)
            .await
            .context("rpush trade event")?;
        Ok(())
    }
}
