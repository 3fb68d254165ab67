//! Folds decoded orderbook events into order, activity and item state.
//!
//! Handlers are best effort per event: a failure aborts the current event but
//! never the batch loop, and every write is idempotent against batch replays
//! (inserts ignore conflicts, status updates converge). The one exception is
//! the partial fill decrement in the match handler, see the note there.

use crate::{
    chain::ChainClient,
    events::{EventMeta, OrderbookEvent},
    util::now_seconds,
};
use alloy_primitives::Address;
use bigdecimal::BigDecimal;
use contracts::{sale_kind, side, LogCancel, LogMake, LogMatch};
use database::{
    activities::{self, Activity, ActivityType},
    items,
    orders::{self, Order, OrderStatus, OrderType},
    Tables, MARKETPLACE_ORDER_BOOK,
};
use order_manager::{OrderManaging, OrderSummary, TradeEvent, TradeEventKind};
use sqlx::PgConnection;
use std::sync::Arc;

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

pub struct Projector {
    tables: Tables,
    chain: Arc<dyn ChainClient>,
    order_manager: Arc<dyn OrderManaging>,
    /// Stored on every order and activity row.
    currency_address: String,
}

impl Projector {
    pub fn new(
        tables: Tables,
        chain: Arc<dyn ChainClient>,
        order_manager: Arc<dyn OrderManaging>,
        currency_address: Address,
    ) -> Self {
        Self {
            tables,
            chain,
            order_manager,
            currency_address: currency_address.to_string(),
        }
    }

    pub async fn apply(&self, ex: &mut PgConnection, meta: &EventMeta, event: &OrderbookEvent) {
        match event {
            OrderbookEvent::Make(event) => self.on_make(ex, meta, event).await,
            OrderbookEvent::Cancel(event) => self.on_cancel(ex, meta, event).await,
            OrderbookEvent::Match(event) => self.on_match(ex, meta, event).await,
        }
    }

    async fn on_make(&self, ex: &mut PgConnection, meta: &EventMeta, event: &LogMake) {
        let order_id = event.orderKey.to_string();
        let Ok(amount) = i64::try_from(event.nft.amount) else {
            tracing::error!(%order_id, "order amount exceeds i64");
            return;
        };
        let (order_type, activity_type) = classify(event.side, event.saleKind);
        let order = Order {
            order_id: order_id.clone(),
            order_type,
            order_status: OrderStatus::Active,
            collection_address: event.nft.collection.to_string(),
            token_id: event.nft.tokenId.to_string(),
            price: BigDecimal::from(event.price),
            maker: event.maker.to_string(),
            taker: ZERO_ADDRESS.to_string(),
            quantity_remaining: amount,
            size: amount,
            currency_address: self.currency_address.clone(),
            event_time: now_seconds(),
            expire_time: saturating_i64(event.expiry),
            salt: saturating_i64(event.salt),
            marketplace_id: MARKETPLACE_ORDER_BOOK,
        };
        if let Err(err) = orders::insert(ex, &self.tables.orders, &order).await {
            tracing::error!(?err, %order_id, "failed to insert order");
        }

        let Some(block_time) = self.block_time(meta).await else {
            return;
        };
        let activity = Activity {
            activity_type,
            maker: event.maker.to_string(),
            taker: ZERO_ADDRESS.to_string(),
            marketplace_id: MARKETPLACE_ORDER_BOOK,
            collection_address: event.nft.collection.to_string(),
            token_id: event.nft.tokenId.to_string(),
            currency_address: self.currency_address.clone(),
            price: BigDecimal::from(event.price),
            block_number: saturating_i64(meta.block_number),
            tx_hash: meta.tx_hash.to_string(),
            event_time: block_time,
        };
        if let Err(err) = activities::insert(ex, &self.tables.activities, &activity).await {
            tracing::warn!(?err, %order_id, "failed to insert activity");
        }

        let summary = OrderSummary {
            order_id: order.order_id,
            collection_address: order.collection_address,
            token_id: order.token_id,
            price: order.price,
            maker: order.maker,
            expire_time: order.expire_time,
        };
        if let Err(err) = self.order_manager.enqueue_order(summary).await {
            tracing::error!(?err, "failed to add order to manager queue");
        }
    }

    async fn on_cancel(&self, ex: &mut PgConnection, meta: &EventMeta, event: &LogCancel) {
        let order_id = event.orderKey.to_string();
        if let Err(err) = orders::mark_cancelled(ex, &self.tables.orders, &order_id).await {
            tracing::error!(?err, %order_id, "failed to update order status");
            return;
        }
        let order = match orders::fetch(ex, &self.tables.orders, &order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                tracing::warn!(%order_id, "cancelled order is not tracked");
                return;
            }
            Err(err) => {
                tracing::error!(?err, %order_id, "failed to get cancelled order");
                return;
            }
        };

        let Some(block_time) = self.block_time(meta).await else {
            return;
        };
        let activity = Activity {
            activity_type: cancel_activity(order.order_type),
            maker: order.maker,
            taker: ZERO_ADDRESS.to_string(),
            marketplace_id: MARKETPLACE_ORDER_BOOK,
            collection_address: order.collection_address.clone(),
            token_id: order.token_id.clone(),
            currency_address: self.currency_address.clone(),
            price: order.price,
            block_number: saturating_i64(meta.block_number),
            tx_hash: meta.tx_hash.to_string(),
            event_time: block_time,
        };
        if let Err(err) = activities::insert(ex, &self.tables.activities, &activity).await {
            tracing::warn!(?err, %order_id, "failed to insert activity");
        }

        let trade_event = TradeEvent {
            order_id,
            collection_address: order.collection_address,
            token_id: order.token_id,
            from: String::new(),
            to: String::new(),
            event_type: TradeEventKind::Cancel,
        };
        if let Err(err) = self.order_manager.enqueue_trade_event(trade_event).await {
            tracing::error!(?err, "failed to add cancel event to manager queue");
        }
    }

    async fn on_match(&self, ex: &mut PgConnection, meta: &EventMeta, event: &LogMatch) {
        let make_order_id = event.makeOrderKey.to_string();
        let take_order_id = event.takeOrderKey.to_string();

        // When the maker side is a bid the taker is a seller executing it, so
        // the take order is the sell side and the asset comes from it; when
        // the maker listed, roles flip.
        let (sell_order_id, buy_order_id, new_owner, collection, token_id, from, to) =
            if event.makeOrder.side == side::BID {
                (
                    take_order_id,
                    make_order_id,
                    event.makeOrder.maker,
                    event.takeOrder.nft.collection,
                    event.takeOrder.nft.tokenId.to_string(),
                    event.takeOrder.maker,
                    event.makeOrder.maker,
                )
            } else {
                (
                    make_order_id,
                    take_order_id,
                    event.takeOrder.maker,
                    event.makeOrder.nft.collection,
                    event.makeOrder.nft.tokenId.to_string(),
                    event.makeOrder.maker,
                    event.takeOrder.maker,
                )
            };

        if let Err(err) =
            orders::fill_sell_order(ex, &self.tables.orders, &sell_order_id, &to.to_string()).await
        {
            tracing::error!(?err, order_id = %sell_order_id, "failed to fill sell order");
            return;
        }

        let buy_order = match orders::fetch(ex, &self.tables.orders, &buy_order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                // The buy side was created outside this platform; there is
                // nothing to keep in sync.
                tracing::info!(order_id = %buy_order_id, "buy order is not tracked");
                return;
            }
            Err(err) => {
                tracing::error!(?err, order_id = %buy_order_id, "failed to get buy order");
                return;
            }
        };
        // A replayed batch decrements again; accepted, see the module note.
        let update = if buy_order.quantity_remaining > 1 {
            orders::set_quantity_remaining(
                ex,
                &self.tables.orders,
                &buy_order_id,
                buy_order.quantity_remaining - 1,
            )
            .await
        } else {
            orders::fill_buy_order(ex, &self.tables.orders, &buy_order_id).await
        };
        if let Err(err) = update {
            tracing::error!(?err, order_id = %buy_order_id, "failed to update buy order");
            return;
        }

        let Some(block_time) = self.block_time(meta).await else {
            return;
        };
        let activity = Activity {
            activity_type: ActivityType::Sale,
            maker: event.makeOrder.maker.to_string(),
            taker: event.takeOrder.maker.to_string(),
            marketplace_id: MARKETPLACE_ORDER_BOOK,
            collection_address: collection.to_string(),
            token_id: token_id.clone(),
            currency_address: self.currency_address.clone(),
            price: BigDecimal::from(event.fillPrice),
            block_number: saturating_i64(meta.block_number),
            tx_hash: meta.tx_hash.to_string(),
            event_time: block_time,
        };
        if let Err(err) = activities::insert(ex, &self.tables.activities, &activity).await {
            tracing::warn!(?err, "failed to insert activity");
        }

        if let Err(err) = items::update_owner(
            ex,
            &self.tables.items,
            &collection.to_string().to_lowercase(),
            &token_id,
            &new_owner.to_string().to_lowercase(),
        )
        .await
        {
            tracing::error!(?err, %token_id, "failed to update item owner");
            return;
        }

        let trade_event = TradeEvent {
            order_id: sell_order_id,
            collection_address: collection.to_string(),
            token_id,
            from: from.to_string(),
            to: to.to_string(),
            event_type: TradeEventKind::Buy,
        };
        if let Err(err) = self.order_manager.enqueue_trade_event(trade_event).await {
            tracing::error!(?err, "failed to add sale event to manager queue");
        }
    }

    async fn block_time(&self, meta: &EventMeta) -> Option<i64> {
        match self.chain.block_time(meta.block_number).await {
            Ok(time) => Some(saturating_i64(time)),
            Err(err) => {
                tracing::error!(?err, block = meta.block_number, "failed to get block time");
                None
            }
        }
    }
}

/// Maps the on-chain (side, sale kind) pair onto order and activity types.
fn classify(order_side: u8, order_sale_kind: u8) -> (OrderType, ActivityType) {
    if order_side == side::BID {
        if order_sale_kind == sale_kind::FIX_FOR_COLLECTION {
            (OrderType::CollectionBid, ActivityType::CollectionBid)
        } else {
            (OrderType::ItemBid, ActivityType::ItemBid)
        }
    } else {
        (OrderType::Listing, ActivityType::Listing)
    }
}

fn cancel_activity(order_type: OrderType) -> ActivityType {
    match order_type {
        OrderType::Listing => ActivityType::CancelListing,
        OrderType::CollectionBid => ActivityType::CancelCollectionBid,
        OrderType::ItemBid => ActivityType::CancelItemBid,
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
