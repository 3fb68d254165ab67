use bigdecimal::BigDecimal;
use sqlx::PgConnection;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, sqlx::Type)]
#[repr(i16)]
pub enum OrderType {
    #[default]
    Listing = 0,
    CollectionBid = 1,
    ItemBid = 2,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, sqlx::Type)]
#[repr(i16)]
pub enum OrderStatus {
    #[default]
    Active = 0,
    Filled = 1,
    Cancelled = 2,
    Expired = 3,
}

/// One row in the orders table: the off-chain mirror of an on-chain order.
#[derive(Clone, Debug, Default, Eq, PartialEq, sqlx::FromRow)]
pub struct Order {
    /// 32 byte order key, `0x`-prefixed lowercase hex.
    pub order_id: String,
    pub order_type: OrderType,
    pub order_status: OrderStatus,
    pub collection_address: String,
    /// Decimal string; token ids do not fit in any native integer.
    pub token_id: String,
    /// Unit price in wei.
    pub price: BigDecimal,
    pub maker: String,
    pub taker: String,
    pub quantity_remaining: i64,
    pub size: i64,
    pub currency_address: String,
    pub event_time: i64,
    pub expire_time: i64,
    pub salt: i64,
    pub marketplace_id: i16,
}

const COLUMNS: &str = "order_id, order_type, order_status, collection_address, token_id, price, \
                       maker, taker, quantity_remaining, size, currency_address, event_time, \
                       expire_time, salt, marketplace_id";

/// Inserts a new order. Re-delivered events are a no-op: the row is keyed by
/// `order_id` and conflicts are ignored.
pub async fn insert(ex: &mut PgConnection, table: &str, order: &Order) -> sqlx::Result<()> {
    let query = format!(
        "INSERT INTO {table} ({COLUMNS}) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         ON CONFLICT DO NOTHING;"
    );
    sqlx::query(&query)
        .bind(&order.order_id)
        .bind(order.order_type)
        .bind(order.order_status)
        .bind(&order.collection_address)
        .bind(&order.token_id)
        .bind(&order.price)
        .bind(&order.maker)
        .bind(&order.taker)
        .bind(order.quantity_remaining)
        .bind(order.size)
        .bind(&order.currency_address)
        .bind(order.event_time)
        .bind(order.expire_time)
        .bind(order.salt)
        .bind(order.marketplace_id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn fetch(
    ex: &mut PgConnection,
    table: &str,
    order_id: &str,
) -> sqlx::Result<Option<Order>> {
    let query = format!("SELECT {COLUMNS} FROM {table} WHERE order_id = $1;");
    sqlx::query_as(&query).bind(order_id).fetch_optional(ex).await
}

/// Marks an order cancelled. Setting the status twice is a no-op, which keeps
/// batch replays idempotent.
pub async fn mark_cancelled(
    ex: &mut PgConnection,
    table: &str,
    order_id: &str,
) -> sqlx::Result<u64> {
    let query = format!("UPDATE {table} SET order_status = $1 WHERE order_id = $2;");
    let result = sqlx::query(&query)
        .bind(OrderStatus::Cancelled)
        .bind(order_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}

/// Settles the sell side of a match: filled, nothing remaining, taker
/// recorded.
pub async fn fill_sell_order(
    ex: &mut PgConnection,
    table: &str,
    order_id: &str,
    taker: &str,
) -> sqlx::Result<u64> {
    let query = format!(
        "UPDATE {table} SET order_status = $1, quantity_remaining = 0, taker = $2 \
         WHERE order_id = $3;"
    );
    let result = sqlx::query(&query)
        .bind(OrderStatus::Filled)
        .bind(taker)
        .bind(order_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}

/// Settles the buy side of a match once its last unit is consumed. The taker
/// column is left untouched: a bid can be filled by many sellers and no single
/// counterparty would be meaningful.
pub async fn fill_buy_order(
    ex: &mut PgConnection,
    table: &str,
    order_id: &str,
) -> sqlx::Result<u64> {
    let query = format!(
        "UPDATE {table} SET order_status = $1, quantity_remaining = 0 WHERE order_id = $2;"
    );
    let result = sqlx::query(&query)
        .bind(OrderStatus::Filled)
        .bind(order_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}

pub async fn set_quantity_remaining(
    ex: &mut PgConnection,
    table: &str,
    order_id: &str,
    quantity_remaining: i64,
) -> sqlx::Result<u64> {
    let query = format!("UPDATE {table} SET quantity_remaining = $1 WHERE order_id = $2;");
    let result = sqlx::query(&query)
        .bind(quantity_remaining)
        .bind(order_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tables;
    use sqlx::Connection;

    fn order(id: &str) -> Order {
        Order {
            order_id: id.to_string(),
            quantity_remaining: 3,
            size: 3,
            ..Default::default()
        }
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_insert_is_idempotent() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        let tables = Tables::new("test", "orders_insert");
        crate::test_util::create_all(&mut db, &tables).await.unwrap();

        let order = order("0x11");
        insert(&mut db, &tables.orders, &order).await.unwrap();
        insert(&mut db, &tables.orders, &order).await.unwrap();

        let fetched = fetch(&mut db, &tables.orders, "0x11").await.unwrap().unwrap();
        assert_eq!(fetched, order);
        assert!(fetch(&mut db, &tables.orders, "0x22").await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_lifecycle_updates() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        let tables = Tables::new("test", "orders_lifecycle");
        crate::test_util::create_all(&mut db, &tables).await.unwrap();

        insert(&mut db, &tables.orders, &order("0xaa")).await.unwrap();
        insert(&mut db, &tables.orders, &order("0xbb")).await.unwrap();

        // Cancelling twice affects one row each time but the end state is the
        // same.
        assert_eq!(mark_cancelled(&mut db, &tables.orders, "0xaa").await.unwrap(), 1);
        assert_eq!(mark_cancelled(&mut db, &tables.orders, "0xaa").await.unwrap(), 1);
        let cancelled = fetch(&mut db, &tables.orders, "0xaa").await.unwrap().unwrap();
        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);

        fill_sell_order(&mut db, &tables.orders, "0xbb", "0xtaker").await.unwrap();
        let filled = fetch(&mut db, &tables.orders, "0xbb").await.unwrap().unwrap();
        assert_eq!(filled.order_status, OrderStatus::Filled);
        assert_eq!(filled.quantity_remaining, 0);
        assert_eq!(filled.taker, "0xtaker");

        // Updating a missing order is visible to the caller.
        assert_eq!(mark_cancelled(&mut db, &tables.orders, "0xcc").await.unwrap(), 0);
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_partial_fill_decrement() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        let tables = Tables::new("test", "orders_partial");
        crate::test_util::create_all(&mut db, &tables).await.unwrap();

        insert(&mut db, &tables.orders, &order("0xbid")).await.unwrap();
        set_quantity_remaining(&mut db, &tables.orders, "0xbid", 2).await.unwrap();
        let bid = fetch(&mut db, &tables.orders, "0xbid").await.unwrap().unwrap();
        assert_eq!(bid.order_status, OrderStatus::Active);
        assert_eq!(bid.quantity_remaining, 2);

        fill_buy_order(&mut db, &tables.orders, "0xbid").await.unwrap();
        let bid = fetch(&mut db, &tables.orders, "0xbid").await.unwrap().unwrap();
        assert_eq!(bid.order_status, OrderStatus::Filled);
        assert_eq!(bid.quantity_remaining, 0);
        // `fill_buy_order` never assigns a taker.
        assert_eq!(bid.taker, "");
    }
}
