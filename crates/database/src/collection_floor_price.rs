use crate::orders::{OrderStatus, OrderType};
use bigdecimal::BigDecimal;
use sqlx::{PgConnection, Postgres, QueryBuilder};

/// One point of the per-collection floor price time series.
#[derive(Clone, Debug, Eq, PartialEq, sqlx::FromRow)]
pub struct FloorPrice {
    pub collection_address: String,
    /// Cheapest active listing in wei at `event_time`.
    pub price: BigDecimal,
    /// Snapshot time, unix seconds.
    pub event_time: i64,
    /// Row bookkeeping, unix milliseconds.
    pub create_time: i64,
    pub update_time: i64,
}

/// Result row of [`snapshot`].
#[derive(Clone, Debug, Eq, PartialEq, sqlx::FromRow)]
pub struct CollectionFloor {
    pub collection_address: String,
    pub price: BigDecimal,
}

/// Current floor per collection: the minimum price over active, unexpired
/// listings whose maker still owns the listed token. Listings whose maker sold
/// or transferred the token away no longer back a floor. Addresses are
/// compared (and returned) lowercased since stored columns may carry the
/// checksummed rendering.
pub async fn snapshot(
    ex: &mut PgConnection,
    orders_table: &str,
    items_table: &str,
    now: i64,
) -> sqlx::Result<Vec<CollectionFloor>> {
    let query = format!(
        "SELECT LOWER(o.collection_address) AS collection_address, MIN(o.price) AS price \
         FROM {items_table} i \
         JOIN {orders_table} o \
           ON LOWER(o.collection_address) = LOWER(i.collection_address) \
          AND o.token_id = i.token_id \
         WHERE o.order_type = $1 \
           AND o.order_status = $2 \
           AND o.expire_time > $3 \
           AND LOWER(o.maker) = LOWER(i.owner) \
         GROUP BY LOWER(o.collection_address);"
    );
    sqlx::query_as(&query)
        .bind(OrderType::Listing)
        .bind(OrderStatus::Active)
        .bind(now)
        .fetch_all(ex)
        .await
}

/// Appends one snapshot batch. The natural key is
/// `(collection_address, event_time)`; re-running a snapshot within the same
/// second only refreshes `update_time`.
pub async fn upsert_batch(
    ex: &mut PgConnection,
    table: &str,
    rows: &[FloorPrice],
) -> sqlx::Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "INSERT INTO {table} (collection_address, price, event_time, create_time, update_time) "
    ));
    builder.push_values(rows, |mut values, row| {
        values
            .push_bind(&row.collection_address)
            .push_bind(&row.price)
            .push_bind(row.event_time)
            .push_bind(row.create_time)
            .push_bind(row.update_time);
    });
    builder.push(
        " ON CONFLICT (collection_address, event_time) \
         DO UPDATE SET update_time = EXCLUDED.update_time",
    );
    builder.build().execute(ex).await?;
    Ok(())
}

/// Prunes points older than the retention window.
pub async fn delete_before(ex: &mut PgConnection, table: &str, cutoff: i64) -> sqlx::Result<u64> {
    let query = format!("DELETE FROM {table} WHERE event_time < $1;");
    let result = sqlx::query(&query).bind(cutoff).execute(ex).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{orders, Tables};
    use sqlx::Connection;

    fn point(collection: &str, event_time: i64, update_time: i64) -> FloorPrice {
        FloorPrice {
            collection_address: collection.to_string(),
            price: BigDecimal::from(1000),
            event_time,
            create_time: update_time,
            update_time,
        }
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_same_second_snapshot_upserts() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        let tables = Tables::new("test", "floor_upsert");
        crate::test_util::create_all(&mut db, &tables).await.unwrap();
        let table = &tables.collection_floor_price;

        upsert_batch(&mut db, table, &[point("0xc", 100, 100_000)]).await.unwrap();
        upsert_batch(&mut db, table, &[point("0xc", 100, 100_400)]).await.unwrap();

        let rows: Vec<FloorPrice> = sqlx::query_as(&format!("SELECT * FROM {table};"))
            .fetch_all(&mut *db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].create_time, 100_000);
        assert_eq!(rows[0].update_time, 100_400);

        // A later second is a fresh time series point.
        upsert_batch(&mut db, table, &[point("0xc", 101, 101_000)]).await.unwrap();
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table};"))
            .fetch_one(&mut *db)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_prune_expired_points() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        let tables = Tables::new("test", "floor_prune_rows");
        crate::test_util::create_all(&mut db, &tables).await.unwrap();
        let table = &tables.collection_floor_price;

        upsert_batch(
            &mut db,
            table,
            &[point("0xc", 100, 0), point("0xc", 200, 0), point("0xc", 300, 0)],
        )
        .await
        .unwrap();

        assert_eq!(delete_before(&mut db, table, 250).await.unwrap(), 2);
        let remaining: Vec<FloorPrice> = sqlx::query_as(&format!("SELECT * FROM {table};"))
            .fetch_all(&mut *db)
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].event_time, 300);
    }

    #[tokio::test]
    #[ignore]
    async fn postgres_snapshot_requires_owning_maker() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        let tables = Tables::new("test", "floor_snapshot");
        crate::test_util::create_all(&mut db, &tables).await.unwrap();

        let now = 1_000;
        crate::items::insert(&mut db, &tables.items, "0xcc", "1", "0xalice").await.unwrap();
        crate::items::insert(&mut db, &tables.items, "0xcc", "2", "0xbob").await.unwrap();

        let listing = |id: &str, token: &str, maker: &str, price: u32, expire: i64| orders::Order {
            order_id: id.to_string(),
            order_type: orders::OrderType::Listing,
            order_status: orders::OrderStatus::Active,
            collection_address: "0xCC".to_string(),
            token_id: token.to_string(),
            maker: maker.to_string(),
            price: BigDecimal::from(price),
            expire_time: expire,
            quantity_remaining: 1,
            size: 1,
            ..Default::default()
        };

        // Counted: active, unexpired, maker owns. Checksum-cased columns still
        // match the lowercase item key.
        orders::insert(&mut db, &tables.orders, &listing("0x1", "1", "0xAlice", 500, 2_000))
            .await
            .unwrap();
        // Ignored: maker no longer owns token 2.
        orders::insert(&mut db, &tables.orders, &listing("0x2", "2", "0xalice", 100, 2_000))
            .await
            .unwrap();
        // Ignored: expired.
        orders::insert(&mut db, &tables.orders, &listing("0x3", "1", "0xalice", 200, 900))
            .await
            .unwrap();
        // Counted, and cheaper than 0x1.
        orders::insert(&mut db, &tables.orders, &listing("0x4", "2", "0xbob", 400, 2_000))
            .await
            .unwrap();

        let floors = snapshot(&mut db, &tables.orders, &tables.items, now).await.unwrap();
        assert_eq!(floors.len(), 1);
        assert_eq!(floors[0].collection_address, "0xcc");
        assert_eq!(floors[0].price, BigDecimal::from(400));
    }
}
