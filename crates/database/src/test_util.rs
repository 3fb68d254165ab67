//! Schema helpers for integration tests. The production schema is managed by
//! the deployment's migration tooling; these definitions exist so tests can
//! run against a scratch database inside a rolled-back transaction.

use crate::Tables;
use sqlx::{Executor, PgConnection};

/// Creates all tables of one `(project, chain)` deployment.
pub async fn create_all(ex: &mut PgConnection, tables: &Tables) -> sqlx::Result<()> {
    let Tables {
        orders,
        activities,
        items,
        collection_floor_price,
        indexed_status,
    } = tables;
    let statements = [
        format!(
            "CREATE TABLE IF NOT EXISTS {orders} ( \
             order_id TEXT PRIMARY KEY, \
             order_type SMALLINT NOT NULL, \
             order_status SMALLINT NOT NULL, \
             collection_address TEXT NOT NULL, \
             token_id TEXT NOT NULL, \
             price NUMERIC(78, 0) NOT NULL, \
             maker TEXT NOT NULL, \
             taker TEXT NOT NULL, \
             quantity_remaining BIGINT NOT NULL, \
             size BIGINT NOT NULL, \
             currency_address TEXT NOT NULL, \
             event_time BIGINT NOT NULL, \
             expire_time BIGINT NOT NULL, \
             salt BIGINT NOT NULL, \
             marketplace_id SMALLINT NOT NULL);"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {activities} ( \
             activity_type SMALLINT NOT NULL, \
             maker TEXT NOT NULL, \
             taker TEXT NOT NULL, \
             marketplace_id SMALLINT NOT NULL, \
             collection_address TEXT NOT NULL, \
             token_id TEXT NOT NULL, \
             currency_address TEXT NOT NULL, \
             price NUMERIC(78, 0) NOT NULL, \
             block_number BIGINT NOT NULL, \
             tx_hash TEXT NOT NULL, \
             event_time BIGINT NOT NULL, \
             UNIQUE (tx_hash, activity_type, collection_address, token_id));"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {items} ( \
             collection_address TEXT NOT NULL, \
             token_id TEXT NOT NULL, \
             owner TEXT NOT NULL, \
             PRIMARY KEY (collection_address, token_id));"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {collection_floor_price} ( \
             collection_address TEXT NOT NULL, \
             price NUMERIC(78, 0) NOT NULL, \
             event_time BIGINT NOT NULL, \
             create_time BIGINT NOT NULL, \
             update_time BIGINT NOT NULL, \
             PRIMARY KEY (collection_address, event_time));"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {indexed_status} ( \
             chain_id BIGINT NOT NULL, \
             index_type SMALLINT NOT NULL, \
             last_indexed_block BIGINT NOT NULL, \
             last_indexed_time BIGINT NOT NULL, \
             PRIMARY KEY (chain_id, index_type));"
        ),
    ];
    for statement in &statements {
        ex.execute(statement.as_str()).await?;
    }
    Ok(())
}

/// Seeds a cursor row the way an operator would before first start.
pub async fn seed_cursor(
    ex: &mut PgConnection,
    table: &str,
    chain_id: i64,
    index_type: i16,
    last_indexed_block: i64,
    last_indexed_time: i64,
) -> sqlx::Result<()> {
    let query = format!(
        "INSERT INTO {table} (chain_id, index_type, last_indexed_block, last_indexed_time) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (chain_id, index_type) \
         DO UPDATE SET last_indexed_block = EXCLUDED.last_indexed_block, \
                       last_indexed_time = EXCLUDED.last_indexed_time;"
    );
    sqlx::query(&query)
        .bind(chain_id)
        .bind(index_type)
        .bind(last_indexed_block)
        .bind(last_indexed_time)
        .execute(ex)
        .await?;
    Ok(())
}
