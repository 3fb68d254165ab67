use sqlx::PgConnection;

/// Cursor row for the orderbook event tailer.
pub const EVENT_INDEX: i16 = 1;
/// Cursor row for the floor price maintenance loop.
pub const FLOOR_CHANGE_INDEX: i16 = 2;

/// Persistent indexing cursor, one row per `(chain_id, index_type)`.
///
/// Rows are seeded by the operator (the starting block of a deployment is a
/// deliberate choice, not something the indexer can guess), so there is no
/// insert here: only fetch and advance.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, sqlx::FromRow)]
pub struct IndexedStatus {
    pub last_indexed_block: i64,
    pub last_indexed_time: i64,
}

pub async fn fetch(
    ex: &mut PgConnection,
    table: &str,
    chain_id: i64,
    index_type: i16,
) -> sqlx::Result<Option<IndexedStatus>> {
    let query = format!(
        "SELECT last_indexed_block, last_indexed_time FROM {table} \
         WHERE chain_id = $1 AND index_type = $2;"
    );
    sqlx::query_as(&query)
        .bind(chain_id)
        .bind(index_type)
        .fetch_optional(ex)
        .await
}

pub async fn update_last_indexed_block(
    ex: &mut PgConnection,
    table: &str,
    chain_id: i64,
    index_type: i16,
    last_indexed_block: i64,
) -> sqlx::Result<u64> {
    let query = format!(
        "UPDATE {table} SET last_indexed_block = $1 WHERE chain_id = $2 AND index_type = $3;"
    );
    let result = sqlx::query(&query)
        .bind(last_indexed_block)
        .bind(chain_id)
        .bind(index_type)
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}
