use sqlx::PgConnection;

/// Reassigns an item to its new owner after a sale. Both parts of the key are
/// expected in lowercase; callers normalize before looking rows up.
pub async fn update_owner(
    ex: &mut PgConnection,
    table: &str,
    collection_address: &str,
    token_id: &str,
    owner: &str,
) -> sqlx::Result<u64> {
    let query = format!(
        "UPDATE {table} SET owner = $1 WHERE collection_address = $2 AND token_id = $3;"
    );
    let result = sqlx::query(&query)
        .bind(owner)
        .bind(collection_address)
        .bind(token_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}

/// Seeds an item row. Items are normally maintained by a separate collection
/// importer; the indexer only mutates `owner`. Used by tests and backstops.
pub async fn insert(
    ex: &mut PgConnection,
    table: &str,
    collection_address: &str,
    token_id: &str,
    owner: &str,
) -> sqlx::Result<()> {
    let query = format!(
        "INSERT INTO {table} (collection_address, token_id, owner) VALUES ($1, $2, $3) \
         ON CONFLICT DO NOTHING;"
    );
    sqlx::query(&query)
        .bind(collection_address)
        .bind(token_id)
        .bind(owner)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn owner_of(
    ex: &mut PgConnection,
    table: &str,
    collection_address: &str,
    token_id: &str,
) -> sqlx::Result<Option<String>> {
    let query = format!(
        "SELECT owner FROM {table} WHERE collection_address = $1 AND token_id = $2;"
    );
    sqlx::query_scalar(&query)
        .bind(collection_address)
        .bind(token_id)
        .fetch_optional(ex)
        .await
}
