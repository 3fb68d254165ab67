use bigdecimal::BigDecimal;
use sqlx::PgConnection;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, sqlx::Type)]
#[repr(i16)]
pub enum ActivityType {
    #[default]
    Listing = 1,
    CollectionBid = 2,
    ItemBid = 3,
    Sale = 4,
    CancelListing = 5,
    CancelCollectionBid = 6,
    CancelItemBid = 7,
}

/// Append-only audit entry. Rows are never updated or deleted; the natural
/// key lives in the table definition and duplicate ingestion is ignored.
#[derive(Clone, Debug, Default, Eq, PartialEq, sqlx::FromRow)]
pub struct Activity {
    pub activity_type: ActivityType,
    pub maker: String,
    pub taker: String,
    pub marketplace_id: i16,
    pub collection_address: String,
    pub token_id: String,
    pub currency_address: String,
    pub price: BigDecimal,
    pub block_number: i64,
    pub tx_hash: String,
    pub event_time: i64,
}

pub async fn insert(ex: &mut PgConnection, table: &str, activity: &Activity) -> sqlx::Result<()> {
    let query = format!(
        "INSERT INTO {table} (activity_type, maker, taker, marketplace_id, collection_address, \
         token_id, currency_address, price, block_number, tx_hash, event_time) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         ON CONFLICT DO NOTHING;"
    );
    sqlx::query(&query)
        .bind(activity.activity_type)
        .bind(&activity.maker)
        .bind(&activity.taker)
        .bind(activity.marketplace_id)
        .bind(&activity.collection_address)
        .bind(&activity.token_id)
        .bind(&activity.currency_address)
        .bind(&activity.price)
        .bind(activity.block_number)
        .bind(&activity.tx_hash)
        .bind(activity.event_time)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn count(ex: &mut PgConnection, table: &str) -> sqlx::Result<i64> {
    let query = format!("SELECT COUNT(*) FROM {table};");
    sqlx::query_scalar(&query).fetch_one(ex).await
}

/// All activities recorded for one transaction, e.g. for activity feeds.
pub async fn fetch_by_tx(
    ex: &mut PgConnection,
    table: &str,
    tx_hash: &str,
) -> sqlx::Result<Vec<Activity>> {
    let query = format!(
        "SELECT activity_type, maker, taker, marketplace_id, collection_address, token_id, \
         currency_address, price, block_number, tx_hash, event_time \
         FROM {table} WHERE tx_hash = $1;"
    );
    sqlx::query_as(&query).bind(tx_hash).fetch_all(ex).await
}
