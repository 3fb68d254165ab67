pub mod activities;
pub mod collection_floor_price;
pub mod indexed_status;
pub mod items;
pub mod orders;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

// Design:
//
// Functions that execute a single statement take `&mut PgConnection` so
// callers can decide whether to run them standalone or as part of a bigger
// transaction. We usually call the parameter `ex` for `Executor` which is the
// trait whose methods we use to run queries.
//
// Table names carry a `(project, chain)` prefix and are computed once at
// startup into a `Tables` value. Identifiers cannot be bound as query
// parameters, so queries interpolate the precomputed name and bind everything
// else.
//
// For tests a useful pattern is to start a transaction at the beginning of the
// test, use it for all queries and never commit it. When the uncommited
// transaction gets dropped it is rolled back. This allows postgres tests to
// run in parallel and makes clearing tables at the beginning of a test
// obsolete.

/// Fully qualified table names for one `(project, chain)` deployment.
#[derive(Clone, Debug)]
pub struct Tables {
    pub orders: String,
    pub activities: String,
    pub items: String,
    pub collection_floor_price: String,
    /// Cursor table. Shared across chains of a project; rows are keyed by
    /// `(chain_id, index_type)`.
    pub indexed_status: String,
}

impl Tables {
    pub fn new(project: &str, chain: &str) -> Self {
        Self {
            orders: format!("{project}_{chain}_orders"),
            activities: format!("{project}_{chain}_activities"),
            items: format!("{project}_{chain}_items"),
            collection_floor_price: format!("{project}_{chain}_collection_floor_price"),
            indexed_status: format!("{project}_indexed_status"),
        }
    }
}

/// The marketplace this indexer mirrors; orders and activities written by it
/// always carry this id.
pub const MARKETPLACE_ORDER_BOOK: i16 = 1;
