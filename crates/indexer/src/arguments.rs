use alloy_primitives::Address;
use std::{fmt, fmt::Display, num::ParseIntError, time::Duration};
use url::Url;

#[derive(clap::Parser)]
pub struct Arguments {
    /// Tracing filter directives, `RUST_LOG` syntax.
    #[clap(long, env, default_value = "warn,indexer=debug,database=debug")]
    pub log_filter: String,

    /// Url of the Postgres database. By default connects to locally running
    /// postgres.
    #[clap(long, env, default_value = "postgresql://")]
    pub db_url: Url,

    /// JSON-RPC node of the chain being indexed.
    #[clap(long, env)]
    pub node_url: Url,

    /// Redis instance backing the order manager queues.
    #[clap(long, env, default_value = "redis://localhost")]
    pub redis_url: Url,

    /// Canonical chain name. Scopes table names and queue names, and keys the
    /// confirmation depth table.
    #[clap(long, env, default_value = "eth")]
    pub chain: String,

    #[clap(long, env, default_value = "1")]
    pub chain_id: i64,

    /// Project namespace; used as the table name prefix. Floor price
    /// snapshots are only maintained for the orderbook dex project.
    #[clap(long, env, default_value = "orderbook_dex")]
    pub project: String,

    /// Address of the orderbook exchange contract whose events are indexed.
    #[clap(long, env)]
    pub dex_address: Address,

    /// Currency recorded on orders and activities, i.e. the chain's wrapped
    /// native token.
    #[clap(long, env)]
    pub currency_address: Address,

    /// How often the per-collection floor price snapshot is recomputed.
    /// Expects a value in seconds.
    #[clap(long, env, default_value = "300", value_parser = duration_from_seconds)]
    pub floor_refresh_interval: Duration,

    /// How long floor price time series points are retained before the daily
    /// prune deletes them. Expects a value in seconds.
    #[clap(long, env, default_value = "604800", value_parser = duration_from_seconds)]
    pub floor_retention: Duration,

    /// Maximum number of rows per floor snapshot insert statement.
    #[clap(long, env, default_value = "500")]
    pub db_batch_size: usize,
}

pub fn duration_from_seconds(s: &str) -> Result<Duration, ParseIntError> {
    Ok(Duration::from_secs(s.parse()?))
}

impl Display for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "log_filter: {}", self.log_filter)?;
        // Connection urls can embed credentials.
        writeln!(f, "db_url: SECRET")?;
        writeln!(f, "node_url: SECRET")?;
        writeln!(f, "redis_url: SECRET")?;
        writeln!(f, "chain: {}", self.chain)?;
        writeln!(f, "chain_id: {}", self.chain_id)?;
        writeln!(f, "project: {}", self.project)?;
        writeln!(f, "dex_address: {}", self.dex_address)?;
        writeln!(f, "currency_address: {}", self.currency_address)?;
        writeln!(f, "floor_refresh_interval: {:?}", self.floor_refresh_interval)?;
        writeln!(f, "floor_retention: {:?}", self.floor_retention)?;
        writeln!(f, "db_batch_size: {}", self.db_batch_size)?;
        Ok(())
    }
}
