use crate::{
    arguments::Arguments,
    chain::{ChainClient, RpcChainClient},
    floor::FloorPriceMaintainer,
    projector::Projector,
    tailer::Tailer,
};
use anyhow::Result;
use clap::Parser;
use database::Tables;
use order_manager::{OrderManaging, RedisOrderManager};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub async fn start(args: impl Iterator<Item = String>) {
    let args = Arguments::parse_from(args);
    observe::tracing::initialize(&args.log_filter);
    observe::panic_hook::install();
    tracing::info!("running orderbook indexer with validated arguments:\n{args}");
    observe::metrics::setup_registry(Some("orderbook_indexer".into()), None);
    run(args).await
}

/// Assumes tracing and the metrics registry have already been set up.
pub async fn run(args: Arguments) {
    let pool = PgPool::connect(args.db_url.as_str())
        .await
        .expect("connect postgres");
    let chain_client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(&args.node_url));
    let order_manager: Arc<dyn OrderManaging> = Arc::new(
        RedisOrderManager::connect(args.redis_url.as_str(), &args.chain)
            .await
            .expect("connect redis"),
    );
    let tables = Tables::new(&args.project, &args.chain);
    let shutdown = CancellationToken::new();

    let projector = Projector::new(
        tables.clone(),
        chain_client.clone(),
        order_manager,
        args.currency_address,
    );
    let tailer = Tailer::new(
        pool.clone(),
        tables.clone(),
        chain_client,
        projector,
        args.chain_id,
        args.chain.clone(),
        args.dex_address,
        shutdown.clone(),
    );
    let floor = FloorPriceMaintainer::new(
        pool,
        tables,
        args.project,
        args.chain_id,
        args.floor_refresh_interval,
        args.floor_retention,
        args.db_batch_size,
        shutdown.clone(),
    );

    let mut tasks: JoinSet<Result<()>> = JoinSet::new();
    tasks.spawn(tailer.run());
    tasks.spawn(floor.run());

    // Tasks run until the process is told to stop. A task ending on its own
    // means it hit a fatal condition; there is no in-process restart, the
    // orchestrator restarts us instead.
    tokio::select! {
        _ = shutdown_signal() => tracing::info!("exit by signal"),
        task = tasks.join_next() => match task {
            Some(Ok(Ok(()))) => tracing::error!("task exited unexpectedly"),
            Some(Ok(Err(err))) => tracing::error!(?err, "task failed"),
            Some(Err(err)) => tracing::error!(?err, "task panicked"),
            None => (),
        },
    }

    shutdown.cancel();
    while let Some(task) = tasks.join_next().await {
        match task {
            Ok(Ok(())) => (),
            Ok(Err(err)) => tracing::warn!(?err, "task exited with error during shutdown"),
            Err(err) => tracing::warn!(?err, "task panicked during shutdown"),
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => (),
        _ = sigterm.recv() => (),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
