use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::{BlockNumberOrTag, Filter, Log};
use anyhow::{Context, Result};
use url::Url;

/// Read-only chain access as needed by the tailer and projector.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Current head of the chain.
    async fn block_number(&self) -> Result<u64>;

    /// All logs emitted by `address` within the inclusive block range, in
    /// (block number, log index) order.
    async fn filter_logs(
        &self,
        from_block: u64,
        to_block: u64,
        address: Address,
    ) -> Result<Vec<Log>>;

    /// Unix timestamp of the given block, in seconds.
    async fn block_time(&self, block_number: u64) -> Result<u64>;
}

pub struct RpcChainClient {
    provider: DynProvider,
}

impl RpcChainClient {
    pub fn new(node_url: &Url) -> Self {
        let provider = ProviderBuilder::new().connect_http(node_url.clone());
        Self {
            provider: provider.erased(),
        }
    }
}

#[async_trait::async_trait]
impl ChainClient for RpcChainClient {
    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("eth_blockNumber")
    }

    async fn filter_logs(
        &self,
        from_block: u64,
        to_block: u64,
        address: Address,
    ) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .address(address);
        self.provider.get_logs(&filter).await.context("eth_getLogs")
    }

    async fn block_time(&self, block_number: u64) -> Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(block_number))
            .await
            .context("eth_getBlockByNumber")?
            .with_context(|| format!("block {block_number} not found"))?;
        Ok(block.header.timestamp)
    }
}
