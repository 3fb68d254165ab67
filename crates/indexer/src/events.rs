//! Decoding of raw logs into typed orderbook events.

use alloy_primitives::B256;
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use contracts::{LogCancel, LogMake, LogMatch};

/// Chain position of an event, used for activity rows and block time lookups.
#[derive(Clone, Copy, Debug)]
pub struct EventMeta {
    pub block_number: u64,
    pub tx_hash: B256,
}

#[derive(Debug)]
pub enum OrderbookEvent {
    Make(LogMake),
    Cancel(LogCancel),
    Match(LogMatch),
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The node returned a log without the field; only possible for pending
    /// logs, which the tailer never requests.
    #[error("log is missing its {0}")]
    MissingMeta(&'static str),
    #[error("malformed {event} payload: {source}")]
    Payload {
        event: &'static str,
        source: alloy_sol_types::Error,
    },
}

/// Decodes a log into a typed orderbook event.
///
/// Logs whose topic0 the indexer does not track (admin events, events added
/// in future contract upgrades) decode to `None` and are skipped silently.
pub fn decode(log: &Log) -> Result<Option<(EventMeta, OrderbookEvent)>, DecodeError> {
    let Some(topic0) = log.inner.data.topics().first() else {
        return Ok(None);
    };
    let event = if *topic0 == LogMake::SIGNATURE_HASH {
        OrderbookEvent::Make(decode_data::<LogMake>(log)?)
    } else if *topic0 == LogCancel::SIGNATURE_HASH {
        OrderbookEvent::Cancel(decode_data::<LogCancel>(log)?)
    } else if *topic0 == LogMatch::SIGNATURE_HASH {
        OrderbookEvent::Match(decode_data::<LogMatch>(log)?)
    } else {
        return Ok(None);
    };
    let meta = EventMeta {
        block_number: log
            .block_number
            .ok_or(DecodeError::MissingMeta("block number"))?,
        tx_hash: log
            .transaction_hash
            .ok_or(DecodeError::MissingMeta("transaction hash"))?,
    };
    Ok(Some((meta, event)))
}

fn decode_data<T: SolEvent>(log: &Log) -> Result<T, DecodeError> {
    T::decode_log_data(&log.inner.data).map_err(|source| DecodeError::Payload {
        event: T::SIGNATURE,
        source,
    })
}
