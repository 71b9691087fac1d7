//! Chain access seam.
//!
//! The orchestrator only talks to a node through [`ChainClient`]; the
//! production implementation wraps an alloy HTTP provider, tests use an
//! in-memory chain.

mod client;
#[cfg(test)]
pub(crate) mod mock;
mod wallet;

use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;

use crate::error::MinterResult;

pub use client::{AlloyClient, AlloyConnector};
pub use wallet::Wallet;

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub success: bool,
    pub gas_used: u64,
    pub block_number: Option<u64>,
}

/// Read and write access to one EVM node
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    async fn chain_id(&self) -> MinterResult<u64>;

    /// Pending-inclusive nonce for `address`
    async fn transaction_count(&self, address: Address) -> MinterResult<u64>;

    async fn balance(&self, address: Address) -> MinterResult<U256>;

    async fn gas_price(&self) -> MinterResult<u128>;

    /// `eth_call` against `to`; a node error response is `CallFailed`
    async fn call(&self, to: Address, data: Bytes) -> MinterResult<Bytes>;

    async fn estimate_gas(&self, tx: &TransactionRequest) -> MinterResult<u64>;

    /// Broadcast a signed, EIP-2718 encoded transaction
    async fn submit(&self, raw: Bytes) -> MinterResult<TxHash>;

    /// Poll for the receipt until it appears or `timeout` elapses
    async fn wait_for_receipt(&self, tx_hash: TxHash, timeout: Duration) -> MinterResult<Receipt>;
}

/// Opens a [`ChainClient`] for an RPC URL
#[allow(async_fn_in_trait)]
pub trait Connector: Clone {
    type Client: ChainClient;

    async fn connect(&self, rpc_url: &str) -> MinterResult<Self::Client>;
}
