//! In-memory chain for orchestrator tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, TxHash, U256, keccak256};
use alloy::rpc::types::TransactionRequest;

use super::{ChainClient, Connector, Receipt};
use crate::error::{MinterError, MinterResult};

#[derive(Debug, Clone)]
pub(crate) enum MockResponse {
    Return(Bytes),
    Revert(String),
    Transport(String),
}

#[derive(Debug)]
pub(crate) struct MockState {
    pub chain_id: u64,
    pub nonce: u64,
    pub balance: U256,
    pub gas_price: u128,
    pub gas_estimate: Option<u64>,
    pub receipt_success: bool,
    pub fail_connect: bool,
    pub responses: HashMap<[u8; 4], MockResponse>,
    pub submit_errors: VecDeque<String>,
    pub calls: Vec<(Address, Bytes)>,
    pub estimates: Vec<TransactionRequest>,
    pub submitted: Vec<Bytes>,
    pub connects: usize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            chain_id: 80085,
            nonce: 0,
            balance: U256::from(10u128.pow(18)),
            gas_price: 1_000_000_000,
            gas_estimate: Some(100_000),
            receipt_success: true,
            fail_connect: false,
            responses: HashMap::new(),
            submit_errors: VecDeque::new(),
            calls: Vec::new(),
            estimates: Vec::new(),
            submitted: Vec::new(),
            connects: 0,
        }
    }
}

/// Shared handle: clones observe the same state, so a test keeps one and
/// hands another to the code under test.
#[derive(Debug, Clone, Default)]
pub(crate) struct MockChain {
    state: Arc<Mutex<MockState>>,
}

pub(crate) fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub(crate) fn uint_word(value: u64) -> Bytes {
    DynSolValue::Uint(U256::from(value), 256).abi_encode().into()
}

pub(crate) fn bool_word(value: bool) -> Bytes {
    DynSolValue::Bool(value).abi_encode().into()
}

impl MockChain {
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn respond(&self, signature: &str, response: MockResponse) -> &Self {
        self.state().responses.insert(selector(signature), response);
        self
    }

    pub fn returns(&self, signature: &str, data: Bytes) -> &Self {
        self.respond(signature, MockResponse::Return(data))
    }

    pub fn reverts(&self, signature: &str, reason: &str) -> &Self {
        self.respond(
            signature,
            MockResponse::Revert(format!("execution reverted: {}", reason)),
        )
    }

    /// Selectors of every `eth_call` made so far, in order
    pub fn called_selectors(&self) -> Vec<[u8; 4]> {
        self.state()
            .calls
            .iter()
            .filter_map(|(_, data)| data.get(..4).map(|s| [s[0], s[1], s[2], s[3]]))
            .collect()
    }

    pub fn was_called(&self, signature: &str) -> bool {
        self.called_selectors().contains(&selector(signature))
    }
}

impl Connector for MockChain {
    type Client = MockChain;

    async fn connect(&self, rpc_url: &str) -> MinterResult<MockChain> {
        let mut state = self.state();
        state.connects += 1;
        if state.fail_connect {
            return Err(MinterError::Connection(format!(
                "Failed to connect to network at {}",
                rpc_url
            )));
        }
        drop(state);
        Ok(self.clone())
    }
}

impl ChainClient for MockChain {
    async fn chain_id(&self) -> MinterResult<u64> {
        Ok(self.state().chain_id)
    }

    async fn transaction_count(&self, _address: Address) -> MinterResult<u64> {
        Ok(self.state().nonce)
    }

    async fn balance(&self, _address: Address) -> MinterResult<U256> {
        Ok(self.state().balance)
    }

    async fn gas_price(&self) -> MinterResult<u128> {
        Ok(self.state().gas_price)
    }

    async fn call(&self, to: Address, data: Bytes) -> MinterResult<Bytes> {
        let mut state = self.state();
        state.calls.push((to, data.clone()));

        let key = match data.get(..4) {
            Some(s) => [s[0], s[1], s[2], s[3]],
            None => return Err(MinterError::CallFailed("empty calldata".to_string())),
        };

        match state.responses.get(&key) {
            Some(MockResponse::Return(bytes)) => Ok(bytes.clone()),
            Some(MockResponse::Revert(message)) => Err(MinterError::CallFailed(message.clone())),
            Some(MockResponse::Transport(message)) => Err(MinterError::Rpc(message.clone())),
            None => Err(MinterError::CallFailed("execution reverted".to_string())),
        }
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> MinterResult<u64> {
        let mut state = self.state();
        state.estimates.push(tx.clone());
        state
            .gas_estimate
            .ok_or_else(|| MinterError::CallFailed("execution reverted".to_string()))
    }

    async fn submit(&self, raw: Bytes) -> MinterResult<TxHash> {
        let mut state = self.state();
        if let Some(message) = state.submit_errors.pop_front() {
            return Err(MinterError::Rpc(message));
        }
        let hash = keccak256(&raw);
        state.submitted.push(raw);
        state.nonce += 1;
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash, _timeout: Duration) -> MinterResult<Receipt> {
        let state = self.state();
        Ok(Receipt {
            tx_hash,
            success: state.receipt_success,
            gas_used: 90_000,
            block_number: Some(state.submitted.len() as u64),
        })
    }
}
