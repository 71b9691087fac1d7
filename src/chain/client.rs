use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::{RpcError, TransportError};
use tokio::time::{interval, timeout};

use super::{ChainClient, Connector, Receipt};
use crate::error::{MinterError, MinterResult};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Opens HTTP providers and verifies the endpoint answers `eth_chainId`
#[derive(Debug, Clone, Copy, Default)]
pub struct AlloyConnector;

/// [`ChainClient`] over an alloy HTTP provider
#[derive(Clone)]
pub struct AlloyClient {
    provider: DynProvider,
}

impl Connector for AlloyConnector {
    type Client = AlloyClient;

    async fn connect(&self, rpc_url: &str) -> MinterResult<AlloyClient> {
        let url: reqwest::Url = rpc_url.parse().map_err(|e| {
            MinterError::Connection(format!("Invalid RPC URL '{}': {}", rpc_url, e))
        })?;

        let provider = ProviderBuilder::new().connect_http(url).erased();

        let chain_id = match timeout(CONNECT_TIMEOUT, provider.get_chain_id()).await {
            Ok(Ok(chain_id)) => chain_id,
            Ok(Err(e)) => {
                return Err(MinterError::Connection(format!(
                    "Failed to connect to network at {}: {}",
                    rpc_url, e
                )));
            }
            Err(_) => {
                return Err(MinterError::Connection(format!(
                    "Timed out after {}s connecting to {}",
                    CONNECT_TIMEOUT.as_secs(),
                    rpc_url
                )));
            }
        };

        tracing::debug!(rpc_url = %rpc_url, chain_id, "RPC endpoint reachable");
        Ok(AlloyClient { provider })
    }
}

/// Node error responses become `CallFailed`, everything else is a transport problem
fn classify(context: &str, err: TransportError) -> MinterError {
    match err {
        RpcError::ErrorResp(payload) => {
            if let Some(data) = &payload.data {
                tracing::debug!(code = payload.code, data = %data.get(), "{} error data", context);
            }
            MinterError::CallFailed(format!("{}: {}", context, payload.message))
        }
        other => MinterError::Rpc(format!("{}: {}", context, other)),
    }
}

impl ChainClient for AlloyClient {
    async fn chain_id(&self) -> MinterResult<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| classify("eth_chainId", e))
    }

    async fn transaction_count(&self, address: Address) -> MinterResult<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|e| classify("eth_getTransactionCount", e))
    }

    async fn balance(&self, address: Address) -> MinterResult<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| classify("eth_getBalance", e))
    }

    async fn gas_price(&self) -> MinterResult<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| classify("eth_gasPrice", e))
    }

    async fn call(&self, to: Address, data: Bytes) -> MinterResult<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);

        self.provider
            .call(tx)
            .await
            .map_err(|e| classify("eth_call", e))
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> MinterResult<u64> {
        self.provider
            .estimate_gas(tx.clone())
            .await
            .map_err(|e| classify("eth_estimateGas", e))
    }

    async fn submit(&self, raw: Bytes) -> MinterResult<TxHash> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| classify("eth_sendRawTransaction", e))?;

        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash, limit: Duration) -> MinterResult<Receipt> {
        let poll = async {
            let mut ticker = interval(RECEIPT_POLL_INTERVAL);

            loop {
                ticker.tick().await;

                let receipt = match self
                    .provider
                    .get_transaction_receipt(tx_hash)
                    .await
                    .map_err(|e| classify("eth_getTransactionReceipt", e))?
                {
                    Some(r) => r,
                    None => {
                        tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                        continue;
                    }
                };

                return Ok::<_, MinterError>(Receipt {
                    tx_hash: receipt.transaction_hash,
                    success: receipt.status(),
                    gas_used: receipt.gas_used,
                    block_number: receipt.block_number,
                });
            }
        };

        timeout(limit, poll).await.map_err(|_| {
            MinterError::Timeout(format!(
                "Transaction {} not confirmed within {}s",
                tx_hash,
                limit.as_secs()
            ))
        })?
    }
}

#[cfg(test)]
mod tests {
    use alloy::rpc::json_rpc::ErrorPayload;

    use super::*;

    fn error_response(json: &str) -> TransportError {
        RpcError::ErrorResp(serde_json::from_str::<ErrorPayload>(json).unwrap())
    }

    #[test]
    fn test_classify_keeps_revert_data_out_of_reason() {
        let err = classify(
            "eth_call",
            error_response(
                r#"{"code":3,"message":"execution reverted: Max supply reached","data":"0x08c379a0"}"#,
            ),
        );

        match &err {
            MinterError::CallFailed(message) => assert!(!message.contains("0x08c379a0")),
            other => panic!("expected CallFailed, got {:?}", other),
        }
        assert_eq!(err.revert_reason(), Some("Max supply reached".to_string()));

        let wrapped = MinterError::transaction(format!("Transaction failed: {}", err));
        assert_eq!(wrapped.revert_reason(), Some("Max supply reached".to_string()));
    }

    #[test]
    fn test_classify_transport_failure() {
        let err = classify("eth_call", RpcError::NullResp);
        assert!(matches!(err, MinterError::Rpc(_)));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_url() {
        let err = AlloyConnector.connect("not a url").await.err().unwrap();
        assert!(matches!(err, MinterError::Connection(_)));
    }

    #[tokio::test]
    async fn test_connect_fails_when_endpoint_is_down() {
        // nothing listens on the discard port
        let err = AlloyConnector
            .connect("http://127.0.0.1:9")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, MinterError::Connection(_)));
    }
}
