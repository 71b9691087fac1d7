use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use zeroize::Zeroizing;

use crate::error::{MinterError, MinterResult};

/// Signing account derived from a private key.
///
/// The key never leaves the signer and is not logged.
#[derive(Clone)]
pub struct Wallet {
    signer: PrivateKeySigner,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

impl Wallet {
    /// Create a wallet from a hex private key, with or without `0x`
    pub fn from_private_key(private_key: &str) -> MinterResult<Self> {
        let trimmed = private_key.trim();
        if trimmed.is_empty() {
            return Err(MinterError::Configuration(
                "Private key not provided".to_string(),
            ));
        }

        let normalized = Zeroizing::new(if trimmed.starts_with("0x") {
            trimmed.to_string()
        } else {
            format!("0x{}", trimmed)
        });

        let signer: PrivateKeySigner = normalized.parse().map_err(|e| {
            MinterError::Configuration(format!("Invalid private key format: {}", e))
        })?;

        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a fully populated request into raw EIP-2718 bytes
    pub async fn sign_transaction(&self, tx: TransactionRequest) -> MinterResult<Bytes> {
        let wallet = EthereumWallet::from(self.signer.clone());

        let envelope = tx
            .build(&wallet)
            .await
            .map_err(|e| MinterError::transaction(format!("Failed to sign transaction: {}", e)))?;

        Ok(envelope.encoded_2718().into())
    }
}
