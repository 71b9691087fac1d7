//! Error taxonomy shared by every layer of the minter.

use thiserror::Error;

use crate::contracts::AbiError;

/// Errors that can occur while configuring, connecting or minting.
#[derive(Debug, Error)]
pub enum MinterError {
    /// Bad or missing settings, invalid key or address formats.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network key not present in the registry.
    #[error("Unsupported network: {name}. Available networks: {}", available.join(", "))]
    UnsupportedNetwork { name: String, available: Vec<String> },

    /// RPC endpoint unreachable or not answering.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Address, ABI or function-discovery failure, or an unexpected call error.
    #[error("Contract error: {0}")]
    Contract(String),

    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),

    /// The node answered a contract call with an error (usually a revert).
    #[error("Contract call failed: {0}")]
    CallFailed(String),

    /// Transport-level RPC failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Signing, submission or confirmation failure, including on-chain revert.
    #[error("Transaction error: {message}")]
    Transaction {
        message: String,
        reason: Option<String>,
    },

    #[error("Insufficient balance: {balance} (minimum {minimum})")]
    InsufficientFunds { balance: String, minimum: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    /// Malformed user-supplied data.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation called before the session reached the required state.
    #[error("Invalid session state: {0}")]
    State(&'static str),
}

/// Result type for minter operations.
pub type MinterResult<T> = Result<T, MinterError>;

impl MinterError {
    pub fn transaction(message: impl Into<String>) -> Self {
        let message = message.into();
        let reason = crate::units::parse_revert_reason(&message);
        Self::Transaction { message, reason }
    }

    /// Parsed revert reason, if this error carries one.
    pub fn revert_reason(&self) -> Option<String> {
        match self {
            Self::Transaction { reason: Some(reason), .. } => Some(reason.clone()),
            Self::Transaction { message, .. } | Self::CallFailed(message) => {
                crate::units::parse_revert_reason(message)
            }
            _ => None,
        }
    }

    /// Errors caused by the user's settings rather than the chain.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::UnsupportedNetwork { .. } | Self::Validation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MinterError::UnsupportedNetwork {
            name: "SOLANA".to_string(),
            available: vec!["ARBITRUM_ONE".to_string(), "BERACHAIN".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unsupported network: SOLANA. Available networks: ARBITRUM_ONE, BERACHAIN"
        );

        let err = MinterError::State("contract not loaded");
        assert!(err.to_string().contains("contract not loaded"));
    }

    #[test]
    fn test_transaction_error_parses_reason() {
        let err = MinterError::transaction("server returned an error: execution reverted: Max supply reached");
        assert_eq!(err.revert_reason(), Some("Max supply reached".to_string()));

        let err = MinterError::transaction("nonce too low");
        assert_eq!(err.revert_reason(), None);
    }

    #[test]
    fn test_configuration_category() {
        assert!(MinterError::Configuration("x".into()).is_configuration());
        assert!(MinterError::Validation("x".into()).is_configuration());
        assert!(!MinterError::Connection("x".into()).is_configuration());
        assert!(!MinterError::transaction("x").is_configuration());
    }
}
