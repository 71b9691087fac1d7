//! ABI loading from compiled artifacts on disk or an Etherscan-style explorer.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::abi::{AbiError, ContractAbi};

const EXPLORER_TIMEOUT: Duration = Duration::from_secs(30);

/// Pull the ABI array out of a JSON document.
///
/// Accepts a bare array, a Hardhat/Truffle artifact (`{"abi": [...]}`) or a
/// Foundry metadata artifact (`{"metadata": {"output": {"abi": [...]}}}`).
pub fn extract_abi(document: Value) -> Result<Value, AbiError> {
    match document {
        Value::Array(_) => Ok(document),
        Value::Object(mut artifact) => {
            if let Some(abi) = artifact.remove("abi") {
                return Ok(abi);
            }

            artifact
                .get_mut("metadata")
                .and_then(|m| m.get_mut("output"))
                .and_then(|o| o.get_mut("abi"))
                .map(Value::take)
                .ok_or_else(|| AbiError::Format("Could not find ABI in JSON file".to_string()))
        }
        _ => Err(AbiError::Format("Invalid ABI file format".to_string())),
    }
}

/// Load and parse an ABI file
pub fn load_from_file(path: &Path) -> Result<ContractAbi, AbiError> {
    let content = fs::read_to_string(path).map_err(|source| AbiError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let document: Value =
        serde_json::from_str(&content).map_err(|e| AbiError::Json(e.to_string()))?;

    let abi = ContractAbi::from_json(&extract_abi(document)?)?;
    tracing::debug!("Loaded {} ABI functions from {:?}", abi.function_count(), path);
    Ok(abi)
}

#[derive(Debug, Deserialize)]
struct ExplorerResponse {
    status: Value,
    #[serde(default)]
    result: Value,
}

/// Fetch a verified contract's ABI from the explorer API (`module=contract&action=getabi`)
pub async fn load_from_explorer(
    address: &str,
    api_key: &str,
    api_url: &str,
) -> Result<ContractAbi, AbiError> {
    let client = Client::builder()
        .timeout(EXPLORER_TIMEOUT)
        .build()
        .map_err(|e| AbiError::Network(e.to_string()))?;

    let response = client
        .get(api_url)
        .query(&[
            ("module", "contract"),
            ("action", "getabi"),
            ("address", address),
            ("apikey", api_key),
        ])
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AbiError::Network(e.to_string()))?;

    let body: ExplorerResponse = response
        .json()
        .await
        .map_err(|e| AbiError::Json(format!("Malformed explorer response: {}", e)))?;

    let ok = match &body.status {
        Value::String(status) => status == "1",
        Value::Number(status) => status.as_u64() == Some(1),
        _ => false,
    };

    match body.result {
        Value::String(abi_str) if ok && !abi_str.is_empty() => {
            let abi = ContractAbi::from_str_json(&abi_str)?;
            tracing::debug!("Fetched {} ABI functions from explorer", abi.function_count());
            Ok(abi)
        }
        Value::String(message) => Err(AbiError::Explorer(message)),
        Value::Null => Err(AbiError::Explorer("Unknown error".to_string())),
        other => Err(AbiError::Explorer(other.to_string())),
    }
}
