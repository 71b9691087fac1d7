use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::networks;
use crate::error::{MinterError, MinterResult};
use crate::units::{redact, validate_address, validate_private_key};

const CONFIG_DIR: &str = "nft-minter";
const CONFIG_FILE: &str = "config.toml";
const LOCAL_CONFIG_FILES: [&str; 2] = ["config.toml", "config.json"];

/// Recipient sentinel meaning "the sender's own address".
pub const DEFAULT_RECIPIENT: &str = "DEFAULT";

pub const ENV_WALLET_PRIVATE_KEY: &str = "WALLET_PRIVATE_KEY";
pub const ENV_WALLET_ADDRESS: &str = "WALLET_ADDRESS";
pub const ENV_NETWORK_NAME: &str = "NETWORK_NAME";
pub const ENV_NETWORK_RPC: &str = "NETWORK_RPC";
pub const ENV_CONTRACT_ADDRESS: &str = "CONTRACT_ADDRESS";
pub const ENV_CONTRACT_ABI_PATH: &str = "CONTRACT_ABI_PATH";
pub const ENV_EXPLORER_API_KEY: &str = "EXPLORER_API_KEY";
pub const ENV_EXPLORER_API_URL: &str = "EXPLORER_API_URL";
pub const ENV_MINTING_GROUP_ID: &str = "MINTING_GROUP_ID";
pub const ENV_MINTING_AMOUNT: &str = "MINTING_AMOUNT";
pub const ENV_MINTING_TO_ADDRESS: &str = "MINTING_TO_ADDRESS";
pub const ENV_MINTING_AUTO_MAX: &str = "MINTING_AUTO_MAX";

/// Effective minting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintConfig {
    pub wallet: WalletSettings,
    pub network: NetworkSettings,
    pub contract: ContractSettings,
    pub minting: MintingSettings,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalletSettings {
    pub private_key: String,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub name: String,
    pub custom_rpc: Option<String>,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractSettings {
    pub address: Option<String>,
    pub abi_path: Option<PathBuf>,
    pub explorer_api_key: Option<String>,
    /// Replaces the network profile's explorer API endpoint
    pub explorer_api_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MintingSettings {
    pub group_id: u64,
    /// Exact count when positive, `-1` for the maximum allowed
    pub amount: i64,
    pub to_address: String,
    pub auto_max: bool,
}

/// How many tokens a mint should request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintAmount {
    Exact(u64),
    Max,
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            wallet: WalletSettings::default(),
            network: NetworkSettings {
                name: "BERACHAIN".to_string(),
                custom_rpc: None,
            },
            contract: ContractSettings::default(),
            minting: MintingSettings {
                group_id: 0,
                amount: 1,
                to_address: DEFAULT_RECIPIENT.to_string(),
                auto_max: false,
            },
        }
    }
}

impl fmt::Debug for WalletSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSettings")
            .field("private_key", &redact(&self.private_key, 6, 4))
            .field("address", &self.address)
            .finish()
    }
}

impl fmt::Debug for ContractSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractSettings")
            .field("address", &self.address)
            .field("abi_path", &self.abi_path)
            .field(
                "explorer_api_key",
                &self.explorer_api_key.as_deref().map(|k| redact(k, 4, 4)),
            )
            .field("explorer_api_url", &self.explorer_api_url)
            .finish()
    }
}

/// One partial configuration source: a file, the environment or CLI flags.
///
/// An empty string for an optional value clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub wallet: WalletLayer,
    pub network: NetworkLayer,
    pub contract: ContractLayer,
    pub minting: MintingLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletLayer {
    pub private_key: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkLayer {
    pub name: Option<String>,
    pub custom_rpc: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContractLayer {
    pub address: Option<String>,
    pub abi_path: Option<String>,
    pub explorer_api_key: Option<String>,
    pub explorer_api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MintingLayer {
    pub group_id: Option<u64>,
    pub amount: Option<i64>,
    pub to_address: Option<String>,
    pub auto_max: Option<bool>,
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl ConfigLayer {
    /// Parse a configuration file; `.json` files are JSON, anything else TOML
    pub fn from_file(path: &Path) -> MinterResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MinterError::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&content).map_err(|e| {
                MinterError::Configuration(format!("Invalid JSON in config file {:?}: {}", path, e))
            })
        } else {
            toml::from_str(&content).map_err(|e| {
                MinterError::Configuration(format!("Invalid TOML in config file {:?}: {}", path, e))
            })
        }
    }

    /// Read overrides from the process environment
    pub fn from_env() -> MinterResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> MinterResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // "none" clears an optional value, mirroring an explicit null in the file
        let text = |key: &str| {
            lookup(key).map(|v| if v.eq_ignore_ascii_case("none") { String::new() } else { v })
        };

        let mut layer = ConfigLayer::default();
        layer.wallet.private_key = text(ENV_WALLET_PRIVATE_KEY);
        layer.wallet.address = text(ENV_WALLET_ADDRESS);
        layer.network.name = text(ENV_NETWORK_NAME);
        layer.network.custom_rpc = text(ENV_NETWORK_RPC);
        layer.contract.address = text(ENV_CONTRACT_ADDRESS);
        layer.contract.abi_path = text(ENV_CONTRACT_ABI_PATH);
        layer.contract.explorer_api_key = text(ENV_EXPLORER_API_KEY);
        layer.contract.explorer_api_url = text(ENV_EXPLORER_API_URL);
        layer.minting.to_address = text(ENV_MINTING_TO_ADDRESS);

        if let Some(value) = lookup(ENV_MINTING_GROUP_ID) {
            layer.minting.group_id = Some(parse_env(ENV_MINTING_GROUP_ID, &value)?);
        }
        if let Some(value) = lookup(ENV_MINTING_AMOUNT) {
            layer.minting.amount = Some(parse_env(ENV_MINTING_AMOUNT, &value)?);
        }
        if let Some(value) = lookup(ENV_MINTING_AUTO_MAX) {
            layer.minting.auto_max = Some(matches!(
                value.trim().to_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ));
        }

        Ok(layer)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> MinterResult<T>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| MinterError::Configuration(format!("Invalid value for {}: {} ({})", key, value, e)))
}

impl MintConfig {
    /// Resolve defaults, then the config file, then environment, then `overrides`
    pub fn load(path: Option<&Path>, overrides: ConfigLayer) -> MinterResult<Self> {
        let mut config = Self::default();

        match (resolve_config_path(path), path) {
            (Some(config_path), _) => {
                config = config.merged(ConfigLayer::from_file(&config_path)?);
                tracing::info!("Loaded configuration from {:?}", config_path);
            }
            (None, Some(missing)) => {
                return Err(MinterError::Configuration(format!(
                    "Config file not found: {:?}",
                    missing
                )));
            }
            (None, None) => {
                tracing::warn!("No configuration file found, using defaults and environment variables");
            }
        }

        config = config.merged(ConfigLayer::from_env()?);
        config = config.merged(overrides);

        tracing::debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    /// Produce a new configuration with every value present in `layer` applied
    pub fn merged(mut self, layer: ConfigLayer) -> Self {
        if let Some(key) = layer.wallet.private_key {
            self.wallet.private_key = key.trim().to_string();
        }
        if let Some(address) = layer.wallet.address {
            self.wallet.address = non_empty(address);
        }
        if let Some(name) = layer.network.name.and_then(non_empty) {
            self.network.name = name;
        }
        if let Some(rpc) = layer.network.custom_rpc {
            self.network.custom_rpc = non_empty(rpc);
        }
        if let Some(address) = layer.contract.address {
            self.contract.address = non_empty(address);
        }
        if let Some(path) = layer.contract.abi_path {
            self.contract.abi_path = non_empty(path).map(PathBuf::from);
        }
        if let Some(key) = layer.contract.explorer_api_key {
            self.contract.explorer_api_key = non_empty(key);
        }
        if let Some(url) = layer.contract.explorer_api_url {
            self.contract.explorer_api_url = non_empty(url);
        }
        if let Some(group_id) = layer.minting.group_id {
            self.minting.group_id = group_id;
        }
        if let Some(amount) = layer.minting.amount {
            self.minting.amount = amount;
        }
        if let Some(to) = layer.minting.to_address {
            self.minting.to_address = non_empty(to).unwrap_or_else(|| DEFAULT_RECIPIENT.to_string());
        }
        if let Some(auto_max) = layer.minting.auto_max {
            self.minting.auto_max = auto_max;
        }
        self
    }

    /// Copy of this configuration minting exactly `amount` tokens
    pub fn with_amount(&self, amount: u64) -> Self {
        let mut config = self.clone();
        config.minting.amount = i64::try_from(amount).unwrap_or(i64::MAX);
        config.minting.auto_max = false;
        config
    }

    /// Check every setting, reporting all problems at once
    pub fn validate(&self) -> MinterResult<()> {
        let mut errors = Vec::new();

        if self.wallet.private_key.is_empty() {
            errors.push("wallet.private_key is required".to_string());
        } else if !validate_private_key(&self.wallet.private_key) {
            errors.push("wallet.private_key must be 64 hex characters".to_string());
        }

        if let Some(address) = &self.wallet.address {
            if !validate_address(address) {
                errors.push(format!("Invalid wallet address: {}", address));
            }
        }

        if networks::resolve(&self.network.name).is_err() {
            errors.push(format!(
                "Invalid network: {}. Valid options: {}",
                self.network.name,
                networks::supported_names().join(", ")
            ));
        }

        match &self.contract.address {
            None => errors.push("contract.address is required".to_string()),
            Some(address) if !validate_address(address) => {
                errors.push(format!("Invalid contract address: {}", address));
            }
            Some(_) => {}
        }

        if self.contract.abi_path.is_none() && self.contract.explorer_api_key.is_none() {
            errors.push(
                "Either contract.abi_path or contract.explorer_api_key must be provided".to_string(),
            );
        }

        if self.minting.amount == 0 || self.minting.amount < -1 {
            errors.push("minting.amount must be -1 (for max) or greater than 0".to_string());
        }

        let to = &self.minting.to_address;
        if to != DEFAULT_RECIPIENT && !validate_address(to) {
            errors.push(format!("Invalid minting.to_address: {}", to));
        }

        if errors.is_empty() {
            tracing::info!("Configuration validation passed");
            Ok(())
        } else {
            Err(MinterError::Configuration(format!(
                "Configuration validation failed:\n{}",
                errors
                    .iter()
                    .map(|e| format!("  - {}", e))
                    .collect::<Vec<_>>()
                    .join("\n")
            )))
        }
    }

    /// Requested amount; `0` and negatives other than `-1` are rejected
    pub fn mint_amount(&self) -> MinterResult<MintAmount> {
        match self.minting.amount {
            _ if self.minting.auto_max => Ok(MintAmount::Max),
            -1 => Ok(MintAmount::Max),
            amount if amount > 0 => Ok(MintAmount::Exact(amount.unsigned_abs())),
            amount => Err(MinterError::Validation(format!(
                "Invalid mint amount {}: must be -1 (for max) or greater than 0",
                amount
            ))),
        }
    }

    /// Explicit recipient, or `None` when minting to the sender
    pub fn recipient(&self) -> Option<&str> {
        let to = self.minting.to_address.trim();
        if to.is_empty() || to == DEFAULT_RECIPIENT {
            None
        } else {
            Some(to)
        }
    }

    /// Write an example configuration file with placeholder secrets
    pub fn save_example(path: &Path) -> MinterResult<()> {
        let mut example = Self::default();
        example.wallet.private_key = "YOUR_PRIVATE_KEY_HERE".to_string();
        example.wallet.address = Some("YOUR_WALLET_ADDRESS_HERE".to_string());
        example.contract.address = Some("CONTRACT_ADDRESS_HERE".to_string());
        example.contract.abi_path = Some(PathBuf::from("path/to/contract_abi.json"));
        example.contract.explorer_api_key = Some("YOUR_API_KEY_HERE".to_string());

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let content = if is_json {
            serde_json::to_string_pretty(&example)
                .map_err(|e| MinterError::Configuration(format!("Failed to serialize config: {}", e)))?
        } else {
            toml::to_string_pretty(&example)
                .map_err(|e| MinterError::Configuration(format!("Failed to serialize config: {}", e)))?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                MinterError::Configuration(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            MinterError::Configuration(format!("Failed to write config file {:?}: {}", path, e))
        })?;

        tracing::info!("Saved example configuration to {:?}", path);
        Ok(())
    }
}

/// Pick the config file: the explicit path, a local `config.toml`/`config.json`,
/// or the per-user config directory
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }

    LOCAL_CONFIG_FILES
        .iter()
        .map(PathBuf::from)
        .chain(default_config_path())
        .find(|p| p.exists())
}

/// `<config dir>/nft-minter/config.toml`
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}
