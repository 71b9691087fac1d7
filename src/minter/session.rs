use std::fmt;
use std::time::Duration;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use serde::Serialize;
use tokio::time::{Instant, sleep};

use super::discovery::{self, ContractHandle};
use crate::chain::{AlloyConnector, ChainClient, Connector, Wallet};
use crate::config::networks::{self, NetworkProfile};
use crate::config::{MintAmount, MintConfig};
use crate::contracts::{self, first_bool, first_uint};
use crate::error::{MinterError, MinterResult};
use crate::units::{format_gas_price, validate_address, wei_to_ether};

/// How long a submitted transaction may stay unconfirmed
pub const RECEIPT_TIMEOUT: Duration = Duration::from_secs(300);
/// Gas limit used before the node's estimate is known
pub const PLACEHOLDER_GAS_LIMIT: u64 = 500_000;
/// Gas limit used when estimation fails
pub const FALLBACK_GAS_LIMIT: u64 = 2_000_000;
pub const GAS_ESTIMATE_MULTIPLIER: f64 = 1.2;

struct Session<C> {
    client: C,
    profile: &'static NetworkProfile,
    chain_id: u64,
    wallet: Wallet,
    nonce: u64,
    last_tx_hash: Option<TxHash>,
}

/// Supply and sale status read from the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractInfo {
    pub total_supply: Option<U256>,
    pub max_supply: Option<U256>,
    pub mint_live: bool,
}

impl ContractInfo {
    pub fn is_sold_out(&self) -> bool {
        matches!((self.total_supply, self.max_supply), (Some(total), Some(max)) if total >= max)
    }
}

impl fmt::Display for ContractInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<U256>| v.map_or_else(|| "N/A".to_string(), |v| v.to_string());
        write!(
            f,
            "Total Supply: {}, Max Supply: {}, Mint Live: {}",
            show(self.total_supply),
            show(self.max_supply),
            self.mint_live
        )
    }
}

/// Drives one minting session: connect, load the contract, then mint.
///
/// Operations must run in that order; calling one early returns
/// [`MinterError::State`].
pub struct Minter<K: Connector = AlloyConnector> {
    connector: K,
    config: MintConfig,
    dry_run: bool,
    session: Option<Session<K::Client>>,
    contract: Option<ContractHandle>,
}

impl Minter<AlloyConnector> {
    pub fn new(config: MintConfig, dry_run: bool) -> Self {
        Self::with_connector(config, dry_run, AlloyConnector)
    }
}

impl<K: Connector> Minter<K> {
    pub fn with_connector(config: MintConfig, dry_run: bool, connector: K) -> Self {
        if dry_run {
            tracing::info!("Running in DRY RUN mode - no transactions will be sent");
        }

        Self {
            connector,
            config,
            dry_run,
            session: None,
            contract: None,
        }
    }

    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn address(&self) -> Option<Address> {
        self.session.as_ref().map(|s| s.wallet.address())
    }

    pub fn chain_id(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.chain_id)
    }

    /// Next nonce this session will use
    pub fn nonce(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.nonce)
    }

    pub fn last_tx_hash(&self) -> Option<TxHash> {
        self.session.as_ref().and_then(|s| s.last_tx_hash)
    }

    pub fn contract(&self) -> Option<&ContractHandle> {
        self.contract.as_ref()
    }

    /// Network profile of the live session, or the configured one before connecting
    pub fn network(&self) -> MinterResult<&'static NetworkProfile> {
        match &self.session {
            Some(session) => Ok(session.profile),
            None => networks::resolve(&self.config.network.name),
        }
    }

    fn session(&self) -> MinterResult<&Session<K::Client>> {
        self.session
            .as_ref()
            .ok_or(MinterError::State("not connected to network"))
    }

    fn loaded(&self) -> MinterResult<(&Session<K::Client>, &ContractHandle)> {
        let session = self.session()?;
        let contract = self
            .contract
            .as_ref()
            .ok_or(MinterError::State("contract not loaded"))?;
        Ok((session, contract))
    }

    /// Connect to the configured network and initialise the signing account
    pub async fn connect(&mut self) -> MinterResult<()> {
        let network_name = &self.config.network.name;
        let profile = networks::resolve(network_name)?;

        // a custom RPC only replaces the URL; chain metadata stays with the profile
        let rpc_url = self
            .config
            .network
            .custom_rpc
            .as_deref()
            .unwrap_or(profile.rpc_url);

        tracing::debug!("Connecting to {} at {}", network_name, rpc_url);

        let client = self.connector.connect(rpc_url).await?;
        let chain_id = client.chain_id().await.map_err(|e| {
            MinterError::Connection(format!("Failed to read chain id from {}: {}", rpc_url, e))
        })?;

        tracing::info!("Connected to {} (Chain ID: {})", network_name, chain_id);
        if !profile.validate_chain_id(chain_id) {
            tracing::warn!(
                "Chain ID {} does not match {} (expected {})",
                chain_id,
                profile.name,
                profile.chain_id
            );
        }

        let wallet = Wallet::from_private_key(&self.config.wallet.private_key)?;
        tracing::info!("Initialized wallet: {}", wallet.address());

        if let Some(configured) = &self.config.wallet.address {
            let derived = wallet.address().to_string();
            if !configured.eq_ignore_ascii_case(&derived) {
                tracing::warn!(
                    "Configured address {} doesn't match derived address {}",
                    configured,
                    derived
                );
            }
        }

        let nonce = client
            .transaction_count(wallet.address())
            .await
            .map_err(|e| MinterError::Connection(format!("Failed to read nonce: {}", e)))?;
        tracing::debug!("Current nonce: {}", nonce);

        self.contract = None;
        self.session = Some(Session {
            client,
            profile,
            chain_id,
            wallet,
            nonce,
            last_tx_hash: None,
        });

        Ok(())
    }

    /// Load the contract ABI from file, then the block explorer
    pub async fn load_contract(&mut self) -> MinterResult<()> {
        let profile = self.session()?.profile;

        let raw_address = self.config.contract.address.as_deref().ok_or_else(|| {
            MinterError::Contract("Contract address not provided in configuration".to_string())
        })?;
        if !validate_address(raw_address) {
            return Err(MinterError::Contract(format!(
                "Invalid contract address: {}",
                raw_address
            )));
        }
        let address: Address = raw_address.parse().map_err(|e| {
            MinterError::Contract(format!("Invalid contract address {}: {}", raw_address, e))
        })?;

        let abi = self.load_abi(profile, address).await?;

        tracing::info!("Loaded contract at {}", address);
        self.contract = Some(ContractHandle { address, abi });
        Ok(())
    }

    async fn load_abi(
        &self,
        profile: &NetworkProfile,
        address: Address,
    ) -> MinterResult<contracts::ContractAbi> {
        if let Some(path) = &self.config.contract.abi_path {
            match contracts::load_from_file(path) {
                Ok(abi) => {
                    tracing::info!("Loaded ABI from file: {:?}", path);
                    return Ok(abi);
                }
                Err(e) => tracing::warn!("Failed to load ABI from file: {}", e),
            }
        }

        if let Some(api_key) = &self.config.contract.explorer_api_key {
            let api_url = self
                .config
                .contract
                .explorer_api_url
                .as_deref()
                .or(profile.explorer.as_ref().map(|e| e.api_url));

            match api_url {
                Some(api_url) => {
                    match contracts::load_from_explorer(&address.to_string(), api_key, api_url)
                        .await
                    {
                        Ok(abi) => {
                            tracing::info!("Loaded ABI from block explorer");
                            return Ok(abi);
                        }
                        Err(e) => tracing::warn!("Failed to fetch ABI from explorer: {}", e),
                    }
                }
                None => tracing::warn!("No block explorer configured for {}", profile.name),
            }
        }

        Err(MinterError::Contract(
            "Could not load contract ABI. Please provide either 'abi_path' or \
             'explorer_api_key' in configuration."
                .to_string(),
        ))
    }

    /// Read total supply, max supply and mint status where the contract exposes them
    pub async fn contract_info(&self) -> MinterResult<ContractInfo> {
        let (session, contract) = self.loaded()?;
        let client = &session.client;

        let failed = |e: MinterError| MinterError::Contract(format!("Failed to get contract info: {}", e));

        let mut info = ContractInfo {
            total_supply: None,
            max_supply: None,
            mint_live: true,
        };

        if contract.abi.has_function("totalSupply") {
            let values = contract.read(client, "totalSupply", &[]).await.map_err(failed)?;
            info.total_supply = first_uint(&values);
        }

        if contract.abi.has_function("maxSupply") {
            let values = contract.read(client, "maxSupply", &[]).await.map_err(failed)?;
            info.max_supply = first_uint(&values);
        }

        if contract.abi.has_function("mintLive") {
            let values = contract.read(client, "mintLive", &[]).await.map_err(failed)?;
            info.mint_live = first_bool(&values).ok_or_else(|| {
                MinterError::Contract("mintLive did not return a boolean".to_string())
            })?;
        }

        Ok(info)
    }

    pub async fn wallet_balance_wei(&self) -> MinterResult<U256> {
        let session = self.session()?;
        session.client.balance(session.wallet.address()).await
    }

    /// Native token balance in whole units
    pub async fn wallet_balance(&self) -> MinterResult<f64> {
        Ok(wei_to_ether(self.wallet_balance_wei().await?))
    }

    pub async fn gas_price(&self) -> MinterResult<u128> {
        self.session()?.client.gas_price().await
    }

    pub async fn mint_cost(&self, group_id: u64, amount: u64) -> MinterResult<U256> {
        let (session, contract) = self.loaded()?;
        Ok(discovery::mint_cost(&session.client, contract, group_id, amount).await)
    }

    /// Block until `mintLive()` reports true.
    ///
    /// Returns at once for contracts without `mintLive`. A failing `mintLive`
    /// call is treated as "proceed"; transport failures are errors.
    pub async fn wait_for_mint_live(
        &self,
        check_interval: Duration,
        timeout: Duration,
    ) -> MinterResult<()> {
        let (session, contract) = self.loaded()?;

        if !contract.abi.has_function("mintLive") {
            tracing::warn!("Contract doesn't have mintLive function, proceeding anyway");
            return Ok(());
        }

        let start = Instant::now();

        loop {
            match contract.read(&session.client, "mintLive", &[]).await {
                Ok(values) => match first_bool(&values) {
                    Some(true) => {
                        tracing::info!("Minting is now LIVE!");
                        return Ok(());
                    }
                    Some(false) => {}
                    None => {
                        tracing::warn!("Unexpected mintLive output, proceeding anyway");
                        return Ok(());
                    }
                },
                Err(e @ (MinterError::CallFailed(_) | MinterError::Abi(_))) => {
                    tracing::warn!("Error checking mint status, proceeding anyway: {}", e);
                    return Ok(());
                }
                Err(e) => {
                    return Err(MinterError::Contract(format!(
                        "Error checking mint status: {}",
                        e
                    )));
                }
            }

            if start.elapsed() >= timeout {
                return Err(MinterError::Timeout(format!(
                    "Timeout waiting for mint to go live ({}s)",
                    timeout.as_secs()
                )));
            }

            tracing::debug!(
                "Mint not live yet, checking again in {}s...",
                check_interval.as_secs()
            );
            sleep(check_interval).await;
        }
    }

    /// Mint with the configured group, amount and recipient.
    ///
    /// Returns `None` in dry-run mode, otherwise the confirmed transaction hash.
    pub async fn mint(&mut self) -> MinterResult<Option<TxHash>> {
        let (Some(session), Some(contract)) = (self.session.as_mut(), self.contract.as_ref()) else {
            return Err(MinterError::State("contract not loaded"));
        };

        let group_id = self.config.minting.group_id;
        let requested = self.config.mint_amount()?;

        let to = match self.config.recipient() {
            Some(raw) => raw.parse::<Address>().map_err(|e| {
                MinterError::Validation(format!("Invalid recipient address {}: {}", raw, e))
            })?,
            None => session.wallet.address(),
        };

        let amount = match requested {
            MintAmount::Exact(amount) => amount,
            MintAmount::Max => {
                let amount = discovery::max_mint_amount(&session.client, contract, group_id).await;
                tracing::info!("Auto-detected max mint amount: {}", amount);
                amount
            }
        };

        tracing::info!("Minting {} NFT(s) from group {} to {}", amount, group_id, to);

        if self.dry_run {
            tracing::info!("DRY RUN - Transaction not executed");
            return Ok(None);
        }

        let tx = build_mint_transaction(session, contract, to, group_id, amount).await?;
        let tx_hash = execute(session, tx).await?;

        Ok(Some(tx_hash))
    }

    /// Explorer link for a transaction on the session's network
    pub fn transaction_url(&self, tx_hash: &TxHash) -> String {
        let hash = tx_hash.to_string();
        match self.network() {
            Ok(profile) => profile.tx_url(&hash),
            Err(_) => format!("Transaction hash: {}", hash),
        }
    }
}

async fn build_mint_transaction<C: ChainClient>(
    session: &Session<C>,
    contract: &ContractHandle,
    to: Address,
    group_id: u64,
    amount: u64,
) -> MinterResult<TransactionRequest> {
    let candidate = discovery::select_mint_function(&contract.abi)?;
    tracing::debug!("Using mint function: {}", candidate.name);

    let calldata = contract
        .abi
        .encode_call(candidate.name, &candidate.arguments(amount, group_id, to))
        .map_err(|e| MinterError::Contract(format!("Failed to build transaction: {}", e)))?;

    let cost = discovery::mint_cost(&session.client, contract, group_id, amount).await;

    let gas_price = session
        .client
        .gas_price()
        .await
        .map_err(|e| MinterError::Contract(format!("Failed to build transaction: {}", e)))?;
    tracing::debug!("Gas price: {}", format_gas_price(gas_price));

    let tx = TransactionRequest::default()
        .with_from(session.wallet.address())
        .with_to(contract.address)
        .with_input(calldata)
        .with_value(cost)
        .with_nonce(session.nonce)
        .with_chain_id(session.chain_id)
        .with_gas_price(gas_price)
        .with_gas_limit(PLACEHOLDER_GAS_LIMIT);

    let gas_limit = match session.client.estimate_gas(&tx).await {
        Ok(estimate) => {
            let gas_limit = (estimate as f64 * GAS_ESTIMATE_MULTIPLIER) as u64;
            tracing::debug!("Gas estimate: {} (using {})", estimate, gas_limit);
            gas_limit
        }
        Err(e) => {
            tracing::warn!("Gas estimation failed, using default: {}", e);
            FALLBACK_GAS_LIMIT
        }
    };

    Ok(tx.with_gas_limit(gas_limit))
}

/// Sign, submit and confirm; session nonce and last hash move only on success
async fn execute<C: ChainClient>(
    session: &mut Session<C>,
    tx: TransactionRequest,
) -> MinterResult<TxHash> {
    let raw = session.wallet.sign_transaction(tx).await?;

    tracing::info!("Sending transaction...");
    let tx_hash = session
        .client
        .submit(raw)
        .await
        .map_err(|e| MinterError::transaction(format!("Transaction failed: {}", e)))?;
    tracing::info!("Transaction sent! Hash: {}", tx_hash);

    tracing::info!("Waiting for transaction confirmation...");
    let receipt = session
        .client
        .wait_for_receipt(tx_hash, RECEIPT_TIMEOUT)
        .await
        .map_err(|e| MinterError::transaction(format!("Transaction failed: {}", e)))?;

    if !receipt.success {
        return Err(MinterError::Transaction {
            message: "Transaction failed (status = 0)".to_string(),
            reason: None,
        });
    }

    tracing::info!("Transaction confirmed! Gas used: {}", receipt.gas_used);

    session.nonce += 1;
    session.last_tx_hash = Some(receipt.tx_hash);

    Ok(receipt.tx_hash)
}
