//! Multi-attempt minting built on [`Minter`]: retry, batches, monitoring and
//! scheduling. Every wait is a tokio sleep, so callers can cancel a workflow
//! by dropping its future or bound it with `tokio::time::timeout`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy::primitives::{TxHash, U256};
use serde::Serialize;
use tokio::time::{Instant, sleep};

use super::session::{ContractInfo, Minter};
use crate::chain::{AlloyConnector, Connector};
use crate::config::MintConfig;
use crate::error::{MinterError, MinterResult};
use crate::units::{format_gas_price, format_time_remaining, format_wei_to_ether};

/// Balance below which a mint is not attempted, in native token units
pub const MIN_BALANCE: f64 = 0.01;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Revert reasons that no amount of retrying will fix
pub const PERMANENT_REVERT_KEYWORDS: [&str; 3] = ["max supply", "mint not live", "invalid proof"];

const BASE_GAS_ESTIMATE: u64 = 150_000;
const PER_TOKEN_GAS_ESTIMATE: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MintOutcome {
    Success,
    Failure,
}

/// One entry of the attempt history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintAttemptRecord {
    /// Unix seconds
    pub timestamp: u64,
    pub tx_hash: Option<TxHash>,
    pub attempt: u32,
    pub outcome: MintOutcome,
    pub error: Option<String>,
}

/// Projected cost of minting `amount` tokens at the current gas price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostEstimate {
    pub amount: u64,
    pub mint_cost_wei: U256,
    pub gas_cost_wei: U256,
    pub total_cost_wei: U256,
    pub gas_price_wei: u128,
    pub estimated_gas: u64,
}

impl CostEstimate {
    pub fn mint_cost_eth(&self) -> String {
        format_wei_to_ether(self.mint_cost_wei, 4)
    }

    pub fn gas_cost_eth(&self) -> String {
        format_wei_to_ether(self.gas_cost_wei, 4)
    }

    pub fn total_cost_eth(&self) -> String {
        format_wei_to_ether(self.total_cost_wei, 4)
    }

    pub fn gas_price_gwei(&self) -> String {
        format_gas_price(self.gas_price_wei)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Failures that end a retry loop immediately
pub fn is_permanent(err: &MinterError) -> bool {
    if matches!(err, MinterError::InsufficientFunds { .. }) {
        return true;
    }

    err.revert_reason().is_some_and(|reason| {
        let reason = reason.to_lowercase();
        PERMANENT_REVERT_KEYWORDS.iter().any(|k| reason.contains(k))
    })
}

/// Runs complete connect → load → mint sequences, each on a fresh session
pub struct MintRunner<K: Connector = AlloyConnector> {
    connector: K,
    config: MintConfig,
    dry_run: bool,
    max_attempts: u32,
    retry_delay: Duration,
    history: Vec<MintAttemptRecord>,
}

impl MintRunner<AlloyConnector> {
    pub fn new(config: MintConfig, dry_run: bool) -> Self {
        Self::with_connector(config, dry_run, AlloyConnector)
    }
}

impl<K: Connector> MintRunner<K> {
    pub fn with_connector(config: MintConfig, dry_run: bool, connector: K) -> Self {
        Self {
            connector,
            config,
            dry_run,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            history: Vec::new(),
        }
    }

    /// Attempts and delay used by the batch, monitor and schedule workflows
    pub fn with_retry_policy(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = retry_delay;
        self
    }

    pub fn history(&self) -> &[MintAttemptRecord] {
        &self.history
    }

    fn minter(&self, config: MintConfig) -> Minter<K> {
        Minter::with_connector(config, self.dry_run, self.connector.clone())
    }

    async fn loaded_minter(&self, config: MintConfig) -> MinterResult<Minter<K>> {
        let mut minter = self.minter(config);
        minter.connect().await?;
        minter.load_contract().await?;
        Ok(minter)
    }

    async fn attempt(&self, config: &MintConfig) -> MinterResult<Option<TxHash>> {
        let mut minter = self.loaded_minter(config.clone()).await?;

        let balance = minter.wallet_balance().await?;
        if balance < MIN_BALANCE {
            return Err(MinterError::InsufficientFunds {
                balance: format!("{:.4}", balance),
                minimum: MIN_BALANCE.to_string(),
            });
        }

        minter.mint().await
    }

    fn record(&mut self, attempt: u32, result: &MinterResult<Option<TxHash>>) {
        let (tx_hash, outcome, error) = match result {
            Ok(tx_hash) => (*tx_hash, MintOutcome::Success, None),
            Err(e) => (None, MintOutcome::Failure, Some(e.to_string())),
        };

        self.history.push(MintAttemptRecord {
            timestamp: unix_now(),
            tx_hash,
            attempt,
            outcome,
            error,
        });
    }

    /// Mint with the runner's configuration, retrying transient failures
    pub async fn mint_with_retry(&mut self, max_attempts: u32, delay: Duration) -> bool {
        let config = self.config.clone();
        self.retry(&config, max_attempts, delay).await
    }

    async fn retry(&mut self, config: &MintConfig, max_attempts: u32, delay: Duration) -> bool {
        for attempt in 1..=max_attempts {
            tracing::info!("Mint attempt {}/{}", attempt, max_attempts);

            let result = self.attempt(config).await;
            self.record(attempt, &result);

            match result {
                Ok(Some(tx_hash)) => {
                    tracing::info!("Success! TX: {}", tx_hash);
                    return true;
                }
                Ok(None) => return true,
                Err(e) => {
                    match e.revert_reason() {
                        Some(reason) => tracing::warn!("Transaction failed: {}", reason),
                        None => tracing::error!("Mint attempt {} failed: {}", attempt, e),
                    }

                    if is_permanent(&e) {
                        tracing::error!("Permanent error detected, not retrying");
                        return false;
                    }

                    if attempt < max_attempts {
                        tracing::info!("Retrying in {} seconds...", delay.as_secs());
                        sleep(delay).await;
                    }
                }
            }
        }

        false
    }

    /// Mint `total` tokens in batches of at most `batch_size`.
    ///
    /// Stops at the first batch that fails and returns the records of the
    /// batches that succeeded.
    pub async fn mint_in_batches(
        &mut self,
        total: u64,
        batch_size: u64,
        delay: Duration,
    ) -> MinterResult<Vec<MintAttemptRecord>> {
        if total == 0 || batch_size == 0 {
            return Err(MinterError::Validation(
                "total amount and batch size must be greater than 0".to_string(),
            ));
        }

        let mut completed = Vec::new();
        let mut remaining = total;

        while remaining > 0 {
            let current = batch_size.min(remaining);
            tracing::info!(
                "Minting batch: {} NFTs ({}/{})",
                current,
                total - remaining + current,
                total
            );

            let config = self.config.with_amount(current);
            if !self.retry(&config, self.max_attempts, self.retry_delay).await {
                tracing::error!("Batch failed, stopping");
                break;
            }

            completed.extend(self.history.last().cloned());
            remaining -= current;

            if remaining > 0 {
                tracing::info!("Waiting {}s before next batch...", delay.as_secs());
                sleep(delay).await;
            }
        }

        Ok(completed)
    }

    async fn poll_contract(&self) -> MinterResult<ContractInfo> {
        self.loaded_minter(self.config.clone())
            .await?
            .contract_info()
            .await
    }

    /// Poll until minting opens, then mint; gives up on sell-out or after `max_wait`
    pub async fn monitor_and_mint(&mut self, check_interval: Duration, max_wait: Duration) -> bool {
        let start = Instant::now();

        while start.elapsed() < max_wait {
            match self.poll_contract().await {
                Ok(info) if !info.mint_live => tracing::info!("Mint not live yet, waiting..."),
                Ok(info) if info.is_sold_out() => {
                    tracing::error!("Max supply reached!");
                    return false;
                }
                Ok(_) => {
                    tracing::info!("Conditions met, attempting to mint...");
                    let config = self.config.clone();
                    return self.retry(&config, self.max_attempts, self.retry_delay).await;
                }
                Err(e) => tracing::error!("Error during monitoring: {}", e),
            }

            sleep(check_interval).await;
        }

        tracing::error!("Timeout reached while monitoring");
        false
    }

    /// Projected mint plus gas cost for `amount` tokens
    pub async fn estimate_total_cost(&self, amount: u64) -> MinterResult<CostEstimate> {
        let minter = self.loaded_minter(self.config.clone()).await?;

        let gas_price = minter.gas_price().await?;
        let estimated_gas = BASE_GAS_ESTIMATE + PER_TOKEN_GAS_ESTIMATE * amount;
        let mint_cost = minter
            .mint_cost(self.config.minting.group_id, amount)
            .await?;

        let gas_cost = U256::from(estimated_gas) * U256::from(gas_price);

        Ok(CostEstimate {
            amount,
            mint_cost_wei: mint_cost,
            gas_cost_wei: gas_cost,
            total_cost_wei: gas_cost + mint_cost,
            gas_price_wei: gas_price,
            estimated_gas,
        })
    }

    /// Wait until `target`, then mint with retries; `false` if `target` has passed
    pub async fn schedule_mint_at(&mut self, target: SystemTime) -> bool {
        let wait = match target.duration_since(SystemTime::now()) {
            Ok(wait) if !wait.is_zero() => wait,
            _ => {
                tracing::error!("Target time is in the past");
                return false;
            }
        };

        tracing::info!(
            "Scheduled mint in {}. Waiting...",
            format_time_remaining(wait.as_secs())
        );
        sleep(wait).await;

        tracing::info!("Executing scheduled mint...");
        let config = self.config.clone();
        self.retry(&config, self.max_attempts, self.retry_delay).await
    }

    /// Mint every `interval`, forever or `max_iterations` times; returns the number of successes
    pub async fn recurring_mint(&mut self, interval: Duration, max_iterations: Option<u32>) -> u32 {
        let mut iteration = 0;
        let mut successes = 0;

        while max_iterations.is_none_or(|max| iteration < max) {
            tracing::info!("Recurring mint iteration {}", iteration + 1);

            let config = self.config.clone();
            if self.retry(&config, self.max_attempts, self.retry_delay).await {
                successes += 1;
                tracing::info!(
                    "Mint successful. Next attempt in {}",
                    format_time_remaining(interval.as_secs())
                );
            } else {
                tracing::warn!("Mint failed");
            }

            iteration += 1;
            if max_iterations.is_none_or(|max| iteration < max) {
                sleep(interval).await;
            }
        }

        successes
    }
}
