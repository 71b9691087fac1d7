//! Capability probing over a loaded contract: mint entry point, mint cost
//! and per-wallet limits are found by trying known function names in a fixed
//! priority order.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, U256};

use crate::chain::ChainClient;
use crate::contracts::{ContractAbi, first_uint};
use crate::error::{MinterError, MinterResult};

/// Contract address plus its parsed ABI
#[derive(Debug, Clone)]
pub struct ContractHandle {
    pub address: Address,
    pub abi: ContractAbi,
}

impl ContractHandle {
    /// Encode, `eth_call` and decode a read-only function
    pub async fn read<C: ChainClient>(
        &self,
        client: &C,
        name: &str,
        args: &[String],
    ) -> MinterResult<Vec<DynSolValue>> {
        let data = self.abi.encode_call(name, args)?;
        let output = client.call(self.address, data).await?;
        Ok(self.abi.decode_output(name, args.len(), &output)?)
    }

    async fn read_uint<C: ChainClient>(
        &self,
        client: &C,
        name: &str,
        args: &[String],
    ) -> MinterResult<U256> {
        let values = self.read(client, name, args).await?;
        first_uint(&values)
            .ok_or_else(|| MinterError::Contract(format!("{} did not return an integer", name)))
    }
}

/// Positional argument of a probed function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintArg {
    Amount,
    Group,
    Recipient,
}

/// A known function name and the order it takes its arguments in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub name: &'static str,
    pub args: &'static [MintArg],
}

impl Candidate {
    pub fn arguments(&self, amount: u64, group_id: u64, to: Address) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| match arg {
                MintArg::Amount => amount.to_string(),
                MintArg::Group => group_id.to_string(),
                MintArg::Recipient => to.to_string(),
            })
            .collect()
    }
}

use MintArg::{Amount, Group, Recipient};

pub const MINT_CANDIDATES: [Candidate; 4] = [
    Candidate { name: "batchMint", args: &[Amount, Group, Recipient] },
    Candidate { name: "mint", args: &[Recipient, Amount, Group] },
    Candidate { name: "mintBatch", args: &[Recipient, Group, Amount] },
    Candidate { name: "publicMint", args: &[Amount, Group] },
];

pub const COST_CANDIDATES: [Candidate; 4] = [
    Candidate { name: "quoteBatchMint", args: &[Group, Amount] },
    Candidate { name: "mintPrice", args: &[Group, Amount] },
    Candidate { name: "price", args: &[Amount] },
    Candidate { name: "cost", args: &[Amount] },
];

pub const MAX_MINT_CANDIDATES: [&str; 3] = ["maxMintPerWallet", "maxMint", "maxMintAmount"];

/// First mint candidate whose name exists in the ABI
pub fn select_mint_function(abi: &ContractAbi) -> MinterResult<&'static Candidate> {
    MINT_CANDIDATES
        .iter()
        .find(|c| abi.has_function(c.name))
        .ok_or_else(|| {
            MinterError::Contract("Could not find a suitable mint function in the contract".to_string())
        })
}

fn clamp_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.to::<u64>()
    }
}

/// Per-wallet mint limit, falling back to 1 when no probe answers
pub async fn max_mint_amount<C: ChainClient>(
    client: &C,
    handle: &ContractHandle,
    group_id: u64,
) -> u64 {
    for name in MAX_MINT_CANDIDATES {
        if !handle.abi.has_function(name) {
            continue;
        }

        let with_group = handle
            .read_uint(client, name, &[group_id.to_string()])
            .await;

        let result = match with_group {
            Ok(value) => Ok(value),
            Err(_) => handle.read_uint(client, name, &[]).await,
        };

        match result {
            Ok(value) => return clamp_u64(value),
            Err(e) => tracing::debug!("Failed to call {}: {}", name, e),
        }
    }

    tracing::warn!("Could not determine max mint amount, defaulting to 1");
    1
}

/// Price in wei for minting `amount` tokens of `group_id`; zero when no probe answers
pub async fn mint_cost<C: ChainClient>(
    client: &C,
    handle: &ContractHandle,
    group_id: u64,
    amount: u64,
) -> U256 {
    // the recipient slot is never used by cost functions
    let unused = Address::ZERO;

    for candidate in &COST_CANDIDATES {
        if !handle.abi.has_function(candidate.name) {
            continue;
        }

        let args = candidate.arguments(amount, group_id, unused);
        match handle.read_uint(client, candidate.name, &args).await {
            Ok(cost) => {
                tracing::debug!("Mint cost from {}: {} wei", candidate.name, cost);
                return cost;
            }
            Err(e) => tracing::debug!("Failed to call {}: {}", candidate.name, e),
        }
    }

    tracing::warn!("Could not determine mint cost, assuming free mint");
    U256::ZERO
}
