use crate::error::{MinterError, MinterResult};

/// Block explorer endpoints for a network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explorer {
    pub name: &'static str,
    pub base_url: &'static str,
    pub api_url: &'static str,
}

/// A supported chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub key: &'static str,
    pub name: &'static str,
    pub chain_id: u64,
    pub rpc_url: &'static str,
    pub alternative_rpcs: &'static [&'static str],
    pub explorer: Option<Explorer>,
    pub native_token: &'static str,
    pub is_testnet: bool,
}

static NETWORKS: [NetworkProfile; 4] = [
    NetworkProfile {
        key: "ARBITRUM_ONE",
        name: "Arbitrum One",
        chain_id: 42161,
        rpc_url: "https://arb1.arbitrum.io/rpc",
        alternative_rpcs: &[
            "https://arbitrum-mainnet.infura.io/v3/YOUR-PROJECT-ID",
            "https://arb-mainnet.g.alchemy.com/v2/YOUR-API-KEY",
            "https://endpoints.omniatech.io/v1/arbitrum/one/public",
        ],
        explorer: Some(Explorer {
            name: "Arbiscan",
            base_url: "https://arbiscan.io",
            api_url: "https://api.arbiscan.io/api",
        }),
        native_token: "ETH",
        is_testnet: false,
    },
    NetworkProfile {
        key: "ARBITRUM_NOVA",
        name: "Arbitrum Nova",
        chain_id: 42170,
        rpc_url: "https://nova.arbitrum.io/rpc",
        alternative_rpcs: &[
            "https://arbitrum-nova.publicnode.com",
            "https://arbitrum-nova.drpc.org",
        ],
        explorer: Some(Explorer {
            name: "NovaArbiscan",
            base_url: "https://nova.arbiscan.io",
            api_url: "https://api-nova.arbiscan.io/api",
        }),
        native_token: "ETH",
        is_testnet: false,
    },
    NetworkProfile {
        key: "ARBITRUM_SEPOLIA",
        name: "Arbitrum Sepolia",
        chain_id: 421614,
        rpc_url: "https://sepolia-rollup.arbitrum.io/rpc",
        alternative_rpcs: &[
            "https://arbitrum-sepolia.infura.io/v3/YOUR-PROJECT-ID",
            "https://arb-sepolia.g.alchemy.com/v2/YOUR-API-KEY",
        ],
        explorer: Some(Explorer {
            name: "Sepolia Arbiscan",
            base_url: "https://sepolia.arbiscan.io",
            api_url: "https://api-sepolia.arbiscan.io/api",
        }),
        native_token: "ETH",
        is_testnet: true,
    },
    NetworkProfile {
        key: "BERACHAIN",
        name: "Berachain Bartio (Testnet)",
        chain_id: 80085,
        rpc_url: "https://bartio.rpc.berachain.com",
        alternative_rpcs: &[
            "https://bartio.drpc.org",
            "https://bera-testnet.nodeinfra.com",
        ],
        explorer: Some(Explorer {
            name: "Beratrail",
            base_url: "https://bartio.beratrail.io",
            api_url: "https://api.routescan.io/v2/network/testnet/evm/80085/etherscan/api",
        }),
        native_token: "BERA",
        is_testnet: true,
    },
];

/// All supported networks, in registry order
pub fn supported_networks() -> &'static [NetworkProfile] {
    &NETWORKS
}

/// Registry keys, in registry order
pub fn supported_names() -> Vec<&'static str> {
    NETWORKS.iter().map(|n| n.key).collect()
}

/// Look up a network by key (ASCII case-insensitive)
pub fn resolve(name: &str) -> MinterResult<&'static NetworkProfile> {
    NETWORKS
        .iter()
        .find(|n| n.key.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| MinterError::UnsupportedNetwork {
            name: name.to_string(),
            available: supported_names().into_iter().map(String::from).collect(),
        })
}

/// Primary RPC followed by the alternates, in fixed order
pub fn rpc_endpoints(name: &str) -> MinterResult<Vec<&'static str>> {
    Ok(resolve(name)?.rpc_endpoints())
}

pub fn by_chain_id(chain_id: u64) -> Option<&'static NetworkProfile> {
    NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

impl NetworkProfile {
    pub fn rpc_endpoints(&self) -> Vec<&'static str> {
        std::iter::once(self.rpc_url)
            .chain(self.alternative_rpcs.iter().copied())
            .collect()
    }

    /// Explorer link for a transaction, or the bare hash when no explorer exists
    pub fn tx_url(&self, tx_hash: &str) -> String {
        match &self.explorer {
            Some(explorer) => format!("{}/tx/{}", explorer.base_url, tx_hash),
            None => format!("Transaction hash: {}", tx_hash),
        }
    }

    pub fn address_url(&self, address: &str) -> Option<String> {
        self.explorer
            .as_ref()
            .map(|explorer| format!("{}/address/{}", explorer.base_url, address))
    }

    pub fn validate_chain_id(&self, chain_id: u64) -> bool {
        self.chain_id == chain_id
    }
}
