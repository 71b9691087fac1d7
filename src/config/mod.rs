pub mod networks;
mod settings;

pub use networks::{Explorer, NetworkProfile};
pub use settings::{
    ConfigLayer, ContractLayer, ContractSettings, DEFAULT_RECIPIENT, MintAmount, MintConfig,
    MintingLayer, MintingSettings, NetworkLayer, NetworkSettings, WalletLayer, WalletSettings,
    resolve_config_path,
};
