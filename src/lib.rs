//! Automated NFT minting on EVM-compatible chains.
//!
//! [`Minter`] runs a single connect → load → mint session; [`MintRunner`]
//! layers retry, batch, monitor and schedule workflows on top of it.

pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod minter;
pub mod units;

pub use config::{MintConfig, NetworkProfile};
pub use error::{MinterError, MinterResult};
pub use minter::{ContractInfo, MintAttemptRecord, MintRunner, Minter};
