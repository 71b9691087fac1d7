mod abi;
mod loader;

pub use abi::{
    AbiError, ContractAbi, ContractFunction, FunctionParam, encode_param, first_bool, first_uint,
};
pub use loader::{extract_abi, load_from_explorer, load_from_file};
