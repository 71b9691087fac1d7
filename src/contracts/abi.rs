use std::collections::BTreeMap;
use std::path::PathBuf;

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Address, B256, Bytes, I256, U256, keccak256};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while loading, encoding or decoding against an ABI
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("Failed to read ABI file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ABI JSON: {0}")]
    Json(String),

    #[error("Unrecognised ABI format: {0}")]
    Format(String),

    #[error("Explorer API error: {0}")]
    Explorer(String),

    #[error("Explorer request failed: {0}")]
    Network(String),

    #[error("Function not found in ABI: {0}")]
    MissingFunction(String),

    #[error("Cannot encode argument: {0}")]
    Encoding(String),

    #[error("Cannot decode output of {function}: {message}")]
    Decoding { function: String, message: String },
}

/// One `function` entry of an ABI, in its JSON field names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractFunction {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<FunctionParam>,
    #[serde(default)]
    pub outputs: Vec<FunctionParam>,
    #[serde(default = "default_mutability")]
    pub state_mutability: String,
}

/// Input or output slot; tuples carry their `components`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<FunctionParam>>,
}

/// Parsed contract ABI, indexed by function name.
///
/// Overloads share a name and are told apart by arity. The original JSON
/// array is kept alongside the index.
#[derive(Debug, Clone, Default)]
pub struct ContractAbi {
    functions: BTreeMap<String, Vec<ContractFunction>>,
    raw: Vec<Value>,
}

impl ContractAbi {
    /// Build from an ABI JSON array; non-function entries are ignored
    pub fn from_json(abi_json: &Value) -> Result<Self, AbiError> {
        let abi_array = abi_json
            .as_array()
            .ok_or_else(|| AbiError::Format("ABI must be a JSON array".to_string()))?;

        let mut functions: BTreeMap<String, Vec<ContractFunction>> = BTreeMap::new();
        for function in abi_array.iter().filter_map(parse_function) {
            functions
                .entry(function.name.clone())
                .or_default()
                .push(function);
        }

        Ok(Self {
            functions,
            raw: abi_array.clone(),
        })
    }

    /// Parse ABI from a string
    pub fn from_str_json(abi_str: &str) -> Result<Self, AbiError> {
        let abi_json: Value =
            serde_json::from_str(abi_str).map_err(|e| AbiError::Json(e.to_string()))?;
        Self::from_json(&abi_json)
    }

    /// The ABI array exactly as loaded
    pub fn raw(&self) -> &[Value] {
        &self.raw
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Overload of `name` taking exactly `arity` arguments
    pub fn function(&self, name: &str, arity: usize) -> Option<&ContractFunction> {
        self.functions
            .get(name)?
            .iter()
            .find(|f| f.inputs.len() == arity)
    }

    pub fn functions(&self) -> impl Iterator<Item = &ContractFunction> {
        self.functions.values().flatten()
    }

    pub fn function_count(&self) -> usize {
        self.functions.values().map(Vec::len).sum()
    }

    /// Calldata for `name(args...)`, picking the overload by argument count
    pub fn encode_call(&self, name: &str, args: &[String]) -> Result<Bytes, AbiError> {
        self.lookup(name, args.len())?.encode_call(args)
    }

    /// Decode return data of the `name` overload with `arity` inputs
    pub fn decode_output(
        &self,
        name: &str,
        arity: usize,
        data: &[u8],
    ) -> Result<Vec<DynSolValue>, AbiError> {
        self.lookup(name, arity)?.decode_output(data)
    }

    fn lookup(&self, name: &str, arity: usize) -> Result<&ContractFunction, AbiError> {
        self.function(name, arity)
            .ok_or_else(|| AbiError::MissingFunction(format!("{} with {} argument(s)", name, arity)))
    }
}

fn parse_function(item: &Value) -> Option<ContractFunction> {
    if item.get("type").and_then(Value::as_str) != Some("function") {
        return None;
    }

    match ContractFunction::deserialize(item) {
        Ok(function) => Some(function),
        Err(e) => {
            tracing::debug!("Skipping malformed ABI entry: {}", e);
            None
        }
    }
}

fn default_mutability() -> String {
    "nonpayable".to_string()
}

impl ContractFunction {
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.inputs.iter().map(encode_param_type).collect();
        format!("{}({})", self.name, params.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self.state_mutability.as_str(), "view" | "pure")
    }

    /// Selector followed by the ABI-encoded arguments
    pub fn encode_call(&self, args: &[String]) -> Result<Bytes, AbiError> {
        if args.len() != self.inputs.len() {
            return Err(AbiError::Encoding(format!(
                "{} expects {} argument(s), got {}",
                self.signature(),
                self.inputs.len(),
                args.len()
            )));
        }

        let values = self
            .inputs
            .iter()
            .zip(args)
            .map(|(param, value)| encode_param(param, value))
            .collect::<Result<Vec<_>, _>>()?;

        let mut calldata = self.selector().to_vec();
        calldata.extend(DynSolValue::Tuple(values).abi_encode_params());
        Ok(calldata.into())
    }

    /// Decode return data by the declared output types
    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<DynSolValue>, AbiError> {
        if self.outputs.is_empty() || data.is_empty() {
            return Ok(vec![]);
        }

        let decoding_error = |message: String| AbiError::Decoding {
            function: self.name.clone(),
            message,
        };

        let types = self
            .outputs
            .iter()
            .map(|output| DynSolType::parse(&encode_param_type(output)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| decoding_error(e.to_string()))?;

        match DynSolType::Tuple(types)
            .abi_decode_params(data)
            .map_err(|e| decoding_error(e.to_string()))?
        {
            DynSolValue::Tuple(values) => Ok(values),
            other => Ok(vec![other]),
        }
    }
}

fn encode_param_type(param: &FunctionParam) -> String {
    if let Some(components) = &param.components {
        // tuple, possibly with array suffixes such as `tuple[]`
        let inner: Vec<String> = components.iter().map(encode_param_type).collect();
        let suffix = param.param_type.strip_prefix("tuple").unwrap_or("");
        format!("({}){}", inner.join(","), suffix)
    } else {
        param.param_type.clone()
    }
}

fn type_bits(param_type: &str, prefix: &str) -> usize {
    param_type
        .strip_prefix(prefix)
        .and_then(|bits| bits.parse().ok())
        .unwrap_or(256)
}

fn parse_uint(value: &str) -> Result<U256, String> {
    match value.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16),
        None => U256::from_str_radix(value, 10),
    }
    .map_err(|e| e.to_string())
}

/// Coerce a string argument to the parameter's declared Solidity type
pub fn encode_param(param: &FunctionParam, value: &str) -> Result<DynSolValue, AbiError> {
    let value = value.trim();
    let param_type = param.param_type.as_str();
    let invalid =
        |reason: String| AbiError::Encoding(format!("invalid {} '{}': {}", param_type, value, reason));

    match param_type {
        "address" => {
            let addr: Address = value.parse().map_err(|e| invalid(format!("{}", e)))?;
            Ok(DynSolValue::Address(addr))
        }
        "bool" => match value.to_lowercase().as_str() {
            "true" | "1" => Ok(DynSolValue::Bool(true)),
            "false" | "0" => Ok(DynSolValue::Bool(false)),
            _ => Err(invalid("expected true or false".to_string())),
        },
        "bytes32" => {
            let bytes: B256 = value.parse().map_err(|e| invalid(format!("{}", e)))?;
            Ok(DynSolValue::FixedBytes(bytes, 32))
        }
        "bytes" => {
            let hex_str = value.strip_prefix("0x").unwrap_or(value);
            let bytes = hex::decode(hex_str).map_err(|e| invalid(e.to_string()))?;
            Ok(DynSolValue::Bytes(bytes))
        }
        "string" => Ok(DynSolValue::String(value.to_string())),
        t if t.starts_with("uint") && !t.contains('[') => {
            let num = parse_uint(value).map_err(invalid)?;
            Ok(DynSolValue::Uint(num, type_bits(t, "uint")))
        }
        t if t.starts_with("int") && !t.contains('[') => {
            let num = match value.strip_prefix("0x") {
                Some(_) => I256::from_hex_str(value),
                None => I256::from_dec_str(value),
            }
            .map_err(|e| invalid(e.to_string()))?;
            Ok(DynSolValue::Int(num, type_bits(t, "int")))
        }
        _ => DynSolType::parse(&encode_param_type(param))
            .and_then(|ty| ty.coerce_str(value))
            .map_err(|e| invalid(e.to_string())),
    }
}

/// First unsigned integer in decoded output, looking through tuples and arrays
pub fn first_uint(values: &[DynSolValue]) -> Option<U256> {
    match values.first()? {
        DynSolValue::Uint(value, _) => Some(*value),
        DynSolValue::Tuple(inner) | DynSolValue::Array(inner) | DynSolValue::FixedArray(inner) => {
            first_uint(inner)
        }
        _ => None,
    }
}

pub fn first_bool(values: &[DynSolValue]) -> Option<bool> {
    match values.first()? {
        DynSolValue::Bool(value) => Some(*value),
        DynSolValue::Tuple(inner) => first_bool(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use alloy::dyn_abi::DynSolValue;

    use super::*;

    const NFT_ABI: &str = r#"[
        {
            "type": "function",
            "name": "mint",
            "inputs": [
                {"name": "to", "type": "address"},
                {"name": "amount", "type": "uint256"},
                {"name": "groupId", "type": "uint256"}
            ],
            "outputs": [],
            "stateMutability": "payable"
        },
        {
            "type": "function",
            "name": "mint",
            "inputs": [{"name": "amount", "type": "uint256"}],
            "outputs": [],
            "stateMutability": "payable"
        },
        {
            "type": "function",
            "name": "quoteBatchMint",
            "inputs": [
                {"name": "groupId", "type": "uint256"},
                {"name": "amount", "type": "uint256"}
            ],
            "outputs": [
                {"name": "total", "type": "uint256"},
                {"name": "fee", "type": "uint256"}
            ],
            "stateMutability": "view"
        },
        {
            "type": "function",
            "name": "mintLive",
            "inputs": [],
            "outputs": [{"name": "", "type": "bool"}],
            "stateMutability": "view"
        },
        {"type": "event", "name": "Transfer", "inputs": []},
        {"type": "constructor", "inputs": []}
    ]"#;

    fn uint(name: &str) -> FunctionParam {
        FunctionParam {
            name: name.to_string(),
            param_type: "uint256".to_string(),
            components: None,
        }
    }

    #[test]
    fn test_parse_abi_indexes_functions() {
        let abi = ContractAbi::from_str_json(NFT_ABI).unwrap();

        assert_eq!(abi.function_count(), 4);
        assert_eq!(abi.raw().len(), 6);
        assert!(abi.has_function("mint"));
        assert!(abi.has_function("mintLive"));
        assert!(!abi.has_function("Transfer"));
        assert!(!abi.has_function("batchMint"));

        assert_eq!(abi.function("mint", 3).unwrap().inputs[0].param_type, "address");
        assert_eq!(abi.function("mint", 1).unwrap().inputs[0].name, "amount");
        assert!(abi.function("mint", 2).is_none());
        assert!(abi.function("mintLive", 0).unwrap().is_read_only());
    }

    #[test]
    fn test_non_array_abi_is_rejected() {
        let err = ContractAbi::from_json(&serde_json::json!({"abi": []})).unwrap_err();
        assert!(matches!(err, AbiError::Format(_)));
    }

    #[test]
    fn test_function_signature_and_selector() {
        let func = ContractFunction {
            name: "transfer".to_string(),
            inputs: vec![
                FunctionParam {
                    name: "to".to_string(),
                    param_type: "address".to_string(),
                    components: None,
                },
                uint("amount"),
            ],
            outputs: vec![],
            state_mutability: "nonpayable".to_string(),
        };

        assert_eq!(func.signature(), "transfer(address,uint256)");
        assert_eq!(func.selector(), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn test_tuple_array_signature() {
        let param = FunctionParam {
            name: "orders".to_string(),
            param_type: "tuple[]".to_string(),
            components: Some(vec![
                uint("id"),
                FunctionParam {
                    name: "buyer".to_string(),
                    param_type: "address".to_string(),
                    components: None,
                },
            ]),
        };
        assert_eq!(encode_param_type(&param), "(uint256,address)[]");
    }

    #[test]
    fn test_encode_call_layout() {
        let abi = ContractAbi::from_str_json(NFT_ABI).unwrap();
        let to = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string();
        let data = abi
            .encode_call("mint", &[to, "5".to_string(), "2".to_string()])
            .unwrap();

        let func = abi.function("mint", 3).unwrap();
        assert_eq!(&data[..4], &func.selector());
        assert_eq!(data.len(), 4 + 3 * 32);
        assert_eq!(data[4 + 32 + 31], 5);
        assert_eq!(data[4 + 64 + 31], 2);
    }

    #[test]
    fn test_encode_call_argument_errors() {
        let abi = ContractAbi::from_str_json(NFT_ABI).unwrap();

        let err = abi.encode_call("mint", &["a".into(), "b".into()]).unwrap_err();
        assert!(matches!(err, AbiError::MissingFunction(_)));

        let err = abi
            .encode_call("mint", &["0x123".into(), "1".into(), "0".into()])
            .unwrap_err();
        assert!(matches!(err, AbiError::Encoding(_)));
    }

    #[test]
    fn test_encode_param_types() {
        let param = |ty: &str| FunctionParam {
            name: String::new(),
            param_type: ty.to_string(),
            components: None,
        };

        assert_eq!(
            encode_param(&param("uint8"), "0x10").unwrap(),
            DynSolValue::Uint(U256::from(16), 8)
        );
        assert_eq!(
            encode_param(&param("int256"), "-3").unwrap(),
            DynSolValue::Int(I256::from_dec_str("-3").unwrap(), 256)
        );
        assert_eq!(encode_param(&param("bool"), "TRUE").unwrap(), DynSolValue::Bool(true));
        assert_eq!(
            encode_param(&param("bytes"), "0xdead").unwrap(),
            DynSolValue::Bytes(vec![0xde, 0xad])
        );
        assert!(encode_param(&param("bool"), "maybe").is_err());
        assert!(encode_param(&param("uint256"), "-1").is_err());
    }

    #[test]
    fn test_decode_tuple_output_takes_first_element() {
        let abi = ContractAbi::from_str_json(NFT_ABI).unwrap();
        let mut data = vec![0u8; 64];
        data[31] = 100;
        data[63] = 7;

        let values = abi.decode_output("quoteBatchMint", 2, &data).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(first_uint(&values), Some(U256::from(100)));
    }

    #[test]
    fn test_decode_bool_and_empty_output() {
        let abi = ContractAbi::from_str_json(NFT_ABI).unwrap();
        let mut data = vec![0u8; 32];
        data[31] = 1;

        let values = abi.decode_output("mintLive", 0, &data).unwrap();
        assert_eq!(first_bool(&values), Some(true));
        assert!(abi.decode_output("mintLive", 0, &[]).unwrap().is_empty());

        let err = abi.decode_output("quoteBatchMint", 2, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, AbiError::Decoding { .. }));
    }
}
