use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Value,
    pub id: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcErrorResponse {
    pub jsonrpc: String,
    pub error: JsonRpcError,
    pub id: u64,
}

/// Methods a connected dApp may request from the wallet.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    #[serde(rename = "eth_sendTransaction")]
    SendTransaction,
    #[serde(rename = "eth_signTransaction")]
    SignTransaction,
    #[serde(rename = "personal_sign")]
    PersonalSign,
    #[serde(rename = "eth_sign")]
    Sign,
    #[serde(rename = "eth_signTypedData")]
    SignTypedData,
    #[serde(rename = "eth_signTypedData_v3")]
    SignTypedDataV3,
    #[serde(rename = "eth_signTypedData_v4")]
    SignTypedDataV4,
}

impl RpcMethod {
    pub const ALL: [RpcMethod; 7] = [
        RpcMethod::SendTransaction,
        RpcMethod::SignTransaction,
        RpcMethod::PersonalSign,
        RpcMethod::Sign,
        RpcMethod::SignTypedData,
        RpcMethod::SignTypedDataV3,
        RpcMethod::SignTypedDataV4,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::SendTransaction => "eth_sendTransaction",
            RpcMethod::SignTransaction => "eth_signTransaction",
            RpcMethod::PersonalSign => "personal_sign",
            RpcMethod::Sign => "eth_sign",
            RpcMethod::SignTypedData => "eth_signTypedData",
            RpcMethod::SignTypedDataV3 => "eth_signTypedData_v3",
            RpcMethod::SignTypedDataV4 => "eth_signTypedData_v4",
        }
    }

    /// Looks up a method by its wire name.
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == name)
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request as received from the WalletConnect transport, params still untyped.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub method: RpcMethod,
    pub params: Vec<Value>,
}

/// Transaction object of `eth_sendTransaction` / `eth_signTransaction`.
///
/// Every value stays in its hex-string wire form. Only `from` is mandatory;
/// a missing `to` means contract creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TypedDataField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// EIP-712 payload of the `eth_signTypedData` family.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: BTreeMap<String, Vec<TypedDataField>>,
    pub primary_type: String,
    pub domain: Map<String, Value>,
    pub message: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedParams {
    Transaction {
        method: RpcMethod,
        tx: TransactionParams,
    },
    Message {
        method: RpcMethod,
        message: String,
        address: String,
    },
    TypedData {
        method: RpcMethod,
        address: String,
        typed_data: TypedData,
    },
}

impl NormalizedParams {
    pub fn method(&self) -> RpcMethod {
        match self {
            NormalizedParams::Transaction { method, .. }
            | NormalizedParams::Message { method, .. }
            | NormalizedParams::TypedData { method, .. } => *method,
        }
    }

    /// The account the request acts on.
    pub fn address(&self) -> &str {
        match self {
            NormalizedParams::Transaction { tx, .. } => &tx.from,
            NormalizedParams::Message { address, .. }
            | NormalizedParams::TypedData { address, .. } => address,
        }
    }
}
