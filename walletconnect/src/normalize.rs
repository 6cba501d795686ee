//! Positional parameter normalization for WalletConnect RPC requests
use crate::constants::TYPED_DATA_KEYS;
use crate::errors::{AppError, AppResult};
use crate::types::*;
use serde_json::{Map, Value};
use std::fmt;

/// Named position a raw parameter binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSlot {
    Transaction,
    Message,
    Address,
    TypedData,
}

impl fmt::Display for ParamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamSlot::Transaction => "transaction",
            ParamSlot::Message => "message",
            ParamSlot::Address => "address",
            ParamSlot::TypedData => "typedData",
        };
        f.write_str(name)
    }
}

/// Expected JSON shape of a raw parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    HexString,
    Object,
    /// EIP-712 object, or the same object JSON-encoded in a string
    TypedData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub slot: ParamSlot,
    pub kind: ParamKind,
}

const fn spec(slot: ParamSlot, kind: ParamKind) -> ParamSpec {
    ParamSpec { slot, kind }
}

const TRANSACTION_SCHEMA: &[ParamSpec] = &[spec(ParamSlot::Transaction, ParamKind::Object)];
const PERSONAL_SIGN_SCHEMA: &[ParamSpec] = &[
    spec(ParamSlot::Message, ParamKind::HexString),
    spec(ParamSlot::Address, ParamKind::HexString),
];
const ETH_SIGN_SCHEMA: &[ParamSpec] = &[
    spec(ParamSlot::Address, ParamKind::HexString),
    spec(ParamSlot::Message, ParamKind::HexString),
];
const TYPED_DATA_SCHEMA: &[ParamSpec] = &[
    spec(ParamSlot::Address, ParamKind::HexString),
    spec(ParamSlot::TypedData, ParamKind::TypedData),
];

/// Ordered parameter layout for each method.
pub fn schema(method: RpcMethod) -> &'static [ParamSpec] {
    match method {
        RpcMethod::SendTransaction | RpcMethod::SignTransaction => TRANSACTION_SCHEMA,
        RpcMethod::PersonalSign => PERSONAL_SIGN_SCHEMA,
        RpcMethod::Sign => ETH_SIGN_SCHEMA,
        RpcMethod::SignTypedData | RpcMethod::SignTypedDataV3 | RpcMethod::SignTypedDataV4 => {
            TYPED_DATA_SCHEMA
        }
    }
}

#[derive(Default)]
struct BoundParams {
    tx: Option<TransactionParams>,
    message: Option<String>,
    address: Option<String>,
    typed_data: Option<TypedData>,
}

/// Build a typed request from a JSON-RPC method name and params value.
pub fn parse_request(method: &str, params: Value) -> AppResult<RpcRequest> {
    let method =
        RpcMethod::from_wire(method).ok_or_else(|| AppError::UnsupportedMethod(method.into()))?;
    match params {
        Value::Array(params) => Ok(RpcRequest { method, params }),
        other => Err(AppError::malformed(
            method,
            format!("params must be an array, got {}", json_type(&other)),
        )),
    }
}

/// Map a positional request onto its method-specific record.
///
/// Fails without a partial result when the arity or any element's shape
/// disagrees with [`schema`]. Hex values are passed through untouched.
pub fn normalize(request: &RpcRequest) -> AppResult<NormalizedParams> {
    let method = request.method;
    let specs = schema(method);

    if request.params.len() != specs.len() {
        return Err(AppError::malformed(
            method,
            format!(
                "expected {} params, got {}",
                specs.len(),
                request.params.len()
            ),
        ));
    }

    let mut bound = BoundParams::default();
    for (index, (spec, value)) in specs.iter().zip(&request.params).enumerate() {
        bind(&mut bound, method, index, spec, value)?;
    }

    let missing = |slot: ParamSlot| AppError::malformed(method, format!("{slot} is missing"));
    let normalized = match method {
        RpcMethod::SendTransaction | RpcMethod::SignTransaction => NormalizedParams::Transaction {
            method,
            tx: bound.tx.ok_or_else(|| missing(ParamSlot::Transaction))?,
        },
        RpcMethod::PersonalSign | RpcMethod::Sign => NormalizedParams::Message {
            method,
            message: bound.message.ok_or_else(|| missing(ParamSlot::Message))?,
            address: bound.address.ok_or_else(|| missing(ParamSlot::Address))?,
        },
        RpcMethod::SignTypedData | RpcMethod::SignTypedDataV3 | RpcMethod::SignTypedDataV4 => {
            NormalizedParams::TypedData {
                method,
                address: bound.address.ok_or_else(|| missing(ParamSlot::Address))?,
                typed_data: bound
                    .typed_data
                    .ok_or_else(|| missing(ParamSlot::TypedData))?,
            }
        }
    };

    Ok(normalized)
}

fn bind(
    bound: &mut BoundParams,
    method: RpcMethod,
    index: usize,
    spec: &ParamSpec,
    value: &Value,
) -> AppResult<()> {
    let wrong_shape = |expected: &str| {
        AppError::malformed(
            method,
            format!(
                "param {index} ({}) must be {expected}, got {}",
                spec.slot,
                json_type(value)
            ),
        )
    };

    match (spec.kind, spec.slot) {
        (ParamKind::HexString, slot) => {
            let text = value
                .as_str()
                .ok_or_else(|| wrong_shape("a hex string"))?
                .to_string();
            match slot {
                ParamSlot::Message => bound.message = Some(text),
                ParamSlot::Address => bound.address = Some(text),
                other => {
                    return Err(AppError::malformed(
                        method,
                        format!("{other} cannot be a hex string"),
                    ));
                }
            }
        }
        (ParamKind::Object, ParamSlot::Transaction) => {
            let object = value.as_object().ok_or_else(|| wrong_shape("an object"))?;
            bound.tx = Some(parse_transaction(method, object)?);
        }
        (ParamKind::TypedData, ParamSlot::TypedData) => {
            bound.typed_data = Some(parse_typed_data(method, value)?);
        }
        (kind, slot) => {
            return Err(AppError::malformed(
                method,
                format!("no binding for {slot} as {kind:?}"),
            ));
        }
    }

    Ok(())
}

fn parse_typed_data(method: RpcMethod, value: &Value) -> AppResult<TypedData> {
    let decoded;
    let object = match value {
        Value::Object(object) => object,
        Value::String(raw) => {
            decoded = serde_json::from_str::<Value>(raw).map_err(|e| {
                AppError::malformed(method, format!("typedData is not valid JSON: {e}"))
            })?;
            decoded.as_object().ok_or_else(|| {
                AppError::malformed(method, "typedData must encode an object")
            })?
        }
        other => {
            return Err(AppError::malformed(
                method,
                format!("typedData must be an object, got {}", json_type(other)),
            ));
        }
    };

    if let Some(key) = TYPED_DATA_KEYS.iter().find(|key| !object.contains_key(**key)) {
        return Err(AppError::malformed(
            method,
            format!("typedData is missing `{key}`"),
        ));
    }

    serde_json::from_value(Value::Object(object.clone()))
        .map_err(|e| AppError::malformed(method, format!("invalid typedData: {e}")))
}

fn parse_transaction(method: RpcMethod, object: &Map<String, Value>) -> AppResult<TransactionParams> {
    let mut object = object.clone();
    // `gas` is the older name of `gasLimit`; both may be sent if they agree
    if let Some(gas) = object.remove("gas") {
        match object.get("gasLimit") {
            None => {
                object.insert("gasLimit".to_string(), gas);
            }
            Some(limit) if *limit == gas => {}
            Some(limit) => {
                return Err(AppError::malformed(
                    method,
                    format!("gas {gas} and gasLimit {limit} disagree"),
                ));
            }
        }
    }

    serde_json::from_value(Value::Object(object))
        .map_err(|e| AppError::malformed(method, format!("invalid transaction: {e}")))
}

/// Render a hex-encoded message as text when it decodes to UTF-8.
pub fn decode_message(message: &str) -> String {
    let digits = message
        .strip_prefix("0x")
        .or_else(|| message.strip_prefix("0X"))
        .unwrap_or(message);
    hex::decode(digits)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| message.to_string())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
