use crate::config::SignerConfig;
use crate::constants::{GENERIC_ERROR_CODE, JSONRPC_VERSION};
use crate::device::{DeviceSignal, LedgerErrorCode};
use crate::errors::{AppError, AppResult};
use crate::flow::{DeviceRegistry, FlowOutcome, HardwareTxFlow};
use crate::normalize::{decode_message, normalize, parse_request};
use crate::storage::FileStore;
use crate::types::*;
use anyhow::{Context, anyhow};
use serde_json::{Value, json};
use std::{
    io::{BufRead, Write, stdout},
    ops::ControlFlow,
    panic,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub fn set_panic_hook(id: u64) {
    panic::set_hook(Box::new(move |info| {
        let payload = if let Some(payload) = info.payload().downcast_ref::<String>().or(info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .as_ref())
        {
            payload.clone()
        } else {
            "unknown panic".to_string()
        };

        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown location".to_string());

        let json = json!({
            "jsonrpc": JSONRPC_VERSION,
            "error": {
                "code": GENERIC_ERROR_CODE,
                "message": format!("Panic occurred: {}", payload),
                "data": {
                    "payload": payload,
                    "location": location,
                }
            },
            "id": id,
        });

        let _ = writeln!(stdout(), "{json}");
    }));
}

/// Read one JSON-RPC request and answer with its normalized params.
pub fn run_cli<R: BufRead>(buf_reader: R) -> Result<Value, (anyhow::Error, u64)> {
    let JsonRpcRequest {
        jsonrpc: _,
        method,
        params,
        id,
    } = read_json_line(buf_reader).map_err(|e| (e, 0))?;

    if method.is_empty() {
        return Err((anyhow!("Method is required"), id));
    }

    serde_json::to_value(JsonRpcResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        result: handle_request(&method, params).map_err(|e| (e, id))?,
        id,
    })
    .map_err(|e| (anyhow!("Failed to serialize response: {}", e), id))
}

pub fn handle_request(method: &str, params: Value) -> Result<Value, anyhow::Error> {
    let request = parse_request(method, params)?;
    let normalized = normalize(&request)?;
    debug!(method, address = normalized.address(), "normalized request");
    if let NormalizedParams::Message { message, .. } = &normalized {
        debug!(text = %decode_message(message), "message to sign");
    }

    serde_json::to_value(normalized).context("Unable to serialize normalized params")
}

/// JSON-RPC error code for an error raised while handling a request.
pub fn error_code(err: &anyhow::Error) -> i64 {
    err.downcast_ref::<AppError>()
        .map(AppError::rpc_code)
        .unwrap_or(GENERIC_ERROR_CODE)
}

pub fn error_response(err: &anyhow::Error, id: u64) -> Value {
    json!(JsonRpcErrorResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        error: JsonRpcError {
            code: error_code(err),
            message: format!("{err:#}"),
        },
        id,
    })
}

pub fn return_error(err: &anyhow::Error, id: u64) {
    println!("{}", error_response(err, id));
}

pub fn read_json_line<R: BufRead>(mut buf_reader: R) -> Result<JsonRpcRequest, anyhow::Error> {
    let mut input = String::new();
    buf_reader
        .read_line(&mut input)
        .context("Unable to read request")?;
    serde_json::from_str(&input).context("Unable to deserialize request")
}

/// Parse one device signal line. Blank lines yield `None`.
pub fn parse_signal_line(line: &str) -> AppResult<Option<DeviceSignal>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Forward device signals from `reader` until EOF or the flow stops listening.
pub fn forward_signals<R: BufRead>(
    reader: R,
    sender: mpsc::Sender<DeviceSignal>,
) -> Result<(), anyhow::Error> {
    for line in reader.lines() {
        let line = line.context("Unable to read device signal")?;
        match parse_signal_line(&line) {
            Ok(Some(signal)) => {
                if sender.blocking_send(signal).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, line = %line, "skipping malformed device signal"),
        }
    }
    Ok(())
}

/// Drive one hardware-tx flow, writing every effect as a JSON line.
pub async fn run_hardware_tx<W: Write>(
    config: &SignerConfig,
    signals: mpsc::Receiver<DeviceSignal>,
    mut writer: W,
) -> Result<FlowOutcome, anyhow::Error> {
    let registry = DeviceRegistry::new();
    let store = FileStore::new(&config.store_path);
    let submitter = || -> AppResult<()> {
        info!("[LedgerTx] - transaction handed to signer");
        Ok(())
    };
    let presenter = |error: LedgerErrorCode, device_id: Option<String>| {
        warn!(error = %error, device_id = ?device_id, "hardware wallet needs attention");
    };

    let flow = HardwareTxFlow::enter(
        config.device_id.clone(),
        &registry,
        store,
        submitter,
        presenter,
    )?;

    // the first failed write stops the flow, nothing further is submitted
    let mut write_error: Option<std::io::Error> = None;
    let outcome = flow
        .run(signals, |effect| {
            if write_error.is_some() {
                return ControlFlow::Break(());
            }
            match writeln!(writer, "{}", json!(effect)) {
                Ok(()) => ControlFlow::Continue(()),
                Err(e) => {
                    warn!(error = %e, "unable to write effect, stopping hardware tx flow");
                    write_error = Some(e);
                    ControlFlow::Break(())
                }
            }
        })
        .await;

    if let Some(e) = write_error {
        return Err(anyhow::Error::new(e).context("Unable to write effect"));
    }
    writeln!(writer, "{}", json!({ "outcome": outcome })).context("Unable to write outcome")?;
    Ok(outcome)
}
