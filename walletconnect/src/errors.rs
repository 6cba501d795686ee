use crate::constants::{GENERIC_ERROR_CODE, INVALID_PARAMS_CODE, METHOD_NOT_FOUND_CODE};
use crate::device::LedgerErrorCode;
use serde::{Deserialize, Serialize};

/// Error type for the WalletConnect signer
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// Parameter sequence does not match the method's schema
    #[error("Malformed params: {0}")]
    MalformedParams(String),

    /// Method name is not one the wallet handles
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    /// No compatible signer app open on the device
    #[error("No Ethereum app open on the hardware wallet. Please open it and try again")]
    DeviceUnavailable,

    /// Device is off or locked
    #[error("Hardware wallet is off or locked. Please unlock it and try again")]
    DeviceLocked,

    /// Device errors that are not surfaced to the user
    #[error("Hardware wallet error: {0}")]
    Silent(LedgerErrorCode),

    /// Another signing flow is already polling this device
    #[error("Device {0} is already in use by another signing flow")]
    DeviceBusy(String),

    /// Persisted flag could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Type alias for Results in this application
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn malformed(method: impl std::fmt::Display, detail: impl std::fmt::Display) -> Self {
        AppError::MalformedParams(format!("{method}: {detail}"))
    }

    /// JSON-RPC error code reported back to the requesting dApp.
    pub fn rpc_code(&self) -> i64 {
        match self {
            AppError::MalformedParams(_) => INVALID_PARAMS_CODE,
            AppError::UnsupportedMethod(_) => METHOD_NOT_FOUND_CODE,
            _ => GENERIC_ERROR_CODE,
        }
    }

    /// Whether the user gets a recovery screen for this error.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, AppError::DeviceUnavailable | AppError::DeviceLocked)
    }
}

impl From<LedgerErrorCode> for AppError {
    fn from(code: LedgerErrorCode) -> Self {
        match code {
            LedgerErrorCode::NoEthApp => AppError::DeviceUnavailable,
            LedgerErrorCode::OffOrLocked => AppError::DeviceLocked,
            other => AppError::Silent(other),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::malformed("personal_sign", "expected 2 params, got 1");
        assert_eq!(
            err.to_string(),
            "Malformed params: personal_sign: expected 2 params, got 1"
        );

        let err = AppError::Silent(LedgerErrorCode::Disconnected);
        assert_eq!(err.to_string(), "Hardware wallet error: disconnected");
    }

    #[test]
    fn test_error_serialization() {
        let err = AppError::DeviceLocked;
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("DeviceLocked"));

        let err = AppError::Silent(LedgerErrorCode::Unknown);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("Silent"));
        assert!(json.contains("unknown"));
    }

    #[test]
    fn test_rpc_codes() {
        assert_eq!(AppError::MalformedParams("x".into()).rpc_code(), -32602);
        assert_eq!(AppError::UnsupportedMethod("x".into()).rpc_code(), -32601);
        assert_eq!(AppError::DeviceLocked.rpc_code(), 1);
    }

    #[test]
    fn test_device_code_conversion() {
        assert_eq!(
            AppError::from(LedgerErrorCode::NoEthApp),
            AppError::DeviceUnavailable
        );
        assert_eq!(
            AppError::from(LedgerErrorCode::OffOrLocked),
            AppError::DeviceLocked
        );
        let silent = AppError::from(LedgerErrorCode::Disconnected);
        assert_eq!(silent, AppError::Silent(LedgerErrorCode::Disconnected));
        assert!(!silent.is_user_visible());
        assert!(AppError::DeviceLocked.is_user_visible());
    }

    #[test]
    fn test_error_conversions() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        match AppError::from(json_err) {
            AppError::Serialization(msg) => assert!(!msg.is_empty()),
            other => panic!("Expected Serialization, got {other:?}"),
        }

        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        match AppError::from(io_err) {
            AppError::Storage(msg) => assert!(msg.contains("denied")),
            other => panic!("Expected Storage, got {other:?}"),
        }
    }
}
