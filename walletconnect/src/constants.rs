//! Protocol constants for the WalletConnect request layer and hardware-tx flow

pub const JSONRPC_VERSION: &str = "2.0";

// JSON-RPC error codes
pub const INVALID_PARAMS_CODE: i64 = -32602;
pub const METHOD_NOT_FOUND_CODE: i64 = -32601;
pub const GENERIC_ERROR_CODE: i64 = 1;

/// Keys every EIP-712 payload must carry
pub const TYPED_DATA_KEYS: [&str; 4] = ["types", "primaryType", "domain", "message"];

// Persisted flag store
pub const LEDGER_STORAGE_ID: &str = "ledgerStorage";
pub const HARDWARE_TX_ERROR_KEY: &str = "hardwareTXError";

// Environment overrides
pub const STORE_PATH_ENV: &str = "HARDWARE_TX_STORE";
pub const DEVICE_ID_ENV: &str = "HARDWARE_DEVICE_ID";

// Ledger Ethereum app status words
pub const STATUS_APP_NOT_OPEN: u16 = 0x650f;
pub const STATUS_WRONG_APP: u16 = 0x6511;
pub const STATUS_INS_NOT_SUPPORTED: u16 = 0x6d00;
pub const STATUS_CLA_NOT_SUPPORTED: u16 = 0x6e00;
pub const STATUS_LOCKED: u16 = 0x5515;
pub const STATUS_OFF_OR_LOCKED: u16 = 0x6b0c;
