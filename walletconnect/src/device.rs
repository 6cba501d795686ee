//! Hardware-connect collaborator: error codes, signals and the callbacks a flow drives
use crate::constants::*;
use crate::errors::AppResult;
use mockall::automock;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Failure classes reported by the hardware-connect collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerErrorCode {
    NoEthApp,
    OffOrLocked,
    Disconnected,
    Unknown,
}

impl LedgerErrorCode {
    /// Classify a raw APDU status word from the Ethereum app.
    pub fn from_status(status: u16) -> Self {
        match status {
            STATUS_APP_NOT_OPEN | STATUS_WRONG_APP | STATUS_INS_NOT_SUPPORTED
            | STATUS_CLA_NOT_SUPPORTED => LedgerErrorCode::NoEthApp,
            STATUS_LOCKED | STATUS_OFF_OR_LOCKED => LedgerErrorCode::OffOrLocked,
            _ => LedgerErrorCode::Unknown,
        }
    }

    /// Classify a transport error message, which carries the status word as hex text.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        let known = [
            STATUS_APP_NOT_OPEN,
            STATUS_WRONG_APP,
            STATUS_INS_NOT_SUPPORTED,
            STATUS_CLA_NOT_SUPPORTED,
            STATUS_LOCKED,
            STATUS_OFF_OR_LOCKED,
        ];
        if let Some(status) = known
            .into_iter()
            .find(|status| lower.contains(&format!("0x{status:04x}")))
        {
            return Self::from_status(status);
        }

        if lower.contains("bleerror") || lower.contains("disconnected") {
            LedgerErrorCode::Disconnected
        } else {
            LedgerErrorCode::Unknown
        }
    }

    /// Only these codes route the user to the pair-again recovery screen.
    pub fn shows_recovery(&self) -> bool {
        matches!(self, LedgerErrorCode::NoEthApp | LedgerErrorCode::OffOrLocked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerErrorCode::NoEthApp => "no_eth_app",
            LedgerErrorCode::OffOrLocked => "off_or_locked",
            LedgerErrorCode::Disconnected => "disconnected",
            LedgerErrorCode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LedgerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal signals emitted by the hardware-connect collaborator.
///
/// A failure may arrive already classified (`code`) or as the raw transport
/// error text (`message`), which is classified with
/// [`LedgerErrorCode::from_message`].
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceSignal {
    Ready,
    Failed { code: LedgerErrorCode },
    Exit,
}

#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum SignalLine {
    Ready,
    Failed {
        #[serde(default)]
        code: Option<LedgerErrorCode>,
        #[serde(default)]
        message: Option<String>,
    },
    Exit,
}

impl<'de> Deserialize<'de> for DeviceSignal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match SignalLine::deserialize(deserializer)? {
            SignalLine::Ready => DeviceSignal::Ready,
            SignalLine::Failed { code, message } => DeviceSignal::Failed {
                code: code.unwrap_or_else(|| {
                    message
                        .as_deref()
                        .map(LedgerErrorCode::from_message)
                        .unwrap_or(LedgerErrorCode::Unknown)
                }),
            },
            SignalLine::Exit => DeviceSignal::Exit,
        })
    }
}

/// Broadcasts the transaction once the device is ready.
#[automock]
pub trait TxSubmitter {
    fn submit(&mut self) -> AppResult<()>;
}

impl<F> TxSubmitter for F
where
    F: FnMut() -> AppResult<()>,
{
    fn submit(&mut self) -> AppResult<()> {
        self()
    }
}

/// Routes the user to the pair-again error screen.
#[automock]
pub trait RecoveryPresenter {
    fn show_pair_again(&mut self, error: LedgerErrorCode, device_id: Option<String>);
}

impl<F> RecoveryPresenter for F
where
    F: FnMut(LedgerErrorCode, Option<String>),
{
    fn show_pair_again(&mut self, error: LedgerErrorCode, device_id: Option<String>) {
        self(error, device_id)
    }
}
