//! Hardware-tx flow: owns one signer session and carries out its effects
use crate::constants::HARDWARE_TX_ERROR_KEY;
use crate::device::{DeviceSignal, LedgerErrorCode, RecoveryPresenter, TxSubmitter};
use crate::errors::{AppError, AppResult};
use crate::session::{Effect, SessionEvent, SessionState, SignerSession};
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

type ClaimSet = Arc<Mutex<HashSet<String>>>;

/// Device ids currently polled by a live flow.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    claimed: ClaimSet,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&self, device_id: &str) -> AppResult<DeviceClaim> {
        if !lock(&self.claimed).insert(device_id.to_string()) {
            return Err(AppError::DeviceBusy(device_id.to_string()));
        }
        Ok(DeviceClaim {
            claimed: self.claimed.clone(),
            device_id: device_id.to_string(),
        })
    }

    pub fn is_claimed(&self, device_id: &str) -> bool {
        lock(&self.claimed).contains(device_id)
    }
}

/// Released on drop.
#[derive(Debug)]
pub struct DeviceClaim {
    claimed: ClaimSet,
    device_id: String,
}

impl Drop for DeviceClaim {
    fn drop(&mut self) {
        lock(&self.claimed).remove(&self.device_id);
    }
}

fn lock(claimed: &ClaimSet) -> MutexGuard<'_, HashSet<String>> {
    claimed.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub submitted: bool,
    pub last_error: Option<LedgerErrorCode>,
}

pub struct HardwareTxFlow {
    session: SignerSession,
    store: Box<dyn KeyValueStore + Send>,
    submitter: Box<dyn TxSubmitter + Send>,
    presenter: Box<dyn RecoveryPresenter + Send>,
    claim: Option<DeviceClaim>,
    torn_down: bool,
}

impl HardwareTxFlow {
    /// Open the flow for `device_id`, moving the session to `AwaitingDevice`.
    pub fn enter(
        device_id: Option<String>,
        registry: &DeviceRegistry,
        store: impl KeyValueStore + Send + 'static,
        submitter: impl TxSubmitter + Send + 'static,
        presenter: impl RecoveryPresenter + Send + 'static,
    ) -> AppResult<Self> {
        let claim = device_id
            .as_deref()
            .map(|id| registry.claim(id))
            .transpose()?;

        let mut flow = Self {
            session: SignerSession::new(),
            store: Box::new(store),
            submitter: Box::new(submitter),
            presenter: Box::new(presenter),
            claim,
            torn_down: false,
        };
        info!(device_id = ?device_id, "[LedgerTx] - entering hardware tx flow");
        flow.handle(SessionEvent::Enter { device_id });
        Ok(flow)
    }

    pub fn session(&self) -> &SignerSession {
        &self.session
    }

    pub fn outcome(&self) -> FlowOutcome {
        FlowOutcome {
            submitted: self.session.state == SessionState::Submitted,
            last_error: self.session.last_error,
        }
    }

    /// Apply one event and perform the effects it yields.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Effect> {
        let from = self.session.state;
        let transition = self.session.apply(event);
        if transition.is_ignored() {
            if from == SessionState::Submitted {
                debug!("[LedgerTx] - already submitted");
            } else {
                debug!(state = ?from, "[LedgerTx] - event ignored");
            }
            return Vec::new();
        }

        debug!(from = ?from, path = ?transition.path, "[LedgerTx] - transition");
        self.session = transition.session;
        for effect in &transition.effects {
            self.perform(effect);
        }
        transition.effects
    }

    pub fn signal(&mut self, signal: DeviceSignal) -> Vec<Effect> {
        match signal {
            DeviceSignal::Ready => self.handle(SessionEvent::DeviceReady),
            DeviceSignal::Failed { code } => {
                let error = AppError::from(code);
                if error.is_user_visible() {
                    info!(error = %error, "[LedgerTx] - device error");
                } else {
                    debug!(error = %error, "[LedgerTx] - device error not shown to user");
                }
                self.handle(SessionEvent::DeviceFailed(code))
            }
            DeviceSignal::Exit => self.exit(),
        }
    }

    /// Reset the session and release the device. Later calls do nothing.
    pub fn exit(&mut self) -> Vec<Effect> {
        if self.torn_down {
            return Vec::new();
        }
        let effects = self.handle(SessionEvent::Exit);
        self.claim = None;
        self.torn_down = true;
        effects
    }

    /// Consume collaborator signals until `Exit`, the sender goes away or
    /// `on_effect` breaks, then tear down.
    pub async fn run<F>(mut self, mut signals: mpsc::Receiver<DeviceSignal>, mut on_effect: F) -> FlowOutcome
    where
        F: FnMut(&Effect) -> ControlFlow<()>,
    {
        'signals: while let Some(signal) = signals.recv().await {
            if signal == DeviceSignal::Exit {
                break;
            }
            for effect in self.signal(signal) {
                if on_effect(&effect).is_break() {
                    debug!("[LedgerTx] - effect consumer stopped, closing flow");
                    break 'signals;
                }
            }
        }
        signals.close();

        let outcome = self.outcome();
        for effect in self.exit() {
            let _ = on_effect(&effect);
        }
        outcome
    }

    fn perform(&mut self, effect: &Effect) {
        match effect {
            Effect::Submit => {
                debug!("[LedgerTx] - submitting tx");
                if let Err(e) = self.submitter.submit() {
                    error!(error = %e, "[LedgerTx] - submit failed");
                    self.persist_tx_error(true);
                }
            }
            Effect::PersistTxError { value } => self.persist_tx_error(*value),
            Effect::ShowRecovery { error, device_id } => {
                info!(error = %error, device_id = ?device_id, "[LedgerTx] - routing to pair again sheet");
                self.presenter.show_pair_again(*error, device_id.clone());
            }
        }
    }

    fn persist_tx_error(&mut self, value: bool) {
        info!(value, "setHardwareTXError");
        if let Err(e) = self.store.set_bool(HARDWARE_TX_ERROR_KEY, value) {
            warn!(error = %e, "failed to persist hardware tx error flag");
        }
    }
}

impl Drop for HardwareTxFlow {
    fn drop(&mut self) {
        self.exit();
    }
}
