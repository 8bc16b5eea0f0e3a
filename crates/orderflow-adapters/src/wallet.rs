use std::sync::{Arc, Mutex};

use alloy::primitives::{keccak256, Address, B256};

use orderflow_core::{PlannedStep, PortError, WalletKind, WalletPort};

use crate::AdapterConfig;

/// Wallet/session capability. The deterministic mode stands in for an
/// injected browser or WaaS wallet during development and tests; the
/// production profile refuses to run without a real integration.
#[derive(Debug, Clone)]
pub struct WalletAdapter {
    mode: WalletMode,
    state: Arc<Mutex<WalletState>>,
}

#[derive(Debug, Clone)]
enum WalletMode {
    Disabled(String),
    Deterministic,
}

#[derive(Debug, Clone)]
struct WalletState {
    address: Option<Address>,
    chain_id: u64,
    kind: WalletKind,
    reject_next_signature: bool,
    submitted: u64,
}

impl Default for WalletAdapter {
    fn default() -> Self {
        Self::with_config(AdapterConfig::default())
    }
}

impl WalletAdapter {
    pub fn with_config(config: AdapterConfig) -> Self {
        let mode = if config.strict_runtime_required() {
            WalletMode::Disabled(
                "wallet integration not configured in production runtime profile".to_owned(),
            )
        } else {
            WalletMode::Deterministic
        };
        Self {
            mode,
            state: Arc::new(Mutex::new(WalletState {
                address: Some(
                    "0x1000000000000000000000000000000000000001"
                        .parse()
                        .expect("valid built-in deterministic account"),
                ),
                chain_id: config.default_chain_id,
                kind: config.wallet_kind,
                reject_next_signature: false,
                submitted: 0,
            })),
        }
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let WalletMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, WalletState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("wallet lock poisoned: {e}")))
    }

    fn take_rejection(&self) -> Result<(), PortError> {
        let mut g = self.lock()?;
        if g.reject_next_signature {
            g.reject_next_signature = false;
            return Err(PortError::Policy("signature rejected by user".to_owned()));
        }
        Ok(())
    }

    pub fn debug_set_address(&self, address: Option<Address>) -> Result<(), PortError> {
        self.lock()?.address = address;
        Ok(())
    }

    pub fn debug_set_wallet_kind(&self, kind: WalletKind) -> Result<(), PortError> {
        self.lock()?.kind = kind;
        Ok(())
    }

    pub fn debug_reject_next_signature(&self) -> Result<(), PortError> {
        self.lock()?.reject_next_signature = true;
        Ok(())
    }
}

impl WalletPort for WalletAdapter {
    fn address(&self) -> Option<Address> {
        self.state.lock().ok().and_then(|g| g.address)
    }

    fn chain_id(&self) -> u64 {
        self.state.lock().map(|g| g.chain_id).unwrap_or(1)
    }

    fn wallet_kind(&self) -> WalletKind {
        self.state
            .lock()
            .map(|g| g.kind)
            .unwrap_or(WalletKind::Eoa)
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), PortError> {
        self.check_mode()?;
        self.lock()?.chain_id = chain_id;
        Ok(())
    }

    async fn send_transaction(&self, step: &PlannedStep) -> Result<B256, PortError> {
        self.check_mode()?;
        self.take_rejection()?;
        let mut g = self.lock()?;
        g.submitted += 1;
        // Deterministic hash derived from the call so tests can assert on it.
        let preimage = format!("{}:{}:{}", step.to, step.data, g.submitted);
        Ok(keccak256(preimage.as_bytes()))
    }

    async fn sign_order(&self, step: &PlannedStep) -> Result<String, PortError> {
        self.check_mode()?;
        self.take_rejection()?;
        let mut g = self.lock()?;
        g.submitted += 1;
        Ok(format!("order-{}-{}", step.id, g.submitted))
    }
}
