use alloy::primitives::{Address, B256, U256};
use thiserror::Error;

use crate::domain::{OrderIntent, PlannedStep, TransactionPlan, WalletKind};

#[derive(Debug, Clone, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
}

/// Wallet/session capability. The engine only branches on `is_waas` to decide
/// whether a fee step exists; everything else is opaque.
pub trait WalletPort {
    fn address(&self) -> Option<Address>;
    fn chain_id(&self) -> u64;
    fn wallet_kind(&self) -> WalletKind;
    fn is_waas(&self) -> bool {
        self.wallet_kind() == WalletKind::Waas
    }
    fn switch_chain(
        &self,
        chain_id: u64,
    ) -> impl std::future::Future<Output = Result<(), PortError>> + Send;
    /// Submit a planned call; suspends on the signature prompt and RPC.
    fn send_transaction(
        &self,
        step: &PlannedStep,
    ) -> impl std::future::Future<Output = Result<B256, PortError>> + Send;
    /// Sign an off-chain order payload; resolves to the backend order id.
    fn sign_order(
        &self,
        step: &PlannedStep,
    ) -> impl std::future::Future<Output = Result<String, PortError>> + Send;
}

/// Balance lookup used exclusively by the fee auto-selector. `contract: None`
/// queries the native-token balance.
pub trait BalancePort {
    fn token_balance(
        &self,
        owner: Address,
        contract: Option<Address>,
    ) -> impl std::future::Future<Output = Result<U256, PortError>> + Send;
}

/// Backend transaction-plan generator.
pub trait PlanPort {
    fn generate_plan(
        &self,
        intent: &OrderIntent,
    ) -> impl std::future::Future<Output = Result<TransactionPlan, PortError>> + Send;
}

#[derive(Debug, Clone, Error)]
pub enum FlowError {
    /// A caller bypassed a disabled step and called execute directly. UI bug,
    /// not a user error; tests treat this as an assertion failure.
    #[error("guard violation: {0}")]
    GuardViolation(String),
    #[error("wallet error: {0}")]
    Wallet(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<PortError> for FlowError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Transport(msg) => FlowError::Network(msg),
            PortError::Validation(msg) | PortError::NotFound(msg) => FlowError::Configuration(msg),
            PortError::Policy(msg) => FlowError::Wallet(msg),
            PortError::NotImplemented(what) => FlowError::Configuration(what.to_owned()),
        }
    }
}
