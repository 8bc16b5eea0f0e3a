use alloy::primitives::{Address, U256};

use orderflow_core::{BalancePort, FlowError, FlowKind, OrderIntent, PlanPort, WalletPort};

use crate::session::FlowSession;

#[derive(Debug, Clone)]
pub struct TransferParams {
    pub chain_id: u64,
    pub collection: Address,
    pub token_id: String,
    pub receiver: Address,
    pub quantity: u64,
}

impl From<TransferParams> for OrderIntent {
    fn from(params: TransferParams) -> Self {
        OrderIntent {
            flow: FlowKind::Transfer,
            chain_id: params.chain_id,
            collection: params.collection,
            token_id: params.token_id,
            quantity: params.quantity,
            price: U256::ZERO,
            currency: None,
            expiry_unix: None,
            order_id: None,
            receiver: Some(params.receiver),
        }
    }
}

/// Open a transfer flow. Moves the caller's own token; no approval step
/// unless the plan generator says otherwise.
pub async fn transfer<W, B, P>(
    params: TransferParams,
    wallet: W,
    balances: B,
    planner: P,
) -> Result<FlowSession<W, B, P>, FlowError>
where
    W: WalletPort + Send + Sync,
    B: BalancePort + Send + Sync,
    P: PlanPort + Send + Sync,
{
    FlowSession::open(params.into(), wallet, balances, planner).await
}
