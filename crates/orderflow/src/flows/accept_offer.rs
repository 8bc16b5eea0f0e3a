use alloy::primitives::{Address, U256};

use orderflow_core::{BalancePort, FlowError, FlowKind, OrderIntent, PlanPort, WalletPort};

use crate::session::FlowSession;

#[derive(Debug, Clone)]
pub struct AcceptOfferParams {
    pub chain_id: u64,
    pub collection: Address,
    pub token_id: String,
    /// Backend id of the offer being accepted.
    pub order_id: String,
    pub quantity: u64,
}

impl From<AcceptOfferParams> for OrderIntent {
    fn from(params: AcceptOfferParams) -> Self {
        OrderIntent {
            flow: FlowKind::AcceptOffer,
            chain_id: params.chain_id,
            collection: params.collection,
            token_id: params.token_id,
            quantity: params.quantity,
            price: U256::ZERO,
            currency: None,
            expiry_unix: None,
            order_id: Some(params.order_id),
            receiver: None,
        }
    }
}

/// Open an accept-offer flow. Selling into an offer approves the collection
/// for the exchange and submits the fill on-chain.
pub async fn accept_offer<W, B, P>(
    params: AcceptOfferParams,
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
