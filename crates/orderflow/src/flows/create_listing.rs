use alloy::primitives::{Address, U256};

use orderflow_core::{BalancePort, FlowError, FlowKind, OrderIntent, PlanPort, WalletPort};

use crate::session::FlowSession;

#[derive(Debug, Clone)]
pub struct ListingParams {
    pub chain_id: u64,
    pub collection: Address,
    pub token_id: String,
    pub quantity: u64,
    pub price: U256,
    /// `None` prices the listing in the chain's native token.
    pub currency: Option<Address>,
    pub expiry_unix: Option<u64>,
}

impl From<ListingParams> for OrderIntent {
    fn from(params: ListingParams) -> Self {
        OrderIntent {
            flow: FlowKind::CreateListing,
            chain_id: params.chain_id,
            collection: params.collection,
            token_id: params.token_id,
            quantity: params.quantity,
            price: params.price,
            currency: params.currency,
            expiry_unix: params.expiry_unix,
            order_id: None,
            receiver: None,
        }
    }
}

/// Open a create-listing flow. Listing approves the collection for the
/// exchange; the listing order itself is signed off-chain.
pub async fn create_listing<W, B, P>(
    params: ListingParams,
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
