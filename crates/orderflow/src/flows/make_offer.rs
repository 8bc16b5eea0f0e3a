use alloy::primitives::{Address, U256};

use orderflow_core::{BalancePort, FlowError, FlowKind, OrderIntent, PlanPort, WalletPort};

use crate::session::FlowSession;

#[derive(Debug, Clone)]
pub struct OfferParams {
    pub chain_id: u64,
    pub collection: Address,
    pub token_id: String,
    pub quantity: u64,
    pub price: U256,
    /// `None` prices the offer in the chain's native token.
    pub currency: Option<Address>,
    pub expiry_unix: Option<u64>,
}

impl From<OfferParams> for OrderIntent {
    fn from(params: OfferParams) -> Self {
        OrderIntent {
            flow: FlowKind::MakeOffer,
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

/// Open a make-offer flow. The final step signs the offer order off-chain;
/// an ERC-20-priced offer gets a currency-allowance approval step.
pub async fn make_offer<W, B, P>(
    params: OfferParams,
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
