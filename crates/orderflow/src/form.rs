//! Per-flow form validation. Collects every field error instead of failing
//! fast; validation errors are state, never `Err`.

use std::collections::BTreeMap;

use alloy::primitives::{Address, U256};

use orderflow_core::{FlowKind, FormStatus, FormStep, OrderIntent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub errors: BTreeMap<String, Option<String>>,
}

impl FormState {
    pub fn validate(intent: &OrderIntent, wallet: Option<Address>, now_unix: u64) -> Self {
        let mut errors = BTreeMap::new();

        match intent.flow {
            FlowKind::MakeOffer | FlowKind::CreateListing => {
                check(
                    &mut errors,
                    "price",
                    intent.price > U256::ZERO,
                    "price must be greater than zero",
                );
                check(
                    &mut errors,
                    "quantity",
                    intent.quantity >= 1,
                    "quantity must be at least 1",
                );
                check(
                    &mut errors,
                    "expiry",
                    intent.expiry_unix.map(|e| e > now_unix).unwrap_or(true),
                    "expiry must be in the future",
                );
            }
            FlowKind::AcceptOffer => {
                check(
                    &mut errors,
                    "orderId",
                    intent.order_id.as_ref().is_some_and(|id| !id.is_empty()),
                    "order id is required",
                );
                check(
                    &mut errors,
                    "quantity",
                    intent.quantity >= 1,
                    "quantity must be at least 1",
                );
            }
            FlowKind::Transfer => {
                check(
                    &mut errors,
                    "receiver",
                    intent.receiver.is_some_and(|r| r != Address::ZERO),
                    "receiver address is required",
                );
                check(
                    &mut errors,
                    "receiver",
                    intent.receiver.is_none() || intent.receiver != wallet,
                    "cannot transfer to the connected wallet",
                );
                check(
                    &mut errors,
                    "quantity",
                    intent.quantity >= 1,
                    "quantity must be at least 1",
                );
            }
        }

        Self { errors }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.values().all(|e| e.is_none())
    }

    /// A form with outstanding field errors stays idle; it reaches success
    /// only once every check passes.
    pub fn to_step(&self) -> FormStep {
        FormStep {
            status: if self.is_valid() {
                FormStatus::Success
            } else {
                FormStatus::Idle
            },
            is_valid: self.is_valid(),
            errors: self.errors.clone(),
        }
    }
}

/// Record the field outcome; a field that failed an earlier check keeps its
/// first error message.
fn check(
    errors: &mut BTreeMap<String, Option<String>>,
    field: &str,
    ok: bool,
    message: &str,
) {
    let entry = errors.entry(field.to_owned()).or_insert(None);
    if !ok && entry.is_none() {
        *entry = Some(message.to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offer_intent() -> OrderIntent {
        OrderIntent {
            flow: FlowKind::MakeOffer,
            chain_id: 1,
            collection: Address::ZERO,
            token_id: "1".to_owned(),
            quantity: 1,
            price: U256::from(100),
            currency: None,
            expiry_unix: Some(2_000),
            order_id: None,
            receiver: None,
        }
    }

    #[test]
    fn valid_offer_has_no_field_errors() {
        let form = FormState::validate(&offer_intent(), None, 1_000);
        assert!(form.is_valid());
        // Every checked field is present in the map with no error.
        assert_eq!(form.errors.get("price"), Some(&None));
        assert_eq!(form.errors.get("quantity"), Some(&None));
        assert_eq!(form.errors.get("expiry"), Some(&None));
    }

    #[test]
    fn zero_price_and_past_expiry_are_both_reported() {
        let mut intent = offer_intent();
        intent.price = U256::ZERO;
        intent.expiry_unix = Some(500);
        let form = FormState::validate(&intent, None, 1_000);
        assert!(!form.is_valid());
        assert!(form.errors.get("price").and_then(|e| e.as_ref()).is_some());
        assert!(form.errors.get("expiry").and_then(|e| e.as_ref()).is_some());
    }

    #[test]
    fn transfer_to_self_is_rejected() {
        let me: Address = "0x1000000000000000000000000000000000000001"
            .parse()
            .expect("address");
        let mut intent = offer_intent();
        intent.flow = FlowKind::Transfer;
        intent.receiver = Some(me);
        let form = FormState::validate(&intent, Some(me), 1_000);
        assert!(!form.is_valid());
        assert!(form
            .errors
            .get("receiver")
            .and_then(|e| e.as_ref())
            .is_some());
    }

    #[test]
    fn form_step_is_idle_until_every_check_passes() {
        let mut intent = offer_intent();
        intent.price = U256::ZERO;
        let step = FormState::validate(&intent, None, 1_000).to_step();
        assert_eq!(step.status, FormStatus::Idle);
        assert!(!step.is_complete());

        let step = FormState::validate(&offer_intent(), None, 1_000).to_step();
        assert_eq!(step.status, FormStatus::Success);
        assert!(step.is_complete());
    }

    #[test]
    fn accept_offer_requires_order_id() {
        let mut intent = offer_intent();
        intent.flow = FlowKind::AcceptOffer;
        intent.order_id = None;
        let form = FormState::validate(&intent, None, 1_000);
        assert!(!form.is_valid());

        intent.order_id = Some("order-7".to_owned());
        let form = FormState::validate(&intent, None, 1_000);
        assert!(form.is_valid());
    }
}
