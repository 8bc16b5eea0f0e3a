//! Fee-option confirmation and auto-selection for managed wallets.
//!
//! The confirmation slot is an owned, injectable single-slot mailbox: at most
//! one `FeeOptionConfirmation` is outstanding at any time, and its decision
//! is settled exactly once (the oneshot sender is consumed on send). There is
//! no ambient global; the flow session owns the slot and hands a shared
//! handle to the wallet provider.

use std::sync::Mutex;

use alloy::primitives::{Address, U256};
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{FeeConfirmationDecision, FeeOption, FeeOptionConfirmation};
use crate::ports::{BalancePort, FlowError, PortError};

#[derive(Debug, Default)]
pub struct FeeConfirmationSlot {
    inner: Mutex<Option<PendingConfirmation>>,
}

#[derive(Debug)]
struct PendingConfirmation {
    confirmation: FeeOptionConfirmation,
    sender: oneshot::Sender<FeeConfirmationDecision>,
}

impl FeeConfirmationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new confirmation, rejecting any unresolved prior one first
    /// so no promise is ever leaked. Returns the receiver the provider
    /// awaits.
    pub fn request(
        &self,
        confirmation: FeeOptionConfirmation,
    ) -> Result<oneshot::Receiver<FeeConfirmationDecision>, PortError> {
        let mut g = self.lock()?;
        if let Some(prior) = g.take() {
            tracing::debug!(id = %prior.confirmation.id, "superseding unresolved fee confirmation");
            send_rejection(prior);
        }
        let (sender, receiver) = oneshot::channel();
        *g = Some(PendingConfirmation {
            confirmation,
            sender,
        });
        Ok(receiver)
    }

    /// Snapshot of the outstanding confirmation, if any.
    pub fn pending(&self) -> Result<Option<FeeOptionConfirmation>, PortError> {
        Ok(self.lock()?.as_ref().map(|p| p.confirmation.clone()))
    }

    /// Settle the outstanding confirmation with the chosen fee token.
    /// A stale id is a validation error and leaves the slot untouched.
    pub fn resolve(
        &self,
        id: &str,
        fee_token_address: Option<Address>,
    ) -> Result<(), PortError> {
        let mut g = self.lock()?;
        let pending = match g.take() {
            Some(p) if p.confirmation.id == id => p,
            Some(p) => {
                let current = p.confirmation.id.clone();
                *g = Some(p);
                return Err(PortError::Validation(format!(
                    "stale fee confirmation id: {id} (current: {current})"
                )));
            }
            None => {
                return Err(PortError::NotFound(format!(
                    "no outstanding fee confirmation: {id}"
                )))
            }
        };
        let decision = FeeConfirmationDecision {
            id: pending.confirmation.id.clone(),
            fee_token_address,
            confirmed: true,
        };
        if pending.sender.send(decision).is_err() {
            tracing::debug!(id, "fee confirmation receiver dropped before resolve");
        }
        Ok(())
    }

    /// Reject the outstanding confirmation by id.
    pub fn reject(&self, id: &str) -> Result<(), PortError> {
        let mut g = self.lock()?;
        match g.take() {
            Some(p) if p.confirmation.id == id => {
                send_rejection(p);
                Ok(())
            }
            other => {
                *g = other;
                Err(PortError::NotFound(format!(
                    "no outstanding fee confirmation: {id}"
                )))
            }
        }
    }

    /// Teardown path: implicitly reject whatever is outstanding. Idempotent;
    /// returns whether a confirmation was actually rejected.
    pub fn close(&self) -> bool {
        let Ok(mut g) = self.inner.lock() else {
            return false;
        };
        match g.take() {
            Some(pending) => {
                send_rejection(pending);
                true
            }
            None => false,
        }
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<PendingConfirmation>>, PortError> {
        self.inner
            .lock()
            .map_err(|e| PortError::Transport(format!("fee slot lock poisoned: {e}")))
    }
}

fn send_rejection(pending: PendingConfirmation) {
    let decision = FeeConfirmationDecision {
        id: pending.confirmation.id.clone(),
        fee_token_address: None,
        confirmed: false,
    };
    if pending.sender.send(decision).is_err() {
        tracing::debug!(
            id = %pending.confirmation.id,
            "fee confirmation receiver dropped before rejection"
        );
    }
}

/// Provider-facing entry point: register the confirmation and block until the
/// UI resolves or rejects it. This is the exact contract the managed-wallet
/// provider calls with `(id, options, chain_id)`.
pub async fn confirm_fee_option(
    slot: &FeeConfirmationSlot,
    id: String,
    options: Vec<FeeOption>,
    chain_id: u64,
) -> Result<FeeConfirmationDecision, FlowError> {
    let receiver = slot.request(FeeOptionConfirmation {
        id,
        options,
        chain_id,
    })?;
    receiver
        .await
        .map_err(|_| FlowError::Wallet("fee confirmation slot dropped".to_owned()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FeeSelectionError {
    #[error("No options provided")]
    NoOptionsProvided,
    #[error("User not connected")]
    UserNotConnected,
    #[error("Insufficient balance for any fee option")]
    InsufficientBalance,
    #[error("Failed to check balances")]
    BalanceCheckFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSelection {
    /// Id of the confirmation the selection was computed for; the caller must
    /// drop the result if a newer confirmation has superseded this id.
    pub confirmation_id: Option<String>,
    pub selected_option: Option<FeeOption>,
    pub error: Option<FeeSelectionError>,
}

impl FeeSelection {
    fn failed(confirmation_id: Option<String>, error: FeeSelectionError) -> Self {
        Self {
            confirmation_id,
            selected_option: None,
            error: Some(error),
        }
    }
}

/// Pick the first fee option, in provider order, the wallet can afford.
/// Balances are fetched concurrently; the first option whose balance covers
/// `option.value` wins (provider priority order, not cheapest).
pub async fn auto_select_fee_option<B: BalancePort + Sync>(
    confirmation: Option<&FeeOptionConfirmation>,
    wallet: Option<Address>,
    balances: &B,
) -> FeeSelection {
    let Some(confirmation) = confirmation else {
        return FeeSelection::failed(None, FeeSelectionError::NoOptionsProvided);
    };
    let id = confirmation.id.clone();
    let Some(owner) = wallet else {
        return FeeSelection::failed(Some(id), FeeSelectionError::UserNotConnected);
    };

    let lookups = confirmation
        .options
        .iter()
        .map(|option| balances.token_balance(owner, option.token.contract_address));
    let results: Vec<Result<U256, PortError>> = join_all(lookups).await;

    let mut fetched = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(balance) => fetched.push(balance),
            Err(err) => {
                tracing::warn!(id = %id, error = %err, "fee balance lookup failed");
                return FeeSelection::failed(Some(id), FeeSelectionError::BalanceCheckFailed);
            }
        }
    }

    for (option, balance) in confirmation.options.iter().zip(fetched) {
        if balance >= option.value {
            tracing::debug!(id = %id, symbol = %option.token.symbol, "fee option selected");
            return FeeSelection {
                confirmation_id: Some(id),
                selected_option: Some(option.clone()),
                error: None,
            };
        }
    }

    FeeSelection::failed(Some(id), FeeSelectionError::InsufficientBalance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FeeToken;
    use std::collections::BTreeMap;

    struct TableBalances {
        table: BTreeMap<Option<Address>, U256>,
        fail: bool,
    }

    impl BalancePort for TableBalances {
        async fn token_balance(
            &self,
            _owner: Address,
            contract: Option<Address>,
        ) -> Result<U256, PortError> {
            if self.fail {
                return Err(PortError::Transport("indexer returned 500".to_owned()));
            }
            Ok(self.table.get(&contract).copied().unwrap_or(U256::ZERO))
        }
    }

    fn eth(value_wei: u128) -> FeeOption {
        FeeOption {
            token: FeeToken {
                contract_address: None,
                decimals: 18,
                symbol: "ETH".to_owned(),
            },
            value: U256::from(value_wei),
            gas_limit: 21_000,
        }
    }

    fn usdc(value: u64) -> FeeOption {
        FeeOption {
            token: FeeToken {
                contract_address: Some(usdc_address()),
                decimals: 6,
                symbol: "USDC".to_owned(),
            },
            value: U256::from(value),
            gas_limit: 60_000,
        }
    }

    fn usdc_address() -> Address {
        "0x00000000000000000000000000000000000000aa"
            .parse()
            .expect("usdc address")
    }

    fn owner() -> Address {
        "0x1000000000000000000000000000000000000001"
            .parse()
            .expect("owner")
    }

    fn confirmation(options: Vec<FeeOption>) -> FeeOptionConfirmation {
        FeeOptionConfirmation {
            id: "conf-1".to_owned(),
            options,
            chain_id: 1,
        }
    }

    const ONE_ETH: u128 = 1_000_000_000_000_000_000;

    #[tokio::test]
    async fn selects_first_affordable_option() {
        let balances = TableBalances {
            table: BTreeMap::from([(None, U256::from(2 * ONE_ETH))]),
            fail: false,
        };
        let conf = confirmation(vec![eth(ONE_ETH), usdc(1_000_000)]);
        let selection = auto_select_fee_option(Some(&conf), Some(owner()), &balances).await;
        assert_eq!(selection.error, None);
        assert_eq!(
            selection.selected_option.expect("selected").token.symbol,
            "ETH"
        );
    }

    #[tokio::test]
    async fn falls_through_to_later_affordable_option() {
        // 0.5 ETH is not enough for the 1 ETH option, but 2 USDC covers the
        // 1 USDC option.
        let balances = TableBalances {
            table: BTreeMap::from([
                (None, U256::from(ONE_ETH / 2)),
                (Some(usdc_address()), U256::from(2_000_000u64)),
            ]),
            fail: false,
        };
        let conf = confirmation(vec![eth(ONE_ETH), usdc(1_000_000)]);
        let selection = auto_select_fee_option(Some(&conf), Some(owner()), &balances).await;
        assert_eq!(
            selection.selected_option.expect("selected").token.symbol,
            "USDC"
        );
    }

    #[tokio::test]
    async fn no_affordable_option_is_an_error() {
        let balances = TableBalances {
            table: BTreeMap::from([(None, U256::from(ONE_ETH / 2))]),
            fail: false,
        };
        let conf = confirmation(vec![eth(ONE_ETH)]);
        let selection = auto_select_fee_option(Some(&conf), Some(owner()), &balances).await;
        assert_eq!(selection.error, Some(FeeSelectionError::InsufficientBalance));
        assert_eq!(
            selection.error.expect("error").to_string(),
            "Insufficient balance for any fee option"
        );
    }

    #[tokio::test]
    async fn missing_confirmation_and_wallet_are_distinct_errors() {
        let balances = TableBalances {
            table: BTreeMap::new(),
            fail: false,
        };
        let selection = auto_select_fee_option(None, Some(owner()), &balances).await;
        assert_eq!(selection.error, Some(FeeSelectionError::NoOptionsProvided));
        assert_eq!(
            selection.error.expect("error").to_string(),
            "No options provided"
        );

        let conf = confirmation(vec![eth(ONE_ETH)]);
        let selection = auto_select_fee_option(Some(&conf), None, &balances).await;
        assert_eq!(selection.error, Some(FeeSelectionError::UserNotConnected));
        assert_eq!(
            selection.error.expect("error").to_string(),
            "User not connected"
        );
    }

    #[tokio::test]
    async fn balance_lookup_failure_is_surfaced() {
        let balances = TableBalances {
            table: BTreeMap::new(),
            fail: true,
        };
        let conf = confirmation(vec![eth(ONE_ETH)]);
        let selection = auto_select_fee_option(Some(&conf), Some(owner()), &balances).await;
        assert_eq!(selection.error, Some(FeeSelectionError::BalanceCheckFailed));
        assert_eq!(
            selection.error.expect("error").to_string(),
            "Failed to check balances"
        );
    }

    #[tokio::test]
    async fn slot_settles_exactly_once_via_resolve() {
        let slot = FeeConfirmationSlot::new();
        let receiver = slot
            .request(confirmation(vec![eth(ONE_ETH)]))
            .expect("request");
        slot.resolve("conf-1", None).expect("resolve");
        let decision = receiver.await.expect("decision");
        assert!(decision.confirmed);
        assert_eq!(decision.id, "conf-1");

        // Slot is free again: resolving a second time reports nothing pending.
        let err = slot.resolve("conf-1", None).expect_err("already settled");
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn new_request_rejects_unresolved_prior() {
        let slot = FeeConfirmationSlot::new();
        let first = slot
            .request(confirmation(vec![eth(ONE_ETH)]))
            .expect("first request");
        let second = slot
            .request(FeeOptionConfirmation {
                id: "conf-2".to_owned(),
                options: vec![],
                chain_id: 1,
            })
            .expect("second request");

        let first_decision = first.await.expect("first settled");
        assert!(!first_decision.confirmed);
        assert_eq!(first_decision.id, "conf-1");

        slot.resolve("conf-2", None).expect("resolve second");
        assert!(second.await.expect("second settled").confirmed);
    }

    #[tokio::test]
    async fn resolve_with_stale_id_is_rejected() {
        let slot = FeeConfirmationSlot::new();
        let _receiver = slot
            .request(confirmation(vec![eth(ONE_ETH)]))
            .expect("request");
        let err = slot
            .resolve("conf-0", None)
            .expect_err("stale id must not settle the slot");
        assert!(matches!(err, PortError::Validation(_)));
        assert!(slot.pending().expect("pending").is_some());
    }

    #[tokio::test]
    async fn close_rejects_once_and_is_idempotent() {
        let slot = FeeConfirmationSlot::new();
        let receiver = slot
            .request(confirmation(vec![eth(ONE_ETH)]))
            .expect("request");
        assert!(slot.close());
        assert!(!slot.close());
        let decision = receiver.await.expect("settled by close");
        assert!(!decision.confirmed);
    }

    #[tokio::test]
    async fn confirm_fee_option_round_trip() {
        let slot = FeeConfirmationSlot::new();
        let pending = confirm_fee_option(&slot, "conf-9".to_owned(), vec![eth(ONE_ETH)], 1);
        tokio::pin!(pending);

        // Not settled yet.
        assert!(futures_util::poll!(pending.as_mut()).is_pending());

        slot.resolve("conf-9", Some(usdc_address()))
            .expect("resolve");
        let decision = pending.await.expect("decision");
        assert!(decision.confirmed);
        assert_eq!(decision.fee_token_address, Some(usdc_address()));
    }
}
