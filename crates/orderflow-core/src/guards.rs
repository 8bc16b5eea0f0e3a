//! Pure predicates gating step execution. Evaluated on every read; calling a
//! guard twice with the same input must return structurally equal results.

use crate::domain::{GuardResult, SuggestedAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaseGuardInput {
    pub wallet_connected: bool,
    pub is_form_valid: bool,
    pub tx_ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FinalGuardInput {
    pub base: BaseGuardInput,
    pub requires_approval: bool,
    pub approval_complete: bool,
}

/// Check order: wallet-connected → form-valid → tx-ready. First failing
/// check wins and supplies the suggested action.
pub fn base_guard(input: &BaseGuardInput) -> GuardResult {
    if !input.wallet_connected {
        return GuardResult::blocked("wallet not connected", SuggestedAction::ConnectWallet);
    }
    if !input.is_form_valid {
        return GuardResult::blocked("form has validation errors", SuggestedAction::FixForm);
    }
    if !input.tx_ready {
        return GuardResult::blocked(
            "transaction not ready",
            SuggestedAction::WaitForTransaction,
        );
    }
    GuardResult::proceed()
}

/// Same as `base_guard` with the approval check inserted between form-valid
/// and tx-ready. The relative order intentionally differs from `base_guard`;
/// flows without approvals keep the base priority.
pub fn final_transaction_guard(input: &FinalGuardInput) -> GuardResult {
    if !input.base.wallet_connected {
        return GuardResult::blocked("wallet not connected", SuggestedAction::ConnectWallet);
    }
    if !input.base.is_form_valid {
        return GuardResult::blocked("form has validation errors", SuggestedAction::FixForm);
    }
    if input.requires_approval && !input.approval_complete {
        return GuardResult::blocked(
            "token approval not completed",
            SuggestedAction::CompleteApproval,
        );
    }
    if !input.base.tx_ready {
        return GuardResult::blocked(
            "transaction not ready",
            SuggestedAction::WaitForTransaction,
        );
    }
    GuardResult::proceed()
}

/// Fails while the fee-selection UI is open so no downstream step can execute
/// mid-selection.
pub fn fee_guard(fee_selection_visible: bool) -> GuardResult {
    if fee_selection_visible {
        return GuardResult::blocked("fee selection in progress", SuggestedAction::SelectFee);
    }
    GuardResult::proceed()
}
