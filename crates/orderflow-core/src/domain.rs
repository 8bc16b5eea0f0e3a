use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletKind {
    /// Managed wallet: gas fees require an explicit fee-token confirmation.
    Waas,
    Eoa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowKind {
    MakeOffer,
    AcceptOffer,
    Transfer,
    CreateListing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Form,
    Fee,
    Approval,
    Transaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    Idle,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeStatus {
    Idle,
    Selecting,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStepStatus {
    Idle,
    Pending,
    Success,
    Error,
}

/// Client-side input validation. No network effect; errors are recovered by
/// re-input, never by retrying the step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormStep {
    pub status: FormStatus,
    pub is_valid: bool,
    pub errors: BTreeMap<String, Option<String>>,
}

impl FormStep {
    pub fn is_complete(&self) -> bool {
        self.status == FormStatus::Success && self.is_valid
    }
}

/// Fee-token selection. Present only for managed wallets; sponsored flows
/// (zero fee options) complete immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStep {
    pub status: FeeStatus,
    pub is_sponsored: bool,
    pub is_selecting: bool,
    pub selected_option: Option<FeeOption>,
}

impl FeeStep {
    pub fn is_complete(&self) -> bool {
        self.status == FeeStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStep {
    pub status: TxStepStatus,
    pub disabled: bool,
    pub disabled_reason: Option<String>,
    pub error: Option<String>,
    pub result: Option<StepResult>,
}

impl TransactionStep {
    pub fn idle() -> Self {
        Self {
            status: TxStepStatus::Idle,
            disabled: false,
            disabled_reason: None,
            error: None,
            result: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TxStepStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == TxStepStatus::Success
    }

    pub fn has_error(&self) -> bool {
        self.status == TxStepStatus::Error || self.error.is_some()
    }

    pub fn can_execute(&self) -> bool {
        self.status == TxStepStatus::Idle && !self.disabled
    }
}

/// A token-allowance transaction gating the final step, plus the one
/// documented exception to "complete means complete": an `invalidated`
/// approval is actionable again even after success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub tx: TransactionStep,
    pub invalidated: bool,
}

impl ApprovalStep {
    pub fn idle() -> Self {
        Self {
            tx: TransactionStep::idle(),
            invalidated: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.tx.is_success() && !self.invalidated
    }

    pub fn reset(&mut self) {
        self.tx = TransactionStep::idle();
        self.invalidated = false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepResult {
    Transaction { hash: B256 },
    Signature { order_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeToken {
    pub contract_address: Option<Address>,
    pub decimals: u8,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeOption {
    pub token: FeeToken,
    /// Fee amount in the token's base units, decimal string on the wire.
    #[serde(with = "u256_decimal")]
    pub value: U256,
    pub gas_limit: u64,
}

/// One wallet-provider fee-confirmation request. At most one instance may be
/// outstanding at any time; see `FeeConfirmationSlot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeOptionConfirmation {
    pub id: String,
    pub options: Vec<FeeOption>,
    pub chain_id: u64,
}

/// Result shape the wallet provider is blocked on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfirmationDecision {
    pub id: String,
    pub fee_token_address: Option<Address>,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestedAction {
    ConnectWallet,
    FixForm,
    WaitForTransaction,
    CompleteApproval,
    SelectFee,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardResult {
    pub can_proceed: bool,
    pub error: Option<String>,
    pub suggested_action: Option<SuggestedAction>,
}

impl GuardResult {
    pub fn proceed() -> Self {
        Self {
            can_proceed: true,
            error: None,
            suggested_action: None,
        }
    }

    pub fn blocked(error: impl Into<String>, action: SuggestedAction) -> Self {
        Self {
            can_proceed: false,
            error: Some(error.into()),
            suggested_action: Some(action),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlannedStepKind {
    /// Reserved kind the engine recognizes; everything else is final-action.
    TokenApproval,
    Transaction,
    Signature,
}

/// One backend-defined unit of the generated transaction plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub id: String,
    pub kind: PlannedStepKind,
    pub to: Address,
    pub data: String,
    #[serde(with = "u256_decimal")]
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPlan {
    pub steps: Vec<PlannedStep>,
}

impl TransactionPlan {
    pub fn approval(&self) -> Option<&PlannedStep> {
        self.steps
            .iter()
            .find(|s| s.kind == PlannedStepKind::TokenApproval)
    }

    /// The single final action step: first non-approval step in plan order.
    pub fn final_action(&self) -> Option<&PlannedStep> {
        self.steps
            .iter()
            .find(|s| s.kind != PlannedStepKind::TokenApproval)
    }
}

/// Domain parameters handed to the plan generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub flow: FlowKind,
    pub chain_id: u64,
    pub collection: Address,
    pub token_id: String,
    pub quantity: u64,
    #[serde(with = "u256_decimal")]
    pub price: U256,
    pub currency: Option<Address>,
    pub expiry_unix: Option<u64>,
    pub order_id: Option<String>,
    pub receiver: Option<Address>,
}

/// The canonical ordered step set: Form → Fee → Approval → Transaction.
/// Absent optional steps are skipped, never reordered; the field layout makes
/// the order structural rather than positional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepSet {
    pub form: Option<FormStep>,
    pub fee: Option<FeeStep>,
    pub approval: Option<ApprovalStep>,
    pub transaction: Option<TransactionStep>,
}

impl StepSet {
    pub fn kinds(&self) -> Vec<StepKind> {
        let mut out = Vec::with_capacity(4);
        if self.form.is_some() {
            out.push(StepKind::Form);
        }
        if self.fee.is_some() {
            out.push(StepKind::Fee);
        }
        if self.approval.is_some() {
            out.push(StepKind::Approval);
        }
        if self.transaction.is_some() {
            out.push(StepKind::Transaction);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.kinds().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Idle,
    Pending,
    Error,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub percent: u8,
}

/// Renderable summary of a step set. Pure function of the steps; recomputed
/// on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    pub status: FlowStatus,
    /// `None` when the step set is empty ("unknown" in the source contract).
    pub current_step: Option<StepKind>,
    pub next_step: Option<StepKind>,
    pub progress: Progress,
    pub has_invalidated_steps: bool,
}

pub(crate) mod u256_decimal {
    use alloy::primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_option_value_round_trips_as_decimal_string() {
        let option = FeeOption {
            token: FeeToken {
                contract_address: None,
                decimals: 18,
                symbol: "ETH".to_owned(),
            },
            value: U256::from(1_500_000_000_000_000_000u128),
            gas_limit: 21_000,
        };
        let json = serde_json::to_value(&option).expect("serialize");
        assert_eq!(
            json.get("value").and_then(|v| v.as_str()),
            Some("1500000000000000000")
        );
        let back: FeeOption = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, option);
    }

    #[test]
    fn plan_splits_approval_from_final_action() {
        let plan = TransactionPlan {
            steps: vec![
                PlannedStep {
                    id: "approve".to_owned(),
                    kind: PlannedStepKind::TokenApproval,
                    to: Address::ZERO,
                    data: "0x".to_owned(),
                    value: U256::ZERO,
                },
                PlannedStep {
                    id: "sell".to_owned(),
                    kind: PlannedStepKind::Transaction,
                    to: Address::ZERO,
                    data: "0x".to_owned(),
                    value: U256::ZERO,
                },
            ],
        };
        assert_eq!(plan.approval().map(|s| s.id.as_str()), Some("approve"));
        assert_eq!(plan.final_action().map(|s| s.id.as_str()), Some("sell"));
    }

    #[test]
    fn invalidated_approval_is_not_complete() {
        let mut step = ApprovalStep::idle();
        step.tx.status = TxStepStatus::Success;
        assert!(step.is_complete());
        step.invalidated = true;
        assert!(!step.is_complete());
        step.reset();
        assert_eq!(step.tx.status, TxStepStatus::Idle);
        assert!(!step.invalidated);
    }
}
