pub mod domain;
pub mod executor;
pub mod fee;
pub mod flow_state;
pub mod guards;
pub mod ports;

pub use domain::{
    ApprovalStep, FeeConfirmationDecision, FeeOption, FeeOptionConfirmation, FeeStatus, FeeStep,
    FeeToken, FlowKind, FlowState, FlowStatus, FormStatus, FormStep, GuardResult, OrderIntent,
    PlannedStep, PlannedStepKind, Progress, StepKind, StepResult, StepSet, SuggestedAction,
    TransactionPlan, TransactionStep, TxStepStatus, WalletKind,
};
pub use executor::{execute_next_step, StepRunner};
pub use fee::{
    auto_select_fee_option, confirm_fee_option, FeeConfirmationSlot, FeeSelection,
    FeeSelectionError,
};
pub use flow_state::compute_flow_state;
pub use guards::{base_guard, fee_guard, final_transaction_guard, BaseGuardInput, FinalGuardInput};
pub use ports::{BalancePort, FlowError, PlanPort, PortError, WalletPort};
